//! Program Compilation
//!
//! [`ProgramCompiler`] assembles final stage source text (prefix generation
//! via the define builder, body expansion via the preprocessor) and submits
//! it to the driver. The result is a [`CompiledProgram`] owning the driver
//! handle, the generated source, optional diagnostics, and lazily built
//! attribute / uniform tables.
//!
//! Driver-reported compile or link failures never raise: the program comes
//! back with `is_usable() == false` and the per-stage logs attached, and the
//! caller decides on a fallback. Only the textual stage (missing includes,
//! unsupported enum table entries) produces hard errors.

use rustc_hash::FxHashMap;

use crate::chunks::ShaderChunkLibrary;
use crate::driver::{ActiveAttribute, GpuDriver, ProgramHandle, ShaderStage};
use crate::errors::Result;
use crate::features::{FeatureBits, ProgramFeatures, ToneMapping};
use crate::pipeline::defines::{
    self, RequestedExtensions, build_defines, build_extension_pragmas, precision_block,
};
use crate::pipeline::preprocess::{resolve_includes, substitute_light_counts, unroll_light_loops};
use crate::uniforms::UniformTree;

/// Driver log text captured during compile + link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDiagnostics {
    pub program_log: String,
    pub vertex_log: String,
    pub fragment_log: String,
}

/// A linked GPU program plus everything needed to feed it per-frame values.
#[derive(Debug)]
pub struct CompiledProgram {
    program: ProgramHandle,
    cache_key: u128,
    usable: bool,
    diagnostics: Option<ProgramDiagnostics>,
    pub vertex_source: String,
    pub fragment_source: String,
    attributes: Option<FxHashMap<String, ActiveAttribute>>,
    uniforms: Option<UniformTree>,
    usage_count: u32,
}

impl CompiledProgram {
    #[must_use]
    pub fn handle(&self) -> ProgramHandle {
        self.program
    }

    /// Key over `(features, raw stage bodies)`; see
    /// [`ProgramFeatures::cache_key`].
    #[must_use]
    pub fn cache_key(&self) -> u128 {
        self.cache_key
    }

    /// `false` when the driver reported a link failure. The handle and
    /// diagnostics stay valid either way.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.usable
    }

    /// Logs retained from compile + link. `None` when the link succeeded and
    /// every log was empty.
    #[must_use]
    pub fn diagnostics(&self) -> Option<&ProgramDiagnostics> {
        self.diagnostics.as_ref()
    }

    /// Active attribute table, reflected on first call and cached.
    pub fn attributes(&mut self, driver: &dyn GpuDriver) -> &FxHashMap<String, ActiveAttribute> {
        self.attributes.get_or_insert_with(|| {
            driver
                .active_attributes(self.program)
                .into_iter()
                .map(|attribute| (attribute.name.clone(), attribute))
                .collect()
        })
    }

    /// Uniform setter tree, reflected and parsed on first call.
    ///
    /// Built exactly once; subsequent calls return the same tree. Fails only
    /// when reflection reports a GL type missing from the dispatch table.
    pub fn uniform_tree(&mut self, driver: &dyn GpuDriver) -> Result<&mut UniformTree> {
        let tree = match self.uniforms.take() {
            Some(tree) => tree,
            None => UniformTree::from_program(driver, self.program)?,
        };
        Ok(self.uniforms.insert(tree))
    }

    #[must_use]
    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }

    /// Usage hook for an external program pool: one more material shares
    /// this program.
    pub fn retain(&mut self) {
        self.usage_count += 1;
    }

    /// Drop one usage. At zero the driver program object is freed and `true`
    /// is returned; the instance must not be used afterwards.
    pub fn release(&mut self, driver: &mut dyn GpuDriver) -> bool {
        if self.usage_count == 0 {
            log::warn!("release() on a program already at zero usage");
            return false;
        }
        self.usage_count -= 1;
        if self.usage_count == 0 {
            driver.delete_program(self.program);
            return true;
        }
        false
    }
}

/// Assembles and compiles program variants against one chunk library.
#[derive(Debug, Default)]
pub struct ProgramCompiler {
    chunks: ShaderChunkLibrary,
}

impl ProgramCompiler {
    #[must_use]
    pub fn new(chunks: ShaderChunkLibrary) -> Self {
        Self { chunks }
    }

    #[must_use]
    pub fn chunks(&self) -> &ShaderChunkLibrary {
        &self.chunks
    }

    /// Assemble, compile and link one program variant.
    ///
    /// `vertex_body` / `fragment_body` are the raw stage bodies (with
    /// `#include` directives and count tokens still in place). Errors come
    /// only from the textual stage; a driver link failure is returned as a
    /// non-usable program carrying diagnostics.
    pub fn compile(
        &self,
        driver: &mut dyn GpuDriver,
        features: &ProgramFeatures,
        requested: &RequestedExtensions,
        vertex_body: &str,
        fragment_body: &str,
    ) -> Result<CompiledProgram> {
        let define_lines = build_defines(features)?;
        let pragmas = build_extension_pragmas(requested, features, driver);

        let vertex_prefix = Self::vertex_prefix(features, &define_lines);
        let fragment_prefix = Self::fragment_prefix(features, &define_lines, &pragmas)?;

        let vertex_source = format!(
            "{vertex_prefix}\n{}",
            self.preprocess_body(vertex_body, features)?
        );
        let fragment_source = format!(
            "{fragment_prefix}\n{}",
            self.preprocess_body(fragment_body, features)?
        );

        let vertex = driver.create_shader(ShaderStage::Vertex, &vertex_source);
        let fragment = driver.create_shader(ShaderStage::Fragment, &fragment_source);
        let program = driver.link_program(vertex, fragment);

        let linked = driver.link_status(program);
        let program_log = driver.program_info_log(program);
        let vertex_log = driver.shader_info_log(vertex);
        let fragment_log = driver.shader_info_log(fragment);

        driver.delete_shader(vertex);
        driver.delete_shader(fragment);

        let has_logs = !program_log.trim().is_empty()
            || !vertex_log.trim().is_empty()
            || !fragment_log.trim().is_empty();

        let diagnostics = if linked && !has_logs {
            None
        } else {
            Some(ProgramDiagnostics {
                program_log,
                vertex_log,
                fragment_log,
            })
        };

        let cache_key = features.cache_key(vertex_body, fragment_body);
        if linked {
            log::debug!("program linked, cache_key={cache_key:032x}");
        } else if let Some(d) = &diagnostics {
            log::warn!(
                "program link failed: {} | vs: {} | fs: {}",
                d.program_log,
                d.vertex_log,
                d.fragment_log
            );
        }

        Ok(CompiledProgram {
            program,
            cache_key,
            usable: linked,
            diagnostics,
            vertex_source,
            fragment_source,
            attributes: None,
            uniforms: None,
            usage_count: 1,
        })
    }

    fn preprocess_body(&self, body: &str, features: &ProgramFeatures) -> Result<String> {
        let mut out = resolve_includes(body, &self.chunks)?;
        out = substitute_light_counts(&out, &features.light_counts);
        if !features.is_raw() {
            out = unroll_light_loops(&out);
        }
        Ok(out)
    }

    fn vertex_prefix(features: &ProgramFeatures, define_lines: &[String]) -> String {
        let mut prefix = String::new();
        if features.is_raw() {
            push_lines(&mut prefix, define_lines);
            return prefix;
        }

        prefix.push_str(&precision_block(features));
        push_lines(&mut prefix, define_lines);

        prefix.push_str(
            "uniform mat4 modelMatrix;\n\
             uniform mat4 modelViewMatrix;\n\
             uniform mat4 projectionMatrix;\n\
             uniform mat4 viewMatrix;\n\
             uniform mat3 normalMatrix;\n\
             uniform vec3 cameraPosition;\n\
             attribute vec3 position;\n\
             attribute vec3 normal;\n\
             attribute vec2 uv;\n",
        );
        if features.bits.contains(FeatureBits::VERTEX_COLORS) {
            prefix.push_str("attribute vec3 color;\n");
        }
        if features.bits.contains(FeatureBits::MORPH_TARGETS) {
            prefix.push_str(
                "attribute vec3 morphTarget0;\n\
                 attribute vec3 morphTarget1;\n\
                 attribute vec3 morphTarget2;\n\
                 attribute vec3 morphTarget3;\n",
            );
            if features.bits.contains(FeatureBits::MORPH_NORMALS) {
                prefix.push_str(
                    "attribute vec3 morphNormal0;\n\
                     attribute vec3 morphNormal1;\n\
                     attribute vec3 morphNormal2;\n\
                     attribute vec3 morphNormal3;\n",
                );
            }
        }
        if features.bits.contains(FeatureBits::SKINNING) {
            prefix.push_str(
                "attribute vec4 skinIndex;\n\
                 attribute vec4 skinWeight;\n",
            );
        }
        prefix
    }

    fn fragment_prefix(
        features: &ProgramFeatures,
        define_lines: &[String],
        pragmas: &[String],
    ) -> Result<String> {
        let mut prefix = String::new();
        push_lines(&mut prefix, pragmas);
        if features.is_raw() {
            push_lines(&mut prefix, define_lines);
            return Ok(prefix);
        }

        prefix.push_str(&precision_block(features));
        push_lines(&mut prefix, define_lines);
        prefix.push_str(
            "uniform mat4 viewMatrix;\n\
             uniform vec3 cameraPosition;\n",
        );

        if features.tone_mapping != ToneMapping::None {
            prefix.push_str(&defines::tone_mapping_function(features.tone_mapping)?);
            prefix.push('\n');
        }
        if features.bits.contains(FeatureBits::MAP) {
            prefix.push_str(&defines::texel_decode_function(
                "mapTexelToLinear",
                features.map_encoding,
            )?);
            prefix.push('\n');
        }
        if features.bits.contains(FeatureBits::ENV_MAP) {
            prefix.push_str(&defines::texel_decode_function(
                "envMapTexelToLinear",
                features.env_map_encoding,
            )?);
            prefix.push('\n');
        }
        prefix.push_str(&defines::texel_encode_function(
            "linearToOutputTexel",
            features.output_encoding,
        )?);
        prefix.push('\n');
        Ok(prefix)
    }
}

fn push_lines(out: &mut String, lines: &[String]) {
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
}
