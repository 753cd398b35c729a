//! Program Define Builder
//!
//! Converts a [`ProgramFeatures`] record into `#define` lines, precision
//! qualifiers and `#extension` pragmas for the generated stage prefixes.
//! Define order is fixed so that identical feature sets always produce
//! byte-identical prefix text.
//!
//! Raw-mode programs bypass every built-in define; only the user-authored
//! `custom_defines` (and available extension pragmas) are emitted.

use crate::driver::GpuDriver;
use crate::errors::{GlintError, Result};
use crate::features::{
    CombineOperation, EnvMapping, FeatureBits, ProgramFeatures, ShadowTechnique, TextureEncoding,
    ToneMapping,
};

/// Extensions a material asks for explicitly, on top of what the feature set
/// implies.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestedExtensions {
    pub derivatives: bool,
    pub frag_depth: bool,
    pub draw_buffers: bool,
    pub shader_texture_lod: bool,
}

// ─── Fixed lookup tables ─────────────────────────────────────────────────────

fn env_map_type_define(mapping: EnvMapping) -> &'static str {
    match mapping {
        EnvMapping::CubeReflection | EnvMapping::CubeRefraction => "ENVMAP_TYPE_CUBE",
        EnvMapping::EquirectReflection | EnvMapping::EquirectRefraction => "ENVMAP_TYPE_EQUIREC",
        EnvMapping::CubeUv => "ENVMAP_TYPE_CUBE_UV",
    }
}

fn env_map_mode_define(mapping: EnvMapping) -> &'static str {
    match mapping {
        EnvMapping::CubeRefraction | EnvMapping::EquirectRefraction => "ENVMAP_MODE_REFRACTION",
        _ => "ENVMAP_MODE_REFLECTION",
    }
}

fn env_map_blending_define(combine: CombineOperation) -> &'static str {
    match combine {
        CombineOperation::Multiply => "ENVMAP_BLENDING_MULTIPLY",
        CombineOperation::Mix => "ENVMAP_BLENDING_MIX",
        CombineOperation::Add => "ENVMAP_BLENDING_ADD",
    }
}

fn shadow_map_type_define(technique: ShadowTechnique) -> &'static str {
    match technique {
        ShadowTechnique::Basic => "SHADOWMAP_TYPE_BASIC",
        ShadowTechnique::Pcf => "SHADOWMAP_TYPE_PCF",
        ShadowTechnique::PcfSoft => "SHADOWMAP_TYPE_PCF_SOFT",
        ShadowTechnique::Vsm => "SHADOWMAP_TYPE_VSM",
    }
}

/// GLSL function name implementing a tone-mapping curve.
fn tone_mapping_function_name(mode: ToneMapping) -> Result<&'static str> {
    match mode {
        ToneMapping::Linear => Ok("LinearToneMapping"),
        ToneMapping::Reinhard => Ok("ReinhardToneMapping"),
        ToneMapping::Cineon => Ok("OptimizedCineonToneMapping"),
        ToneMapping::AcesFilmic => Ok("ACESFilmicToneMapping"),
        // `None` never reaches the table; `Custom` has no built-in body.
        ToneMapping::None | ToneMapping::Custom => Err(GlintError::UnsupportedToneMapping(mode)),
    }
}

/// `(function suffix, extra arguments)` for a texel encoding.
fn encoding_components(encoding: TextureEncoding) -> Result<(&'static str, &'static str)> {
    match encoding {
        TextureEncoding::Linear => Ok(("Linear", "( value )")),
        TextureEncoding::Srgb => Ok(("sRGB", "( value )")),
        TextureEncoding::Rgbe => Ok(("RGBE", "( value )")),
        TextureEncoding::Rgbm7 => Ok(("RGBM", "( value, 7.0 )")),
        TextureEncoding::Rgbm16 => Ok(("RGBM", "( value, 16.0 )")),
        TextureEncoding::Rgbd => Ok(("RGBD", "( value, 256.0 )")),
        TextureEncoding::Gamma => Ok(("Gamma", "( value, float( GAMMA_FACTOR ) )")),
        TextureEncoding::LogLuv => Err(GlintError::UnsupportedEncoding(encoding)),
    }
}

/// `vec4 fnName( vec4 value ) { return XToLinear( value[, args] ); }`
pub fn texel_decode_function(fn_name: &str, encoding: TextureEncoding) -> Result<String> {
    let (suffix, args) = encoding_components(encoding)?;
    Ok(format!(
        "vec4 {fn_name}( vec4 value ) {{ return {suffix}ToLinear{args}; }}"
    ))
}

/// `vec4 fnName( vec4 value ) { return LinearToX( value[, args] ); }`
pub fn texel_encode_function(fn_name: &str, encoding: TextureEncoding) -> Result<String> {
    let (suffix, args) = encoding_components(encoding)?;
    Ok(format!(
        "vec4 {fn_name}( vec4 value ) {{ return LinearTo{suffix}{args}; }}"
    ))
}

/// `vec3 toneMapping( vec3 color ) { return XToneMapping( color ); }`
pub fn tone_mapping_function(mode: ToneMapping) -> Result<String> {
    let name = tone_mapping_function_name(mode)?;
    Ok(format!(
        "vec3 toneMapping( vec3 color ) {{ return {name}( color ); }}"
    ))
}

// ─── Define emission ─────────────────────────────────────────────────────────

/// Precision qualifier block shared by both stages.
#[must_use]
pub fn precision_block(features: &ProgramFeatures) -> String {
    let q = features.precision.qualifier();
    format!("precision {q} float;\nprecision {q} int;\n")
}

/// One `#define` line per active feature, in fixed order.
///
/// Raw mode emits only the user-authored custom defines.
pub fn build_defines(features: &ProgramFeatures) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    if !features.is_raw() {
        let mut flag = |bit: FeatureBits, name: &str| {
            if features.bits.contains(bit) {
                lines.push(format!("#define {name}"));
            }
        };
        flag(FeatureBits::MAP, "USE_MAP");
        flag(FeatureBits::ENV_MAP, "USE_ENVMAP");
        flag(FeatureBits::AO_MAP, "USE_AOMAP");
        flag(FeatureBits::EMISSIVE_MAP, "USE_EMISSIVEMAP");
        flag(FeatureBits::NORMAL_MAP, "USE_NORMALMAP");
        flag(FeatureBits::FLAT_SHADING, "FLAT_SHADED");
        flag(FeatureBits::VERTEX_COLORS, "USE_COLOR");
        flag(FeatureBits::FOG, "USE_FOG");
        flag(FeatureBits::SKINNING, "USE_SKINNING");
        flag(FeatureBits::MORPH_TARGETS, "USE_MORPHTARGETS");
        flag(FeatureBits::MORPH_NORMALS, "USE_MORPHNORMALS");
        flag(FeatureBits::DOUBLE_SIDED, "DOUBLE_SIDED");
        flag(FeatureBits::FLIP_SIDED, "FLIP_SIDED");
        flag(FeatureBits::PREMULTIPLIED_ALPHA, "PREMULTIPLIED_ALPHA");
        flag(FeatureBits::DITHERING, "DITHERING");
        flag(FeatureBits::PHYSICAL_LIGHTS, "PHYSICALLY_CORRECT_LIGHTS");

        if features.bits.contains(FeatureBits::ENV_MAP) {
            if let Some(mapping) = features.env_mapping {
                lines.push(format!("#define {}", env_map_type_define(mapping)));
                lines.push(format!("#define {}", env_map_mode_define(mapping)));
                lines.push(format!(
                    "#define {}",
                    env_map_blending_define(features.combine)
                ));
            }
        }

        if features.bits.contains(FeatureBits::SHADOW_MAP) {
            lines.push("#define USE_SHADOWMAP".to_string());
            lines.push(format!(
                "#define {}",
                shadow_map_type_define(features.shadow_technique)
            ));
        }

        if features.num_clipping_planes > 0 {
            lines.push(format!(
                "#define NUM_CLIPPING_PLANES {}",
                features.num_clipping_planes
            ));
            lines.push(format!(
                "#define UNION_CLIPPING_PLANES {}",
                features.num_clipping_planes - features.num_clip_intersection
            ));
        }

        if features.tone_mapping != ToneMapping::None {
            // Validate against the table up front; the function body itself is
            // emitted into the fragment prefix.
            tone_mapping_function_name(features.tone_mapping)?;
            lines.push("#define TONE_MAPPING".to_string());
        }
    }

    for (name, value) in &features.custom_defines {
        if value.is_empty() {
            lines.push(format!("#define {name}"));
        } else {
            lines.push(format!("#define {name} {value}"));
        }
    }

    Ok(lines)
}

/// `#extension` pragmas for the fragment prefix.
///
/// A pragma is emitted only when the extension is requested (explicitly or
/// implied by the feature set) **and** reported available by the driver.
/// Requested-but-unavailable extensions are silently omitted.
#[must_use]
pub fn build_extension_pragmas(
    requested: &RequestedExtensions,
    features: &ProgramFeatures,
    driver: &dyn GpuDriver,
) -> Vec<String> {
    let needs_derivatives = requested.derivatives
        || features
            .bits
            .intersects(FeatureBits::NORMAL_MAP | FeatureBits::FLAT_SHADING);
    let needs_lod = requested.shader_texture_lod || features.bits.contains(FeatureBits::ENV_MAP);

    let wanted: [(bool, &str, &str); 4] = [
        (
            needs_derivatives,
            "OES_standard_derivatives",
            "GL_OES_standard_derivatives",
        ),
        (requested.frag_depth, "EXT_frag_depth", "GL_EXT_frag_depth"),
        (
            requested.draw_buffers,
            "WEBGL_draw_buffers",
            "GL_EXT_draw_buffers",
        ),
        (
            needs_lod,
            "EXT_shader_texture_lod",
            "GL_EXT_shader_texture_lod",
        ),
    ];

    wanted
        .iter()
        .filter(|(want, ext, _)| *want && driver.has_extension(ext))
        .map(|(_, _, pragma)| format!("#extension {pragma} : enable"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_plane_defines_encode_union_count() {
        let features = ProgramFeatures {
            num_clipping_planes: 4,
            num_clip_intersection: 1,
            ..ProgramFeatures::default()
        };
        let lines = build_defines(&features).unwrap();
        assert!(lines.contains(&"#define NUM_CLIPPING_PLANES 4".to_string()));
        assert!(lines.contains(&"#define UNION_CLIPPING_PLANES 3".to_string()));
    }

    #[test]
    fn custom_tone_mapping_is_rejected() {
        let features = ProgramFeatures {
            tone_mapping: ToneMapping::Custom,
            ..ProgramFeatures::default()
        };
        assert!(matches!(
            build_defines(&features),
            Err(GlintError::UnsupportedToneMapping(ToneMapping::Custom))
        ));
    }

    #[test]
    fn log_luv_encoding_is_rejected() {
        assert!(matches!(
            texel_decode_function("mapTexelToLinear", TextureEncoding::LogLuv),
            Err(GlintError::UnsupportedEncoding(TextureEncoding::LogLuv))
        ));
    }
}
