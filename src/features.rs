//! Program Feature Flags
//!
//! [`ProgramFeatures`] is the immutable record describing which material,
//! geometry and scene features a GPU program variant is compiled for. It is
//! the input to the define builder and the preprocessor, and it is hashable
//! so that identical `(features, source)` requests can share one compiled
//! program.

use std::hash::{Hash, Hasher};

use bitflags::bitflags;
use rustc_hash::FxHasher;
use xxhash_rust::xxh3::xxh3_128;

bitflags! {
    /// Boolean material / geometry / scene features.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FeatureBits: u32 {
        const MAP                 = 1 << 0;
        const ENV_MAP             = 1 << 1;
        const AO_MAP              = 1 << 2;
        const EMISSIVE_MAP        = 1 << 3;
        const NORMAL_MAP          = 1 << 4;
        const FLAT_SHADING        = 1 << 5;
        const VERTEX_COLORS       = 1 << 6;
        const FOG                 = 1 << 7;
        const SKINNING            = 1 << 8;
        const MORPH_TARGETS       = 1 << 9;
        const MORPH_NORMALS       = 1 << 10;
        const DOUBLE_SIDED        = 1 << 11;
        const FLIP_SIDED          = 1 << 12;
        const SHADOW_MAP          = 1 << 13;
        const PREMULTIPLIED_ALPHA = 1 << 14;
        const DITHERING           = 1 << 15;
        const PHYSICAL_LIGHTS     = 1 << 16;
        /// Escape hatch: hand-authored shader, no built-in prefix block.
        const RAW_SHADER          = 1 << 17;
    }
}

/// Shadow-map filtering technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShadowTechnique {
    #[default]
    Basic,
    Pcf,
    PcfSoft,
    Vsm,
}

/// Tone-mapping mode applied in the fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToneMapping {
    #[default]
    None,
    Linear,
    Reinhard,
    Cineon,
    AcesFilmic,
    /// Reserved for a user-supplied `CustomToneMapping` body; the built-in
    /// table rejects it.
    Custom,
}

/// Texel storage encoding of a texture or the output target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureEncoding {
    #[default]
    Linear,
    Srgb,
    Rgbe,
    Rgbm7,
    Rgbm16,
    Rgbd,
    Gamma,
    /// Legacy encoding with no built-in decode function; rejected by the
    /// define builder.
    LogLuv,
}

/// How an environment texture is mapped onto the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvMapping {
    CubeReflection,
    CubeRefraction,
    EquirectReflection,
    EquirectRefraction,
    CubeUv,
}

/// How the environment contribution is combined with the surface color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CombineOperation {
    #[default]
    Multiply,
    Mix,
    Add,
}

/// Float precision qualifier for generated prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    Low,
    Medium,
    #[default]
    High,
}

impl Precision {
    #[must_use]
    pub fn qualifier(self) -> &'static str {
        match self {
            Precision::Low => "lowp",
            Precision::Medium => "mediump",
            Precision::High => "highp",
        }
    }
}

/// Per-category light counts baked into a program variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightCounts {
    pub directional: usize,
    pub point: usize,
    pub spot: usize,
    pub rect_area: usize,
    pub hemisphere: usize,
}

/// Immutable feature configuration for one program variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ProgramFeatures {
    pub bits: FeatureBits,
    pub precision: Precision,
    pub shadow_technique: ShadowTechnique,
    pub tone_mapping: ToneMapping,
    /// Encoding of the render target the fragment stage writes to.
    pub output_encoding: TextureEncoding,
    /// Encoding of the color map, when `MAP` is set.
    pub map_encoding: TextureEncoding,
    /// Encoding of the environment map, when `ENV_MAP` is set.
    pub env_map_encoding: TextureEncoding,
    pub env_mapping: Option<EnvMapping>,
    pub combine: CombineOperation,
    pub light_counts: LightCounts,
    pub num_clipping_planes: usize,
    pub num_clip_intersection: usize,
    /// User-authored defines, emitted verbatim (also in raw mode).
    pub custom_defines: Vec<(String, String)>,
}

impl ProgramFeatures {
    #[must_use]
    pub fn is_raw(&self) -> bool {
        self.bits.contains(FeatureBits::RAW_SHADER)
    }

    /// Cache key over the feature set and both raw stage bodies.
    ///
    /// An external program pool can use this to route identical
    /// `(features, code)` requests to one [`CompiledProgram`] instance.
    ///
    /// [`CompiledProgram`]: crate::pipeline::program::CompiledProgram
    #[must_use]
    pub fn cache_key(&self, vertex_source: &str, fragment_source: &str) -> u128 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);

        let mut buf =
            Vec::with_capacity(8 + vertex_source.len() + fragment_source.len() + 1);
        buf.extend_from_slice(&hasher.finish().to_le_bytes());
        buf.extend_from_slice(vertex_source.as_bytes());
        buf.push(0);
        buf.extend_from_slice(fragment_source.as_bytes());
        xxh3_128(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_and_source_sensitive() {
        let features = ProgramFeatures {
            bits: FeatureBits::MAP | FeatureBits::FOG,
            ..ProgramFeatures::default()
        };

        let a = features.cache_key("void main() {}", "void main() {}");
        let b = features.cache_key("void main() {}", "void main() {}");
        assert_eq!(a, b);

        let c = features.cache_key("void main() { }", "void main() {}");
        assert_ne!(a, c);
    }

    #[test]
    fn cache_key_separates_stage_boundaries() {
        let features = ProgramFeatures::default();
        // "ab" + "c" must not collide with "a" + "bc".
        assert_ne!(features.cache_key("ab", "c"), features.cache_key("a", "bc"));
    }
}
