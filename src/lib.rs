#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod chunks;
pub mod driver;
pub mod errors;
pub mod features;
pub mod lights;
pub mod pipeline;
pub mod uniforms;

pub use chunks::ShaderChunkLibrary;
pub use driver::{GpuDriver, ProgramHandle, ShaderHandle, TextureHandle, UniformLocation};
pub use errors::{GlintError, Result};
pub use features::{
    CombineOperation, EnvMapping, FeatureBits, LightCounts, Precision, ProgramFeatures,
    ShadowTechnique, TextureEncoding, ToneMapping,
};
pub use lights::{Camera, Light, LightFrameState, LightKind, LightStateAggregator};
pub use pipeline::{CompiledProgram, ProgramCompiler, ProgramDiagnostics, RequestedExtensions};
pub use uniforms::value::{UniformEntry, UniformValue, UniformValueMap};
pub use uniforms::UniformTree;
