//! Error Types
//!
//! The error type [`GlintError`] covers the failure modes of the textual
//! shader pipeline and of program reflection:
//! - missing or cyclic `#include` chunks
//! - enum values with no built-in GLSL implementation
//! - reflected uniforms whose GL type is absent from the dispatch table
//!
//! Driver-reported compile/link failures are deliberately **not** errors:
//! they are captured as [`ProgramDiagnostics`] on the returned program so the
//! caller can decide on a fallback.
//!
//! [`ProgramDiagnostics`]: crate::pipeline::program::ProgramDiagnostics

use thiserror::Error;

use crate::features::{TextureEncoding, ToneMapping};

/// The main error type for the glint shader core.
#[derive(Error, Debug)]
pub enum GlintError {
    /// An `#include <name>` directive referenced a chunk that is not in the
    /// library. Fatal to the compile request.
    #[error("Unresolved shader include: <{name}>")]
    UnresolvedInclude {
        /// The chunk name that failed to resolve.
        name: String,
    },

    /// Include resolution re-entered a chunk that is still being expanded.
    #[error("Cyclic shader include: <{name}>")]
    IncludeCycle {
        /// The chunk name that closed the cycle.
        name: String,
    },

    /// The requested tone-mapping mode has no built-in GLSL function.
    #[error("Unsupported tone mapping: {0:?}")]
    UnsupportedToneMapping(ToneMapping),

    /// The requested texel encoding has no built-in encode/decode pair.
    #[error("Unsupported texture encoding: {0:?}")]
    UnsupportedEncoding(TextureEncoding),

    /// Reflection returned a uniform whose GL type enum is not in the setter
    /// dispatch table. Indicates a stale type table, not bad user input.
    #[error("Unknown GL type {gl_type:#06x} for uniform '{name}'")]
    UnknownUniformType {
        /// The reflected uniform name.
        name: String,
        /// The raw GL type enum.
        gl_type: u32,
    },

    /// Reflection reported the same path segment as both a value leaf and a
    /// struct container, e.g. `"light"` next to `"light.color"`.
    #[error("Uniform path segment '{segment}' of '{name}' is both leaf and container")]
    UniformPathConflict {
        /// The reflected uniform name being inserted.
        name: String,
        /// The conflicting path segment.
        segment: String,
    },
}

/// Alias for `Result<T, GlintError>`.
pub type Result<T> = std::result::Result<T, GlintError>;
