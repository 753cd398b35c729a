//! Shader Pipeline
//!
//! Turns a feature configuration plus raw stage bodies into a linked GPU
//! program:
//! - `preprocess`: include expansion, light-count substitution, loop unrolling
//! - `defines`: `#define` / `#extension` / precision emission
//! - `program`: source assembly, driver submission, diagnostics, lazy tables

pub mod defines;
pub mod preprocess;
pub mod program;

pub use defines::RequestedExtensions;
pub use program::{CompiledProgram, ProgramCompiler, ProgramDiagnostics};
