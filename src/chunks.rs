//! Shader Chunk Library
//!
//! Read-only mapping from chunk name to GLSL fragment text, consumed by the
//! `#include <name>` resolver. The library is populated once when the owning
//! [`ProgramCompiler`] is created and never mutated afterwards, so multiple
//! renderer instances with different chunk sets stay isolated.
//!
//! [`ProgramCompiler`]: crate::pipeline::program::ProgramCompiler

use rustc_hash::FxHashMap;

/// Named GLSL source fragments addressable via `#include <name>`.
#[derive(Debug, Clone, Default)]
pub struct ShaderChunkLibrary {
    chunks: FxHashMap<String, String>,
}

impl ShaderChunkLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunks: FxHashMap::default(),
        }
    }

    /// Register a chunk. Later registrations with the same name replace the
    /// earlier text; this is only expected during initial population.
    pub fn register(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.chunks.insert(name.into(), source.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.chunks.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.chunks.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl<N: Into<String>, S: Into<String>> FromIterator<(N, S)> for ShaderChunkLibrary {
    fn from_iter<T: IntoIterator<Item = (N, S)>>(iter: T) -> Self {
        let mut library = Self::new();
        for (name, source) in iter {
            library.register(name, source);
        }
        library
    }
}
