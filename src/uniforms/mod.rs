//! Uniform Reflection Tree
//!
//! [`UniformTree`] reflects a linked program's active uniforms and parses
//! each name into a tree of typed setter nodes:
//!
//! - `"color"` → a top-level [`SingleUniform`]
//! - `"lights[0].direction"` → a structured chain `lights` → `0` →
//!   `direction`
//! - `"spotLights[0]"` (a bottom-level array) → one [`PureArrayUniform`]
//!   covering the whole array
//!
//! The tree is built once per program and immutable afterwards; only
//! uniforms that survived link-time dead-code elimination appear, which is
//! why `set_value` on an absent name is a silent no-op rather than an error
//! (speculative updates against eliminated uniforms are routine).

pub mod setter;
pub mod value;

use smallvec::SmallVec;

use crate::driver::{GpuDriver, ProgramHandle};
use crate::errors::{GlintError, Result};
use crate::uniforms::setter::{
    FlattenCache, NodeSet, PureArrayUniform, SingleUniform, UniformKind,
};
use crate::uniforms::value::{UniformValue, UniformValueMap};

pub use setter::{StructuredUniform, UniformNode};

// ─── Path parsing ────────────────────────────────────────────────────────────

enum PathLeaf {
    Single,
    PureArray,
}

struct ParsedPath {
    /// Structured steps leading to the leaf, e.g. `["lights", "0"]`.
    steps: SmallVec<[String; 4]>,
    leaf_id: String,
    leaf: PathLeaf,
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Tokenize a reflected uniform name.
///
/// Grammar: `segment := identifier ("[" digits "]")? ("." | "[")?`. A
/// trailing `[digits]` at end-of-string is the pure-array suffix; any
/// unparseable name falls back to a single leaf under its full name.
fn parse_uniform_path(name: &str) -> ParsedPath {
    let whole = |name: &str| ParsedPath {
        steps: SmallVec::new(),
        leaf_id: name.to_string(),
        leaf: PathLeaf::Single,
    };

    let b = name.as_bytes();
    let mut steps: SmallVec<[String; 4]> = SmallVec::new();
    let mut p = 0;
    loop {
        let start = p;
        while p < b.len() && is_ident_byte(b[p]) {
            p += 1;
        }
        if p == start {
            return whole(name);
        }
        let ident = &name[start..p];
        if p == b.len() {
            return ParsedPath {
                steps,
                leaf_id: ident.to_string(),
                leaf: PathLeaf::Single,
            };
        }
        match b[p] {
            b'.' => {
                steps.push(ident.to_string());
                p += 1;
            }
            b'[' => {
                let digits_start = p + 1;
                let mut q = digits_start;
                while q < b.len() && b[q].is_ascii_digit() {
                    q += 1;
                }
                if q == digits_start || q == b.len() || b[q] != b']' {
                    return whole(name);
                }
                if q + 1 == b.len() {
                    // Pure bottom-level array: one setter for the whole array.
                    return ParsedPath {
                        steps,
                        leaf_id: ident.to_string(),
                        leaf: PathLeaf::PureArray,
                    };
                }
                steps.push(ident.to_string());
                steps.push(name[digits_start..q].to_string());
                p = q + 1;
                if b[p] == b'.' {
                    p += 1;
                }
            }
            _ => return whole(name),
        }
    }
}

// ─── Tree ────────────────────────────────────────────────────────────────────

/// Typed setter tree over a linked program's active uniforms.
#[derive(Debug, Default)]
pub struct UniformTree {
    root: NodeSet,
    flatten: FlattenCache,
}

impl UniformTree {
    /// Reflect `program` and build the tree.
    ///
    /// Fails with [`UnknownUniformType`] when reflection reports a GL type
    /// the dispatch table does not know, and with [`UniformPathConflict`]
    /// when it reports the same path as both a leaf and a container.
    ///
    /// [`UnknownUniformType`]: crate::errors::GlintError::UnknownUniformType
    /// [`UniformPathConflict`]: crate::errors::GlintError::UniformPathConflict
    pub fn from_program(driver: &dyn GpuDriver, program: ProgramHandle) -> Result<Self> {
        let mut tree = Self::default();
        for uniform in driver.active_uniforms(program) {
            let kind = UniformKind::classify(&uniform.name, uniform.gl_type)?;
            let parsed = parse_uniform_path(&uniform.name);

            let mut container = &mut tree.root;
            for step in &parsed.steps {
                container = container
                    .get_or_add_struct(step)
                    .ok_or_else(|| GlintError::UniformPathConflict {
                        name: uniform.name.clone(),
                        segment: step.clone(),
                    })?
                    .children_mut();
            }
            let node = match parsed.leaf {
                PathLeaf::Single => UniformNode::Single(SingleUniform::new(
                    parsed.leaf_id,
                    uniform.location,
                    kind,
                )),
                PathLeaf::PureArray => UniformNode::PureArray(PureArrayUniform::new(
                    parsed.leaf_id,
                    uniform.location,
                    kind,
                    uniform.size,
                )),
            };
            container.add(node);
        }
        Ok(tree)
    }

    /// Top-level nodes in first-seen reflection order.
    #[must_use]
    pub fn nodes(&self) -> &[UniformNode] {
        &self.root.seq
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&UniformNode> {
        self.root.index.get(name).map(|&i| &self.root.seq[i])
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.root.index.contains_key(name)
    }

    /// Upload one named top-level uniform. A name that is not an active
    /// uniform is silently ignored.
    pub fn set_value(&mut self, driver: &mut dyn GpuDriver, name: &str, value: &UniformValue) {
        let Some(&position) = self.root.index.get(name) else {
            return;
        };
        self.root.seq[position].set(driver, value, &mut self.flatten);
    }

    /// Upload `name` only if the value map carries it.
    pub fn set_optional(&mut self, driver: &mut dyn GpuDriver, values: &UniformValueMap, name: &str) {
        if let Some(entry) = values.get(name) {
            let Some(&position) = self.root.index.get(name) else {
                return;
            };
            self.root.seq[position].set(driver, &entry.value, &mut self.flatten);
        }
    }

    /// Indices (into [`nodes`](Self::nodes)) of the top-level uniforms that
    /// have a backing value. Computed once per material and reused across
    /// frames.
    #[must_use]
    pub fn seq_with_value(&self, values: &UniformValueMap) -> Vec<usize> {
        self.root
            .seq
            .iter()
            .enumerate()
            .filter(|(_, node)| values.contains_key(node.id()))
            .map(|(i, _)| i)
            .collect()
    }

    /// Upload every node in `seq` whose backing value is dirty. An absent
    /// `needs_update` flag counts as dirty; only an explicit `Some(false)`
    /// skips.
    pub fn upload(&mut self, driver: &mut dyn GpuDriver, seq: &[usize], values: &UniformValueMap) {
        for &position in seq {
            let Some(node) = self.root.seq.get_mut(position) else {
                continue;
            };
            if let Some(entry) = values.get(node.id()) {
                if entry.needs_update != Some(false) {
                    node.set(driver, &entry.value, &mut self.flatten);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(parsed: &ParsedPath) -> Vec<&str> {
        parsed.steps.iter().map(String::as_str).collect()
    }

    #[test]
    fn bare_name_is_single_leaf() {
        let parsed = parse_uniform_path("color");
        assert!(steps(&parsed).is_empty());
        assert_eq!(parsed.leaf_id, "color");
        assert!(matches!(parsed.leaf, PathLeaf::Single));
    }

    #[test]
    fn struct_array_member_descends() {
        let parsed = parse_uniform_path("lights[0].direction");
        assert_eq!(steps(&parsed), ["lights", "0"]);
        assert_eq!(parsed.leaf_id, "direction");
        assert!(matches!(parsed.leaf, PathLeaf::Single));
    }

    #[test]
    fn trailing_subscript_is_pure_array() {
        let parsed = parse_uniform_path("spotLights[0]");
        assert!(steps(&parsed).is_empty());
        assert_eq!(parsed.leaf_id, "spotLights");
        assert!(matches!(parsed.leaf, PathLeaf::PureArray));

        // Multi-digit indices parse the same way.
        let parsed = parse_uniform_path("spotLights[12]");
        assert!(matches!(parsed.leaf, PathLeaf::PureArray));
    }

    #[test]
    fn nested_pure_array_keeps_outer_steps() {
        let parsed = parse_uniform_path("cascades[1].splits[0]");
        assert_eq!(steps(&parsed), ["cascades", "1"]);
        assert_eq!(parsed.leaf_id, "splits");
        assert!(matches!(parsed.leaf, PathLeaf::PureArray));
    }
}
