//! Uniform Setter Nodes
//!
//! The three node kinds of the setter tree. Dispatch is decided once at
//! construction from the reflected GL type enum; `set` then goes straight to
//! the matching driver entry point. Semantic glam values are copied through
//! size-matched scratch buffers, raw arrays are uploaded as-is.
//!
//! A value whose shape does not match the reflected type is logged and
//! skipped; it never panics and never partially uploads.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::driver::{GpuDriver, UniformLocation, gl};
use crate::errors::{GlintError, Result};
use crate::uniforms::value::UniformValue;

/// Upload dispatch selected from the reflected GL type enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UniformKind {
    Float,
    Int,
    Bool,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Sampler2d,
    SamplerCube,
}

impl UniformKind {
    /// Map a raw GL type enum; anything outside the table is a hard error at
    /// reflection time.
    pub(crate) fn classify(name: &str, gl_type: u32) -> Result<Self> {
        match gl_type {
            gl::FLOAT => Ok(Self::Float),
            gl::INT => Ok(Self::Int),
            gl::BOOL => Ok(Self::Bool),
            gl::FLOAT_VEC2 => Ok(Self::Vec2),
            gl::FLOAT_VEC3 => Ok(Self::Vec3),
            gl::FLOAT_VEC4 => Ok(Self::Vec4),
            gl::FLOAT_MAT2 => Ok(Self::Mat2),
            gl::FLOAT_MAT3 => Ok(Self::Mat3),
            gl::FLOAT_MAT4 => Ok(Self::Mat4),
            gl::SAMPLER_2D => Ok(Self::Sampler2d),
            gl::SAMPLER_CUBE => Ok(Self::SamplerCube),
            _ => Err(GlintError::UnknownUniformType {
                name: name.to_string(),
                gl_type,
            }),
        }
    }

    fn matrix_len(self) -> usize {
        match self {
            Self::Mat2 => 4,
            Self::Mat3 => 9,
            _ => 16,
        }
    }

    fn vector_components(self) -> usize {
        match self {
            Self::Float => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            _ => 4,
        }
    }
}

/// Instance-owned, size-keyed scratch buffers for flattening arrays of
/// semantic values before bulk upload. Held by the owning tree so separate
/// renderer instances never share state.
#[derive(Debug, Default)]
pub(crate) struct FlattenCache {
    buffers: FxHashMap<usize, Vec<f32>>,
}

impl FlattenCache {
    fn buffer(&mut self, len: usize) -> &mut Vec<f32> {
        self.buffers.entry(len).or_insert_with(|| vec![0.0; len])
    }
}

// ─── Single ──────────────────────────────────────────────────────────────────

/// Setter for one non-array uniform.
#[derive(Debug)]
pub struct SingleUniform {
    id: String,
    location: UniformLocation,
    kind: UniformKind,
    /// Reused between uploads; sized to the matrix order on first use.
    scratch: Vec<f32>,
}

impl SingleUniform {
    pub(crate) fn new(id: String, location: UniformLocation, kind: UniformKind) -> Self {
        Self {
            id,
            location,
            kind,
            scratch: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn set(&mut self, driver: &mut dyn GpuDriver, value: &UniformValue) {
        let loc = self.location;
        match (self.kind, value) {
            (UniformKind::Float, UniformValue::Float(v)) => driver.uniform1f(loc, *v),
            (UniformKind::Float, UniformValue::Int(v)) => driver.uniform1f(loc, *v as f32),
            (UniformKind::Int, UniformValue::Int(v)) => driver.uniform1i(loc, *v),
            (UniformKind::Int | UniformKind::Bool, UniformValue::Bool(v)) => {
                driver.uniform1i(loc, i32::from(*v));
            }
            (UniformKind::Bool, UniformValue::Int(v)) => driver.uniform1i(loc, *v),

            (UniformKind::Vec2, UniformValue::Vec2(v)) => driver.uniform2fv(loc, &v.to_array()),
            (UniformKind::Vec3, UniformValue::Vec3(v)) => driver.uniform3fv(loc, &v.to_array()),
            (UniformKind::Vec4, UniformValue::Vec4(v)) => driver.uniform4fv(loc, &v.to_array()),
            (UniformKind::Vec2, UniformValue::FloatArray(a)) => driver.uniform2fv(loc, a),
            (UniformKind::Vec3, UniformValue::FloatArray(a)) => driver.uniform3fv(loc, a),
            (UniformKind::Vec4, UniformValue::FloatArray(a)) => driver.uniform4fv(loc, a),

            (UniformKind::Mat2, UniformValue::Mat2(m)) => {
                copy_into(&mut self.scratch, &m.to_cols_array());
                driver.uniform_matrix2fv(loc, &self.scratch);
            }
            (UniformKind::Mat3, UniformValue::Mat3(m)) => {
                copy_into(&mut self.scratch, &m.to_cols_array());
                driver.uniform_matrix3fv(loc, &self.scratch);
            }
            (UniformKind::Mat4, UniformValue::Mat4(m)) => {
                copy_into(&mut self.scratch, &m.to_cols_array());
                driver.uniform_matrix4fv(loc, &self.scratch);
            }
            (UniformKind::Mat2, UniformValue::FloatArray(a)) => driver.uniform_matrix2fv(loc, a),
            (UniformKind::Mat3, UniformValue::FloatArray(a)) => driver.uniform_matrix3fv(loc, a),
            (UniformKind::Mat4, UniformValue::FloatArray(a)) => driver.uniform_matrix4fv(loc, a),

            (UniformKind::Sampler2d, UniformValue::Texture(texture)) => {
                let unit = driver.allocate_texture_unit();
                driver.uniform1i(loc, unit as i32);
                driver.bind_texture_2d(unit, *texture);
            }
            (UniformKind::SamplerCube, UniformValue::Texture(texture)) => {
                let unit = driver.allocate_texture_unit();
                driver.uniform1i(loc, unit as i32);
                driver.bind_texture_cube(unit, *texture);
            }

            (kind, value) => {
                log::warn!("uniform '{}': value {value:?} does not match {kind:?}", self.id);
            }
        }
    }
}

fn copy_into(scratch: &mut Vec<f32>, data: &[f32]) {
    scratch.clear();
    scratch.extend_from_slice(data);
}

// ─── Pure array ──────────────────────────────────────────────────────────────

/// Setter for a bottom-level array uniform: one call uploads the whole array.
#[derive(Debug)]
pub struct PureArrayUniform {
    id: String,
    location: UniformLocation,
    kind: UniformKind,
    size: usize,
}

impl PureArrayUniform {
    pub(crate) fn new(
        id: String,
        location: UniformLocation,
        kind: UniformKind,
        size: usize,
    ) -> Self {
        Self {
            id,
            location,
            kind,
            size,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reflected array element count.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn set(
        &mut self,
        driver: &mut dyn GpuDriver,
        value: &UniformValue,
        flatten: &mut FlattenCache,
    ) {
        let loc = self.location;
        match (self.kind, value) {
            (UniformKind::Float, UniformValue::FloatArray(a)) => driver.uniform1fv(loc, a),
            (UniformKind::Int | UniformKind::Bool, UniformValue::IntArray(a)) => {
                driver.uniform1iv(loc, a);
            }
            (UniformKind::Vec2, UniformValue::FloatArray(a)) => driver.uniform2fv(loc, a),
            (UniformKind::Vec3, UniformValue::FloatArray(a)) => driver.uniform3fv(loc, a),
            (UniformKind::Vec4, UniformValue::FloatArray(a)) => driver.uniform4fv(loc, a),
            (UniformKind::Mat2, UniformValue::FloatArray(a)) => driver.uniform_matrix2fv(loc, a),
            (UniformKind::Mat3, UniformValue::FloatArray(a)) => driver.uniform_matrix3fv(loc, a),
            (UniformKind::Mat4, UniformValue::FloatArray(a)) => driver.uniform_matrix4fv(loc, a),

            (
                UniformKind::Float | UniformKind::Vec2 | UniformKind::Vec3 | UniformKind::Vec4,
                UniformValue::List(items),
            ) => {
                let components = self.kind.vector_components();
                let Some(buffer) = flatten_vectors(items, components, flatten, &self.id) else {
                    return;
                };
                match self.kind {
                    UniformKind::Float => driver.uniform1fv(loc, buffer),
                    UniformKind::Vec2 => driver.uniform2fv(loc, buffer),
                    UniformKind::Vec3 => driver.uniform3fv(loc, buffer),
                    _ => driver.uniform4fv(loc, buffer),
                }
            }

            (
                UniformKind::Mat2 | UniformKind::Mat3 | UniformKind::Mat4,
                UniformValue::List(items),
            ) => {
                let Some(buffer) =
                    flatten_matrices(items, self.kind.matrix_len(), flatten, &self.id)
                else {
                    return;
                };
                match self.kind {
                    UniformKind::Mat2 => driver.uniform_matrix2fv(loc, buffer),
                    UniformKind::Mat3 => driver.uniform_matrix3fv(loc, buffer),
                    _ => driver.uniform_matrix4fv(loc, buffer),
                }
            }

            (UniformKind::Sampler2d | UniformKind::SamplerCube, UniformValue::TextureArray(textures)) => {
                let units: SmallVec<[i32; 16]> = textures
                    .iter()
                    .map(|_| driver.allocate_texture_unit() as i32)
                    .collect();
                driver.uniform1iv(loc, &units);
                for (unit, texture) in units.iter().zip(textures) {
                    if self.kind == UniformKind::Sampler2d {
                        driver.bind_texture_2d(*unit as u32, *texture);
                    } else {
                        driver.bind_texture_cube(*unit as u32, *texture);
                    }
                }
            }

            (kind, value) => {
                log::warn!(
                    "array uniform '{}': value {value:?} does not match {kind:?}[{}]",
                    self.id,
                    self.size
                );
            }
        }
    }
}

/// Flatten a list of semantic vector values into the size-keyed scratch
/// buffer for its total element count.
fn flatten_vectors<'a>(
    items: &[UniformValue],
    components: usize,
    flatten: &'a mut FlattenCache,
    id: &str,
) -> Option<&'a [f32]> {
    let buffer = flatten.buffer(items.len() * components);
    for (i, item) in items.iter().enumerate() {
        let offset = i * components;
        match (components, item) {
            (1, UniformValue::Float(v)) => buffer[offset] = *v,
            (2, UniformValue::Vec2(v)) => buffer[offset..offset + 2].copy_from_slice(&v.to_array()),
            (3, UniformValue::Vec3(v)) => buffer[offset..offset + 3].copy_from_slice(&v.to_array()),
            (4, UniformValue::Vec4(v)) => buffer[offset..offset + 4].copy_from_slice(&v.to_array()),
            _ => {
                log::warn!("array uniform '{id}': element {i} is {item:?}, expected vec{components}");
                return None;
            }
        }
    }
    Some(flatten.buffer(items.len() * components))
}

fn flatten_matrices<'a>(
    items: &[UniformValue],
    matrix_len: usize,
    flatten: &'a mut FlattenCache,
    id: &str,
) -> Option<&'a [f32]> {
    let buffer = flatten.buffer(items.len() * matrix_len);
    for (i, item) in items.iter().enumerate() {
        let offset = i * matrix_len;
        match (matrix_len, item) {
            (4, UniformValue::Mat2(m)) => {
                buffer[offset..offset + 4].copy_from_slice(&m.to_cols_array());
            }
            (9, UniformValue::Mat3(m)) => {
                buffer[offset..offset + 9].copy_from_slice(&m.to_cols_array());
            }
            (16, UniformValue::Mat4(m)) => {
                buffer[offset..offset + 16].copy_from_slice(&m.to_cols_array());
            }
            _ => {
                log::warn!("array uniform '{id}': element {i} is {item:?}, expected matrix");
                return None;
            }
        }
    }
    Some(flatten.buffer(items.len() * matrix_len))
}

// ─── Structured ──────────────────────────────────────────────────────────────

/// Ordered child nodes plus a name index. Insertion order is first-seen
/// reflection order and drives deterministic traversal.
#[derive(Debug, Default)]
pub(crate) struct NodeSet {
    pub seq: Vec<UniformNode>,
    pub index: FxHashMap<String, usize>,
}

impl NodeSet {
    pub fn add(&mut self, node: UniformNode) {
        self.index.insert(node.id().to_string(), self.seq.len());
        self.seq.push(node);
    }

    /// Child structured node with the given id, created on first use.
    ///
    /// `None` when the id already names a leaf node; the caller turns that
    /// into a path-conflict error.
    pub fn get_or_add_struct(&mut self, id: &str) -> Option<&mut StructuredUniform> {
        let position = match self.index.get(id) {
            Some(&i) => i,
            None => {
                self.add(UniformNode::Structured(StructuredUniform {
                    id: id.to_string(),
                    children: NodeSet::default(),
                }));
                self.seq.len() - 1
            }
        };
        match &mut self.seq[position] {
            UniformNode::Structured(node) => Some(node),
            _ => None,
        }
    }
}

/// Setter for a struct (or array-of-struct element) uniform.
#[derive(Debug)]
pub struct StructuredUniform {
    id: String,
    children: NodeSet,
}

impl StructuredUniform {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn children(&self) -> &[UniformNode] {
        &self.children.seq
    }

    #[must_use]
    pub fn child(&self, id: &str) -> Option<&UniformNode> {
        self.children.index.get(id).map(|&i| &self.children.seq[i])
    }

    pub(crate) fn children_mut(&mut self) -> &mut NodeSet {
        &mut self.children
    }

    /// Sparse update: each child looks up its own key; a missing key leaves
    /// that child's prior GPU state untouched.
    pub(crate) fn set(
        &mut self,
        driver: &mut dyn GpuDriver,
        value: &UniformValue,
        flatten: &mut FlattenCache,
    ) {
        for child in &mut self.children.seq {
            if let Some(member) = value.member(child.id()) {
                child.set(driver, member, flatten);
            }
        }
    }
}

/// One node of the setter tree.
#[derive(Debug)]
pub enum UniformNode {
    Single(SingleUniform),
    PureArray(PureArrayUniform),
    Structured(StructuredUniform),
}

impl UniformNode {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            UniformNode::Single(node) => node.id(),
            UniformNode::PureArray(node) => node.id(),
            UniformNode::Structured(node) => node.id(),
        }
    }

    pub(crate) fn set(
        &mut self,
        driver: &mut dyn GpuDriver,
        value: &UniformValue,
        flatten: &mut FlattenCache,
    ) {
        match self {
            UniformNode::Single(node) => node.set(driver, value),
            UniformNode::PureArray(node) => node.set(driver, value, flatten),
            UniformNode::Structured(node) => node.set(driver, value, flatten),
        }
    }
}
