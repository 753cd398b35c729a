//! Uniform Values
//!
//! Host-side representation of the values handed to the setter tree. Semantic
//! math types come straight from glam; `FloatArray` / `IntArray` are the raw
//! flat forms that bypass scratch flattening.

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;

use crate::driver::TextureHandle;

/// One value assignable to a uniform node.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
    /// Raw flat float data, uploaded directly without flattening.
    FloatArray(Vec<f32>),
    /// Raw flat integer data.
    IntArray(Vec<i32>),
    /// `None` binds the driver's shared default empty texture.
    Texture(Option<TextureHandle>),
    TextureArray(Vec<Option<TextureHandle>>),
    /// Ordered array of semantic values; pure-array setters flatten these,
    /// structured setters address elements by decimal key.
    List(Vec<UniformValue>),
    /// Keyed members for structured uniforms; absent keys are left untouched.
    Struct(FxHashMap<String, UniformValue>),
}

impl UniformValue {
    /// Member lookup used by structured setters: string key into a `Struct`,
    /// decimal key into a `List`.
    #[must_use]
    pub fn member(&self, key: &str) -> Option<&UniformValue> {
        match self {
            UniformValue::Struct(map) => map.get(key),
            UniformValue::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        UniformValue::Mat3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

/// A value plus its dirty flag, as stored in per-material value maps.
///
/// An absent flag means "assume dirty": only an explicit `Some(false)` makes
/// [`UniformTree::upload`](crate::uniforms::UniformTree::upload) skip the
/// entry.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformEntry {
    pub value: UniformValue,
    pub needs_update: Option<bool>,
}

impl UniformEntry {
    #[must_use]
    pub fn new(value: impl Into<UniformValue>) -> Self {
        Self {
            value: value.into(),
            needs_update: None,
        }
    }

    #[must_use]
    pub fn clean(value: impl Into<UniformValue>) -> Self {
        Self {
            value: value.into(),
            needs_update: Some(false),
        }
    }
}

impl<T: Into<UniformValue>> From<T> for UniformEntry {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

/// Name-keyed values for one material / draw.
pub type UniformValueMap = FxHashMap<String, UniformEntry>;
