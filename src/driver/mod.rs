//! GPU Driver Surface
//!
//! The [`GpuDriver`] trait is the opaque boundary between this core and the
//! actual GL-style driver: program/shader object lifecycle, reflection of
//! active attributes and uniforms, per-type uniform upload entry points,
//! texture-unit allocation and binding, and extension availability queries.
//!
//! The core never interprets driver behavior beyond what the trait states;
//! in particular it does not retry failed compiles and it assumes every call
//! completes synchronously before returning.
//!
//! [`headless::HeadlessDriver`] is a pure-software implementation that
//! records every call, used by the test-suite and by headless tooling.

pub mod headless;

/// Raw GL type enums as reported by uniform reflection.
///
/// Only the types the setter dispatch table understands are listed; a
/// reflected uniform with any other enum value is a hard error.
pub mod gl {
    pub const FLOAT: u32 = 0x1406;
    pub const INT: u32 = 0x1404;
    pub const BOOL: u32 = 0x8B56;
    pub const FLOAT_VEC2: u32 = 0x8B50;
    pub const FLOAT_VEC3: u32 = 0x8B51;
    pub const FLOAT_VEC4: u32 = 0x8B52;
    pub const FLOAT_MAT2: u32 = 0x8B5A;
    pub const FLOAT_MAT3: u32 = 0x8B5B;
    pub const FLOAT_MAT4: u32 = 0x8B5C;
    pub const SAMPLER_2D: u32 = 0x8B5E;
    pub const SAMPLER_CUBE: u32 = 0x8B60;
}

/// Opaque handle to a driver shader object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// Opaque handle to a linked driver program object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Opaque handle to a driver texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Location of an active uniform within a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// One uniform surviving link-time dead-code elimination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    /// Reflected name, e.g. `"spotLights[0]"` or `"lights[0].direction"`.
    pub name: String,
    /// Raw GL type enum (see [`gl`]).
    pub gl_type: u32,
    /// Array element count; 1 for non-array uniforms.
    pub size: usize,
    pub location: UniformLocation,
}

/// One attribute surviving link-time dead-code elimination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAttribute {
    pub name: String,
    pub gl_type: u32,
    pub location: i32,
}

/// Synchronous GL-style driver surface consumed by this core.
pub trait GpuDriver {
    // ── Shader / program lifecycle ───────────────────────────────────────────

    /// Create and compile a shader object. Compile failure is not reported
    /// here; it surfaces through [`link_status`](Self::link_status) and the
    /// info logs.
    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> ShaderHandle;

    fn shader_info_log(&self, shader: ShaderHandle) -> String;

    /// Attach both stages and link. Always returns a handle, even when the
    /// link fails.
    fn link_program(&mut self, vertex: ShaderHandle, fragment: ShaderHandle) -> ProgramHandle;

    fn link_status(&self, program: ProgramHandle) -> bool;

    fn program_info_log(&self, program: ProgramHandle) -> String;

    fn delete_shader(&mut self, shader: ShaderHandle);

    fn delete_program(&mut self, program: ProgramHandle);

    // ── Reflection ───────────────────────────────────────────────────────────

    fn active_attributes(&self, program: ProgramHandle) -> Vec<ActiveAttribute>;

    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveUniform>;

    // ── Capabilities ─────────────────────────────────────────────────────────

    fn has_extension(&self, name: &str) -> bool;

    /// Allocate the next texture unit for the current draw call.
    fn allocate_texture_unit(&mut self) -> u32;

    /// Reset the texture-unit allocator; called by the renderer between
    /// draw calls.
    fn reset_texture_units(&mut self);

    /// Bind a 2D texture to a unit. `None` binds the shared default empty
    /// texture owned by the driver.
    fn bind_texture_2d(&mut self, unit: u32, texture: Option<TextureHandle>);

    /// Bind a cube texture to a unit. `None` binds the shared default empty
    /// cube texture owned by the driver.
    fn bind_texture_cube(&mut self, unit: u32, texture: Option<TextureHandle>);

    // ── Uniform upload ───────────────────────────────────────────────────────

    fn uniform1f(&mut self, location: UniformLocation, v: f32);
    fn uniform1i(&mut self, location: UniformLocation, v: i32);
    fn uniform1fv(&mut self, location: UniformLocation, v: &[f32]);
    fn uniform1iv(&mut self, location: UniformLocation, v: &[i32]);
    fn uniform2fv(&mut self, location: UniformLocation, v: &[f32]);
    fn uniform3fv(&mut self, location: UniformLocation, v: &[f32]);
    fn uniform4fv(&mut self, location: UniformLocation, v: &[f32]);
    fn uniform_matrix2fv(&mut self, location: UniformLocation, v: &[f32]);
    fn uniform_matrix3fv(&mut self, location: UniformLocation, v: &[f32]);
    fn uniform_matrix4fv(&mut self, location: UniformLocation, v: &[f32]);
}
