//! Headless Driver
//!
//! In-memory [`GpuDriver`] implementation. It performs no GPU work: shader
//! sources are stored verbatim, link outcome and reflection data are seeded
//! by the caller, and every upload / bind call is recorded for inspection.
//!
//! Used by the test-suite and by headless tooling that wants to exercise the
//! shader pipeline without a context.

use rustc_hash::{FxHashMap, FxHashSet};

use super::{
    ActiveAttribute, ActiveUniform, GpuDriver, ProgramHandle, ShaderHandle, ShaderStage,
    TextureHandle, UniformLocation,
};

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Uniform1f(UniformLocation, f32),
    Uniform1i(UniformLocation, i32),
    Uniform1fv(UniformLocation, Vec<f32>),
    Uniform1iv(UniformLocation, Vec<i32>),
    Uniform2fv(UniformLocation, Vec<f32>),
    Uniform3fv(UniformLocation, Vec<f32>),
    Uniform4fv(UniformLocation, Vec<f32>),
    UniformMatrix2fv(UniformLocation, Vec<f32>),
    UniformMatrix3fv(UniformLocation, Vec<f32>),
    UniformMatrix4fv(UniformLocation, Vec<f32>),
    BindTexture2d(u32, Option<TextureHandle>),
    BindTextureCube(u32, Option<TextureHandle>),
}

#[derive(Debug, Clone)]
struct StoredShader {
    stage: ShaderStage,
    source: String,
}

/// Recording in-memory driver.
#[derive(Debug, Default)]
pub struct HeadlessDriver {
    shaders: FxHashMap<u32, StoredShader>,
    programs: FxHashSet<u32>,
    next_id: u32,

    /// Reflection data handed out for every linked program.
    pub uniforms: Vec<ActiveUniform>,
    /// Attribute reflection data handed out for every linked program.
    pub attributes: Vec<ActiveAttribute>,
    /// When `false`, [`link_program`](GpuDriver::link_program) reports failure.
    pub link_ok: bool,
    /// Per-stage info log returned for every shader.
    pub shader_log: String,
    /// Program info log returned after linking.
    pub program_log: String,
    /// Extensions reported as available.
    pub extensions: FxHashSet<String>,

    /// Every upload / bind call, in submission order.
    pub calls: Vec<DriverCall>,
    texture_unit: u32,
}

impl HeadlessDriver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            link_ok: true,
            ..Self::default()
        }
    }

    /// Seed the uniform reflection table returned for linked programs.
    #[must_use]
    pub fn with_uniforms(mut self, uniforms: Vec<ActiveUniform>) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn add_extension(&mut self, name: &str) {
        self.extensions.insert(name.to_string());
    }

    /// Source text of the given shader, if it is still alive.
    #[must_use]
    pub fn shader_source(&self, shader: ShaderHandle) -> Option<&str> {
        self.shaders.get(&shader.0).map(|s| s.source.as_str())
    }

    /// Source of the most recently created shader for a stage.
    #[must_use]
    pub fn last_source(&self, stage: ShaderStage) -> Option<&str> {
        self.shaders
            .iter()
            .filter(|(_, s)| s.stage == stage)
            .max_by_key(|(id, _)| **id)
            .map(|(_, s)| s.source.as_str())
    }

    #[must_use]
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GpuDriver for HeadlessDriver {
    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> ShaderHandle {
        let id = self.next_id();
        self.shaders.insert(
            id,
            StoredShader {
                stage,
                source: source.to_string(),
            },
        );
        ShaderHandle(id)
    }

    fn shader_info_log(&self, _shader: ShaderHandle) -> String {
        self.shader_log.clone()
    }

    fn link_program(&mut self, _vertex: ShaderHandle, _fragment: ShaderHandle) -> ProgramHandle {
        let id = self.next_id();
        self.programs.insert(id);
        ProgramHandle(id)
    }

    fn link_status(&self, _program: ProgramHandle) -> bool {
        self.link_ok
    }

    fn program_info_log(&self, _program: ProgramHandle) -> String {
        self.program_log.clone()
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(&shader.0);
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program.0);
    }

    fn active_attributes(&self, _program: ProgramHandle) -> Vec<ActiveAttribute> {
        self.attributes.clone()
    }

    fn active_uniforms(&self, _program: ProgramHandle) -> Vec<ActiveUniform> {
        self.uniforms.clone()
    }

    fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    fn allocate_texture_unit(&mut self) -> u32 {
        let unit = self.texture_unit;
        self.texture_unit += 1;
        unit
    }

    fn reset_texture_units(&mut self) {
        self.texture_unit = 0;
    }

    fn bind_texture_2d(&mut self, unit: u32, texture: Option<TextureHandle>) {
        self.calls.push(DriverCall::BindTexture2d(unit, texture));
    }

    fn bind_texture_cube(&mut self, unit: u32, texture: Option<TextureHandle>) {
        self.calls.push(DriverCall::BindTextureCube(unit, texture));
    }

    fn uniform1f(&mut self, location: UniformLocation, v: f32) {
        self.calls.push(DriverCall::Uniform1f(location, v));
    }

    fn uniform1i(&mut self, location: UniformLocation, v: i32) {
        self.calls.push(DriverCall::Uniform1i(location, v));
    }

    fn uniform1fv(&mut self, location: UniformLocation, v: &[f32]) {
        self.calls.push(DriverCall::Uniform1fv(location, v.to_vec()));
    }

    fn uniform1iv(&mut self, location: UniformLocation, v: &[i32]) {
        self.calls.push(DriverCall::Uniform1iv(location, v.to_vec()));
    }

    fn uniform2fv(&mut self, location: UniformLocation, v: &[f32]) {
        self.calls.push(DriverCall::Uniform2fv(location, v.to_vec()));
    }

    fn uniform3fv(&mut self, location: UniformLocation, v: &[f32]) {
        self.calls.push(DriverCall::Uniform3fv(location, v.to_vec()));
    }

    fn uniform4fv(&mut self, location: UniformLocation, v: &[f32]) {
        self.calls.push(DriverCall::Uniform4fv(location, v.to_vec()));
    }

    fn uniform_matrix2fv(&mut self, location: UniformLocation, v: &[f32]) {
        self.calls
            .push(DriverCall::UniformMatrix2fv(location, v.to_vec()));
    }

    fn uniform_matrix3fv(&mut self, location: UniformLocation, v: &[f32]) {
        self.calls
            .push(DriverCall::UniformMatrix3fv(location, v.to_vec()));
    }

    fn uniform_matrix4fv(&mut self, location: UniformLocation, v: &[f32]) {
        self.calls
            .push(DriverCall::UniformMatrix4fv(location, v.to_vec()));
    }
}
