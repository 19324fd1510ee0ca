//! OpenGL Shaders
//!
//! This module defines the [`Shader`] and [`ShaderProgram`] structs for managing OpenGL shaders.
//! Uniforms are written through [`ActiveProgram`], the token returned by
//! [`ShaderProgram::activate`], using any type implementing [`Uniform`].

use std::{cell::RefCell, rc::Rc};

use fxhash::FxHashMap;
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use super::{
    BindSlot, GfxError, GpuContext, RawHandle, ResourceKind, ShaderStage, UniformLocation,
    UniformValue,
};

/// Represents an individual compiled shader stage.
pub struct Shader {
    ctx: Rc<GpuContext>,
    handle: RawHandle,
    stage: ShaderStage,
}

impl Shader {
    /// Compiles a new shader from the given source code.
    ///
    /// On failure the error carries the compiler log and the shader object
    /// is already released.
    pub fn compile(
        ctx: &Rc<GpuContext>,
        stage: ShaderStage,
        source: &str,
    ) -> Result<Self, GfxError> {
        let handle = ctx.create(ResourceKind::Shader(stage))?;

        if let Err(log) = ctx.device().compile(handle, source) {
            ctx.device().delete(ResourceKind::Shader(stage), handle);
            ctx.diagnostics()
                .error(format_args!("Failed to compile {stage} shader:\n{}", log.trim_end()));
            return Err(GfxError::Compile { stage, log });
        }

        Ok(Self {
            ctx: Rc::clone(ctx),
            handle,
            stage,
        })
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn handle(&self) -> RawHandle {
        self.handle
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.ctx
            .device()
            .delete(ResourceKind::Shader(self.stage), self.handle);
    }
}

/// Represents a value that can be written to a uniform variable.
pub trait Uniform {
    fn to_uniform(&self) -> UniformValue;
}

impl Uniform for bool {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::I32(*self as i32)
    }
}

impl Uniform for i32 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::I32(*self)
    }
}

impl Uniform for f32 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::F32(*self)
    }
}

impl Uniform for Vec2 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Vec2(*self)
    }
}

impl Uniform for Vec3 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Vec3(*self)
    }
}

impl Uniform for Vec4 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Vec4(*self)
    }
}

impl Uniform for Mat3 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Mat3(*self)
    }
}

impl Uniform for Mat4 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Mat4(*self)
    }
}

impl<T: Uniform> Uniform for &T {
    fn to_uniform(&self) -> UniformValue {
        (*self).to_uniform()
    }
}

/// Represents a linked vertex + fragment program.
pub struct ShaderProgram {
    ctx: Rc<GpuContext>,
    handle: RawHandle,
    locations: RefCell<FxHashMap<String, Option<UniformLocation>>>,
}

impl ShaderProgram {
    /// Compiles both stages and links them into a program.
    pub fn new(
        ctx: &Rc<GpuContext>,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, GfxError> {
        let vertex = Shader::compile(ctx, ShaderStage::Vertex, vertex_source)?;
        let fragment = Shader::compile(ctx, ShaderStage::Fragment, fragment_source)?;
        Self::link(ctx, &[&vertex, &fragment])
    }

    /// Links a new shader program from the given shaders.
    ///
    /// The shaders are detached again after linking, so dropping them right
    /// away is fine.
    pub fn link(ctx: &Rc<GpuContext>, shaders: &[&Shader]) -> Result<Self, GfxError> {
        let handle = ctx.create(ResourceKind::Program)?;
        let device = ctx.device();

        for shader in shaders {
            device.attach(handle, shader.handle);
        }

        let linked = device.link(handle);

        for shader in shaders {
            device.detach(handle, shader.handle);
        }

        if let Err(log) = linked {
            ctx.delete(ResourceKind::Program, BindSlot::Program, handle);
            ctx.diagnostics()
                .error(format_args!("Failed to link shader program:\n{}", log.trim_end()));
            return Err(GfxError::Link { log });
        }

        ctx.diagnostics()
            .info(format_args!("Shader program {handle} linked"));

        Ok(Self {
            ctx: Rc::clone(ctx),
            handle,
            locations: RefCell::default(),
        })
    }

    /// Makes the program current for subsequent draws.
    pub fn activate(&self) -> ActiveProgram<'_> {
        if self.handle != 0 {
            self.ctx.bind(BindSlot::Program, self.handle);
        }
        ActiveProgram { program: self }
    }

    /// Returns `true` if this program is the current one.
    pub fn is_active(&self) -> bool {
        self.ctx.is_bound(BindSlot::Program, self.handle)
    }

    /// Looks up a uniform by name. `None` means the linked program has no
    /// such uniform.
    ///
    /// Results are cached, so repeated lookups return the same location.
    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        if self.handle == 0 {
            return None;
        }
        if let Some(location) = self.locations.borrow().get(name) {
            return *location;
        }

        let location = self.ctx.device().uniform_location(self.handle, name);
        self.locations
            .borrow_mut()
            .insert(name.to_string(), location);
        location
    }

    /// Releases the program. Further calls do nothing.
    pub fn delete(&mut self) {
        if self.handle == 0 {
            return;
        }
        self.ctx.delete(ResourceKind::Program, BindSlot::Program, self.handle);
        self.handle = 0;
        self.locations.borrow_mut().clear();
    }

    pub fn handle(&self) -> RawHandle {
        self.handle
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.delete();
    }
}

/// Proof that a [`ShaderProgram`] is current. Uniform writes go through here.
pub struct ActiveProgram<'a> {
    program: &'a ShaderProgram,
}

impl ActiveProgram<'_> {
    /// Sets a uniform variable. Returns `false` if the program has no
    /// uniform called `name`.
    pub fn set_uniform<T: Uniform>(&self, name: &str, value: T) -> bool {
        debug_assert!(
            self.program.handle == 0 || self.program.is_active(),
            "program {} is no longer active",
            self.program.handle
        );
        match self.program.uniform_location(name) {
            Some(location) => {
                self.program
                    .ctx
                    .device()
                    .set_uniform(location, &value.to_uniform());
                true
            }
            None => false,
        }
    }

    pub fn program(&self) -> &ShaderProgram {
        self.program
    }
}
