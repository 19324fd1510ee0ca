//! The driver interface.
//!
//! [`Device`] is the narrow slice of OpenGL the wrappers in this crate rely on.
//! Handles cross this boundary as plain [`RawHandle`] integers where `0` means
//! "no object", which is also how the wrappers mark a released resource.
//!
//! The real implementation is [`glow::Context`]; tests plug in a recording
//! device instead.

use std::{num::NonZeroU32, rc::Rc, sync::Arc};

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use glow::HasContext;

use super::AttribBinding;

/// Opaque driver handle. `0` is never a live object.
pub type RawHandle = u32;

/// The kinds of objects a [`Device`] can allocate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    VertexArray,
    Shader(ShaderStage),
    Program,
    Texture,
    Framebuffer,
    Renderbuffer,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Buffer => write!(f, "buffer"),
            ResourceKind::VertexArray => write!(f, "vertex array"),
            ResourceKind::Shader(stage) => write!(f, "{stage} shader"),
            ResourceKind::Program => write!(f, "shader program"),
            ResourceKind::Texture => write!(f, "texture"),
            ResourceKind::Framebuffer => write!(f, "framebuffer"),
            ResourceKind::Renderbuffer => write!(f, "renderbuffer"),
        }
    }
}

/// Binding points tracked by the [`GpuContext`](super::GpuContext).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindSlot {
    ArrayBuffer,
    ElementBuffer,
    VertexArray,
    Texture2d,
    Framebuffer,
    Renderbuffer,
    Program,
}

impl BindSlot {
    pub(crate) const COUNT: usize = 7;

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Buffer binding targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

impl BufferTarget {
    pub(crate) fn slot(self) -> BindSlot {
        match self {
            BufferTarget::Array => BindSlot::ArrayBuffer,
            BufferTarget::ElementArray => BindSlot::ElementBuffer,
        }
    }

    fn gl_enum(self) -> u32 {
        match self {
            BufferTarget::Array => glow::ARRAY_BUFFER,
            BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
        }
    }
}

/// Expected update frequency of buffer contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    StaticDraw,
}

/// Element type of a vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttribType {
    Float,
    Int,
    UnsignedInt,
}

impl AttribType {
    /// Size of one component in bytes.
    pub fn size(self) -> usize {
        4
    }

    /// Integer inputs reach the shader unconverted (`ivec`/`uvec`).
    pub fn is_integer(self) -> bool {
        matches!(self, AttribType::Int | AttribType::UnsignedInt)
    }

    fn gl_enum(self) -> u32 {
        match self {
            AttribType::Float => glow::FLOAT,
            AttribType::Int => glow::INT,
            AttribType::UnsignedInt => glow::UNSIGNED_INT,
        }
    }
}

/// Programmable pipeline stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn gl_enum(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Primitive assembly mode for indexed draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    Triangles,
    Lines,
}

impl DrawMode {
    fn gl_enum(self) -> u32 {
        match self {
            DrawMode::Triangles => glow::TRIANGLES,
            DrawMode::Lines => glow::LINES,
        }
    }
}

/// Location of a uniform inside a linked program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// A value that can be written to a uniform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    I32(i32),
    F32(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

/// Storage format of a color texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgb8,
}

/// Storage format of a renderbuffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderbufferFormat {
    Depth24Stencil8,
}

/// Sampling filter for both minification and magnification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFilter {
    Linear,
}

/// Framebuffer attachment points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attachment {
    Color0,
    DepthStencil,
}

impl Attachment {
    fn gl_enum(self) -> u32 {
        match self {
            Attachment::Color0 => glow::COLOR_ATTACHMENT0,
            Attachment::DepthStencil => glow::DEPTH_STENCIL_ATTACHMENT,
        }
    }
}

/// A pixel rectangle with its origin at the bottom-left, as GL counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Result of a framebuffer completeness check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    Incomplete(u32),
}

/// The graphics driver as seen by the wrappers.
///
/// Every call targets the single context that is current on the calling
/// thread. Calls that configure an object (`upload_buffer`, `attrib_pointer`,
/// `allocate_texture`, ...) act on whatever is bound to the matching slot.
pub trait Device {
    /// Allocates a new object. The returned handle is never `0`.
    fn create(&self, kind: ResourceKind) -> Result<RawHandle, String>;
    /// Releases an object. Deleting handle `0` does nothing.
    fn delete(&self, kind: ResourceKind, handle: RawHandle);
    /// Binds `handle` to `slot`; `0` clears the slot.
    fn bind(&self, slot: BindSlot, handle: RawHandle);

    fn upload_buffer(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    fn attrib_pointer(&self, binding: &AttribBinding);
    fn enable_attrib(&self, slot: u32);
    fn draw_indexed(&self, mode: DrawMode, count: i32, offset: i32);

    /// Compiles `source` into `shader`, returning the info log on failure.
    fn compile(&self, shader: RawHandle, source: &str) -> Result<(), String>;
    fn attach(&self, program: RawHandle, shader: RawHandle);
    fn detach(&self, program: RawHandle, shader: RawHandle);
    /// Links `program`, returning the info log on failure.
    fn link(&self, program: RawHandle) -> Result<(), String>;
    fn uniform_location(&self, program: RawHandle, name: &str) -> Option<UniformLocation>;
    fn set_uniform(&self, location: UniformLocation, value: &UniformValue);

    fn allocate_texture(&self, format: TextureFormat, width: i32, height: i32);
    fn set_texture_filter(&self, filter: TextureFilter);
    fn allocate_renderbuffer(&self, format: RenderbufferFormat, width: i32, height: i32);
    fn attach_texture(&self, attachment: Attachment, texture: RawHandle);
    fn attach_renderbuffer(&self, attachment: Attachment, renderbuffer: RawHandle);
    fn framebuffer_status(&self) -> FramebufferStatus;
    /// Copies the color of framebuffer `source` inside `from` into `to` of
    /// the bound draw framebuffer, filtering linearly.
    fn blit_color(&self, source: RawHandle, from: PixelRect, to: PixelRect);

    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32);
    /// Pops the oldest pending error code, if any.
    fn poll_error(&self) -> Option<u32>;
}

impl<D: Device + ?Sized> Device for Rc<D> {
    fn create(&self, kind: ResourceKind) -> Result<RawHandle, String> {
        (**self).create(kind)
    }
    fn delete(&self, kind: ResourceKind, handle: RawHandle) {
        (**self).delete(kind, handle)
    }
    fn bind(&self, slot: BindSlot, handle: RawHandle) {
        (**self).bind(slot, handle)
    }
    fn upload_buffer(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        (**self).upload_buffer(target, data, usage)
    }
    fn attrib_pointer(&self, binding: &AttribBinding) {
        (**self).attrib_pointer(binding)
    }
    fn enable_attrib(&self, slot: u32) {
        (**self).enable_attrib(slot)
    }
    fn draw_indexed(&self, mode: DrawMode, count: i32, offset: i32) {
        (**self).draw_indexed(mode, count, offset)
    }
    fn compile(&self, shader: RawHandle, source: &str) -> Result<(), String> {
        (**self).compile(shader, source)
    }
    fn attach(&self, program: RawHandle, shader: RawHandle) {
        (**self).attach(program, shader)
    }
    fn detach(&self, program: RawHandle, shader: RawHandle) {
        (**self).detach(program, shader)
    }
    fn link(&self, program: RawHandle) -> Result<(), String> {
        (**self).link(program)
    }
    fn uniform_location(&self, program: RawHandle, name: &str) -> Option<UniformLocation> {
        (**self).uniform_location(program, name)
    }
    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        (**self).set_uniform(location, value)
    }
    fn allocate_texture(&self, format: TextureFormat, width: i32, height: i32) {
        (**self).allocate_texture(format, width, height)
    }
    fn set_texture_filter(&self, filter: TextureFilter) {
        (**self).set_texture_filter(filter)
    }
    fn allocate_renderbuffer(&self, format: RenderbufferFormat, width: i32, height: i32) {
        (**self).allocate_renderbuffer(format, width, height)
    }
    fn attach_texture(&self, attachment: Attachment, texture: RawHandle) {
        (**self).attach_texture(attachment, texture)
    }
    fn attach_renderbuffer(&self, attachment: Attachment, renderbuffer: RawHandle) {
        (**self).attach_renderbuffer(attachment, renderbuffer)
    }
    fn framebuffer_status(&self) -> FramebufferStatus {
        (**self).framebuffer_status()
    }
    fn blit_color(&self, source: RawHandle, from: PixelRect, to: PixelRect) {
        (**self).blit_color(source, from, to)
    }
    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        (**self).set_viewport(x, y, width, height)
    }
    fn poll_error(&self) -> Option<u32> {
        (**self).poll_error()
    }
}

impl<D: Device + ?Sized> Device for Arc<D> {
    fn create(&self, kind: ResourceKind) -> Result<RawHandle, String> {
        (**self).create(kind)
    }
    fn delete(&self, kind: ResourceKind, handle: RawHandle) {
        (**self).delete(kind, handle)
    }
    fn bind(&self, slot: BindSlot, handle: RawHandle) {
        (**self).bind(slot, handle)
    }
    fn upload_buffer(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        (**self).upload_buffer(target, data, usage)
    }
    fn attrib_pointer(&self, binding: &AttribBinding) {
        (**self).attrib_pointer(binding)
    }
    fn enable_attrib(&self, slot: u32) {
        (**self).enable_attrib(slot)
    }
    fn draw_indexed(&self, mode: DrawMode, count: i32, offset: i32) {
        (**self).draw_indexed(mode, count, offset)
    }
    fn compile(&self, shader: RawHandle, source: &str) -> Result<(), String> {
        (**self).compile(shader, source)
    }
    fn attach(&self, program: RawHandle, shader: RawHandle) {
        (**self).attach(program, shader)
    }
    fn detach(&self, program: RawHandle, shader: RawHandle) {
        (**self).detach(program, shader)
    }
    fn link(&self, program: RawHandle) -> Result<(), String> {
        (**self).link(program)
    }
    fn uniform_location(&self, program: RawHandle, name: &str) -> Option<UniformLocation> {
        (**self).uniform_location(program, name)
    }
    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        (**self).set_uniform(location, value)
    }
    fn allocate_texture(&self, format: TextureFormat, width: i32, height: i32) {
        (**self).allocate_texture(format, width, height)
    }
    fn set_texture_filter(&self, filter: TextureFilter) {
        (**self).set_texture_filter(filter)
    }
    fn allocate_renderbuffer(&self, format: RenderbufferFormat, width: i32, height: i32) {
        (**self).allocate_renderbuffer(format, width, height)
    }
    fn attach_texture(&self, attachment: Attachment, texture: RawHandle) {
        (**self).attach_texture(attachment, texture)
    }
    fn attach_renderbuffer(&self, attachment: Attachment, renderbuffer: RawHandle) {
        (**self).attach_renderbuffer(attachment, renderbuffer)
    }
    fn framebuffer_status(&self) -> FramebufferStatus {
        (**self).framebuffer_status()
    }
    fn blit_color(&self, source: RawHandle, from: PixelRect, to: PixelRect) {
        (**self).blit_color(source, from, to)
    }
    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        (**self).set_viewport(x, y, width, height)
    }
    fn poll_error(&self) -> Option<u32> {
        (**self).poll_error()
    }
}

fn live(handle: RawHandle) -> Option<NonZeroU32> {
    NonZeroU32::new(handle)
}

impl Device for glow::Context {
    fn create(&self, kind: ResourceKind) -> Result<RawHandle, String> {
        unsafe {
            let id = match kind {
                ResourceKind::Buffer => self.create_buffer()?.0,
                ResourceKind::VertexArray => self.create_vertex_array()?.0,
                ResourceKind::Shader(stage) => self.create_shader(stage.gl_enum())?.0,
                ResourceKind::Program => self.create_program()?.0,
                ResourceKind::Texture => self.create_texture()?.0,
                ResourceKind::Framebuffer => self.create_framebuffer()?.0,
                ResourceKind::Renderbuffer => self.create_renderbuffer()?.0,
            };
            Ok(id.get())
        }
    }

    fn delete(&self, kind: ResourceKind, handle: RawHandle) {
        let Some(id) = live(handle) else {
            return;
        };
        unsafe {
            match kind {
                ResourceKind::Buffer => self.delete_buffer(glow::NativeBuffer(id)),
                ResourceKind::VertexArray => self.delete_vertex_array(glow::NativeVertexArray(id)),
                ResourceKind::Shader(_) => self.delete_shader(glow::NativeShader(id)),
                ResourceKind::Program => self.delete_program(glow::NativeProgram(id)),
                ResourceKind::Texture => self.delete_texture(glow::NativeTexture(id)),
                ResourceKind::Framebuffer => self.delete_framebuffer(glow::NativeFramebuffer(id)),
                ResourceKind::Renderbuffer => {
                    self.delete_renderbuffer(glow::NativeRenderbuffer(id))
                }
            }
        }
    }

    fn bind(&self, slot: BindSlot, handle: RawHandle) {
        let id = live(handle);
        unsafe {
            match slot {
                BindSlot::ArrayBuffer => {
                    self.bind_buffer(glow::ARRAY_BUFFER, id.map(glow::NativeBuffer))
                }
                BindSlot::ElementBuffer => {
                    self.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, id.map(glow::NativeBuffer))
                }
                BindSlot::VertexArray => self.bind_vertex_array(id.map(glow::NativeVertexArray)),
                BindSlot::Texture2d => {
                    self.bind_texture(glow::TEXTURE_2D, id.map(glow::NativeTexture))
                }
                BindSlot::Framebuffer => {
                    self.bind_framebuffer(glow::FRAMEBUFFER, id.map(glow::NativeFramebuffer))
                }
                BindSlot::Renderbuffer => {
                    self.bind_renderbuffer(glow::RENDERBUFFER, id.map(glow::NativeRenderbuffer))
                }
                BindSlot::Program => self.use_program(id.map(glow::NativeProgram)),
            }
        }
    }

    fn upload_buffer(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let usage = match usage {
            BufferUsage::StaticDraw => glow::STATIC_DRAW,
        };
        unsafe {
            self.buffer_data_u8_slice(target.gl_enum(), data, usage);
        }
    }

    fn attrib_pointer(&self, binding: &AttribBinding) {
        let kind = binding.kind.gl_enum();
        unsafe {
            if binding.kind.is_integer() {
                self.vertex_attrib_pointer_i32(
                    binding.slot,
                    binding.components,
                    kind,
                    binding.stride,
                    binding.offset,
                );
            } else {
                self.vertex_attrib_pointer_f32(
                    binding.slot,
                    binding.components,
                    kind,
                    false,
                    binding.stride,
                    binding.offset,
                );
            }
        }
    }

    fn enable_attrib(&self, slot: u32) {
        unsafe {
            self.enable_vertex_attrib_array(slot);
        }
    }

    fn draw_indexed(&self, mode: DrawMode, count: i32, offset: i32) {
        unsafe {
            self.draw_elements(mode.gl_enum(), count, glow::UNSIGNED_INT, offset);
        }
    }

    fn compile(&self, shader: RawHandle, source: &str) -> Result<(), String> {
        let id = live(shader).ok_or_else(|| "shader handle is 0".to_string())?;
        let shader = glow::NativeShader(id);
        unsafe {
            self.shader_source(shader, source);
            self.compile_shader(shader);
            if !self.get_shader_compile_status(shader) {
                return Err(self.get_shader_info_log(shader));
            }
        }
        Ok(())
    }

    fn attach(&self, program: RawHandle, shader: RawHandle) {
        if let (Some(program), Some(shader)) = (live(program), live(shader)) {
            unsafe {
                self.attach_shader(glow::NativeProgram(program), glow::NativeShader(shader));
            }
        }
    }

    fn detach(&self, program: RawHandle, shader: RawHandle) {
        if let (Some(program), Some(shader)) = (live(program), live(shader)) {
            unsafe {
                self.detach_shader(glow::NativeProgram(program), glow::NativeShader(shader));
            }
        }
    }

    fn link(&self, program: RawHandle) -> Result<(), String> {
        let id = live(program).ok_or_else(|| "program handle is 0".to_string())?;
        let program = glow::NativeProgram(id);
        unsafe {
            self.link_program(program);
            if !self.get_program_link_status(program) {
                return Err(self.get_program_info_log(program));
            }
        }
        Ok(())
    }

    fn uniform_location(&self, program: RawHandle, name: &str) -> Option<UniformLocation> {
        let program = glow::NativeProgram(live(program)?);
        unsafe {
            self.get_uniform_location(program, name)
                .map(|location| UniformLocation(location.0))
        }
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        let location = glow::NativeUniformLocation(location.0);
        let location = Some(&location);
        unsafe {
            match value {
                UniformValue::I32(v) => self.uniform_1_i32(location, *v),
                UniformValue::F32(v) => self.uniform_1_f32(location, *v),
                UniformValue::Vec2(v) => self.uniform_2_f32(location, v.x, v.y),
                UniformValue::Vec3(v) => self.uniform_3_f32(location, v.x, v.y, v.z),
                UniformValue::Vec4(v) => self.uniform_4_f32(location, v.x, v.y, v.z, v.w),
                UniformValue::Mat3(m) => {
                    self.uniform_matrix_3_f32_slice(location, false, &m.to_cols_array())
                }
                UniformValue::Mat4(m) => {
                    self.uniform_matrix_4_f32_slice(location, false, &m.to_cols_array())
                }
            }
        }
    }

    fn allocate_texture(&self, format: TextureFormat, width: i32, height: i32) {
        let (internal, format) = match format {
            TextureFormat::Rgb8 => (glow::RGB8 as i32, glow::RGB),
        };
        unsafe {
            self.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal,
                width,
                height,
                0,
                format,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(None),
            );
        }
    }

    fn set_texture_filter(&self, filter: TextureFilter) {
        let filter = match filter {
            TextureFilter::Linear => glow::LINEAR,
        } as i32;
        unsafe {
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter);
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter);
            self.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
        }
    }

    fn allocate_renderbuffer(&self, format: RenderbufferFormat, width: i32, height: i32) {
        let format = match format {
            RenderbufferFormat::Depth24Stencil8 => glow::DEPTH24_STENCIL8,
        };
        unsafe {
            self.renderbuffer_storage(glow::RENDERBUFFER, format, width, height);
        }
    }

    fn attach_texture(&self, attachment: Attachment, texture: RawHandle) {
        unsafe {
            self.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment.gl_enum(),
                glow::TEXTURE_2D,
                live(texture).map(glow::NativeTexture),
                0,
            );
        }
    }

    fn attach_renderbuffer(&self, attachment: Attachment, renderbuffer: RawHandle) {
        unsafe {
            self.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                attachment.gl_enum(),
                glow::RENDERBUFFER,
                live(renderbuffer).map(glow::NativeRenderbuffer),
            );
        }
    }

    fn framebuffer_status(&self) -> FramebufferStatus {
        let status = unsafe { self.check_framebuffer_status(glow::FRAMEBUFFER) };
        if status == glow::FRAMEBUFFER_COMPLETE {
            FramebufferStatus::Complete
        } else {
            FramebufferStatus::Incomplete(status)
        }
    }

    fn blit_color(&self, source: RawHandle, from: PixelRect, to: PixelRect) {
        let Some(source) = live(source) else {
            return;
        };
        unsafe {
            self.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(glow::NativeFramebuffer(source)));
            self.blit_framebuffer(
                from.x,
                from.y,
                from.x + from.width,
                from.y + from.height,
                to.x,
                to.y,
                to.x + to.width,
                to.y + to.height,
                glow::COLOR_BUFFER_BIT,
                glow::LINEAR,
            );
            self.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
        }
    }

    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe {
            self.viewport(x, y, width, height);
        }
    }

    fn poll_error(&self) -> Option<u32> {
        let code = unsafe { self.get_error() };
        (code != glow::NO_ERROR).then_some(code)
    }
}
