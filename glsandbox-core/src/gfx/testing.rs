//! A [`Device`] that records every call instead of talking to a driver.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
};

use fxhash::FxHashMap;

use super::*;
use crate::diagnostics::{Diagnostics, MemorySink};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Create(ResourceKind, RawHandle),
    Delete(ResourceKind, RawHandle),
    Bind(BindSlot, RawHandle),
    Upload(BufferTarget, Vec<u8>, BufferUsage),
    AttribPointer(AttribBinding),
    EnableAttrib(u32),
    Draw(DrawMode, i32, i32),
    Compile(RawHandle),
    Attach(RawHandle, RawHandle),
    Detach(RawHandle, RawHandle),
    Link(RawHandle),
    UniformLocation(RawHandle, String),
    SetUniform(UniformLocation, UniformValue),
    AllocateTexture(TextureFormat, i32, i32),
    TextureFilter(TextureFilter),
    AllocateRenderbuffer(RenderbufferFormat, i32, i32),
    AttachTexture(Attachment, RawHandle),
    AttachRenderbuffer(Attachment, RawHandle),
    Viewport(i32, i32, i32, i32),
    BlitColor(RawHandle, PixelRect, PixelRect),
}

#[derive(Default)]
pub struct RecordingDevice {
    next_handle: Cell<RawHandle>,
    calls: RefCell<Vec<Call>>,
    errors: RefCell<VecDeque<u32>>,
    failing: Cell<Option<ResourceKind>>,
    zero_handles: Cell<bool>,
    incomplete: Cell<bool>,
    stages: RefCell<FxHashMap<RawHandle, ShaderStage>>,
    compile_failure: RefCell<Option<(ShaderStage, String)>>,
    link_failure: RefCell<Option<String>>,
    uniforms: RefCell<Vec<String>>,
}

impl RecordingDevice {
    /// A context backed by a fresh recording device and a memory sink.
    pub fn context() -> (Rc<GpuContext>, Rc<RecordingDevice>, Rc<MemorySink>) {
        let device = Rc::new(RecordingDevice::default());
        let sink = Rc::new(MemorySink::default());
        let ctx = GpuContext::new(device.clone(), Diagnostics::new(sink.clone()));
        (ctx, device, sink)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    /// Handles passed to `delete` for objects of `kind`, in order.
    pub fn deleted(&self, kind: ResourceKind) -> Vec<RawHandle> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Delete(k, handle) if *k == kind => Some(*handle),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn push_error(&self, code: u32) {
        self.errors.borrow_mut().push_back(code);
    }

    pub fn fail_allocation(&self, kind: Option<ResourceKind>) {
        self.failing.set(kind);
    }

    pub fn return_zero_handles(&self, enabled: bool) {
        self.zero_handles.set(enabled);
    }

    pub fn report_incomplete(&self, enabled: bool) {
        self.incomplete.set(enabled);
    }

    pub fn fail_compile(&self, stage: ShaderStage, log: &str) {
        *self.compile_failure.borrow_mut() = Some((stage, log.to_string()));
    }

    pub fn fail_link(&self, log: &str) {
        *self.link_failure.borrow_mut() = Some(log.to_string());
    }

    /// Declares uniforms that every linked program exposes.
    pub fn declare_uniforms(&self, names: &[&str]) {
        *self.uniforms.borrow_mut() = names.iter().map(|name| name.to_string()).collect();
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Device for RecordingDevice {
    fn create(&self, kind: ResourceKind) -> Result<RawHandle, String> {
        if self.failing.get() == Some(kind) {
            return Err(format!("out of {kind} names"));
        }
        if self.zero_handles.get() {
            return Ok(0);
        }

        let handle = self.next_handle.get() + 1;
        self.next_handle.set(handle);
        if let ResourceKind::Shader(stage) = kind {
            self.stages.borrow_mut().insert(handle, stage);
        }
        self.record(Call::Create(kind, handle));
        Ok(handle)
    }

    fn delete(&self, kind: ResourceKind, handle: RawHandle) {
        self.record(Call::Delete(kind, handle));
    }

    fn bind(&self, slot: BindSlot, handle: RawHandle) {
        self.record(Call::Bind(slot, handle));
    }

    fn upload_buffer(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        self.record(Call::Upload(target, data.to_vec(), usage));
    }

    fn attrib_pointer(&self, binding: &AttribBinding) {
        self.record(Call::AttribPointer(*binding));
    }

    fn enable_attrib(&self, slot: u32) {
        self.record(Call::EnableAttrib(slot));
    }

    fn draw_indexed(&self, mode: DrawMode, count: i32, offset: i32) {
        self.record(Call::Draw(mode, count, offset));
    }

    fn compile(&self, shader: RawHandle, _source: &str) -> Result<(), String> {
        self.record(Call::Compile(shader));
        let stage = self.stages.borrow().get(&shader).copied();
        match &*self.compile_failure.borrow() {
            Some((failing, log)) if Some(*failing) == stage => Err(log.clone()),
            _ => Ok(()),
        }
    }

    fn attach(&self, program: RawHandle, shader: RawHandle) {
        self.record(Call::Attach(program, shader));
    }

    fn detach(&self, program: RawHandle, shader: RawHandle) {
        self.record(Call::Detach(program, shader));
    }

    fn link(&self, program: RawHandle) -> Result<(), String> {
        self.record(Call::Link(program));
        match &*self.link_failure.borrow() {
            Some(log) => Err(log.clone()),
            None => Ok(()),
        }
    }

    fn uniform_location(&self, program: RawHandle, name: &str) -> Option<UniformLocation> {
        self.record(Call::UniformLocation(program, name.to_string()));
        self.uniforms
            .borrow()
            .iter()
            .position(|uniform| uniform == name)
            .map(|index| UniformLocation(index as u32))
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        self.record(Call::SetUniform(location, *value));
    }

    fn allocate_texture(&self, format: TextureFormat, width: i32, height: i32) {
        self.record(Call::AllocateTexture(format, width, height));
    }

    fn set_texture_filter(&self, filter: TextureFilter) {
        self.record(Call::TextureFilter(filter));
    }

    fn allocate_renderbuffer(&self, format: RenderbufferFormat, width: i32, height: i32) {
        self.record(Call::AllocateRenderbuffer(format, width, height));
    }

    fn attach_texture(&self, attachment: Attachment, texture: RawHandle) {
        self.record(Call::AttachTexture(attachment, texture));
    }

    fn attach_renderbuffer(&self, attachment: Attachment, renderbuffer: RawHandle) {
        self.record(Call::AttachRenderbuffer(attachment, renderbuffer));
    }

    fn framebuffer_status(&self) -> FramebufferStatus {
        if self.incomplete.get() {
            FramebufferStatus::Incomplete(glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT)
        } else {
            FramebufferStatus::Complete
        }
    }

    fn blit_color(&self, source: RawHandle, from: PixelRect, to: PixelRect) {
        self.record(Call::BlitColor(source, from, to));
    }

    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Call::Viewport(x, y, width, height));
    }

    fn poll_error(&self) -> Option<u32> {
        self.errors.borrow_mut().pop_front()
    }
}
