//! The render context.
//!
//! OpenGL keeps one "currently bound" object per binding point for the whole
//! context. [`GpuContext`] mirrors that state so the wrappers can check their
//! binding discipline and so deleting a bound object clears the slot, just
//! like the driver does.

use std::{cell::Cell, rc::Rc};

use super::{BindSlot, Device, GfxError, RawHandle, ResourceKind};
use crate::diagnostics::Diagnostics;

/// Owns the device and the binding bookkeeping for one GL context.
pub struct GpuContext {
    device: Box<dyn Device>,
    diagnostics: Diagnostics,
    bound: [Cell<RawHandle>; BindSlot::COUNT],
}

impl GpuContext {
    /// Wraps a device. Every wrapper created from the returned context shares it.
    pub fn new(device: impl Device + 'static, diagnostics: Diagnostics) -> Rc<Self> {
        Rc::new(Self {
            device: Box::new(device),
            diagnostics,
            bound: Default::default(),
        })
    }

    pub fn device(&self) -> &dyn Device {
        self.device.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Returns the handle currently bound to `slot`, or `0`.
    pub fn bound(&self, slot: BindSlot) -> RawHandle {
        self.bound[slot.index()].get()
    }

    /// Returns `true` if `handle` is live and bound to `slot`.
    pub fn is_bound(&self, slot: BindSlot, handle: RawHandle) -> bool {
        handle != 0 && self.bound(slot) == handle
    }

    /// Binds `handle` to `slot` on the device and records it.
    pub fn bind(&self, slot: BindSlot, handle: RawHandle) {
        self.device.bind(slot, handle);
        self.bound[slot.index()].set(handle);
    }

    /// Clears `slot`.
    pub fn unbind(&self, slot: BindSlot) {
        self.bind(slot, 0);
    }

    pub(crate) fn create(&self, kind: ResourceKind) -> Result<RawHandle, GfxError> {
        match self.device.create(kind) {
            Ok(0) => Err(self.allocation_failed(kind, "driver returned handle 0".to_string())),
            Ok(handle) => Ok(handle),
            Err(reason) => Err(self.allocation_failed(kind, reason)),
        }
    }

    #[track_caller]
    fn allocation_failed(&self, kind: ResourceKind, reason: String) -> GfxError {
        self.diagnostics.error(format_args!("Failed to allocate {kind}: {reason}"));
        GfxError::Allocation { kind, reason }
    }

    /// Deletes `handle` and forgets any binding that still refers to it.
    pub(crate) fn delete(&self, kind: ResourceKind, slot: BindSlot, handle: RawHandle) {
        if handle == 0 {
            return;
        }
        self.device.delete(kind, handle);
        if self.bound(slot) == handle {
            self.bound[slot.index()].set(0);
        }
    }

    /// Forgets every recorded binding.
    ///
    /// Call after code outside this crate, such as a UI painter, changed the
    /// driver's binding state.
    pub fn forget_bindings(&self) {
        for slot in &self.bound {
            slot.set(0);
        }
    }

    /// Sets the rendering viewport.
    pub fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.device.set_viewport(x, y, width, height);
    }

    /// Polls the driver error flag after `operation`.
    ///
    /// Every pending error is logged; the first one is returned. Errors are
    /// never retried.
    #[track_caller]
    pub fn check_error(&self, operation: &str) -> Result<(), GfxError> {
        let mut first = None;
        while let Some(code) = self.device.poll_error() {
            self.diagnostics.error(format_args!(
                "{operation}: {} (0x{code:04X})",
                describe_gl_error(code)
            ));
            first.get_or_insert(code);
        }

        match first {
            Some(code) => Err(GfxError::Driver {
                operation: operation.to_string(),
                code,
            }),
            None => Ok(()),
        }
    }
}

/// Human-readable name of an OpenGL error code.
pub fn describe_gl_error(code: u32) -> &'static str {
    match code {
        glow::NO_ERROR => "GL_NO_ERROR",
        glow::INVALID_ENUM => "GL_INVALID_ENUM",
        glow::INVALID_VALUE => "GL_INVALID_VALUE",
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION",
        glow::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        glow::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        _ => "unknown GL error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::testing::{Call, RecordingDevice};
    use log::Level;

    #[test]
    fn bind_is_recorded_per_slot() {
        let (ctx, device, _) = RecordingDevice::context();

        ctx.bind(BindSlot::ArrayBuffer, 4);
        ctx.bind(BindSlot::Program, 9);
        assert_eq!(ctx.bound(BindSlot::ArrayBuffer), 4);
        assert_eq!(ctx.bound(BindSlot::Program), 9);
        assert_eq!(ctx.bound(BindSlot::Framebuffer), 0);

        ctx.unbind(BindSlot::ArrayBuffer);
        assert_eq!(ctx.bound(BindSlot::ArrayBuffer), 0);
        assert!(device.calls().contains(&Call::Bind(BindSlot::ArrayBuffer, 0)));
    }

    #[test]
    fn deleting_a_bound_object_clears_the_slot() {
        let (ctx, _, _) = RecordingDevice::context();

        ctx.bind(BindSlot::VertexArray, 2);
        ctx.delete(ResourceKind::VertexArray, BindSlot::VertexArray, 2);
        assert_eq!(ctx.bound(BindSlot::VertexArray), 0);
    }

    #[test]
    fn forget_bindings_clears_every_slot_without_driver_calls() {
        let (ctx, device, _) = RecordingDevice::context();
        ctx.bind(BindSlot::Program, 3);
        ctx.bind(BindSlot::Framebuffer, 5);
        device.clear_calls();

        ctx.forget_bindings();

        assert_eq!(ctx.bound(BindSlot::Program), 0);
        assert_eq!(ctx.bound(BindSlot::Framebuffer), 0);
        assert!(device.calls().is_empty());
    }

    #[test]
    fn check_error_drains_and_logs_every_code() {
        let (ctx, device, sink) = RecordingDevice::context();
        device.push_error(glow::INVALID_VALUE);
        device.push_error(glow::OUT_OF_MEMORY);

        let err = ctx.check_error("texture upload").unwrap_err();
        assert_eq!(
            err,
            GfxError::Driver {
                operation: "texture upload".into(),
                code: glow::INVALID_VALUE
            }
        );
        assert!(sink.contains(Level::Error, "GL_INVALID_VALUE"));
        assert!(sink.contains(Level::Error, "GL_OUT_OF_MEMORY"));
        assert!(ctx.check_error("texture upload").is_ok());
    }

    #[test]
    fn zero_handle_from_driver_is_an_allocation_failure() {
        let (ctx, device, _) = RecordingDevice::context();
        device.return_zero_handles(true);

        let err = ctx.create(ResourceKind::Buffer).unwrap_err();
        assert!(matches!(err, GfxError::Allocation { kind: ResourceKind::Buffer, .. }));
    }
}
