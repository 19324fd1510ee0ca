//! Vertex and index buffers.
//!
//! Both wrappers upload their data once at construction with static usage and
//! own exactly one driver buffer. `delete` can be called any number of times;
//! only the first call reaches the driver.

use std::rc::Rc;

use super::{BindSlot, BufferTarget, BufferUsage, GfxError, GpuContext, RawHandle, ResourceKind};

struct Buffer {
    ctx: Rc<GpuContext>,
    handle: RawHandle,
    target: BufferTarget,
    size: usize,
}

impl Buffer {
    fn new(ctx: &Rc<GpuContext>, target: BufferTarget, data: &[u8]) -> Result<Self, GfxError> {
        let handle = ctx.create(ResourceKind::Buffer)?;
        ctx.bind(target.slot(), handle);
        ctx.device()
            .upload_buffer(target, data, BufferUsage::StaticDraw);
        // Upload errors are transient: logged by `check_error`, buffer stays usable.
        let _ = ctx.check_error("buffer upload");

        Ok(Self {
            ctx: Rc::clone(ctx),
            handle,
            target,
            size: data.len(),
        })
    }

    fn bind(&self) {
        if self.handle != 0 {
            self.ctx.bind(self.target.slot(), self.handle);
        }
    }

    fn unbind(&self) {
        self.ctx.unbind(self.target.slot());
    }

    fn delete(&mut self) {
        if self.handle == 0 {
            return;
        }
        self.ctx.delete(ResourceKind::Buffer, self.target.slot(), self.handle);
        self.handle = 0;
    }
}

/// A buffer of raw vertex data bound to the array-buffer slot.
pub struct VertexBuffer {
    inner: Buffer,
}

impl VertexBuffer {
    /// Uploads raw bytes into a new vertex buffer.
    pub fn new(ctx: &Rc<GpuContext>, data: &[u8]) -> Result<Self, GfxError> {
        let inner = Buffer::new(ctx, BufferTarget::Array, data)?;
        ctx.diagnostics().debug(format_args!(
            "Vertex buffer {} created ({} bytes)",
            inner.handle, inner.size
        ));
        Ok(Self { inner })
    }

    /// Uploads a slice of plain-old-data vertices.
    pub fn from_slice<T: bytemuck::Pod>(
        ctx: &Rc<GpuContext>,
        vertices: &[T],
    ) -> Result<Self, GfxError> {
        Self::new(ctx, bytemuck::cast_slice(vertices))
    }

    pub fn bind(&self) {
        self.inner.bind();
    }

    pub fn unbind(&self) {
        self.inner.unbind();
    }

    /// Releases the buffer. Further calls do nothing.
    pub fn delete(&mut self) {
        self.inner.delete();
    }

    /// The driver handle, or `0` once deleted.
    pub fn handle(&self) -> RawHandle {
        self.inner.handle
    }

    /// Size of the uploaded data in bytes.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.inner.ctx.is_bound(BindSlot::ArrayBuffer, self.inner.handle)
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        self.delete();
    }
}

/// A buffer of `u32` indices bound to the element-array slot.
pub struct IndexBuffer {
    inner: Buffer,
    count: usize,
}

impl IndexBuffer {
    pub fn new(ctx: &Rc<GpuContext>, indices: &[u32]) -> Result<Self, GfxError> {
        let inner = Buffer::new(ctx, BufferTarget::ElementArray, bytemuck::cast_slice(indices))?;
        ctx.diagnostics().debug(format_args!(
            "Index buffer {} created ({} indices)",
            inner.handle,
            indices.len()
        ));
        Ok(Self {
            inner,
            count: indices.len(),
        })
    }

    pub fn bind(&self) {
        self.inner.bind();
    }

    pub fn unbind(&self) {
        self.inner.unbind();
    }

    /// Releases the buffer. Further calls do nothing.
    pub fn delete(&mut self) {
        self.inner.delete();
    }

    pub fn handle(&self) -> RawHandle {
        self.inner.handle
    }

    /// Number of indices uploaded.
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Drop for IndexBuffer {
    fn drop(&mut self) {
        self.delete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::testing::{Call, RecordingDevice};
    use log::Level;

    #[test]
    fn vertex_buffer_uploads_static_data() {
        let (ctx, device, _) = RecordingDevice::context();
        let vertices = [0.0f32, 1.0, 2.0];

        let vbo = VertexBuffer::from_slice(&ctx, &vertices).unwrap();

        assert_eq!(vbo.size(), 12);
        assert_eq!(ctx.bound(BindSlot::ArrayBuffer), vbo.handle());
        assert!(device.calls().contains(&Call::Upload(
            BufferTarget::Array,
            bytemuck::cast_slice(&vertices).to_vec(),
            BufferUsage::StaticDraw,
        )));
    }

    #[test]
    fn double_delete_reaches_the_driver_once() {
        let (ctx, device, _) = RecordingDevice::context();
        let mut vbo = VertexBuffer::new(&ctx, &[1, 2, 3, 4]).unwrap();
        let mut ebo = IndexBuffer::new(&ctx, &[0, 1, 2]).unwrap();
        let (vbo_handle, ebo_handle) = (vbo.handle(), ebo.handle());

        vbo.delete();
        vbo.delete();
        ebo.delete();
        ebo.delete();
        drop(vbo);
        drop(ebo);

        assert_eq!(device.deleted(ResourceKind::Buffer), vec![vbo_handle, ebo_handle]);
    }

    #[test]
    fn drop_releases_the_buffer() {
        let (ctx, device, _) = RecordingDevice::context();
        let handle = {
            let ebo = IndexBuffer::new(&ctx, &[0, 1, 2, 2, 3, 0]).unwrap();
            assert_eq!(ebo.count(), 6);
            ebo.handle()
        };

        assert_eq!(device.deleted(ResourceKind::Buffer), vec![handle]);
        assert_eq!(ctx.bound(BindSlot::ElementBuffer), 0);
    }

    #[test]
    fn operations_after_delete_are_no_ops() {
        let (ctx, device, _) = RecordingDevice::context();
        let mut vbo = VertexBuffer::new(&ctx, &[0; 8]).unwrap();
        vbo.delete();
        device.clear_calls();

        vbo.bind();

        assert_eq!(device.count(|call| matches!(call, Call::Bind(BindSlot::ArrayBuffer, _))), 0);
        assert_eq!(vbo.handle(), 0);
    }

    #[test]
    fn allocation_failure_is_surfaced() {
        let (ctx, device, sink) = RecordingDevice::context();
        device.fail_allocation(Some(ResourceKind::Buffer));

        let err = IndexBuffer::new(&ctx, &[0, 1, 2]).err().unwrap();

        assert!(matches!(err, GfxError::Allocation { kind: ResourceKind::Buffer, .. }));
        assert!(sink.contains(Level::Error, "Failed to allocate buffer"));
    }

    #[test]
    fn upload_errors_are_logged_but_not_fatal() {
        let (ctx, device, sink) = RecordingDevice::context();
        device.push_error(glow::OUT_OF_MEMORY);

        let vbo = VertexBuffer::new(&ctx, &[0; 16]).unwrap();

        assert_ne!(vbo.handle(), 0);
        assert!(sink.contains(Level::Error, "buffer upload: GL_OUT_OF_MEMORY"));
    }
}
