//! Module to work with OpenGL framebuffers.
//!
//! [`RenderTarget`] is an offscreen destination made of a framebuffer, an RGB
//! color texture and a combined depth/stencil renderbuffer. The three objects
//! are always created and released together: a target either holds all of
//! them or none.

use std::rc::Rc;

use super::{
    Attachment, BindSlot, Device, FramebufferStatus, GfxError, GpuContext, PixelRect, RawHandle,
    RenderbufferFormat, ResourceKind, TextureFilter, TextureFormat,
};

/// Lifecycle of a [`RenderTarget`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetState {
    /// Never allocated.
    Unallocated,
    /// Holds live objects but is not the current draw destination.
    Allocated,
    /// Holds live objects and is the current draw destination.
    Bound,
    /// Released, either explicitly or by a failed reallocation.
    Deallocated,
}

/// The driver handles owned by a [`RenderTarget`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TargetHandles {
    pub framebuffer: RawHandle,
    pub color: RawHandle,
    pub depth_stencil: RawHandle,
}

impl TargetHandles {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// What a blit needs to read a [`RenderTarget`]'s color.
///
/// Plain data, so it can travel into a paint callback that only has the raw
/// device. It does not own the framebuffer; once the target is resized or
/// dropped the handle is stale and must not be used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlitSource {
    pub framebuffer: RawHandle,
    pub width: i32,
    pub height: i32,
}

impl BlitSource {
    /// Copies the whole target into `to` of the bound draw framebuffer.
    pub fn copy_to(&self, device: &dyn Device, to: PixelRect) {
        if self.framebuffer == 0 || to.is_empty() {
            return;
        }
        let from = PixelRect::new(0, 0, self.width, self.height);
        device.blit_color(self.framebuffer, from, to);
    }
}

/// An offscreen color + depth/stencil render target.
pub struct RenderTarget {
    ctx: Rc<GpuContext>,
    handles: TargetHandles,
    width: i32,
    height: i32,
    complete: bool,
    released: bool,
}

impl RenderTarget {
    /// Creates a new render target with the specified width and height.
    pub fn new(ctx: &Rc<GpuContext>, width: i32, height: i32) -> Result<Self, GfxError> {
        let mut target = Self {
            ctx: Rc::clone(ctx),
            handles: TargetHandles::default(),
            width,
            height,
            complete: false,
            released: false,
        };
        target.allocate()?;
        Ok(target)
    }

    fn allocate(&mut self) -> Result<(), GfxError> {
        debug_assert!(self.handles.is_empty());
        let ctx = Rc::clone(&self.ctx);
        let device = ctx.device();

        let framebuffer = ctx.create(ResourceKind::Framebuffer)?;
        let color = match ctx.create(ResourceKind::Texture) {
            Ok(color) => color,
            Err(err) => {
                device.delete(ResourceKind::Framebuffer, framebuffer);
                self.released = true;
                return Err(err);
            }
        };
        let depth_stencil = match ctx.create(ResourceKind::Renderbuffer) {
            Ok(depth_stencil) => depth_stencil,
            Err(err) => {
                device.delete(ResourceKind::Texture, color);
                device.delete(ResourceKind::Framebuffer, framebuffer);
                self.released = true;
                return Err(err);
            }
        };

        ctx.bind(BindSlot::Framebuffer, framebuffer);

        ctx.bind(BindSlot::Texture2d, color);
        device.allocate_texture(TextureFormat::Rgb8, self.width, self.height);
        device.set_texture_filter(TextureFilter::Linear);
        let _ = ctx.check_error("render target color allocation");
        device.attach_texture(Attachment::Color0, color);
        ctx.unbind(BindSlot::Texture2d);

        ctx.bind(BindSlot::Renderbuffer, depth_stencil);
        device.allocate_renderbuffer(RenderbufferFormat::Depth24Stencil8, self.width, self.height);
        device.attach_renderbuffer(Attachment::DepthStencil, depth_stencil);
        ctx.unbind(BindSlot::Renderbuffer);

        self.complete = match device.framebuffer_status() {
            FramebufferStatus::Complete => {
                ctx.diagnostics().info(format_args!(
                    "Render target created successfully ({}x{})",
                    self.width, self.height
                ));
                true
            }
            FramebufferStatus::Incomplete(status) => {
                ctx.diagnostics().error(format_args!(
                    "Render target {}x{} is not complete (status 0x{status:04X})",
                    self.width, self.height
                ));
                false
            }
        };

        ctx.unbind(BindSlot::Framebuffer);

        self.handles = TargetHandles {
            framebuffer,
            color,
            depth_stencil,
        };
        self.released = false;
        Ok(())
    }

    fn release(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        let TargetHandles {
            framebuffer,
            color,
            depth_stencil,
        } = std::mem::take(&mut self.handles);

        let ctx = &self.ctx;
        ctx.delete(ResourceKind::Framebuffer, BindSlot::Framebuffer, framebuffer);
        ctx.delete(ResourceKind::Texture, BindSlot::Texture2d, color);
        ctx.delete(ResourceKind::Renderbuffer, BindSlot::Renderbuffer, depth_stencil);
        self.complete = false;
        self.released = true;
    }

    /// Makes this target the draw destination and narrows the viewport to
    /// its size.
    pub fn bind(&self) {
        if self.handles.framebuffer == 0 {
            return;
        }
        self.ctx.bind(BindSlot::Framebuffer, self.handles.framebuffer);
        self.ctx.viewport(0, 0, self.width, self.height);
    }

    /// Reverts to the default framebuffer.
    pub fn unbind(&self) {
        self.ctx.unbind(BindSlot::Framebuffer);
    }

    /// Rebuilds the target at a new size.
    ///
    /// Equal dimensions are a no-op. Otherwise the old objects are released
    /// before the new ones are allocated; if allocation fails the target is
    /// left [`TargetState::Deallocated`].
    pub fn resize(&mut self, width: i32, height: i32) -> Result<(), GfxError> {
        if width == self.width && height == self.height && !self.handles.is_empty() {
            return Ok(());
        }

        self.width = width;
        self.height = height;
        self.release();
        self.allocate()
    }

    /// Releases all three objects. Further calls do nothing.
    pub fn delete(&mut self) {
        self.release();
    }

    pub fn state(&self) -> TargetState {
        if self.handles.is_empty() {
            if self.released {
                TargetState::Deallocated
            } else {
                TargetState::Unallocated
            }
        } else if self.ctx.is_bound(BindSlot::Framebuffer, self.handles.framebuffer) {
            TargetState::Bound
        } else {
            TargetState::Allocated
        }
    }

    /// Whether the last allocation passed the completeness check.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Returns the color texture handle, to sample the rendered image.
    pub fn color_texture(&self) -> RawHandle {
        self.handles.color
    }

    /// Describes the current framebuffer for [`BlitSource::copy_to`].
    pub fn blit_source(&self) -> BlitSource {
        BlitSource {
            framebuffer: self.handles.framebuffer,
            width: self.width,
            height: self.height,
        }
    }

    pub fn handles(&self) -> TargetHandles {
        self.handles
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::testing::{Call, RecordingDevice};
    use log::Level;

    #[test]
    fn new_target_is_complete_and_unbound() {
        let (ctx, device, sink) = RecordingDevice::context();

        let target = RenderTarget::new(&ctx, 640, 480).unwrap();

        assert!(target.is_complete());
        assert_eq!(target.state(), TargetState::Allocated);
        assert!(device.calls().contains(&Call::AllocateTexture(TextureFormat::Rgb8, 640, 480)));
        assert!(device.calls().contains(&Call::AllocateRenderbuffer(
            RenderbufferFormat::Depth24Stencil8,
            640,
            480
        )));
        assert!(sink.contains(Level::Info, "(640x480)"));
    }

    #[test]
    fn bind_sets_the_viewport() {
        let (ctx, device, _) = RecordingDevice::context();
        let target = RenderTarget::new(&ctx, 320, 200).unwrap();

        target.bind();
        assert_eq!(target.state(), TargetState::Bound);
        assert_eq!(device.calls().last(), Some(&Call::Viewport(0, 0, 320, 200)));

        target.unbind();
        assert_eq!(target.state(), TargetState::Allocated);
    }

    #[test]
    fn resize_to_same_size_keeps_handles() {
        let (ctx, device, _) = RecordingDevice::context();
        let mut target = RenderTarget::new(&ctx, 800, 600).unwrap();
        let before = target.handles();
        device.clear_calls();

        target.resize(800, 600).unwrap();

        assert_eq!(target.handles(), before);
        assert!(device.calls().is_empty());
    }

    #[test]
    fn resize_replaces_every_handle() {
        let (ctx, device, _) = RecordingDevice::context();
        let mut target = RenderTarget::new(&ctx, 800, 600).unwrap();
        let before = target.handles();

        target.resize(1024, 768).unwrap();
        let after = target.handles();

        assert_ne!(after.framebuffer, before.framebuffer);
        assert_ne!(after.color, before.color);
        assert_ne!(after.depth_stencil, before.depth_stencil);
        assert!(target.is_complete());
        assert_eq!((target.width(), target.height()), (1024, 768));
        assert_eq!(device.deleted(ResourceKind::Framebuffer), vec![before.framebuffer]);
        assert_eq!(device.deleted(ResourceKind::Texture), vec![before.color]);
        assert_eq!(device.deleted(ResourceKind::Renderbuffer), vec![before.depth_stencil]);
    }

    #[test]
    fn old_objects_are_released_before_new_ones_exist() {
        let (ctx, device, _) = RecordingDevice::context();
        let mut target = RenderTarget::new(&ctx, 16, 16).unwrap();
        device.clear_calls();

        target.resize(32, 32).unwrap();

        let calls = device.calls();
        let last_delete = calls.iter().rposition(|call| matches!(call, Call::Delete(..))).unwrap();
        let first_create = calls.iter().position(|call| matches!(call, Call::Create(..))).unwrap();
        assert!(last_delete < first_create);
    }

    #[test]
    fn incomplete_target_is_reported_not_fatal() {
        let (ctx, device, sink) = RecordingDevice::context();
        device.report_incomplete(true);

        let target = RenderTarget::new(&ctx, 64, 64).unwrap();

        assert!(!target.is_complete());
        assert_eq!(target.state(), TargetState::Allocated);
        assert!(sink.contains(Level::Error, "not complete"));
    }

    #[test]
    fn failed_reallocation_leaves_nothing_live() {
        let (ctx, device, _) = RecordingDevice::context();
        let mut target = RenderTarget::new(&ctx, 64, 64).unwrap();
        device.fail_allocation(Some(ResourceKind::Renderbuffer));

        let err = target.resize(128, 128).unwrap_err();

        assert!(matches!(err, GfxError::Allocation { kind: ResourceKind::Renderbuffer, .. }));
        assert_eq!(target.handles(), TargetHandles::default());
        assert_eq!(target.state(), TargetState::Deallocated);
        // The framebuffer and texture created for the new size were released too.
        assert_eq!(device.deleted(ResourceKind::Framebuffer).len(), 2);
        assert_eq!(device.deleted(ResourceKind::Texture).len(), 2);

        device.fail_allocation(None);
        target.resize(128, 128).unwrap();
        assert_eq!(target.state(), TargetState::Allocated);
    }

    #[test]
    fn texture_allocation_errors_are_logged_not_fatal() {
        let (ctx, device, sink) = RecordingDevice::context();
        device.push_error(glow::OUT_OF_MEMORY);

        let target = RenderTarget::new(&ctx, 256, 256).unwrap();

        assert_eq!(target.state(), TargetState::Allocated);
        assert!(target.is_complete());
        assert!(sink.contains(
            Level::Error,
            "render target color allocation: GL_OUT_OF_MEMORY"
        ));
    }

    #[test]
    fn blit_reads_the_current_framebuffer() {
        let (ctx, device, _) = RecordingDevice::context();
        let mut target = RenderTarget::new(&ctx, 64, 32).unwrap();
        target.resize(128, 64).unwrap();
        let to = PixelRect::new(10, 20, 300, 150);

        target.blit_source().copy_to(ctx.device(), to);

        assert_eq!(
            device.calls().last(),
            Some(&Call::BlitColor(
                target.handles().framebuffer,
                PixelRect::new(0, 0, 128, 64),
                to
            ))
        );
    }

    #[test]
    fn blit_skips_released_targets_and_empty_rects() {
        let (ctx, device, _) = RecordingDevice::context();
        let mut target = RenderTarget::new(&ctx, 64, 64).unwrap();

        target.blit_source().copy_to(ctx.device(), PixelRect::new(0, 0, 0, 10));
        target.delete();
        target.blit_source().copy_to(ctx.device(), PixelRect::new(0, 0, 64, 64));

        assert_eq!(device.count(|call| matches!(call, Call::BlitColor(..))), 0);
    }

    #[test]
    fn color_texture_is_deleted_once_across_resizes() {
        let (ctx, device, _) = RecordingDevice::context();
        let mut target = RenderTarget::new(&ctx, 64, 64).unwrap();
        let mut textures = vec![target.color_texture()];

        for size in [96, 128, 160] {
            target.blit_source().copy_to(ctx.device(), PixelRect::new(0, 0, size, size));
            target.resize(size, size).unwrap();
            textures.push(target.color_texture());
        }
        drop(target);

        assert_eq!(device.deleted(ResourceKind::Texture), textures);
    }

    #[test]
    fn delete_twice_releases_once() {
        let (ctx, device, _) = RecordingDevice::context();
        let mut target = RenderTarget::new(&ctx, 8, 8).unwrap();

        target.delete();
        target.delete();
        drop(target);

        assert_eq!(device.deleted(ResourceKind::Framebuffer).len(), 1);
        assert_eq!(device.deleted(ResourceKind::Texture).len(), 1);
        assert_eq!(device.deleted(ResourceKind::Renderbuffer).len(), 1);
    }
}
