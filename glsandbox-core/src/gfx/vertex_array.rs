//! Vertex layout objects.
//!
//! A [`VertexArray`] records how buffer bytes map onto shader inputs. The
//! recording calls only make sense while the array is bound, so they live on
//! [`BoundVertexArray`], which can only be obtained from [`VertexArray::bind`].

use std::rc::Rc;

use super::{
    AttribType, BindSlot, DrawMode, GfxError, GpuContext, IndexBuffer, RawHandle, ResourceKind,
    VertexBuffer,
};

/// How one vertex input reads from a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttribBinding {
    /// Shader input location.
    pub slot: u32,
    /// Components per vertex, 1 to 4.
    pub components: i32,
    pub kind: AttribType,
    /// Distance between consecutive vertices in bytes.
    pub stride: i32,
    /// Offset of the first component in bytes.
    pub offset: i32,
}

impl AttribBinding {
    /// A float attribute of `components` values.
    pub fn floats(slot: u32, components: i32, stride: i32, offset: i32) -> Self {
        Self {
            slot,
            components,
            kind: AttribType::Float,
            stride,
            offset,
        }
    }

    fn validate(&self) {
        assert!(
            (1..=4).contains(&self.components),
            "attribute {} has {} components, expected 1 to 4",
            self.slot,
            self.components
        );
        assert!(
            self.stride >= 0 && self.offset >= 0,
            "attribute {} has a negative stride or offset",
            self.slot
        );
        let size = self.components * self.kind.size() as i32;
        assert!(
            self.stride == 0 || self.offset + size <= self.stride,
            "attribute {} reads past the end of its vertex",
            self.slot
        );
    }
}

/// Owns one vertex array object.
pub struct VertexArray {
    ctx: Rc<GpuContext>,
    handle: RawHandle,
}

impl VertexArray {
    pub fn new(ctx: &Rc<GpuContext>) -> Result<Self, GfxError> {
        let handle = ctx.create(ResourceKind::VertexArray)?;
        ctx.diagnostics()
            .debug(format_args!("Vertex array {handle} created"));
        Ok(Self {
            ctx: Rc::clone(ctx),
            handle,
        })
    }

    /// Makes this array current and returns the token that allows recording
    /// attributes and drawing.
    pub fn bind(&self) -> BoundVertexArray<'_> {
        self.ctx.bind(BindSlot::VertexArray, self.handle);
        BoundVertexArray { vao: self }
    }

    /// Clears the vertex array binding.
    pub fn unbind(&self) {
        self.ctx.unbind(BindSlot::VertexArray);
    }

    /// Releases the array. Further calls do nothing.
    pub fn delete(&mut self) {
        if self.handle == 0 {
            return;
        }
        self.ctx.delete(ResourceKind::VertexArray, BindSlot::VertexArray, self.handle);
        self.handle = 0;
    }

    pub fn handle(&self) -> RawHandle {
        self.handle
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        self.delete();
    }
}

/// Proof that a [`VertexArray`] is the current layout object.
pub struct BoundVertexArray<'a> {
    vao: &'a VertexArray,
}

impl BoundVertexArray<'_> {
    /// Points `binding.slot` of the bound array at the bytes of `buffer`.
    ///
    /// The buffer is bound for the duration of the call and unbound again;
    /// the vertex array keeps the association.
    ///
    /// # Panics
    ///
    /// Panics if the binding describes an impossible layout or another
    /// vertex array was bound since this token was created.
    pub fn link_attrib(&self, buffer: &VertexBuffer, binding: AttribBinding) {
        binding.validate();
        self.assert_still_bound();
        if buffer.handle() == 0 {
            return;
        }

        buffer.bind();
        debug_assert!(buffer.is_bound());
        let device = self.vao.ctx.device();
        device.attrib_pointer(&binding);
        device.enable_attrib(binding.slot);
        buffer.unbind();
    }

    /// Draws `count` indices from the element buffer captured by this array.
    ///
    /// # Panics
    ///
    /// Panics if another vertex array was bound since this token was created
    /// or `count` does not fit the driver's signed count.
    pub fn draw_elements(&self, mode: DrawMode, count: usize) {
        if self.vao.handle == 0 {
            return;
        }
        self.assert_still_bound();
        let Ok(count) = i32::try_from(count) else {
            panic!("{count} indices exceed the largest indexed draw");
        };
        self.vao.ctx.device().draw_indexed(mode, count, 0);
    }

    /// Draws every index of `indices`.
    pub fn draw(&self, mode: DrawMode, indices: &IndexBuffer) {
        self.draw_elements(mode, indices.count());
    }

    /// Clears the vertex array binding, consuming the token.
    pub fn unbind(self) {
        self.vao.unbind();
    }

    fn assert_still_bound(&self) {
        assert!(
            self.vao.ctx.is_bound(BindSlot::VertexArray, self.vao.handle),
            "vertex array {} is no longer bound",
            self.vao.handle
        );
    }
}
