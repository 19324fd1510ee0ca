//! Geometry drawn by the sandbox.

use std::rc::Rc;

use glsandbox_core::gfx::{
    AttribBinding, DrawMode, GfxError, GpuContext, IndexBuffer, VertexArray, VertexBuffer,
};

const FLOAT_SIZE: i32 = std::mem::size_of::<f32>() as i32;

/// Position and color of the pyramid's corners.
#[rustfmt::skip]
pub const PYRAMID_VERTICES: [[f32; 6]; 5] = [
    // position          color
    [-0.5, 0.0,  0.5,    1.0, 0.0, 0.0],
    [-0.5, 0.0, -0.5,    0.0, 1.0, 0.0],
    [ 0.5, 0.0, -0.5,    0.0, 0.0, 1.0],
    [ 0.5, 0.0,  0.5,    1.0, 1.0, 1.0],
    [ 0.0, 0.8,  0.0,    1.0, 1.0, 0.0],
];

#[rustfmt::skip]
pub const PYRAMID_INDICES: [u32; 18] = [
    0, 1, 2,
    0, 2, 3,
    0, 1, 4,
    1, 2, 4,
    2, 3, 4,
    3, 0, 4,
];

/// An indexed mesh with its own vertex array.
pub struct Mesh {
    vertex_array: VertexArray,
    // Kept alive for the vertex array, which references both buffers.
    _vertices: VertexBuffer,
    indices: IndexBuffer,
    mode: DrawMode,
}

impl Mesh {
    pub fn new<V: bytemuck::Pod>(
        ctx: &Rc<GpuContext>,
        vertices: &[V],
        layout: &[AttribBinding],
        indices: &[u32],
        mode: DrawMode,
    ) -> Result<Self, GfxError> {
        let vertex_array = VertexArray::new(ctx)?;
        let bound = vertex_array.bind();
        let vertex_buffer = VertexBuffer::from_slice(ctx, vertices)?;
        // Created while the array is bound, so the array captures it.
        let index_buffer = IndexBuffer::new(ctx, indices)?;

        for binding in layout {
            bound.link_attrib(&vertex_buffer, *binding);
        }

        bound.unbind();
        vertex_buffer.unbind();
        index_buffer.unbind();

        Ok(Self {
            vertex_array,
            _vertices: vertex_buffer,
            indices: index_buffer,
            mode,
        })
    }

    pub fn draw(&self) {
        self.vertex_array.bind().draw(self.mode, &self.indices);
    }
}

/// The colored pyramid: position at location 0, color at location 1.
pub fn pyramid(ctx: &Rc<GpuContext>) -> Result<Mesh, GfxError> {
    let stride = 6 * FLOAT_SIZE;
    Mesh::new(
        ctx,
        &PYRAMID_VERTICES,
        &[
            AttribBinding::floats(0, 3, stride, 0),
            AttribBinding::floats(1, 3, stride, 3 * FLOAT_SIZE),
        ],
        &PYRAMID_INDICES,
        DrawMode::Triangles,
    )
}

const GRID_LINE: [f32; 3] = [0.45, 0.45, 0.45];
const GRID_X_AXIS: [f32; 3] = [0.9, 0.25, 0.25];
const GRID_Y_AXIS: [f32; 3] = [0.25, 0.9, 0.25];

/// Line vertices `[x, y, r, g, b]` of a square grid centered on the origin
/// with `2 * half_lines + 1` lines per direction. The lines through the
/// origin are colored as axes.
pub fn grid_vertices(half_lines: u32, spacing: f32) -> (Vec<[f32; 5]>, Vec<u32>) {
    let extent = half_lines as f32 * spacing;
    let half_lines = half_lines as i32;
    let mut vertices = Vec::new();

    for i in -half_lines..=half_lines {
        let offset = i as f32 * spacing;
        let (vertical, horizontal) = if i == 0 {
            (GRID_Y_AXIS, GRID_X_AXIS)
        } else {
            (GRID_LINE, GRID_LINE)
        };
        for (x, y, color) in [
            (offset, -extent, vertical),
            (offset, extent, vertical),
            (-extent, offset, horizontal),
            (extent, offset, horizontal),
        ] {
            vertices.push([x, y, color[0], color[1], color[2]]);
        }
    }

    let indices = (0..vertices.len() as u32).collect();
    (vertices, indices)
}

/// The flat grid shown in 2D mode: position at location 0, color at location 1.
pub fn grid(ctx: &Rc<GpuContext>, half_lines: u32, spacing: f32) -> Result<Mesh, GfxError> {
    let (vertices, indices) = grid_vertices(half_lines, spacing);
    let stride = 5 * FLOAT_SIZE;
    Mesh::new(
        ctx,
        &vertices,
        &[
            AttribBinding::floats(0, 2, stride, 0),
            AttribBinding::floats(1, 3, stride, 2 * FLOAT_SIZE),
        ],
        &indices,
        DrawMode::Lines,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pyramid_indices_reference_existing_vertices() {
        assert_eq!(PYRAMID_INDICES.len() % 3, 0);
        assert!(
            PYRAMID_INDICES
                .iter()
                .all(|&index| (index as usize) < PYRAMID_VERTICES.len())
        );
    }

    #[test]
    fn grid_has_two_lines_per_step() {
        let (vertices, indices) = grid_vertices(3, 10.0);

        // 7 vertical and 7 horizontal lines, two vertices each.
        assert_eq!(vertices.len(), 28);
        assert_eq!(indices.len(), 28);
        assert!(vertices.iter().all(|v| v[0].abs() <= 30.0 && v[1].abs() <= 30.0));
    }

    #[test]
    fn lines_through_the_origin_are_axes() {
        let (vertices, _) = grid_vertices(2, 1.0);

        let y_axis: Vec<_> = vertices
            .iter()
            .filter(|v| v[0] == 0.0 && v[1].abs() == 2.0)
            .collect();
        assert_eq!(y_axis.len(), 2);
        assert!(y_axis.iter().all(|v| v[2..] == GRID_Y_AXIS));

        let x_axis: Vec<_> = vertices
            .iter()
            .filter(|v| v[1] == 0.0 && v[0].abs() == 2.0)
            .collect();
        assert_eq!(x_axis.len(), 2);
        assert!(x_axis.iter().all(|v| v[2..] == GRID_X_AXIS));
    }
}
