//! Flat lattice mesh displaced on the GPU by the displacement map.
//!
//! The lattice is generated once at setup and never resized. Vertex colors
//! encode the line pattern: the red channel marks line rows (or columns),
//! green/blue carry the lattice coordinates for the fragment shader.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Lattice resolution along the length (x) axis.
pub const RES_X: usize = 398;

/// Lattice resolution along the depth (z) axis.
pub const RES_Z: usize = 98;

/// World-space extent of the lattice.
pub const MESH_SIZE: Vec3 = Vec3::new(200.0, 1.0, 50.0);

/// Vertex data for the lattice mesh.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
    pub uv: [f32; 2],
}

/// Static lattice mesh with a triangle index buffer.
pub struct LatticeMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl LatticeMesh {
    /// Generate the lattice. `length_lines` selects the line-pattern
    /// orientation: every other depth row vs every other length column.
    pub fn new(length_lines: bool) -> Self {
        let mut vertices = Vec::with_capacity(RES_X * RES_Z);

        for x in 0..RES_X {
            for z in 0..RES_Z {
                let u = x as f32 / RES_X as f32;
                let v = z as f32 / RES_Z as f32;

                let position = MESH_SIZE * Vec3::new(u - 0.5, 0.0, v - 0.5);

                let on_line = if length_lines { z % 2 == 0 } else { x % 2 == 0 };
                let line = if on_line { 1.0 } else { 0.0 };

                vertices.push(Vertex {
                    position: position.to_array(),
                    normal: [0.0, 1.0, 0.0],
                    color: [line, v, u],
                    uv: [u, v],
                });
            }
        }

        let mut indices = Vec::with_capacity(6 * (RES_X - 1) * (RES_Z - 1));
        for x in 0..RES_X - 1 {
            for z in 0..RES_Z - 1 {
                let i = (x * RES_Z + z) as u32;
                let depth = RES_Z as u32;

                indices.extend_from_slice(&[i, i + 1, i + depth, i + depth, i + 1, i + depth + 1]);
            }
        }

        Self { vertices, indices }
    }

    /// Rewrite only the line-pattern colors for a new orientation.
    pub fn set_line_orientation(&mut self, length_lines: bool) {
        for x in 0..RES_X {
            for z in 0..RES_Z {
                let on_line = if length_lines { z % 2 == 0 } else { x % 2 == 0 };
                self.vertices[x * RES_Z + z].color[0] = if on_line { 1.0 } else { 0.0 };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_counts() {
        let mesh = LatticeMesh::new(true);
        assert_eq!(mesh.vertices.len(), RES_X * RES_Z);
        assert_eq!(mesh.indices.len(), 6 * (RES_X - 1) * (RES_Z - 1));
    }

    #[test]
    fn test_indices_in_bounds() {
        let mesh = LatticeMesh::new(true);
        let max = *mesh.indices.iter().max().unwrap();
        assert!((max as usize) < mesh.vertices.len());
    }

    #[test]
    fn test_lattice_extents() {
        let mesh = LatticeMesh::new(true);
        for v in &mesh.vertices {
            assert!(v.position[0] >= -MESH_SIZE.x / 2.0 && v.position[0] <= MESH_SIZE.x / 2.0);
            assert_eq!(v.position[1], 0.0);
            assert!(v.position[2] >= -MESH_SIZE.z / 2.0 && v.position[2] <= MESH_SIZE.z / 2.0);
        }
    }

    #[test]
    fn test_line_pattern_rows() {
        let mesh = LatticeMesh::new(true);
        // Length lines: even depth rows are marked, odd rows are not.
        assert_eq!(mesh.vertices[0].color[0], 1.0); // z = 0
        assert_eq!(mesh.vertices[1].color[0], 0.0); // z = 1
        assert_eq!(mesh.vertices[2].color[0], 1.0); // z = 2
    }

    #[test]
    fn test_line_pattern_columns() {
        let mesh = LatticeMesh::new(false);
        // Width lines: even length columns are marked regardless of z.
        assert_eq!(mesh.vertices[0].color[0], 1.0); // x = 0
        assert_eq!(mesh.vertices[RES_Z].color[0], 0.0); // x = 1
        assert_eq!(mesh.vertices[2 * RES_Z].color[0], 1.0); // x = 2
    }

    #[test]
    fn test_set_line_orientation_matches_fresh_mesh() {
        let mut mesh = LatticeMesh::new(true);
        mesh.set_line_orientation(false);
        let fresh = LatticeMesh::new(false);
        for (a, b) in mesh.vertices.iter().zip(fresh.vertices.iter()) {
            assert_eq!(a.color, b.color);
        }
    }

    #[test]
    fn test_uv_covers_unit_square() {
        let mesh = LatticeMesh::new(true);
        for v in &mesh.vertices {
            assert!(v.uv[0] >= 0.0 && v.uv[0] < 1.0);
            assert!(v.uv[1] >= 0.0 && v.uv[1] < 1.0);
        }
    }
}
