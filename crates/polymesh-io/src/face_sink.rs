//! Appending polygons to meshes with fixed or variable face arity.

use polymesh_core::{FaceArity, FaceIndex, Mesh, VertexIndex};

use crate::error::{MeshIoError, Result};

/// Where polygons read from a file end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceSink {
    /// Faces have exactly `n` vertices. Larger polygons are fan-triangulated
    /// when `n` is 3.
    FixedArity(usize),
    VariableArity,
}

/// One face created from an input polygon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendedFace {
    pub face: FaceIndex,
    /// For each corner of the face, its position in the input polygon.
    pub corners: Vec<usize>,
}

impl FaceSink {
    /// The sink matching the mesh's face arity, if the mesh stores faces.
    pub fn for_mesh(mesh: &Mesh) -> Option<Self> {
        mesh.face_arity().map(|arity| match arity {
            FaceArity::Fixed(n) => FaceSink::FixedArity(n),
            FaceArity::Variable => FaceSink::VariableArity,
        })
    }

    /// Appends the polygon `indices`, splitting it into a triangle fan when the
    /// mesh only stores triangles.
    ///
    /// Indices are validated before anything is appended, so a bad polygon
    /// leaves the mesh untouched.
    ///
    /// # Errors
    ///
    /// `MalformedFile` when an index is not an existing vertex, when the
    /// polygon has fewer than three vertices, or when it cannot be split to
    /// the fixed arity.
    pub fn append_triangulated(&self, mesh: &mut Mesh, indices: &[u32]) -> Result<Vec<AppendedFace>> {
        let count = mesh.vertex_count();
        if let Some(bad) = indices.iter().find(|i| **i as usize >= count) {
            return Err(MeshIoError::malformed(format!(
                "Bad vertex index {bad} for face {}",
                mesh.face_count()
            )));
        }
        if indices.len() < 3 {
            return Err(MeshIoError::malformed(format!(
                "Face {} has only {} vertices",
                mesh.face_count(),
                indices.len()
            )));
        }

        let split = match *self {
            FaceSink::VariableArity => false,
            FaceSink::FixedArity(n) if n == indices.len() => false,
            FaceSink::FixedArity(3) => true,
            FaceSink::FixedArity(n) => {
                return Err(MeshIoError::malformed(format!(
                    "Cannot store a {}-vertex polygon in a mesh of {}-vertex faces",
                    indices.len(),
                    n
                )))
            }
        };

        if !split {
            let vertices: Vec<VertexIndex> = indices.iter().map(|i| VertexIndex(*i)).collect();
            let face = mesh.add_face(&vertices)?;
            return Ok(vec![AppendedFace {
                face,
                corners: (0..indices.len()).collect(),
            }]);
        }

        fan_triangles(indices.len())
            .map(|tri| -> Result<AppendedFace> {
                let vertices = tri.map(|c| VertexIndex(indices[c]));
                let face = mesh.add_face(&vertices)?;
                Ok(AppendedFace {
                    face,
                    corners: tri.to_vec(),
                })
            })
            .collect()
    }
}

/// Corner triples `(0, i, i + 1)` splitting an `n`-gon into `n - 2` triangles.
pub fn fan_triangles(n: usize) -> impl Iterator<Item = [usize; 3]> {
    (1..n.saturating_sub(1)).map(|i| [0, i, i + 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mesh_with(mut mesh: Mesh, vertices: usize) -> Mesh {
        mesh.add_vertices(vertices);
        mesh
    }

    #[test]
    fn test_quad_into_triangles() {
        let mut mesh = mesh_with(Mesh::triangle_mesh(), 4);
        let sink = FaceSink::for_mesh(&mesh).unwrap();
        assert_eq!(sink, FaceSink::FixedArity(3));

        let faces = sink.append_triangulated(&mut mesh, &[0, 1, 2, 3]).unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(mesh.face_vertices(FaceIndex(0)), &[VertexIndex(0), VertexIndex(1), VertexIndex(2)]);
        assert_eq!(mesh.face_vertices(FaceIndex(1)), &[VertexIndex(0), VertexIndex(2), VertexIndex(3)]);
        assert_eq!(faces[1].corners, vec![0, 2, 3]);
    }

    #[test]
    fn test_polygon_mesh_keeps_polygons() {
        let mut mesh = mesh_with(Mesh::polygon_mesh(), 5);
        let sink = FaceSink::for_mesh(&mesh).unwrap();
        let faces = sink.append_triangulated(&mut mesh, &[4, 3, 2, 1, 0]).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(mesh.face_vertices(faces[0].face).len(), 5);
    }

    #[test]
    fn test_rejects_bad_polygons() {
        let mut mesh = mesh_with(Mesh::triangle_mesh(), 3);
        let sink = FaceSink::FixedArity(3);
        assert!(sink.append_triangulated(&mut mesh, &[0, 1, 3]).unwrap_err().is_malformed());
        assert!(sink.append_triangulated(&mut mesh, &[0, 1]).unwrap_err().is_malformed());
        assert_eq!(mesh.face_count(), 0);

        let quads = FaceSink::FixedArity(4);
        assert!(quads.append_triangulated(&mut mesh, &[0, 1, 2]).is_err());
    }

    #[test]
    fn test_point_cloud_has_no_sink() {
        assert_eq!(FaceSink::for_mesh(&Mesh::point_cloud()), None);
    }

    proptest! {
        #[test]
        fn prop_fan_shares_first_vertex(n in 3usize..40) {
            let mut mesh = mesh_with(Mesh::triangle_mesh(), n);
            let indices: Vec<u32> = (0..n as u32).rev().collect();
            let faces = FaceSink::FixedArity(3).append_triangulated(&mut mesh, &indices).unwrap();
            prop_assert_eq!(faces.len(), n - 2);
            prop_assert_eq!(mesh.face_count(), n - 2);
            for (k, f) in faces.iter().enumerate() {
                let vs = mesh.face_vertices(f.face);
                prop_assert_eq!(vs[0], VertexIndex(indices[0]));
                prop_assert_eq!(vs[1], VertexIndex(indices[k + 1]));
                prop_assert_eq!(vs[2], VertexIndex(indices[k + 2]));
            }
        }

        #[test]
        fn prop_out_of_range_leaves_mesh_untouched(n in 3usize..20, bad in 0usize..20) {
            let mut mesh = mesh_with(Mesh::triangle_mesh(), n);
            let mut indices: Vec<u32> = (0..n as u32).collect();
            let at = bad % n;
            indices[at] = n as u32 + bad as u32;
            prop_assert!(FaceSink::FixedArity(3).append_triangulated(&mut mesh, &indices).is_err());
            prop_assert_eq!(mesh.face_count(), 0);
        }
    }
}
