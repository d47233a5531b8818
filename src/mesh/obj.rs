use std::{fs, path::Path};

use crate::geometry::LocalVertex;

use super::{Mesh, MeshError};

impl Mesh {
    /// Loads vertex positions and triangles of all objects in a Wavefront OBJ file.
    ///
    /// Triangles keep the vertex order produced by the parser. That order has the same
    /// winding as the face in the file, but may start at a different corner.
    pub fn with_obj(p: impl AsRef<Path>) -> Result<Mesh, MeshError> {
        let content = fs::read_to_string(p)?;
        Self::from_obj_str(&content)
    }

    pub fn from_obj_str(content: &str) -> Result<Mesh, MeshError> {
        let parsed = wavefront_obj::obj::parse(content)?;
        Self::new_from_obj(parsed)
    }

    fn new_from_obj(obj: wavefront_obj::obj::ObjSet) -> Result<Mesh, MeshError> {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for o in obj.objects.into_iter() {
            // Vertex indices in the parsed set are local to each object
            let base = vertices.len() as u32;
            vertices.extend(
                o.vertices
                    .iter()
                    .map(|v| LocalVertex::new(v.x as f32, v.y as f32, v.z as f32, 1.0)),
            );

            for geometry in o.geometry {
                for shape in geometry.shapes {
                    let wavefront_obj::obj::Primitive::Triangle(a, b, c) = shape.primitive else {
                        log::warn!("Skipping non-triangle primitive in object {:?}", o.name);
                        continue;
                    };

                    indices.push([a, b, c].map(|vtn| base + vtn.0 as u32));
                }
            }
        }

        Mesh::new(vertices, indices)
    }
}
