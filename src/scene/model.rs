use std::{collections::HashMap, fs, path::Path, sync::Arc};

use indexmap::IndexMap;
use log::{info, warn};
use nalgebra::Matrix4;
use thiserror::Error;

use super::Vertex;
use crate::{
    geometry::{WorldPoint, WorldVector},
    resource::Resource,
    util::Color,
};

/// Vertex buffer and index buffer of a single shape.
/// Every three consecutive indices form one triangle.
#[derive(Clone, Debug)]
pub struct Shape {
    pub vertex_buffer: Arc<Resource<Vertex>>,
    pub index_buffer: Arc<Resource<u32>>,
}

impl Shape {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Shape {
        Shape {
            vertex_buffer: Arc::new(Resource::from_vec(vertices)),
            index_buffer: Arc::new(Resource::from_vec(indices)),
        }
    }
}

/// Geometry source for both pipelines.
#[derive(Clone, Debug)]
pub struct Model {
    shapes: Vec<Shape>,
    world_matrix: Matrix4<f32>,
}

#[derive(Debug, Error)]
pub enum ObjOpenError {
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse file: {0}")]
    ParseError(#[from] wavefront_obj::ParseError),
}

#[derive(Copy, Clone, Debug)]
struct MaterialColors {
    ambient: Color,
    diffuse: Color,
    emissive: Color,
}

impl Default for MaterialColors {
    fn default() -> Self {
        MaterialColors {
            ambient: Color::new(0.2, 0.2, 0.2),
            diffuse: Color::new(0.8, 0.8, 0.8),
            emissive: Color::new(0.0, 0.0, 0.0),
        }
    }
}

impl Model {
    pub fn new(shapes: Vec<Shape>) -> Model {
        Model {
            shapes,
            world_matrix: Matrix4::identity(),
        }
    }

    /// Loads a Wavefront OBJ file, one shape per OBJ geometry group.
    /// Vertex colors come from the optional MTL file, matched by the group's material name.
    pub fn with_obj(
        path: impl AsRef<Path>,
        material_path: Option<&Path>,
    ) -> Result<Model, ObjOpenError> {
        let content = fs::read_to_string(path.as_ref())?;
        let parsed = wavefront_obj::obj::parse(content)?;

        let materials = match material_path {
            Some(material_path) => {
                let content = fs::read_to_string(material_path)?;
                load_mtl(wavefront_obj::mtl::parse(content)?)
            }
            None => HashMap::new(),
        };

        let model = Model::new(Self::load_obj(parsed, &materials));
        info!(
            "Loaded {:?}: {} shapes, {} triangles",
            path.as_ref(),
            model.shapes.len(),
            model.triangle_count()
        );
        Ok(model)
    }

    fn load_obj(
        obj: wavefront_obj::obj::ObjSet,
        materials: &HashMap<String, MaterialColors>,
    ) -> Vec<Shape> {
        let mut shapes = Vec::new();

        for o in obj.objects.into_iter() {
            for geometry in o.geometry {
                let colors = geometry
                    .material_name
                    .as_ref()
                    .and_then(|name| materials.get(name))
                    .copied()
                    .unwrap_or_default();

                let mut indices = Vec::new();
                let mut vertices = IndexMap::new();

                for shape in geometry.shapes {
                    let wavefront_obj::obj::Primitive::Triangle(a, b, c) = shape.primitive else {
                        warn!("Skipping non-triangle primitive in object {}", o.name);
                        continue;
                    };

                    let mut handle_vertex = |vtindex: (usize, Option<usize>, Option<usize>)| {
                        let entry = vertices.entry(vtindex);
                        let index = entry.index();
                        entry.or_insert_with(|| {
                            let vertex = &o.vertices[vtindex.0];
                            let normal = vtindex.2.map(|i| &o.normals[i]);
                            Vertex {
                                position: WorldPoint::new(
                                    vertex.x as f32,
                                    vertex.y as f32,
                                    vertex.z as f32,
                                ),
                                normal: normal.map_or_else(WorldVector::zeros, |v| {
                                    WorldVector::new(v.x as f32, v.y as f32, v.z as f32).normalize()
                                }),
                                ambient: colors.ambient,
                                diffuse: colors.diffuse,
                                emissive: colors.emissive,
                            }
                        });
                        index as u32
                    };

                    indices.push(handle_vertex(a));
                    indices.push(handle_vertex(b));
                    indices.push(handle_vertex(c));
                }

                if indices.is_empty() {
                    continue;
                }

                shapes.push(Shape::new(
                    vertices.into_iter().map(|(_k, v)| v).collect(),
                    indices,
                ));
            }
        }

        shapes
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn vertex_buffers(&self) -> Vec<Arc<Resource<Vertex>>> {
        self.shapes
            .iter()
            .map(|s| Arc::clone(&s.vertex_buffer))
            .collect()
    }

    pub fn index_buffers(&self) -> Vec<Arc<Resource<u32>>> {
        self.shapes
            .iter()
            .map(|s| Arc::clone(&s.index_buffer))
            .collect()
    }

    pub fn triangle_count(&self) -> usize {
        self.shapes.iter().map(|s| s.index_buffer.len() / 3).sum()
    }

    pub fn world_matrix(&self) -> &Matrix4<f32> {
        &self.world_matrix
    }

    pub fn set_world_matrix(&mut self, world_matrix: Matrix4<f32>) {
        self.world_matrix = world_matrix;
    }
}

fn load_mtl(mtl: wavefront_obj::mtl::MtlSet) -> HashMap<String, MaterialColors> {
    let convert = |c: &wavefront_obj::mtl::Color| Color::new(c.r as f32, c.g as f32, c.b as f32);

    mtl.materials
        .iter()
        .map(|m| {
            (
                m.name.clone(),
                MaterialColors {
                    ambient: convert(&m.color_ambient),
                    diffuse: convert(&m.color_diffuse),
                    emissive: m
                        .color_emissive
                        .as_ref()
                        .map_or_else(Color::default, convert),
                },
            )
        })
        .collect()
}
