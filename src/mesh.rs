//! Indexed triangle meshes.
//!
//! A [`Mesh`] keeps the attribute pools (positions, normals, texture
//! coordinates) separate and lets every [`FaceElement`] pick one entry from
//! each, the way OBJ files do. Elements are identified by their indices, so
//! two corners sharing a position but not a normal are distinct.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;

use crate::error::{RenderError, Result};
use crate::math::{Vec2, Vec3, Vec4};

/// Object-space position with homogeneous weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vertex {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, w: 1.0 }
    }

    pub const fn with_weight(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, self.w)
    }
}

/// Texture coordinate; `v` and `w` default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TexCoord {
    pub u: f32,
    pub v: f32,
    pub w: f32,
}

impl TexCoord {
    pub const fn new(u: f32, v: f32) -> Self {
        Self { u, v, w: 0.0 }
    }

    pub fn uv(&self) -> Vec2 {
        Vec2::new(self.u, self.v)
    }
}

/// One corner of a face: indices into the mesh attribute pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceElement {
    pub vertex: usize,
    pub texcoord: Option<usize>,
    pub normal: Option<usize>,
}

impl FaceElement {
    pub const fn new(vertex: usize) -> Self {
        Self {
            vertex,
            texcoord: None,
            normal: None,
        }
    }

    pub const fn with_texcoord(mut self, texcoord: usize) -> Self {
        self.texcoord = Some(texcoord);
        self
    }

    pub const fn with_normal(mut self, normal: usize) -> Self {
        self.normal = Some(normal);
        self
    }
}

/// A triangle: exactly three face elements, counter-clockwise when seen
/// from the front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Face {
    pub elements: [FaceElement; 3],
}

impl Face {
    pub const fn new(a: FaceElement, b: FaceElement, c: FaceElement) -> Self {
        Self {
            elements: [a, b, c],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    normals: Vec<Vec3>,
    texcoords: Vec<TexCoord>,
    faces: Vec<Face>,
    /// Faces referencing each distinct element.
    adjacency: HashMap<FaceElement, Vec<usize>>,
}

impl Mesh {
    /// Builds a mesh, validating every index against its pool.
    pub fn new(
        vertices: Vec<Vertex>,
        normals: Vec<Vec3>,
        texcoords: Vec<TexCoord>,
        faces: Vec<Face>,
    ) -> Result<Self> {
        for (face_index, face) in faces.iter().enumerate() {
            for element in &face.elements {
                let in_range = element.vertex < vertices.len()
                    && element.normal.is_none_or(|n| n < normals.len())
                    && element.texcoord.is_none_or(|t| t < texcoords.len());
                if !in_range {
                    return Err(RenderError::InvalidMesh(format!(
                        "face {face_index} references {element:?} outside the attribute pools \
                         ({} vertices, {} normals, {} texcoords)",
                        vertices.len(),
                        normals.len(),
                        texcoords.len()
                    )));
                }
            }
        }

        Ok(Self::assemble(vertices, normals, texcoords, faces))
    }

    fn assemble(
        vertices: Vec<Vertex>,
        normals: Vec<Vec3>,
        texcoords: Vec<TexCoord>,
        faces: Vec<Face>,
    ) -> Self {
        let mut adjacency: HashMap<FaceElement, Vec<usize>> = HashMap::new();
        for (face_index, face) in faces.iter().enumerate() {
            for element in face.elements {
                adjacency.entry(element).or_default().push(face_index);
            }
        }

        Self {
            vertices,
            normals,
            texcoords,
            faces,
            adjacency,
        }
    }

    /// Builds a mesh from polygons, fan-triangulating each one as
    /// `(e0, ei, ei+1)`.
    pub fn from_polygons(
        vertices: Vec<Vertex>,
        normals: Vec<Vec3>,
        texcoords: Vec<TexCoord>,
        polygons: &[Vec<FaceElement>],
    ) -> Result<Self> {
        let mut faces = Vec::with_capacity(polygons.len() * 2);
        for (index, polygon) in polygons.iter().enumerate() {
            if polygon.len() < 3 {
                return Err(RenderError::InvalidMesh(format!(
                    "polygon {index} has only {} elements",
                    polygon.len()
                )));
            }
            fan_triangulate(polygon, &mut faces);
        }
        Self::new(vertices, normals, texcoords, faces)
    }

    /// Loads a Wavefront OBJ file. Polygons are triangulated and all objects
    /// in the file are merged into one mesh.
    pub fn from_obj<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: false,
            ..Default::default()
        };
        let (models, _materials) =
            tobj::load_obj(path, &options).map_err(|source| RenderError::MeshLoad {
                path: path.to_path_buf(),
                source,
            })?;

        let mut vertices = Vec::new();
        let mut normals = Vec::new();
        let mut texcoords = Vec::new();
        let mut faces = Vec::new();

        for model in &models {
            let mesh = &model.mesh;
            let vertex_base = vertices.len();
            let normal_base = normals.len();
            let texcoord_base = texcoords.len();

            vertices.extend(
                mesh.positions
                    .chunks_exact(3)
                    .map(|p| Vertex::new(p[0], p[1], p[2])),
            );
            normals.extend(
                mesh.normals
                    .chunks_exact(3)
                    .map(|n| Vec3::new(n[0], n[1], n[2])),
            );
            texcoords.extend(
                mesh.texcoords
                    .chunks_exact(2)
                    .map(|t| TexCoord::new(t[0], t[1])),
            );

            let element = |i: usize| FaceElement {
                vertex: vertex_base + mesh.indices[i] as usize,
                texcoord: mesh
                    .texcoord_indices
                    .get(i)
                    .map(|&t| texcoord_base + t as usize),
                normal: mesh
                    .normal_indices
                    .get(i)
                    .map(|&n| normal_base + n as usize),
            };
            for i in (0..mesh.indices.len() / 3).map(|tri| tri * 3) {
                faces.push(Face::new(element(i), element(i + 1), element(i + 2)));
            }
            debug!(
                "obj object '{}': {} triangles",
                model.name,
                mesh.indices.len() / 3
            );
        }

        info!(
            "loaded {}: {} vertices, {} faces",
            path.display(),
            vertices.len(),
            faces.len()
        );
        Self::new(vertices, normals, texcoords, faces)
    }

    /// Axis-aligned cube of side 1 centred on the origin, with one normal
    /// per side and a full `[0, 1]²` texture on each side.
    pub fn cube() -> Self {
        let vertices = vec![
            Vertex::new(-0.5, -0.5, -0.5),
            Vertex::new(0.5, -0.5, -0.5),
            Vertex::new(0.5, 0.5, -0.5),
            Vertex::new(-0.5, 0.5, -0.5),
            Vertex::new(-0.5, -0.5, 0.5),
            Vertex::new(0.5, -0.5, 0.5),
            Vertex::new(0.5, 0.5, 0.5),
            Vertex::new(-0.5, 0.5, 0.5),
        ];
        let normals = vec![
            Vec3::FORWARD,
            -Vec3::FORWARD,
            Vec3::RIGHT,
            -Vec3::RIGHT,
            Vec3::UP,
            -Vec3::UP,
        ];
        let texcoords = vec![
            TexCoord::new(0.0, 0.0),
            TexCoord::new(1.0, 0.0),
            TexCoord::new(1.0, 1.0),
            TexCoord::new(0.0, 1.0),
        ];
        // Counter-clockwise seen from outside, in the same order as `normals`
        let quads: [[usize; 4]; 6] = [
            [4, 5, 6, 7],
            [1, 0, 3, 2],
            [1, 2, 6, 5],
            [0, 4, 7, 3],
            [3, 7, 6, 2],
            [0, 1, 5, 4],
        ];
        let mut faces = Vec::with_capacity(12);
        for (side, quad) in quads.iter().enumerate() {
            let polygon: Vec<FaceElement> = quad
                .iter()
                .enumerate()
                .map(|(corner, &v)| FaceElement::new(v).with_texcoord(corner).with_normal(side))
                .collect();
            fan_triangulate(&polygon, &mut faces);
        }

        Self::assemble(vertices, normals, texcoords, faces)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn texcoords(&self) -> &[TexCoord] {
        &self.texcoords
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn adjacency(&self) -> &HashMap<FaceElement, Vec<usize>> {
        &self.adjacency
    }

    /// Indices of the faces that reference `element`.
    pub fn faces_of(&self, element: &FaceElement) -> &[usize] {
        self.adjacency.get(element).map_or(&[], Vec::as_slice)
    }

    pub fn position(&self, element: &FaceElement) -> Vec3 {
        self.vertices[element.vertex].position()
    }

    /// Texture coordinate of an element, or `(0, 0)` when it has none.
    pub fn uv(&self, element: &FaceElement) -> Vec2 {
        element
            .texcoord
            .map_or(Vec2::ZERO, |t| self.texcoords[t].uv())
    }

    /// Unit object-space normal of a face, from the cross product of its edges.
    pub fn face_normal(&self, face: &Face) -> Vec3 {
        let [a, b, c] = face.elements.map(|e| self.position(&e));
        (b - a).cross(c - a).normalize()
    }

    /// Object-space normal of an element: the supplied one, or the mean of
    /// the adjacent face normals when absent or when `force` is set.
    pub fn element_normal(&self, element: &FaceElement, force: bool) -> Result<Vec3> {
        if let (Some(n), false) = (element.normal, force) {
            return Ok(self.normals[n]);
        }
        let adjacent = self.faces_of(element);
        if adjacent.is_empty() {
            return Err(RenderError::OrphanElement { element: *element });
        }
        let sum = adjacent
            .iter()
            .fold(Vec3::ZERO, |acc, &f| acc + self.face_normal(&self.faces[f]));
        Ok(sum / adjacent.len() as f32)
    }
}

/// Splits a convex polygon into the triangles `(e0, ei, ei+1)`.
fn fan_triangulate(polygon: &[FaceElement], faces: &mut Vec<Face>) {
    if let Some((&first, rest)) = polygon.split_first() {
        for pair in rest.windows(2) {
            faces.push(Face::new(first, pair[0], pair[1]));
        }
    }
}

/// A mesh together with the object-space normal of every distinct element.
///
/// Rebuilt whenever the mesh or the force-recalculation flag changes.
#[derive(Debug, Clone)]
pub struct PreparedMesh {
    mesh: Arc<Mesh>,
    normals: HashMap<FaceElement, Vec3>,
    forced_normals: bool,
}

impl PreparedMesh {
    pub fn new(mesh: Arc<Mesh>, force_normals: bool) -> Result<Self> {
        let normals = mesh
            .adjacency
            .par_iter()
            .map(|(element, _)| Ok((*element, mesh.element_normal(element, force_normals)?)))
            .collect::<Result<HashMap<_, _>>>()?;
        debug!(
            "prepared {} element normals (forced: {force_normals})",
            normals.len()
        );
        Ok(Self {
            mesh,
            normals,
            forced_normals: force_normals,
        })
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn forced_normals(&self) -> bool {
        self.forced_normals
    }

    pub fn object_normal(&self, element: &FaceElement) -> Result<Vec3> {
        self.normals
            .get(element)
            .copied()
            .ok_or(RenderError::MissingNormal { element: *element })
    }
}
