//! Mesh objects, UV layers and the scene container.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::Material;
use crate::image::ImageRegistry;

/// Handle of a material in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(u32);

impl MaterialId {
    /// Raw index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "material#{}", self.0)
    }
}

/// A face-corner UV parametrization: one UV per triangle corner.
///
/// UV origin is the bottom-left of the image with `v` pointing up.
#[derive(Debug, Clone, PartialEq)]
pub struct UvLayer {
    /// Layer name.
    pub name: String,
    /// UVs of each triangle's three corners, parallel to the mesh triangles.
    pub corners: Vec<[[f32; 2]; 3]>,
}

impl UvLayer {
    /// Creates a named layer.
    pub fn new(name: impl Into<String>, corners: Vec<[[f32; 2]; 3]>) -> Self {
        Self {
            name: name.into(),
            corners,
        }
    }
}

/// A triangulated mesh object.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshObject {
    /// Object name.
    pub name: String,
    /// Vertex positions in world space.
    pub positions: Vec<[f32; 3]>,
    /// Triangles as vertex indices.
    pub triangles: Vec<[u32; 3]>,
    /// UV parametrization, if any.
    pub uv: Option<UvLayer>,
    /// Material slots; a slot may be empty.
    pub material_slots: Vec<Option<MaterialId>>,
}

impl MeshObject {
    /// Creates a mesh object with no UV layer and no material slots.
    pub fn new(name: impl Into<String>, positions: Vec<[f32; 3]>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            name: name.into(),
            positions,
            triangles,
            uv: None,
            material_slots: Vec::new(),
        }
    }

    /// Sets the UV layer.
    pub fn with_uv(mut self, uv: UvLayer) -> Self {
        self.uv = Some(uv);
        self
    }

    /// Appends a material slot.
    pub fn with_material_slot(mut self, material: Option<MaterialId>) -> Self {
        self.material_slots.push(material);
        self
    }

    /// Whether the mesh has a UV parametrization.
    pub fn has_uv(&self) -> bool {
        self.uv.is_some()
    }

    /// Material assigned to the first slot, if any.
    pub fn primary_material(&self) -> Option<MaterialId> {
        self.material_slots.first().copied().flatten()
    }

    /// Corner positions of a triangle.
    ///
    /// Returns `None` if the triangle references a missing vertex.
    pub fn triangle_positions(&self, triangle: usize) -> Option<[[f32; 3]; 3]> {
        let [a, b, c] = *self.triangles.get(triangle)?;
        Some([
            *self.positions.get(a as usize)?,
            *self.positions.get(b as usize)?,
            *self.positions.get(c as usize)?,
        ])
    }
}

/// An imported scene.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Mesh objects in import order.
    pub objects: Vec<MeshObject>,
    /// Material arena. Materials are never removed.
    pub materials: Vec<Material>,
    /// Image arena.
    pub images: ImageRegistry,
}

impl Scene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a material and returns its handle.
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(material);
        id
    }

    /// Returns a material by handle.
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.index())
    }

    /// Returns a material by handle, mutably.
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.index())
    }

    /// Finds an object by name.
    pub fn object(&self, name: &str) -> Option<&MeshObject> {
        self.objects.iter().find(|o| o.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MaterialGraph;

    #[test]
    fn primary_material_reads_first_slot() {
        let mut scene = Scene::new();
        let id = scene.add_material(Material::with_graph("m", MaterialGraph::new()));

        let mesh = MeshObject::new("a", vec![], vec![]);
        assert_eq!(mesh.primary_material(), None);

        let mesh = mesh.with_material_slot(None);
        assert_eq!(mesh.primary_material(), None);

        let mesh = MeshObject::new("b", vec![], vec![]).with_material_slot(Some(id));
        assert_eq!(mesh.primary_material(), Some(id));
        assert_eq!(scene.material(id).map(|m| m.name.as_str()), Some("m"));
    }

    #[test]
    fn triangle_positions_rejects_bad_index() {
        let mesh = MeshObject::new("t", vec![[0.0; 3], [1.0, 0.0, 0.0]], vec![[0, 1, 2]]);
        assert_eq!(mesh.triangle_positions(0), None);
        assert_eq!(mesh.triangle_positions(1), None);
    }
}
