pub mod demo;

use crate::assets::RawTexture;
use crate::fit::{FitBounds, UvRect};
use crate::isolation::MaterialTag;
use glam::{Mat3, Vec2};
use std::collections::{BTreeSet, HashSet};

/// Creation-order handle of a mesh. Sorting by it is what keeps instance
/// indices stable across traversals of the same asset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct MeshId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
}

/// Run of index (or vertex) positions drawn with one material slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryGroup {
    pub start: usize,
    pub count: usize,
    pub material_index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub uvs: Vec<[f32; 2]>,
    pub index: Option<Vec<u32>>,
    pub groups: Vec<GeometryGroup>,
}

impl Geometry {
    /// Indexed two-triangle quad covering `rect`, drawn with a single group.
    pub fn quad(rect: UvRect) -> Self {
        Self::from_quads(&[(rect, 0)])
    }

    /// One quad per entry, each tagged with its material slot.
    pub fn from_quads(quads: &[(UvRect, usize)]) -> Self {
        let mut uvs = Vec::with_capacity(quads.len() * 4);
        let mut index = Vec::with_capacity(quads.len() * 6);
        let mut groups = Vec::with_capacity(quads.len());
        for (rect, material_index) in quads {
            let base = uvs.len() as u32;
            uvs.push([rect.min_u, rect.min_v]);
            uvs.push([rect.max_u, rect.min_v]);
            uvs.push([rect.max_u, rect.max_v]);
            uvs.push([rect.min_u, rect.max_v]);
            groups.push(GeometryGroup {
                start: index.len(),
                count: 6,
                material_index: *material_index,
            });
            index.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self {
            uvs,
            index: Some(index),
            groups,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.uvs.len()
    }

    /// UVs of the vertices drawn by `material_index`. When the geometry has
    /// no groups every vertex belongs to the slot.
    pub fn slot_uvs(&self, material_index: usize) -> Vec<Vec2> {
        if self.groups.is_empty() {
            return self.uvs.iter().map(|uv| Vec2::from(*uv)).collect();
        }
        let mut out = Vec::new();
        for group in self
            .groups
            .iter()
            .filter(|group| group.material_index == material_index)
        {
            let end = group.start.saturating_add(group.count);
            for position in group.start..end {
                let vertex = match &self.index {
                    Some(index) => match index.get(position) {
                        Some(vertex) => *vertex as usize,
                        None => continue,
                    },
                    None => position,
                };
                if let Some(uv) = self.uvs.get(vertex) {
                    out.push(Vec2::from(*uv));
                }
            }
        }
        out
    }
}

/// Image bound to a material slot, with its own UV transform.
#[derive(Debug, Clone)]
pub struct Texture {
    pub image: RawTexture,
    pub wrap: WrapMode,
    pub offset: Vec2,
    pub repeat: Vec2,
    pub matrix: Mat3,
    /// When set, `uv_matrix` is derived from offset/repeat and `matrix` is ignored.
    pub matrix_auto_update: bool,
    pub fit: Option<FitBounds>,
}

impl Texture {
    pub fn new(image: RawTexture) -> Self {
        Self {
            image,
            wrap: WrapMode::ClampToEdge,
            offset: Vec2::ZERO,
            repeat: Vec2::ONE,
            matrix: Mat3::IDENTITY,
            matrix_auto_update: true,
            fit: None,
        }
    }

    pub fn uv_matrix(&self) -> Mat3 {
        if self.matrix_auto_update {
            Mat3::from_translation(self.offset) * Mat3::from_scale(self.repeat)
        } else {
            self.matrix
        }
    }

    /// Texture-space coordinate actually sampled for a mesh UV, after the
    /// transform and the wrap mode.
    pub fn sample_coord(&self, uv: Vec2) -> Vec2 {
        let coord = self.uv_matrix().transform_point2(uv);
        match self.wrap {
            WrapMode::ClampToEdge => coord.clamp(Vec2::ZERO, Vec2::ONE),
            WrapMode::Repeat => Vec2::new(coord.x.rem_euclid(1.0), coord.y.rem_euclid(1.0)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialUserData {
    pub tags: BTreeSet<MaterialTag>,
    /// Color the material had before it was first isolated.
    pub original_color: Option<[f32; 3]>,
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub color: [f32; 3],
    pub visible: bool,
    pub roughness: f32,
    pub metalness: f32,
    pub map: Option<Texture>,
    pub user_data: MaterialUserData,
    /// Bumped whenever the host must re-upload this material.
    pub version: u32,
}

impl Material {
    pub fn new(name: &str, color: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            color,
            visible: true,
            roughness: 0.5,
            metalness: 0.0,
            map: None,
            user_data: MaterialUserData::default(),
            version: 0,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub id: MeshId,
    pub name: String,
    pub geometry: Option<Geometry>,
    /// A single-material mesh has exactly one slot.
    pub slots: Vec<MaterialId>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub mesh: Option<MeshId>,
    pub children: Vec<NodeId>,
}

/// Loaded mesh hierarchy handed over by the host. Materials live in one
/// arena so several mesh slots can share a single material entry.
#[derive(Debug, Clone, Default)]
pub struct ModelRoot {
    pub name: String,
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
}

impl ModelRoot {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn add_group(&mut self, parent: Option<NodeId>, name: &str) -> NodeId {
        self.push_node(
            parent,
            Node {
                name: name.to_string(),
                mesh: None,
                children: Vec::new(),
            },
        )
    }

    pub fn add_mesh(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        geometry: Option<Geometry>,
        slots: Vec<MaterialId>,
    ) -> MeshId {
        let id = MeshId(self.meshes.len() as u32);
        self.meshes.push(Mesh {
            id,
            name: name.to_string(),
            geometry,
            slots,
        });
        self.push_node(
            parent,
            Node {
                name: name.to_string(),
                mesh: Some(id),
                children: Vec::new(),
            },
        );
        id
    }

    fn push_node(&mut self, parent: Option<NodeId>, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        match parent.and_then(|parent| self.nodes.get_mut(parent.0)) {
            Some(parent) => parent.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Meshes in depth-first scene order, each visited once.
    pub fn traverse_meshes(&self) -> Vec<MeshId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id.0) else {
                continue;
            };
            if let Some(mesh) = node.mesh {
                out.push(mesh);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0 as usize)
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn slot_material(&self, mesh: MeshId, slot: usize) -> Option<MaterialId> {
        self.mesh(mesh).and_then(|mesh| mesh.slots.get(slot).copied())
    }

    pub fn set_slot_material(&mut self, mesh: MeshId, slot: usize, material: MaterialId) -> bool {
        match self
            .meshes
            .get_mut(mesh.0 as usize)
            .and_then(|mesh| mesh.slots.get_mut(slot))
        {
            Some(entry) => {
                *entry = material;
                true
            }
            None => false,
        }
    }

    /// Every material name reachable from a mesh slot, sorted and de-duplicated.
    pub fn all_material_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names: Vec<String> = self
            .traverse_meshes()
            .into_iter()
            .filter_map(|id| self.mesh(id))
            .flat_map(|mesh| mesh.slots.iter())
            .filter_map(|id| self.material(*id))
            .filter(|material| seen.insert(material.name.clone()))
            .map(|material| material.name.clone())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::{Geometry, Material, ModelRoot, Texture, WrapMode};
    use crate::assets::RawTexture;
    use crate::fit::UvRect;
    use glam::Vec2;

    fn rect(min_u: f32, min_v: f32, max_u: f32, max_v: f32) -> UvRect {
        UvRect {
            min_u,
            min_v,
            max_u,
            max_v,
        }
    }

    #[test]
    fn traversal_is_depth_first_not_creation_order() {
        let mut root = ModelRoot::new("car");
        let group = root.add_group(None, "Chassis");
        let a = root.add_mesh(None, "A", None, Vec::new());
        let b = root.add_mesh(Some(group), "B", None, Vec::new());
        assert_eq!(root.traverse_meshes(), vec![b, a]);
    }

    #[test]
    fn slot_uvs_follow_groups() {
        let geometry = Geometry::from_quads(&[
            (rect(0.0, 0.0, 0.5, 0.5), 0),
            (rect(0.6, 0.6, 0.9, 0.8), 1),
        ]);
        let uvs = geometry.slot_uvs(1);
        assert_eq!(uvs.len(), 6);
        assert!(uvs.iter().all(|uv| uv.x >= 0.6 && uv.y >= 0.6));
        assert!(geometry.slot_uvs(2).is_empty());
    }

    #[test]
    fn slot_uvs_without_groups_use_everything() {
        let mut geometry = Geometry::quad(rect(0.1, 0.1, 0.2, 0.2));
        geometry.groups.clear();
        assert_eq!(geometry.slot_uvs(3).len(), 4);
    }

    #[test]
    fn material_names_are_sorted_and_unique() {
        let mut root = ModelRoot::new("car");
        let logo = root.add_material(Material::new("Logo", [1.0, 1.0, 1.0]));
        let capa = root.add_material(Material::new("Capa", [0.4, 0.4, 0.4]));
        root.add_mesh(None, "Body", None, vec![logo, capa]);
        root.add_mesh(None, "Rear", None, vec![logo]);
        assert_eq!(root.all_material_names(), vec!["Capa", "Logo"]);
    }

    #[test]
    fn clamp_wrap_keeps_samples_in_unit_square() {
        let mut texture = Texture::new(RawTexture::solid("white", 2, 2, [255; 4]));
        texture.repeat = Vec2::splat(4.0);
        assert_eq!(texture.sample_coord(Vec2::new(0.9, 0.9)), Vec2::ONE);
        texture.wrap = WrapMode::Repeat;
        let wrapped = texture.sample_coord(Vec2::new(0.3, 0.3));
        assert!((wrapped.x - 0.2).abs() < 1e-5);
    }
}
