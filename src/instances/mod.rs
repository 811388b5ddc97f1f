use crate::roles::RoleTable;
use crate::scene::{Geometry, MaterialId, MeshId, ModelRoot};
use sha2::{Digest, Sha256};

/// One (mesh, material slot) pair matching a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instance {
    pub mesh: MeshId,
    pub slot: usize,
    pub material: MaterialId,
}

/// Identity of an instance. The material is not part of it: isolation
/// swaps the material while the logical target stays the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    pub mesh: MeshId,
    pub slot: usize,
}

impl Instance {
    pub fn key(&self) -> InstanceKey {
        InstanceKey {
            mesh: self.mesh,
            slot: self.slot,
        }
    }
}

/// Every instance of `role`, ordered by (mesh creation order, slot).
pub fn list_instances(root: &ModelRoot, roles: &RoleTable, role: &str) -> Vec<Instance> {
    let mut out = Vec::new();
    for mesh_id in root.traverse_meshes() {
        let Some(mesh) = root.mesh(mesh_id) else {
            continue;
        };
        let mesh_matches = roles.matches_role(&mesh.name, role);
        for (slot, material_id) in mesh.slots.iter().enumerate() {
            let Some(material) = root.material(*material_id) else {
                continue;
            };
            if mesh_matches
                || roles.matches_role(&material.name, role)
                || roles.is_generic_decal(&material.name)
            {
                out.push(Instance {
                    mesh: mesh_id,
                    slot,
                    material: *material_id,
                });
            }
        }
    }
    out.sort_by_key(|instance| instance.key());
    out
}

pub fn instance_count(root: &ModelRoot, roles: &RoleTable, role: &str) -> usize {
    list_instances(root, roles, role).len()
}

/// Persistence key of an instance: mesh name (or id when unnamed), slot,
/// material name and a short structural hash of the mesh geometry. The hash
/// separates unnamed duplicates with different UV layouts.
pub fn signature(root: &ModelRoot, instance: &Instance) -> String {
    let mesh = root.mesh(instance.mesh);
    let mesh_label = match mesh.map(|mesh| mesh.name.trim()) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("mesh-{}", instance.mesh.0),
    };
    let material_name = root
        .material(instance.material)
        .map(|material| material.name.as_str())
        .unwrap_or("");
    let hash = structural_hash(mesh.and_then(|mesh| mesh.geometry.as_ref()));
    format!("{}#{}:{}@{}", mesh_label, instance.slot, material_name, hash)
}

pub fn structural_hash(geometry: Option<&Geometry>) -> String {
    let mut hasher = Sha256::new();
    match geometry {
        Some(geometry) => {
            hasher.update((geometry.vertex_count() as u64).to_le_bytes());
            for uv in [geometry.uvs.first(), geometry.uvs.last()].into_iter().flatten() {
                hasher.update(uv[0].to_le_bytes());
                hasher.update(uv[1].to_le_bytes());
            }
        }
        None => hasher.update(b"no-geometry"),
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..4])
}
