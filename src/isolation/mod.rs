use crate::scene::{MaterialId, MeshId, ModelRoot};

/// Kind of mutation a material was privately cloned for. Each kind isolates
/// independently, so a slot cloned for visibility is cloned once more the
/// first time its texture changes, and never again after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaterialTag {
    Visibility,
    Texture,
    Color,
    Roughness,
}

impl MaterialTag {
    pub fn as_str(self) -> &'static str {
        match self {
            MaterialTag::Visibility => "_clonedForRoleVisibility",
            MaterialTag::Texture => "_clonedForRoleTexture",
            MaterialTag::Color => "_clonedForRoleColor",
            MaterialTag::Roughness => "_clonedForRoleRoughness",
        }
    }
}

/// Returns a material for `(mesh, slot)` that no other slot references,
/// cloning the current one on first use for `tag`.
pub fn ensure_exclusive_material(
    root: &mut ModelRoot,
    mesh: MeshId,
    slot: usize,
    tag: MaterialTag,
) -> Option<MaterialId> {
    let current = root.slot_material(mesh, slot)?;
    let source = root.material(current)?;
    if source.user_data.tags.contains(&tag) {
        return Some(current);
    }

    let mut cloned = source.clone();
    cloned.user_data.tags.insert(tag);
    if cloned.user_data.original_color.is_none() {
        cloned.user_data.original_color = Some(source.color);
    }
    cloned.mark_dirty();
    let name = cloned.name.clone();
    let id = root.add_material(cloned);
    if !root.set_slot_material(mesh, slot, id) {
        return None;
    }
    log::debug!(
        "Isolated material '{}' for mesh {:?} slot {} ({})",
        name,
        mesh,
        slot,
        tag.as_str()
    );
    Some(id)
}
