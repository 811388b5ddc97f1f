//! UV fit engine.
//!
//! Finds the UV rectangle (the footprint) a material slot occupies on its
//! mesh and sets a texture's offset/repeat so one copy of the image covers
//! exactly that rectangle, inset by a padding fraction on every edge.

use crate::assets::RawTexture;
use crate::instances::Instance;
use crate::isolation::{ensure_exclusive_material, MaterialTag};
use crate::scene::{Geometry, MaterialId, MeshId, ModelRoot, Texture, WrapMode};
use glam::Vec2;

pub const DEFAULT_PAD_PERCENT: f32 = 0.06;
pub const MAX_PAD_PERCENT: f32 = 0.2;
const MIN_EXTENT: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UvRect {
    pub min_u: f32,
    pub min_v: f32,
    pub max_u: f32,
    pub max_v: f32,
}

impl UvRect {
    pub fn width(&self) -> f32 {
        self.max_u - self.min_u
    }

    pub fn height(&self) -> f32 {
        self.max_v - self.min_v
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min_u + self.max_u) * 0.5,
            (self.min_v + self.max_v) * 0.5,
        )
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.min_u, self.min_v),
            Vec2::new(self.max_u, self.min_v),
            Vec2::new(self.max_u, self.max_v),
            Vec2::new(self.min_u, self.max_v),
        ]
    }

    fn is_finite(&self) -> bool {
        self.min_u.is_finite()
            && self.min_v.is_finite()
            && self.max_u.is_finite()
            && self.max_v.is_finite()
    }
}

/// Fit metadata stored on a texture: the footprint (before inset), its
/// center, and the padding that produced the inner rectangle.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct FitBounds {
    pub min_u: f32,
    pub min_v: f32,
    pub max_u: f32,
    pub max_v: f32,
    pub center_u: f32,
    pub center_v: f32,
    pub pad: f32,
}

impl FitBounds {
    pub fn footprint(&self) -> UvRect {
        UvRect {
            min_u: self.min_u,
            min_v: self.min_v,
            max_u: self.max_u,
            max_v: self.max_v,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.center_u, self.center_v)
    }

    /// Rectangle the unit image is mapped onto.
    pub fn inner(&self) -> UvRect {
        let footprint = self.footprint();
        let inset_u = footprint.width() * self.pad;
        let inset_v = footprint.height() * self.pad;
        UvRect {
            min_u: self.min_u + inset_u,
            min_v: self.min_v + inset_v,
            max_u: self.min_u + inset_u + (footprint.width() - inset_u * 2.0).max(MIN_EXTENT),
            max_v: self.min_v + inset_v + (footprint.height() - inset_v * 2.0).max(MIN_EXTENT),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitOptions {
    pub pad_percent: Option<f32>,
    /// Edge behaviour outside the inset rectangle. Clamp unless the caller
    /// wants the image tiled across the padding.
    pub wrap: WrapMode,
}

#[derive(Debug, thiserror::Error)]
pub enum FitError {
    #[error("mesh {0:?} does not exist")]
    UnknownMesh(MeshId),
    #[error("mesh '{mesh}' has no UV geometry")]
    MissingGeometry { mesh: String },
    #[error("mesh '{mesh}' slot {slot} has no UV coverage")]
    NoCoverage { mesh: String, slot: usize },
    #[error("mesh '{mesh}' slot {slot} has zero-area UV bounds ({width} x {height})")]
    ZeroArea {
        mesh: String,
        slot: usize,
        width: f32,
        height: f32,
    },
    #[error("material slot {slot} of mesh '{mesh}' could not be isolated")]
    Isolation { mesh: String, slot: usize },
}

pub type Result<T> = std::result::Result<T, FitError>;

/// Bounding rectangle of the UVs drawn by `slot`, or `None` when the slot
/// touches no vertex (the bounds would be infinite).
pub fn slot_footprint(geometry: &Geometry, slot: usize) -> Option<UvRect> {
    let mut rect = UvRect {
        min_u: f32::INFINITY,
        min_v: f32::INFINITY,
        max_u: f32::NEG_INFINITY,
        max_v: f32::NEG_INFINITY,
    };
    for uv in geometry.slot_uvs(slot) {
        rect.min_u = rect.min_u.min(uv.x);
        rect.min_v = rect.min_v.min(uv.y);
        rect.max_u = rect.max_u.max(uv.x);
        rect.max_v = rect.max_v.max(uv.y);
    }
    rect.is_finite().then_some(rect)
}

/// Footprint of an instance, rejecting empty and zero-area slots.
pub fn instance_footprint(root: &ModelRoot, instance: &Instance) -> Result<UvRect> {
    let mesh = root
        .mesh(instance.mesh)
        .ok_or(FitError::UnknownMesh(instance.mesh))?;
    let geometry = mesh
        .geometry
        .as_ref()
        .filter(|geometry| !geometry.uvs.is_empty())
        .ok_or_else(|| FitError::MissingGeometry {
            mesh: mesh.name.clone(),
        })?;
    let rect = slot_footprint(geometry, instance.slot).ok_or_else(|| FitError::NoCoverage {
        mesh: mesh.name.clone(),
        slot: instance.slot,
    })?;
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return Err(FitError::ZeroArea {
            mesh: mesh.name.clone(),
            slot: instance.slot,
            width: rect.width(),
            height: rect.height(),
        });
    }
    Ok(rect)
}

pub fn clamp_pad(pad_percent: Option<f32>) -> f32 {
    match pad_percent {
        Some(pad) if pad.is_finite() => pad.clamp(0.0, MAX_PAD_PERCENT),
        _ => DEFAULT_PAD_PERCENT,
    }
}

/// Points `texture` at the padded footprint. Any previous rotation is
/// dropped; the rotation engine re-derives it from the new metadata.
pub fn fit_texture(texture: &mut Texture, footprint: UvRect, options: FitOptions) -> FitBounds {
    let center = footprint.center();
    let bounds = FitBounds {
        min_u: footprint.min_u,
        min_v: footprint.min_v,
        max_u: footprint.max_u,
        max_v: footprint.max_v,
        center_u: center.x,
        center_v: center.y,
        pad: clamp_pad(options.pad_percent),
    };
    let inner = bounds.inner();
    let repeat = Vec2::new(1.0 / inner.width(), 1.0 / inner.height());
    texture.repeat = repeat;
    texture.offset = Vec2::new(-inner.min_u * repeat.x, -inner.min_v * repeat.y);
    texture.wrap = options.wrap;
    texture.matrix_auto_update = true;
    texture.fit = Some(bounds);
    bounds
}

/// Gives the instance its own copy of `raw`, fitted to the instance's
/// footprint. On error the material is left exactly as it was.
pub fn fit_image_to_instance(
    root: &mut ModelRoot,
    instance: &Instance,
    raw: &RawTexture,
    options: FitOptions,
) -> Result<MaterialId> {
    let footprint = instance_footprint(root, instance)?;
    let material_id = ensure_exclusive_material(root, instance.mesh, instance.slot, MaterialTag::Texture)
        .ok_or_else(|| FitError::Isolation {
            mesh: root
                .mesh(instance.mesh)
                .map(|mesh| mesh.name.clone())
                .unwrap_or_default(),
            slot: instance.slot,
        })?;

    let mut texture = Texture::new(raw.clone());
    let bounds = fit_texture(&mut texture, footprint, options);
    if let Some(material) = root.material_mut(material_id) {
        material.map = Some(texture);
        material.color = [1.0, 1.0, 1.0];
        material.visible = true;
        material.mark_dirty();
    }
    log::debug!(
        "Fitted '{}' to mesh {:?} slot {}: footprint [{:.4}, {:.4}]-[{:.4}, {:.4}] pad {:.3}",
        raw.name,
        instance.mesh,
        instance.slot,
        bounds.min_u,
        bounds.min_v,
        bounds.max_u,
        bounds.max_v,
        bounds.pad
    );
    Ok(material_id)
}
