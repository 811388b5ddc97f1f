mod loading;

pub use loading::{LoadOutcome, LoadTicket};

use crate::assets::{ImageId, ImageLibrary, LoadError, RawTexture};
use crate::config::LiveryConfig;
use crate::fit::{self, FitError, FitOptions};
use crate::instances::{self, Instance, InstanceKey};
use crate::isolation::{ensure_exclusive_material, MaterialTag};
use crate::prefs::{DefaultRotations, KeyValueStore, MemoryStore, PreferenceStore, RotationPreference};
use crate::qa::LogosQa;
use crate::roles::RoleTable;
use crate::rotation::{self, RotationError};
use crate::scene::{MeshId, ModelRoot, Texture};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no '{role}' instance at index {index} ({count} available)")]
    Addressing {
        role: String,
        index: usize,
        count: usize,
    },
    #[error(transparent)]
    Fit(#[from] FitError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    InvalidAngle(#[from] RotationError),
    #[error("image '{0}' is not in the library")]
    UnknownImage(ImageId),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Image currently shown by an instance, kept so the fit can be re-derived.
#[derive(Debug, Clone)]
pub(crate) struct Assignment {
    pub image_id: Option<ImageId>,
    pub texture: RawTexture,
    pub options: FitOptions,
}

/// Owns every piece of mutable state the logo pipeline needs. Several
/// engines can run side by side, each against its own model and store.
pub struct LiveryEngine {
    config: LiveryConfig,
    roles: RoleTable,
    prefs: PreferenceStore,
    defaults: DefaultRotations,
    session_rotations: HashMap<String, f32>,
    assignments: HashMap<InstanceKey, Assignment>,
    generations: HashMap<InstanceKey, u64>,
    library: ImageLibrary,
}

impl LiveryEngine {
    pub fn new(config: LiveryConfig, backend: Box<dyn KeyValueStore>) -> Self {
        let roles = config.role_table();
        let prefs = PreferenceStore::new(&config.store_namespace, backend);
        let mut defaults = DefaultRotations::new(
            config.default_rotations.clone(),
            config.model_rotations.clone(),
        );
        defaults.set_model_key(config.model_key.clone());
        Self {
            config,
            roles,
            prefs,
            defaults,
            session_rotations: HashMap::new(),
            assignments: HashMap::new(),
            generations: HashMap::new(),
            library: ImageLibrary::new(),
        }
    }

    pub fn in_memory(config: LiveryConfig) -> Self {
        Self::new(config, Box::new(MemoryStore::new()))
    }

    pub fn config(&self) -> &LiveryConfig {
        &self.config
    }

    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    pub fn register_matchers<I, S>(&mut self, role: &str, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.roles.register_matchers(role, patterns);
    }

    pub fn set_model_key(&mut self, model_key: Option<String>) {
        self.defaults.set_model_key(model_key);
    }

    pub fn library(&self) -> &ImageLibrary {
        &self.library
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.prefs
    }

    /// Verification entry points (`map`, `set_prefs_by_idx`, `reapply`,
    /// `verify`) bound to `root`.
    pub fn qa<'a>(&'a mut self, root: &'a mut ModelRoot) -> LogosQa<'a> {
        LogosQa::new(self, root)
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    pub fn list_instances(&self, root: &ModelRoot, role: &str) -> Vec<Instance> {
        instances::list_instances(root, &self.roles, role)
    }

    pub fn instance_count(&self, root: &ModelRoot, role: &str) -> usize {
        instances::instance_count(root, &self.roles, role)
    }

    pub fn logo_instances(&self, root: &ModelRoot) -> Vec<Instance> {
        self.list_instances(root, &self.config.logos_role)
    }

    pub fn logo_instance(&self, root: &ModelRoot, index: usize) -> Result<Instance> {
        let list = self.logo_instances(root);
        list.get(index).copied().ok_or_else(|| {
            log::warn!(
                "No '{}' instance at index {} ({} available)",
                self.config.logos_role,
                index,
                list.len()
            );
            EngineError::Addressing {
                role: self.config.logos_role.clone(),
                index,
                count: list.len(),
            }
        })
    }

    pub fn signature_of(&self, root: &ModelRoot, instance: &Instance) -> String {
        instances::signature(root, instance)
    }

    // ========================================================================
    // Visibility, color and roughness
    // ========================================================================

    pub fn set_instance_visible(
        &mut self,
        root: &mut ModelRoot,
        index: usize,
        enabled: bool,
    ) -> Result<()> {
        let instance = self.logo_instance(root, index)?;
        if let Some(id) =
            ensure_exclusive_material(root, instance.mesh, instance.slot, MaterialTag::Visibility)
        {
            if let Some(material) = root.material_mut(id) {
                material.visible = enabled;
                material.mark_dirty();
            }
        }
        Ok(())
    }

    /// Toggles every slot whose material name matches `role`. Returns the
    /// number of slots touched.
    pub fn set_materials_visible_by_role(
        &mut self,
        root: &mut ModelRoot,
        role: &str,
        enabled: bool,
    ) -> usize {
        let slots = self.role_slots(root, role, false);
        for (mesh, slot) in &slots {
            if let Some(id) = ensure_exclusive_material(root, *mesh, *slot, MaterialTag::Visibility)
            {
                if let Some(material) = root.material_mut(id) {
                    material.visible = enabled;
                    material.mark_dirty();
                }
            }
        }
        slots.len()
    }

    pub fn apply_color_to_role(
        &mut self,
        root: &mut ModelRoot,
        role: &str,
        color: [f32; 3],
        disable_map: bool,
    ) -> usize {
        let slots = self.role_slots(root, role, true);
        for (mesh, slot) in &slots {
            if let Some(id) = ensure_exclusive_material(root, *mesh, *slot, MaterialTag::Color) {
                if let Some(material) = root.material_mut(id) {
                    if disable_map {
                        material.map = None;
                    }
                    material.color = color;
                    material.mark_dirty();
                }
            }
        }
        log::info!("Applied color {:?} to {} '{}' slot(s)", color, slots.len(), role);
        slots.len()
    }

    pub fn apply_roughness_to_role(
        &mut self,
        root: &mut ModelRoot,
        role: &str,
        roughness: f32,
        metalness: Option<f32>,
    ) -> usize {
        let slots = self.role_slots(root, role, true);
        for (mesh, slot) in &slots {
            if let Some(id) = ensure_exclusive_material(root, *mesh, *slot, MaterialTag::Roughness)
            {
                if let Some(material) = root.material_mut(id) {
                    material.roughness = roughness.clamp(0.0, 1.0);
                    if let Some(metalness) = metalness {
                        material.metalness = metalness.clamp(0.0, 1.0);
                    }
                    material.mark_dirty();
                    log::debug!("Roughness {} applied to '{}'", roughness, material.name);
                }
            }
        }
        slots.len()
    }

    fn role_slots(&self, root: &ModelRoot, role: &str, match_mesh_names: bool) -> Vec<(MeshId, usize)> {
        let mut out = Vec::new();
        for mesh_id in root.traverse_meshes() {
            let Some(mesh) = root.mesh(mesh_id) else {
                continue;
            };
            let mesh_matches = match_mesh_names && self.roles.matches_role(&mesh.name, role);
            for (slot, material_id) in mesh.slots.iter().enumerate() {
                let material_matches = root
                    .material(*material_id)
                    .map(|material| self.roles.matches_role(&material.name, role))
                    .unwrap_or(false);
                if mesh_matches || material_matches {
                    out.push((mesh_id, slot));
                }
            }
        }
        out
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// Fits `raw` to the instance and applies its effective rotation. On a
    /// fit failure the instance keeps whatever it showed before.
    pub fn fit_image_to_instance(
        &mut self,
        root: &mut ModelRoot,
        index: usize,
        raw: &RawTexture,
        options: FitOptions,
    ) -> Result<()> {
        let instance = self.logo_instance(root, index)?;
        self.bump_generation(instance.key());
        self.assign(root, index, &instance, raw, None, options)
    }

    /// Fits `raw` into every slot of `role` (material name, mesh name or a
    /// generic decal name), each slot getting its own texture. Slots whose
    /// footprint cannot be fitted are skipped. Returns the number fitted.
    pub fn apply_texture_to_role(
        &mut self,
        root: &mut ModelRoot,
        role: &str,
        raw: &RawTexture,
        options: FitOptions,
    ) -> usize {
        let options = self.resolve_options(options);
        let mut fitted = 0;
        for instance in self.list_instances(root, role) {
            match fit::fit_image_to_instance(root, &instance, raw, options) {
                Ok(_) => fitted += 1,
                Err(err) => log::warn!("Skipping '{}' slot: {}", role, err),
            }
        }
        log::info!("Applied '{}' to {} '{}' slot(s)", raw.name, fitted, role);
        fitted
    }

    pub fn clear_image_from_instance(&mut self, root: &mut ModelRoot, index: usize) -> Result<()> {
        let instance = self.logo_instance(root, index)?;
        self.bump_generation(instance.key());
        self.assignments.remove(&instance.key());
        if let Some(id) =
            ensure_exclusive_material(root, instance.mesh, instance.slot, MaterialTag::Texture)
        {
            if let Some(material) = root.material_mut(id) {
                material.map = None;
                if let Some(original) = material.user_data.original_color {
                    material.color = original;
                }
                material.visible = false;
                material.mark_dirty();
            }
        }
        log::info!("Cleared image from logo instance {}", index);
        Ok(())
    }

    pub fn add_image(&mut self, name: &str, texture: RawTexture) -> ImageId {
        let id = self.library.add(name, texture);
        log::info!("Added image '{}' to the library as {}", name, id);
        id
    }

    /// Shows a library image on an instance, or clears it for `None`.
    pub fn assign_image(
        &mut self,
        root: &mut ModelRoot,
        index: usize,
        image: Option<&ImageId>,
    ) -> Result<()> {
        let Some(image_id) = image else {
            return self.clear_image_from_instance(root, index);
        };
        let texture = self
            .library
            .get(image_id)
            .map(|image| image.texture.clone())
            .ok_or_else(|| EngineError::UnknownImage(image_id.clone()))?;
        let instance = self.logo_instance(root, index)?;
        self.bump_generation(instance.key());
        self.assign(
            root,
            index,
            &instance,
            &texture,
            Some(image_id.clone()),
            FitOptions::default(),
        )
    }

    /// Removes a library image and clears every instance showing it.
    pub fn remove_image(&mut self, root: &mut ModelRoot, image: &ImageId) -> bool {
        if self.library.remove(image).is_none() {
            return false;
        }
        let affected: Vec<InstanceKey> = self
            .assignments
            .iter()
            .filter(|(_, assignment)| assignment.image_id.as_ref() == Some(image))
            .map(|(key, _)| *key)
            .collect();
        let list = self.logo_instances(root);
        for key in affected {
            match list.iter().position(|instance| instance.key() == key) {
                Some(index) => {
                    if let Err(err) = self.clear_image_from_instance(root, index) {
                        log::warn!("Failed to clear instance {}: {}", index, err);
                    }
                }
                None => {
                    self.assignments.remove(&key);
                }
            }
        }
        true
    }

    fn assign(
        &mut self,
        root: &mut ModelRoot,
        index: usize,
        instance: &Instance,
        raw: &RawTexture,
        image_id: Option<ImageId>,
        options: FitOptions,
    ) -> Result<()> {
        self.fit_and_rotate(root, index, instance, raw, options)?;
        self.assignments.insert(
            instance.key(),
            Assignment {
                image_id,
                texture: raw.clone(),
                options,
            },
        );
        Ok(())
    }

    pub(crate) fn fit_and_rotate(
        &mut self,
        root: &mut ModelRoot,
        index: usize,
        instance: &Instance,
        raw: &RawTexture,
        options: FitOptions,
    ) -> Result<()> {
        let options = self.resolve_options(options);
        if let Err(err) = fit::fit_image_to_instance(root, instance, raw, options) {
            log::warn!("Skipping fit for logo instance {}: {}", index, err);
            return Err(err.into());
        }
        let signature = instances::signature(root, instance);
        let degrees = self.effective_rotation_for(&signature, index);
        self.session_rotations.entry(signature).or_insert(degrees);
        apply_rotation_to_instance(root, instance, degrees)?;
        log::info!(
            "Logo instance {} shows '{}' at {}°",
            index,
            raw.name,
            degrees
        );
        Ok(())
    }

    fn resolve_options(&self, options: FitOptions) -> FitOptions {
        FitOptions {
            pad_percent: options.pad_percent.or(Some(self.config.pad_percent)),
            ..options
        }
    }

    pub(crate) fn assignment(&self, key: &InstanceKey) -> Option<&Assignment> {
        self.assignments.get(key)
    }

    // ========================================================================
    // Rotation
    // ========================================================================

    /// Sets the absolute angle of an instance, remembers it for the session
    /// and persists it. Returns whether a fitted texture was rotated; without
    /// one only the preference changes.
    pub fn set_instance_rotation(
        &mut self,
        root: &mut ModelRoot,
        index: usize,
        degrees: f32,
    ) -> Result<bool> {
        let degrees = match rotation::validate_degrees(degrees) {
            Ok(degrees) => rotation::normalize_degrees(degrees),
            Err(err) => {
                log::warn!("Rejected rotation for logo instance {}: {}", index, err);
                return Err(err.into());
            }
        };
        let instance = self.logo_instance(root, index)?;
        let signature = instances::signature(root, &instance);
        self.record_rotation(&signature, degrees);
        let applied = apply_rotation_to_instance(root, &instance, degrees)?;
        log::info!("Logo instance {} rotation set to {}°", index, degrees);
        Ok(applied)
    }

    /// Adds `quarter_turns * 90` to the current absolute angle. Returns the
    /// new angle.
    pub fn rotate_instance_by(
        &mut self,
        root: &mut ModelRoot,
        index: usize,
        quarter_turns: i32,
    ) -> Result<f32> {
        let current = self.effective_rotation(root, index)?;
        let target = rotation::normalize_degrees(current + quarter_turns as f32 * 90.0);
        self.set_instance_rotation(root, index, target)?;
        Ok(target)
    }

    pub fn reset_instance_rotation(&mut self, root: &mut ModelRoot, index: usize) -> Result<f32> {
        let degrees = self.default_rotation(index);
        self.set_instance_rotation(root, index, degrees)?;
        Ok(degrees)
    }

    pub fn effective_rotation(&self, root: &ModelRoot, index: usize) -> Result<f32> {
        let instance = self.logo_instance(root, index)?;
        let signature = instances::signature(root, &instance);
        Ok(self.effective_rotation_for(&signature, index))
    }

    pub fn default_rotation(&self, index: usize) -> f32 {
        self.defaults.default_for(index)
    }

    /// Session value, then stored preference, then the slot default.
    pub(crate) fn effective_rotation_for(&self, signature: &str, index: usize) -> f32 {
        if let Some(degrees) = self.session_rotations.get(signature) {
            return *degrees;
        }
        match self.prefs.load_preference(signature) {
            Ok(Some(preference)) => preference.rotation_degrees,
            Ok(None) => self.defaults.default_for(index),
            Err(err) => {
                log::warn!("Could not read rotation preference for '{}': {}", signature, err);
                self.defaults.default_for(index)
            }
        }
    }

    /// Returns `false` when the value only lives in the session because the
    /// store refused it.
    pub(crate) fn record_rotation(&mut self, signature: &str, degrees: f32) -> bool {
        self.session_rotations.insert(signature.to_string(), degrees);
        let preference = RotationPreference {
            rotation_degrees: degrees,
        };
        match self.prefs.save_preference(signature, &preference) {
            Ok(()) => true,
            Err(err) => {
                log::warn!(
                    "Rotation for '{}' kept for this session only: {}",
                    signature,
                    err
                );
                false
            }
        }
    }

    pub(crate) fn save_snapshot<T: serde::Serialize>(&mut self, value: &T) -> bool {
        let key = self.config.snapshot_key.clone();
        match self.prefs.save_snapshot(&key, value) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Could not persist snapshot '{}': {}", key, err);
                false
            }
        }
    }
}

pub(crate) fn instance_texture<'a>(root: &'a ModelRoot, instance: &Instance) -> Option<&'a Texture> {
    root.slot_material(instance.mesh, instance.slot)
        .and_then(|id| root.material(id))
        .and_then(|material| material.map.as_ref())
}

/// Rotates the texture currently bound to the instance slot, if it is fitted.
pub(crate) fn apply_rotation_to_instance(
    root: &mut ModelRoot,
    instance: &Instance,
    degrees: f32,
) -> std::result::Result<bool, RotationError> {
    let Some(id) = root.slot_material(instance.mesh, instance.slot) else {
        return Ok(false);
    };
    let Some(material) = root.material_mut(id) else {
        return Ok(false);
    };
    let Some(texture) = material.map.as_mut() else {
        return Ok(false);
    };
    let applied = rotation::apply_rotation(texture, degrees)?;
    if applied {
        material.mark_dirty();
    }
    Ok(applied)
}
