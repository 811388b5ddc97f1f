//! Generation-guarded image loads.
//!
//! Every load started for an instance bumps that instance's generation. A
//! completion carrying an older generation is discarded, so when two loads
//! race only the most recently started one lands.

use super::{EngineError, LiveryEngine, Result};
use crate::assets::{ImageLoader, ImageSource, LoadError, RawTexture};
use crate::fit::FitOptions;
use crate::instances::InstanceKey;
use crate::scene::ModelRoot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    key: InstanceKey,
    index: usize,
    generation: u64,
}

impl LoadTicket {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load (or a clear) superseded this one; nothing changed.
    Stale,
}

impl LiveryEngine {
    pub(crate) fn bump_generation(&mut self, key: InstanceKey) -> u64 {
        let generation = self.generations.entry(key).or_insert(0);
        *generation += 1;
        *generation
    }

    pub fn begin_image_load(&mut self, root: &ModelRoot, index: usize) -> Result<LoadTicket> {
        let instance = self.logo_instance(root, index)?;
        let generation = self.bump_generation(instance.key());
        log::debug!("Load #{} started for logo instance {}", generation, index);
        Ok(LoadTicket {
            key: instance.key(),
            index,
            generation,
        })
    }

    pub fn complete_image_load(
        &mut self,
        root: &mut ModelRoot,
        ticket: LoadTicket,
        result: std::result::Result<RawTexture, LoadError>,
        options: FitOptions,
    ) -> Result<LoadOutcome> {
        let current = self.generations.get(&ticket.key).copied().unwrap_or(0);
        if current != ticket.generation {
            log::debug!(
                "Discarding load #{} for logo instance {} (current #{})",
                ticket.generation,
                ticket.index,
                current
            );
            return Ok(LoadOutcome::Stale);
        }
        let raw = result.map_err(|err| {
            log::warn!("Image load for logo instance {} failed: {}", ticket.index, err);
            EngineError::Load(err)
        })?;

        let instance = self.logo_instance(root, ticket.index)?;
        if instance.key() != ticket.key {
            log::warn!(
                "Logo instance {} moved while its image was loading",
                ticket.index
            );
            return Ok(LoadOutcome::Stale);
        }
        self.assign(root, ticket.index, &instance, &raw, None, options)?;
        Ok(LoadOutcome::Applied)
    }

    /// Loads and applies an image in one step.
    pub fn load_image_into_instance(
        &mut self,
        root: &mut ModelRoot,
        index: usize,
        loader: &dyn ImageLoader,
        source: &ImageSource,
        options: FitOptions,
    ) -> Result<LoadOutcome> {
        let ticket = self.begin_image_load(root, index)?;
        let result = loader.load(source);
        self.complete_image_load(root, ticket, result, options)
    }
}
