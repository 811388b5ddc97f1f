//! Livery - per-slot logo customization for vehicle models.
//!
//! Finds the logo slots of a loaded model by name, gives each slot its own
//! material, fits an operator image onto the slot's UV footprint and rotates
//! it in quarter turns about the footprint center. Rotations persist per slot
//! signature so they survive reloads.

pub mod assets;
pub mod config;
pub mod engine;
pub mod fit;
pub mod instances;
pub mod isolation;
pub mod prefs;
pub mod qa;
pub mod roles;
pub mod rotation;
pub mod scene;

pub use assets::{DecodingLoader, ImageId, ImageLoader, ImageSource, LoadError, RawTexture};
pub use config::LiveryConfig;
pub use engine::{EngineError, LiveryEngine, LoadOutcome, LoadTicket};
pub use fit::{FitBounds, FitError, FitOptions, UvRect};
pub use instances::{Instance, InstanceKey};
pub use prefs::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use qa::{InstanceMapping, LogosQa, VerifyDetail, VerifyReport};
pub use roles::RoleTable;
pub use scene::ModelRoot;
