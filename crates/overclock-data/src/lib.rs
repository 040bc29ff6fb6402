//! Content-pack loading for the production engine.
//!
//! Scaling profiles are authored as JSON packs by third parties. This crate
//! owns the on-disk schema and the resolution pipeline that turns pack
//! entries into engine profiles, applying the first-wins duplicate policy.

pub mod loader;
pub mod schema;

pub use loader::{ProfileLoadError, load_pack_json, load_profiles_json, register_pack};
