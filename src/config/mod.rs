//! Scan configuration types.
//!
//! `ScanOptions` carries everything a single site scan needs: detector
//! toggles and priorities, viewport resolution, timing, screenshot and
//! replay switches, and the storage path for cached auxiliary data
//! (filter lists, tracker catalogue, privacy wording).

mod builder;
mod types;

pub use builder::ScanOptionsBuilder;
pub use types::{DetectorKind, DetectorToggles, Resolution, ScanOptions};
