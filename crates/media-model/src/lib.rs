//! Blur & Fade Media Model
//!
//! Defines the core data contracts shared by both rendering pipelines:
//! - **Effects:** Blur and fade intensities, presets, and the per-pipeline
//!   conversions that keep both pipelines visually equivalent
//! - **Media:** The live media asset, its kind, output naming, and video
//!   container negotiation
//! - **Object URLs:** Revocable handles onto in-memory byte buffers
//!
//! This crate is pure data. No rendering, no I/O.

pub mod effect;
pub mod media;
pub mod object_url;

pub use effect::*;
pub use media::*;
pub use object_url::*;
