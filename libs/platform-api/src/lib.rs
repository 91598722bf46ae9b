//! Wire models for the site deployment platform API
//!
//! Shapes here mirror the platform's JSON bodies. Local descriptors and the
//! logic that maps them onto these types live in the runner crate.

pub mod models;

pub use models::*;
