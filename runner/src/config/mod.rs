//! Fixture, feature and deployment configuration

pub mod deployment;
pub mod features;
pub mod fixture;
