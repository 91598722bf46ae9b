//! Persistent runner settings

pub mod settings;
