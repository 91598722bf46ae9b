//! Platform API and edge HTTP access

pub mod client;
pub mod deploy_hooks;
pub mod deployments;
pub mod edge;
pub mod projects;
