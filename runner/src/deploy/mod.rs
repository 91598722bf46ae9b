//! Deployment lifecycle

pub mod git;
pub mod hooks;
pub mod mutex;
pub mod reconcile;
pub mod shell;
pub mod teardown;
