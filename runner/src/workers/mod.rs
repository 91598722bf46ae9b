//! Bounded polling loops

pub mod deployment;
pub mod outcome;
pub mod poller;
pub mod provisioner;
