//! Edgeship Library
//!
//! End-to-end deployment tests for hosted site projects: reconfigure a
//! remote project, trigger a deployment, and wait until it is served.

pub mod app;
pub mod config;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod storage;
pub mod utils;
pub mod workers;
