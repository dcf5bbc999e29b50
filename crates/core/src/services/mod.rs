//! Orchestration over the core modules.

pub mod batch;
