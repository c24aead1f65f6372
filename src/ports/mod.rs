//! Ports - Trait definitions for everything the pipelines talk to.

pub mod fetch;
pub mod repository;
pub mod resolver;
pub mod transcoder;
