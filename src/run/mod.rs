//! Run management
//!
//! This module handles configuration, request validation, process
//! supervision and the orchestrator that ties them together.

pub mod config;
pub mod facade;
pub mod request;
pub mod supervisor;
