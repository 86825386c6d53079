#![deny(unused)]
//! Core types, traits, and error definitions for Scholar Agent.
//!
//! This crate provides the foundational building blocks shared across the
//! query-processing pipeline: the intent and task data model, the
//! collaborator trait seams (LLM, tool service, conversation store), and
//! mock implementations for testing.

pub mod error;
pub mod mocks;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
