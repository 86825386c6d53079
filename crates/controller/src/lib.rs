#![deny(unused)]
//! Query-processing pipeline for the scholar agent.
//!
//! The pipeline runs in five stages: intent classification
//! ([`IntentClassifier`]), task planning ([`TaskPlanner`]), dependency-aware
//! execution ([`ExecutionEngine`]), response integration
//! ([`ResponseIntegrator`]), and conversation orchestration
//! ([`ScholarAgent`]), which ties the stages together behind a single
//! `process_query` entry point.

pub mod agent;
pub mod executor;
pub mod intent;
pub mod integrator;
pub mod planner;
pub mod prompts;
pub mod strategies;
pub mod telemetry;

pub use agent::ScholarAgent;
pub use executor::ExecutionEngine;
pub use intent::{IntentClassifier, IntentContext};
pub use integrator::{ResponseContext, ResponseIntegrator};
pub use planner::TaskPlanner;
pub use strategies::{select_strategy, StrategySummary};
