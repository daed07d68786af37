//! droidclaw: a screen-grounding agent that drives a mobile app through a
//! multimodal model. It extracts addressable interactive elements from UI
//! dumps (or a grid overlay as fallback), turns free-text model responses
//! into typed actions, and runs a round-based loop with stagnation detection
//! and human-in-the-loop pauses. A self-exploration mode bootstraps
//! per-element documentation via before/after reflection.
pub mod actions;
pub mod agent;
pub mod config;
pub mod device;
pub mod docs_store;
pub mod errors;
pub mod human;
pub mod llm;
pub mod perception;

pub use errors::{DroidClawError, DroidClawResult};
