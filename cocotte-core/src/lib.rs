//! Core domain logic for Cocotte: platform handlers, the analysis pipeline,
//! LLM and speech-to-text providers, and the string machinery shared with the
//! persistence layer.
//!
//! This crate has no HTTP-framework or database dependency; the `server`
//! crate wires these pieces to the outside world.

pub mod clean;
pub mod error;
pub mod fuzzy;
pub mod llm;
pub mod pipeline;
pub mod platform;
pub mod prompts;
pub mod stt;
pub mod types;
pub mod vocab;
