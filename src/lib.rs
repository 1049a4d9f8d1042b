//! Attestation Mailer — answers attestation requests that arrive by email.

pub mod channels;
pub mod config;
pub mod document;
pub mod error;
pub mod llm;
pub mod monitor;
pub mod pipeline;
pub mod store;
