//! tutor-llm: LLM backend abstraction layer.
//! Implements the `LlmBackend` trait, the provider backends and the audited
//! `LlmClient` the RAG engine calls.

pub mod audit;
pub mod backend;
pub mod client;
pub mod mock;

pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
pub use client::LlmClient;
