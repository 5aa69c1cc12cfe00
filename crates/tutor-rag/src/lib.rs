//! tutor-rag: retrieval-augmented generation for the tutoring chat.
//!
//! Flow per question:
//!   1. detect the language (Indonesian or English)
//!   2. fetch similar chunks from the indexer (empty on any failure)
//!   3. build the TutorAI prompt with context and session history
//!   4. ask the configured LLM and return the reply with its sources

pub mod engine;
pub mod error;
pub mod indexer;
pub mod language;
pub mod prompt;

pub use engine::{preview, DirectAnswer, RagAnswer, RagEngine, Source};
pub use error::{IndexerError, RagError};
pub use indexer::{IndexerClient, RetrievedChunk};
pub use language::{detect_language, Language};
pub use prompt::ChatTurn;
