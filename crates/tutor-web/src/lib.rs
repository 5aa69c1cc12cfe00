//! tutor-web: REST API for Tutor Cerdas
//! Serves the chat client and the admin console:
//!   - Registration, login and bearer-token guards
//!   - RAG chat with sessions, history and feedback
//!   - Admin user, document and chat management
//!   - Dashboard statistics and CSV export

pub mod auth;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;
