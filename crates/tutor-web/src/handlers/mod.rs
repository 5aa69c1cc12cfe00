//! HTTP handlers for all API routes.

pub mod admin_chats;
pub mod admin_documents;
pub mod admin_stats;
pub mod admin_users;
pub mod auth;
pub mod chat;
pub mod health;
