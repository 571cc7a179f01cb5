//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for the chat, health, and static
//!   asset endpoints
//! - **[`models`]**: Request/response data structures for API communication

pub mod handlers;
pub mod models;
