pub mod chat;
pub mod health;
pub mod static_assets;
