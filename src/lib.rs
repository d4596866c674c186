pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod sync;

pub use db::create_pool;
