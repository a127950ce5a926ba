//! Bootstrap module for initializing the `SyncTV` core
//!
//! This module handles:
//! - Configuration loading
//! - Database initialization
//! - Service wiring (playlist registry and media resolver)

pub mod config;
pub mod database;
pub mod services;

pub use config::load_config;
pub use database::init_database;
pub use services::{init_services, Services};
