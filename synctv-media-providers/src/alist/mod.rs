//! Alist Provider Client
//!
//! Pure HTTP client for the Alist API.
//!
//! # Example
//!
//! ```no_run
//! use synctv_media_providers::alist::AlistClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AlistClient::new("https://alist.example.com");
//! let token = client.login("username", "password").await?;
//! let client = AlistClient::with_token("https://alist.example.com", token);
//! let file_info = client.fs_get("/movies/video.mp4", "").await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod types;

pub use client::{hash_password, AlistClient};
pub use types::*;
