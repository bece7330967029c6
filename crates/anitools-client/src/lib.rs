//! # anitools-client
//!
//! HTTP implementation of [`anitools_core::FilterBackend`].
//!
//! ```rust,no_run
//! use anitools_client::{BackendConfig, HttpBackend};
//!
//! let backend = HttpBackend::new(BackendConfig::from_env()).expect("valid backend config");
//! ```

pub mod config;
pub mod http;

pub use config::{BackendConfig, ConfigError, ConfigResult};
pub use http::HttpBackend;
