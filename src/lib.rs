//! ps1tex - PS1-style texture degradation
//!
//! Downscales an image, cuts its color depth and optionally dithers it, on a
//! background worker with debounced, cancellable requests.
//! This library exposes modules for integration testing.

pub mod codec;
pub mod error;
pub mod models;
pub mod services;
