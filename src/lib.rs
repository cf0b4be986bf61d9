//! Liquid-Check tank level monitor integration
//!
//! This crate polls Liquid-Check devices (SI-Elektronik GmbH) over their local
//! HTTP API and exposes the readings and control commands to a host.
//!
//! # Features
//!
//! - Periodic polling with last-good snapshot retention
//! - One table-driven sensor per reported metric
//! - Start-measurement and restart commands addressed by device id
//! - Multiple devices with independent refresh timers
//! - TOML configuration and structured `tracing` logs

// Core modules
pub mod client;
pub mod config;
pub mod error;
pub mod integration;
pub mod logging;
pub mod services;

// Test support modules - available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

// Re-export main types for convenience
pub use client::{ClientFactory, HttpClientFactory, LiquidCheckClient, LiquidCheckHttpClient};
pub use config::{AppConfig, DeviceConfig};
pub use error::{LiquidCheckError, Result, TransportError};
pub use integration::LiquidCheckIntegration;
pub use services::{MetricKey, PollingCoordinator, ReadingSnapshot, ReadingValue};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
