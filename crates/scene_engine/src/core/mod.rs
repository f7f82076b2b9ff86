//! # Core Engine Module
//!
//! Shared abstractions used across the engine subsystems. At the moment this
//! is the unified configuration system.

pub mod config;

pub use config::{
    ApplicationConfig,
    EngineConfig,
    RendererConfig,
    Config,
    ConfigError,
};
