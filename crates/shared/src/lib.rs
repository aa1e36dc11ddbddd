//! Shared identifiers and configuration for Kassa.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe references to periods, accounts and records
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;
