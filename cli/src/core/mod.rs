//! # Statbot Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Foundational pieces shared by every command:
//! - `config`: configuration loading, merging, validation and the API key lookup
//! - `error`: the `StatbotError` enum and the crate-wide `Result` alias
//!
//! ```rust
//! use crate::core::config; // For loading configuration
//! use crate::core::error::{Result, StatbotError}; // For error handling
//! ```
//!
pub mod config;
pub mod error;
