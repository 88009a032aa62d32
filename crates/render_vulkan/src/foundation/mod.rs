//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the renderer:
//! - Math types
//! - Frame timing
//! - Logging and the fatal error policy

pub mod logging;
pub mod math;
pub mod time;
