//! # RTW Common Library
//!
//! Shared code for the RTW world services including:
//! - Wire messages (detection frames in, world snapshots out)
//! - Planar geometry helpers
//! - Configuration loading
//! - Error types
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod geometry;
pub mod messages;
pub mod time;

pub use error::{Error, Result};
pub use geometry::{Vector2, Vector3};
