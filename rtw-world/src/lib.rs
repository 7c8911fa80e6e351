//! # RTW World (rtw-world)
//!
//! Fuses per-camera detection frames into one world snapshot per cycle.
//!
//! **Purpose:** Gate frames until every camera has reported, average robots
//! across cameras, track the ball, attach velocities and danger data, and serve
//! the result over HTTP/SSE to downstream consumers and tracker modules.

pub mod api;
pub mod danger;
pub mod error;
pub mod mailbox;
pub mod predictor;
pub mod state;
pub mod tracker;
pub mod world;

pub use error::{Error, Result};
pub use state::SharedState;
