//! # leap-csv - hand-tracking frame reporter
//!
//! Replays recorded tracking-service events through a listener interface:
//! - Ten lifecycle and data callbacks ([`Listener`])
//! - An [`EventLoop`] that dispatches them one at a time and keeps a short
//!   frame history for "previous frame" lookups
//! - A CSV reporter for hands, fingers, bones, tools and gestures
//! - A BVH recorder for the first tracked hand
//!
//! ## Quick Start
//! ```no_run
//! use leap_csv::{EventLoop, EventStream, FrameReporter, Pacing};
//!
//! let stream = EventStream::open("session.jsonl", Pacing::Immediate).unwrap();
//! let mut event_loop = EventLoop::default();
//! event_loop.add_listener(FrameReporter::stdio());
//! event_loop.run(&stream);
//! event_loop.finish();
//! ```

pub mod error;
pub mod math;
pub mod types;
pub mod protocol;
pub mod history;
pub mod listener;
pub mod controller;
pub mod source;
pub mod reporter;
pub mod bvh;
pub mod config;

pub use error::LeapError;
pub use types::*;
pub use math::{Matrix, Vector};
pub use listener::Listener;
pub use controller::{Controller, EventLoop, Running};
pub use protocol::Event;
pub use source::{EventStream, Pacing};
pub use reporter::FrameReporter;
pub use bvh::BvhRecorder;
pub use config::Config;

/// Result type alias for leap-csv operations.
pub type Result<T> = std::result::Result<T, LeapError>;
