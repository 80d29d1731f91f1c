//! # Laurel Testkit
//!
//! Test utilities for Laurel.
//!
//! This crate provides:
//! - Sample game configurations and engine builders
//! - Property-based test generators using proptest
//! - Recording and failing observers
//! - Temporary snapshot files
//!
//! ## Usage
//!
//! ```rust,ignore
//! use laurel_testkit::prelude::*;
//!
//! #[test]
//! fn progress_is_recorded() {
//!     let (mut engine, gateway) = online_engine("p1");
//!     let events = RecordingObserver::attach(&mut engine);
//!     engine.report_progress(FIRST_WIN, 50.0).unwrap();
//!     assert_eq!(events.names(), vec!["progressed"]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod observer;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::observer::*;
}

pub use fixtures::*;
pub use generators::*;
pub use observer::*;
