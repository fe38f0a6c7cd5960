//! Shared test utilities for rtsup.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with `#[track_caller]`
//! - [`time`] - Virtual clock and a cost model that advances it
//! - [`mock`] - Scripted sensor and recording indicator/priority ports
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! rtsup-test-helpers = { workspace = true }
//! ```
//!
//! ```rust,ignore
//! use rtsup_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic)]

pub mod mock;
pub mod must;
pub mod prelude;
pub mod time;

pub use must::*;
