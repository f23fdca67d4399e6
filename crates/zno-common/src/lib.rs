//! ZNO Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the ZNO loader.
//!
//! # Overview
//!
//! - **Error Handling**: data-level error type and result alias
//! - **Logging**: `tracing` subscriber setup driven by `LOG_*` variables
//! - **Types**: the in-memory table (`Frame`) produced by the source reader
//!
//! # Example
//!
//! ```no_run
//! use zno_common::types::{Column, Frame, Value, ValueKind};
//!
//! fn build() -> zno_common::Result<Frame> {
//!     let mut frame = Frame::new(vec![
//!         Column::new("regname", ValueKind::Text),
//!         Column::new("engball100", ValueKind::Fractional),
//!     ]);
//!     frame.push_row(vec![Value::text("Київ"), Value::Fractional(Some(182.5))])?;
//!     Ok(frame)
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, ZnoError};
