//! Shared utilities
//! Author: kartik4091
//! Created: 2025-06-03 09:14:13 UTC

pub mod logging;

pub use self::logging::{init_logging, log_filter, LOG_LEVELS};
