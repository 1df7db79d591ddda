// Shared value types for the rewrite engine and its codec

pub mod document;

pub use document::*;
