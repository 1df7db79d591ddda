//! Metadata handling: de-branded Info dictionaries and file identifiers
//! Created: 2025-06-03 15:05:27 UTC
//! Author: kartik4091

pub mod id_cleaner;
pub mod info_cleaner;

pub use id_cleaner::{ensure_file_id, fresh_file_id, reset_file_id};
pub use info_cleaner::{build_info_dictionary, decode_text_string, encode_text_string, read_info, InfoCleaner};
