//! File identifier handling
//!
//! Standard security handlers derive their keys from the first element of
//! the trailer `/ID` array, so every document that gets encrypted must carry
//! one. Rewritten documents always get a fresh pair.

use lopdf::{Document, Object, StringFormat};
use rand::RngCore;
use tracing::debug;

/// Generates a new random `/ID` pair
pub fn fresh_file_id() -> Object {
    let mut rng = rand::thread_rng();
    let mut permanent = vec![0u8; 16];
    let mut changing = vec![0u8; 16];
    rng.fill_bytes(&mut permanent);
    rng.fill_bytes(&mut changing);

    Object::Array(vec![
        Object::String(permanent, StringFormat::Hexadecimal),
        Object::String(changing, StringFormat::Hexadecimal),
    ])
}

/// Replaces the document's `/ID` with a fresh pair
pub fn reset_file_id(document: &mut Document) {
    document.trailer.set("ID", fresh_file_id());
}

/// Adds an `/ID` pair when the document has none
pub fn ensure_file_id(document: &mut Document) {
    let present = matches!(document.trailer.get(b"ID"), Ok(Object::Array(ids)) if !ids.is_empty());
    if !present {
        debug!("Document has no file identifier, generating one");
        reset_file_id(document);
    }
}
