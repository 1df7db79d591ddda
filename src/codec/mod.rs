//! PDF codec collaborator
//!
//! The engine never touches the PDF object model directly. It drives a codec
//! through these traits: open a source, read its geometry and security
//! state, create an output container, import pages into it, protect it and
//! finalize it to bytes.

use crate::error::Result;
use crate::security::{CipherDescriptor, EncryptionSettings};
use crate::types::{DocumentInfo, DocumentSource, PageSize};

pub mod lopdf_codec;
pub mod page_import;
pub mod text_layout;

#[cfg(test)]
pub(crate) mod memory;

pub use lopdf_codec::{LopdfCodec, LopdfOutput, LopdfSource};

/// An opened, readable document
pub trait SourceDocument {
    fn page_count(&self) -> u32;

    /// Geometry of a 1-indexed page
    fn page_size(&self, page_number: u32) -> Result<PageSize>;

    fn info(&self) -> DocumentInfo;

    fn is_encrypted(&self) -> bool;

    /// Raw `/P` value; only meaningful when encrypted
    fn permission_bits(&self) -> i32;

    /// Cipher in use, when it can be determined
    fn cipher(&self) -> Option<CipherDescriptor>;

    fn pdf_version(&self) -> String;

    /// Whether opening needed a non-empty password
    fn user_password_required(&self) -> bool;
}

/// A document under construction
pub trait OutputDocument {
    fn set_info(&mut self, info: &DocumentInfo);

    /// Appends text paragraphs, flowing onto new pages as needed
    fn add_paragraphs(&mut self, paragraphs: &[String]) -> Result<()>;

    /// Protects the container; applied when it is finalized
    fn set_encryption(&mut self, settings: EncryptionSettings);

    fn page_count(&self) -> u32;

    /// Serialises the container. Consumes it, so a finalized container is
    /// never written twice.
    fn finalize(self) -> Result<Vec<u8>>;
}

/// Factory and page-transfer capabilities of a codec
pub trait PdfCodec: Send + Sync {
    type Source: SourceDocument;
    type Output: OutputDocument;

    /// Opens a document, failing with `SourceUnreadable` on a bad locator,
    /// corrupt data or a wrong password
    fn open(&self, source: &DocumentSource, password: Option<&str>) -> Result<Self::Source>;

    /// Creates an empty container whose pages use `page_size`
    fn create(&self, page_size: PageSize) -> Result<Self::Output>;

    /// Copies one 1-indexed page from `source` into `output` without content loss
    fn import_page(&self, output: &mut Self::Output, source: &Self::Source, page_number: u32) -> Result<()>;

    /// Turns an opened source into an output container holding the whole
    /// document unchanged
    fn restamp(&self, source: Self::Source) -> Result<Self::Output>;
}
