//! In-memory codec for engine tests
//!
//! Documents are JSON behind a small header, so outputs can be re-opened
//! and inspected without a PDF parser.

use serde::{Deserialize, Serialize};

use crate::codec::{OutputDocument, PdfCodec, SourceDocument};
use crate::error::{Error, Result};
use crate::security::permissions::UNRESTRICTED_MASK;
use crate::security::{CipherDescriptor, EncryptionSettings};
use crate::types::{DocumentInfo, DocumentSource, PageSize};

const HEADER: &[u8] = b"%MEMPDF\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPage {
    pub size: PageSize,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySecurity {
    pub owner_password: String,
    pub user_password: Option<String>,
    pub permission_mask: i32,
    pub cipher: Option<CipherDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    pub version: String,
    pub pages: Vec<MemoryPage>,
    pub info: DocumentInfo,
    pub security: Option<MemorySecurity>,
}

impl MemoryDocument {
    /// A document whose first page is `first` and the rest A4
    pub fn with_pages(count: usize, first: PageSize) -> Self {
        let pages = (0..count)
            .map(|index| MemoryPage {
                size: if index == 0 { first } else { PageSize::A4 },
                content: format!("page {}", index + 1),
            })
            .collect();
        Self {
            version: "1.6".into(),
            pages,
            info: DocumentInfo::default(),
            security: None,
        }
    }

    pub fn info(mut self, info: DocumentInfo) -> Self {
        self.info = info;
        self
    }

    pub fn secured(mut self, owner: &str, user: Option<&str>, permission_mask: i32, cipher: Option<CipherDescriptor>) -> Self {
        self.security = Some(MemorySecurity {
            owner_password: owner.to_string(),
            user_password: user.map(str::to_string),
            permission_mask,
            cipher,
        });
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = HEADER.to_vec();
        bytes.extend(serde_json::to_vec(self).unwrap_or_default());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let body = bytes
            .strip_prefix(HEADER)
            .ok_or_else(|| Error::SourceUnreadable("missing header".into()))?;
        serde_json::from_slice(body).map_err(Error::unreadable)
    }
}

#[derive(Debug)]
pub struct MemorySource {
    pub document: MemoryDocument,
    user_password_required: bool,
}

impl SourceDocument for MemorySource {
    fn page_count(&self) -> u32 {
        self.document.pages.len() as u32
    }

    fn page_size(&self, page_number: u32) -> Result<PageSize> {
        self.document
            .pages
            .get(page_number.wrapping_sub(1) as usize)
            .map(|page| page.size)
            .ok_or_else(|| Error::Codec(format!("page {} out of range", page_number)))
    }

    fn info(&self) -> DocumentInfo {
        self.document.info.clone()
    }

    fn is_encrypted(&self) -> bool {
        self.document.security.is_some()
    }

    fn permission_bits(&self) -> i32 {
        self.document
            .security
            .as_ref()
            .map_or(UNRESTRICTED_MASK, |s| s.permission_mask)
    }

    fn cipher(&self) -> Option<CipherDescriptor> {
        self.document.security.as_ref().and_then(|s| s.cipher)
    }

    fn pdf_version(&self) -> String {
        self.document.version.clone()
    }

    fn user_password_required(&self) -> bool {
        self.user_password_required
    }
}

#[derive(Debug)]
pub struct MemoryOutput {
    pub document: MemoryDocument,
    page_size: PageSize,
    encryption: Option<EncryptionSettings>,
    fail_finalize: bool,
}

impl OutputDocument for MemoryOutput {
    fn set_info(&mut self, info: &DocumentInfo) {
        self.document.info = info.clone();
    }

    fn add_paragraphs(&mut self, paragraphs: &[String]) -> Result<()> {
        self.document.pages.push(MemoryPage {
            size: self.page_size,
            content: paragraphs.join("\n\n"),
        });
        Ok(())
    }

    fn set_encryption(&mut self, settings: EncryptionSettings) {
        self.encryption = Some(settings);
    }

    fn page_count(&self) -> u32 {
        self.document.pages.len() as u32
    }

    fn finalize(mut self) -> Result<Vec<u8>> {
        if self.fail_finalize {
            return Err(Error::Codec("simulated write failure".into()));
        }
        self.document.security = self.encryption.map(|settings| MemorySecurity {
            owner_password: settings.owner_password,
            user_password: settings.user_password,
            permission_mask: settings.permission_mask,
            cipher: Some(CipherDescriptor::new(settings.mode.algorithm(), settings.mode.key_bits())),
        });
        Ok(self.document.to_bytes())
    }
}

/// Codec over [`MemoryDocument`]. Passwords are checked like a standard
/// security handler: a document without a user password opens freely.
#[derive(Debug, Default, Clone)]
pub struct MemoryCodec {
    pub fail_finalize: bool,
}

impl MemoryCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_finalize() -> Self {
        Self { fail_finalize: true }
    }
}

impl PdfCodec for MemoryCodec {
    type Source = MemorySource;
    type Output = MemoryOutput;

    fn open(&self, source: &DocumentSource, password: Option<&str>) -> Result<MemorySource> {
        let document = MemoryDocument::from_bytes(&source.read_bytes()?)?;

        let mut user_password_required = false;
        if let Some(security) = &document.security {
            if let Some(user) = security.user_password.as_deref().filter(|p| !p.is_empty()) {
                user_password_required = true;
                let accepted = matches!(password, Some(p) if p == user || p == security.owner_password);
                if !accepted {
                    return Err(Error::SourceUnreadable("incorrect password".into()));
                }
            }
        }

        Ok(MemorySource {
            document,
            user_password_required,
        })
    }

    fn create(&self, page_size: PageSize) -> Result<MemoryOutput> {
        Ok(MemoryOutput {
            document: MemoryDocument {
                version: "1.7".into(),
                pages: Vec::new(),
                info: DocumentInfo::default(),
                security: None,
            },
            page_size,
            encryption: None,
            fail_finalize: self.fail_finalize,
        })
    }

    fn import_page(&self, output: &mut MemoryOutput, source: &MemorySource, page_number: u32) -> Result<()> {
        let page = source
            .document
            .pages
            .get(page_number.wrapping_sub(1) as usize)
            .ok_or_else(|| Error::Codec(format!("page {} out of range", page_number)))?;
        output.document.pages.push(MemoryPage {
            size: output.page_size,
            content: page.content.clone(),
        });
        Ok(())
    }

    fn restamp(&self, source: MemorySource) -> Result<MemoryOutput> {
        let page_size = source.page_size(1).unwrap_or_default();
        let mut document = source.document;
        document.security = None;
        Ok(MemoryOutput {
            document,
            page_size,
            encryption: None,
            fail_finalize: self.fail_finalize,
        })
    }
}
