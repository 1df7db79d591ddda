//! Info dictionary handling for rewritten and newly authored documents
//! Author: kartik4091
//! Created: 2025-06-05
//!
//! Creator and Producer are always replaced by the configured branding.
//! Title, Author and Subject are carried forward from the source.

use chrono::Utc;
use lopdf::{Dictionary, Document, Object, StringFormat};

use crate::config::{BrandingConfig, DefaultsConfig};
use crate::types::DocumentInfo;

/// Builds the Info fields of output documents
#[derive(Debug, Clone)]
pub struct InfoCleaner {
    branding: BrandingConfig,
    defaults: DefaultsConfig,
}

impl InfoCleaner {
    pub fn new(branding: BrandingConfig, defaults: DefaultsConfig) -> Self {
        Self { branding, defaults }
    }

    /// Info for a rewritten document: branding replaced, descriptive fields kept
    pub fn rewrite_info(&self, source: &DocumentInfo) -> DocumentInfo {
        DocumentInfo {
            title: Some(non_empty(&source.title).unwrap_or_else(|| self.defaults.rewrite_title.clone())),
            author: Some(non_empty(&source.author).unwrap_or_default()),
            subject: Some(non_empty(&source.subject).unwrap_or_default()),
            keywords: None,
            creator: Some(self.branding.rewrite_creator.clone()),
            producer: Some(self.branding.producer.clone()),
        }
    }

    /// Info for a document authored from scratch
    pub fn secured_info(&self, title: Option<&str>) -> DocumentInfo {
        DocumentInfo {
            title: Some(
                title
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| self.defaults.secured_title.clone()),
            ),
            author: None,
            subject: None,
            keywords: None,
            creator: Some(self.branding.secured_creator.clone()),
            producer: Some(self.branding.producer.clone()),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

/// Encodes a PDF text string: PDFDocEncoding-compatible ASCII as a literal,
/// anything else as UTF-16BE with a byte order mark
pub fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        Object::String(text.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

/// Decodes a PDF text string (UTF-16BE with BOM, UTF-8 with BOM, or Latin-1)
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(rest).into_owned()
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Reads the trailer's Info dictionary, tolerating its absence
pub fn read_info(document: &Document) -> DocumentInfo {
    let dict = match document.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => document.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };

    let Some(dict) = dict else {
        return DocumentInfo::default();
    };

    let field = |key: &[u8]| -> Option<String> {
        let object = match dict.get(key).ok()? {
            Object::Reference(id) => document.get_object(*id).ok()?,
            object => object,
        };
        match object {
            Object::String(bytes, _) => Some(decode_text_string(bytes)),
            _ => None,
        }
    };

    DocumentInfo {
        title: field(b"Title"),
        author: field(b"Author"),
        subject: field(b"Subject"),
        keywords: field(b"Keywords"),
        creator: field(b"Creator"),
        producer: field(b"Producer"),
    }
}

/// Builds an Info dictionary stamped with the current time
pub fn build_info_dictionary(info: &DocumentInfo) -> Dictionary {
    let mut dict = Dictionary::new();
    let fields = [
        ("Title", &info.title),
        ("Author", &info.author),
        ("Subject", &info.subject),
        ("Keywords", &info.keywords),
        ("Creator", &info.creator),
        ("Producer", &info.producer),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            dict.set(key, encode_text_string(value));
        }
    }

    let now = pdf_date_now();
    dict.set("CreationDate", Object::string_literal(now.clone()));
    dict.set("ModDate", Object::string_literal(now));
    dict
}

fn pdf_date_now() -> String {
    Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()
}
