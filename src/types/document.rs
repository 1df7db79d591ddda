use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Where a source document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl DocumentSource {
    pub fn path<P: Into<PathBuf>>(path: P) -> Self {
        DocumentSource::Path(path.into())
    }

    /// Reads the whole document into memory
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        match self {
            DocumentSource::Path(path) => std::fs::read(path)
                .map_err(|e| Error::SourceUnreadable(format!("{}: {}", path.display(), e))),
            DocumentSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Path(path) => write!(f, "{}", path.display()),
            DocumentSource::Bytes(bytes) => write!(f, "<{} bytes in memory>", bytes.len()),
        }
    }
}

impl From<&Path> for DocumentSource {
    fn from(path: &Path) -> Self {
        DocumentSource::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for DocumentSource {
    fn from(bytes: Vec<u8>) -> Self {
        DocumentSource::Bytes(bytes)
    }
}

/// Where a finished document goes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Destination {
    #[default]
    Memory,
    File(PathBuf),
}

/// Page geometry in PDF user space units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const A4: PageSize = PageSize { width: 595.0, height: 842.0 };
    pub const LETTER: PageSize = PageSize { width: 612.0, height: 792.0 };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Builds a size from a `[llx lly urx ury]` rectangle
    pub fn from_rect(llx: f32, lly: f32, urx: f32, ury: f32) -> Self {
        Self {
            width: (urx - llx).abs(),
            height: (ury - lly).abs(),
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::A4
    }
}

/// Document information dictionary fields this system reads and writes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}
