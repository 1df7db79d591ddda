//! Operation results and the per-call stage machine

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::{Error, ErrorKind};
use crate::security::SecurityProfile;

/// Stages of one operation, in the order they are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RewriteStage {
    Opened,
    ProfileExtracted,
    OutputCreated,
    SecurityApplied,
    PagesCopied,
    Finalized,
}

impl RewriteStage {
    /// The stage after this one; `Finalized` is terminal
    pub fn next(self) -> Self {
        match self {
            RewriteStage::Opened => RewriteStage::ProfileExtracted,
            RewriteStage::ProfileExtracted => RewriteStage::OutputCreated,
            RewriteStage::OutputCreated => RewriteStage::SecurityApplied,
            RewriteStage::SecurityApplied => RewriteStage::PagesCopied,
            RewriteStage::PagesCopied | RewriteStage::Finalized => RewriteStage::Finalized,
        }
    }
}

impl fmt::Display for RewriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Structured result of a public engine operation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteOutcome {
    pub success: bool,
    pub message: String,
    /// Produced document when writing to memory
    #[serde(skip)]
    pub pdf_bytes: Option<Vec<u8>>,
    pub output_path: Option<PathBuf>,
    pub file_size: Option<u64>,
    pub sha256: Option<String>,
    pub page_count: Option<u32>,
    pub original_profile: Option<SecurityProfile>,
    pub new_profile: Option<SecurityProfile>,
    /// Last stage completed, also set on failure
    pub stage_reached: Option<RewriteStage>,
    pub error_kind: Option<ErrorKind>,
}

impl RewriteOutcome {
    pub(crate) fn pending() -> Self {
        Self {
            success: false,
            message: String::new(),
            pdf_bytes: None,
            output_path: None,
            file_size: None,
            sha256: None,
            page_count: None,
            original_profile: None,
            new_profile: None,
            stage_reached: None,
            error_kind: None,
        }
    }

    pub(crate) fn reach(&mut self, stage: RewriteStage) {
        self.stage_reached = Some(stage);
    }

    /// Stage being attempted, given the first stage of the operation
    pub(crate) fn attempting(&self, first: RewriteStage) -> RewriteStage {
        self.stage_reached.map_or(first, RewriteStage::next)
    }

    pub(crate) fn succeed(&mut self, message: impl Into<String>) {
        self.success = true;
        self.message = message.into();
    }

    /// Marks the outcome failed. Anything produced so far is discarded.
    pub(crate) fn fail(&mut self, operation: &str, first: RewriteStage, error: &Error) {
        self.success = false;
        self.message = format!("{} failed at {}: {}", operation, self.attempting(first), error);
        self.error_kind = Some(error.kind());
        self.pdf_bytes = None;
        self.output_path = None;
        self.file_size = None;
        self.sha256 = None;
        self.new_profile = None;
    }

    /// Produced bytes, when the outcome holds them
    pub fn bytes(&self) -> Option<&[u8]> {
        self.pdf_bytes.as_deref()
    }
}
