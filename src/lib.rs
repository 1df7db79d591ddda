//! PDF security rewrite library
//!
//! Re-emits existing PDF documents under new metadata and a chosen security
//! disposition, and authors new protected documents from text. The
//! permission model and encryption policy live in [`security`]; the
//! orchestration lives in [`rewrite`] and drives a [`codec::PdfCodec`].

pub mod codec;
pub mod config;
pub mod error;
pub mod metadata;
pub mod observer;
pub mod rewrite;
pub mod security;
pub mod transport;
pub mod types;
pub mod utils;

pub use codec::{LopdfCodec, OutputDocument, PdfCodec, SourceDocument};
pub use config::RewriterConfig;
pub use error::{Error, ErrorKind, Result};
pub use observer::{RecordingObserver, RewriteObserver, TracingObserver};
pub use rewrite::{RewriteEngine, RewriteOutcome, RewriteSpec, RewriteStage, SecurityDisposition};
pub use security::{
    CipherMode, Credentials, EncryptionRequest, PermissionSet, SecurityFlags, SecurityProfile, SecuritySettings,
};
pub use transport::TransportOutcome;
pub use types::{Destination, DocumentSource, PageSize};
