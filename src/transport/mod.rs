//! Transport layer: Base64 payloads and staged uploads
//!
//! Requests arriving as encoded documents are decoded here and, for the
//! rewrite path, staged to a private temporary directory that lives exactly
//! as long as one operation.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use crate::codec::PdfCodec;
use crate::error::{Error, Result};
use crate::rewrite::{RewriteEngine, RewriteOutcome, RewriteSpec};
use crate::security::{Credentials, SecurityFlags, SecurityProfile, SecuritySettings};
use crate::types::{Destination, DocumentSource};

/// Decodes a standard Base64 document payload. Surrounding whitespace is
/// ignored.
pub fn decode_document(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::EncodingMalformed(e.to_string()))
}

pub fn encode_document(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Reduces a client-supplied name to its last path component
fn sanitize_file_name(name: &str) -> String {
    let last = name
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty() && *part != "." && *part != "..")
        .unwrap_or("");
    if last.is_empty() {
        "upload.pdf".to_string()
    } else {
        last.to_string()
    }
}

/// Decoded upload written to its own temporary directory.
///
/// The directory is removed on [`close`](Self::close) or drop. Removal
/// failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct StagedUpload {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl StagedUpload {
    #[instrument(skip(bytes), fields(size = bytes.len()))]
    pub fn stage(prefix: &str, file_name: &str, bytes: &[u8]) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        let path = dir.path().join(sanitize_file_name(file_name));
        fs::write(&path, bytes)?;
        debug!(path = %path.display(), "Upload staged");
        Ok(Self { dir: Some(dir), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the staging directory now
    pub fn close(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        if let Some(dir) = self.dir.take() {
            let location = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %location.display(), "Failed to remove staged upload: {}", e);
            }
        }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Rewrite request carrying the document inline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadRewriteRequest {
    pub pdf_file_base64: String,
    pub file_name: String,
    pub owner_password: Option<String>,
    pub user_password: Option<String>,
    pub preserve_security: bool,
}

impl Default for UploadRewriteRequest {
    fn default() -> Self {
        Self {
            pdf_file_base64: String::new(),
            file_name: "upload.pdf".to_string(),
            owner_password: None,
            user_password: None,
            preserve_security: true,
        }
    }
}

/// Request to protect an inline document from scratch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApplySecurityRequest {
    pub pdf_file_base64: String,
    pub file_name: String,
    #[serde(flatten)]
    pub flags: SecurityFlags,
    pub owner_password: Option<String>,
    pub user_password: Option<String>,
    pub encryption_type: Option<String>,
}

/// Request to author a protected document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateSecuredRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(flatten)]
    pub flags: SecurityFlags,
    pub owner_password: Option<String>,
    pub user_password: Option<String>,
    pub encryption_type: Option<String>,
}

fn settings_from(
    flags: &SecurityFlags,
    owner_password: &Option<String>,
    user_password: &Option<String>,
    encryption_type: &Option<String>,
) -> SecuritySettings {
    SecuritySettings::from_flags(
        flags,
        Credentials::new(owner_password.as_deref(), user_password.as_deref()),
        encryption_type.as_deref(),
    )
}

/// Result of a transport operation, with the document Base64 encoded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportOutcome {
    pub success: bool,
    pub message: String,
    pub pdf_base64: Option<String>,
    pub file_size: Option<u64>,
    pub original_profile: Option<SecurityProfile>,
    pub new_profile: Option<SecurityProfile>,
}

impl TransportOutcome {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            message,
            pdf_base64: None,
            file_size: None,
            original_profile: None,
            new_profile: None,
        }
    }
}

impl From<RewriteOutcome> for TransportOutcome {
    fn from(outcome: RewriteOutcome) -> Self {
        if !outcome.success {
            return Self {
                original_profile: outcome.original_profile,
                ..Self::failure(outcome.message)
            };
        }
        Self {
            success: true,
            pdf_base64: outcome.bytes().map(encode_document),
            file_size: outcome.file_size,
            message: outcome.message,
            original_profile: outcome.original_profile,
            new_profile: outcome.new_profile,
        }
    }
}

/// Decodes, stages and rewrites an uploaded document. The staging
/// directory is removed whatever the result.
#[instrument(skip(engine, request), fields(file_name = %request.file_name))]
pub fn upload_and_rewrite<C: PdfCodec>(engine: &RewriteEngine<C>, request: &UploadRewriteRequest) -> TransportOutcome {
    info!("Upload and rewrite requested");
    let bytes = match decode_document(&request.pdf_file_base64) {
        Ok(bytes) => bytes,
        Err(e) => return TransportOutcome::failure(format!("upload failed: {}", e)),
    };
    let staged = match StagedUpload::stage(&engine.config().temp_prefix, &request.file_name, &bytes) {
        Ok(staged) => staged,
        Err(e) => return TransportOutcome::failure(format!("upload failed: {}", e)),
    };

    let spec = RewriteSpec::new(DocumentSource::path(staged.path()))
        .with_credentials(Credentials::new(
            request.owner_password.as_deref(),
            request.user_password.as_deref(),
        ))
        .preserve_security(request.preserve_security)
        .to(Destination::Memory);
    let outcome = engine.rewrite_existing(&spec);
    staged.close();

    outcome.into()
}

/// Protects an inline document under flags built from scratch
#[instrument(skip(engine, request), fields(file_name = %request.file_name))]
pub fn apply_security_base64<C: PdfCodec>(engine: &RewriteEngine<C>, request: &ApplySecurityRequest) -> TransportOutcome {
    let bytes = match decode_document(&request.pdf_file_base64) {
        Ok(bytes) => bytes,
        Err(e) => return TransportOutcome::failure(format!("apply_security failed: {}", e)),
    };
    let settings = settings_from(
        &request.flags,
        &request.owner_password,
        &request.user_password,
        &request.encryption_type,
    );
    engine
        .apply_security(&DocumentSource::Bytes(bytes), None, &settings, &Destination::Memory)
        .into()
}

/// Authors a protected document and returns it encoded
#[instrument(skip(engine, request))]
pub fn create_secured_base64<C: PdfCodec>(engine: &RewriteEngine<C>, request: &CreateSecuredRequest) -> TransportOutcome {
    let settings = settings_from(
        &request.flags,
        &request.owner_password,
        &request.user_password,
        &request.encryption_type,
    );
    engine
        .create_secured(
            request.title.as_deref(),
            request.content.as_deref(),
            &settings,
            &Destination::Memory,
        )
        .into()
}
