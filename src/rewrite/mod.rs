//! Rewrite engine
//!
//! Drives a [`PdfCodec`] through open, profile extraction, output creation,
//! security, page copy and finalize. Every public operation is stateless and
//! converts failures into a [`RewriteOutcome`] instead of returning an error.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::codec::text_layout::split_paragraphs;
use crate::codec::{LopdfCodec, OutputDocument, PdfCodec, SourceDocument};
use crate::config::RewriterConfig;
use crate::error::{Error, Result};
use crate::metadata::InfoCleaner;
use crate::observer::{RewriteObserver, TracingObserver};
use crate::security::{
    encode, extract_profile, resolve, resolve_from_profile, EncryptionSettings, SecurityProfile, SecuritySettings,
};
use crate::types::{Destination, DocumentSource};

mod outcome;
mod request;

pub use outcome::{RewriteOutcome, RewriteStage};
pub use request::{RewriteSpec, SecurityDisposition};

const REWRITE: &str = "rewrite";
const CREATE_SECURED: &str = "create_secured";
const APPLY_SECURITY: &str = "apply_security";
const EXTRACT_PROFILE: &str = "extract_security_profile";

/// Orchestrates rewrites over a codec. Holds no per-operation state, so one
/// engine can be shared across threads.
pub struct RewriteEngine<C: PdfCodec> {
    codec: C,
    config: RewriterConfig,
    info_cleaner: InfoCleaner,
    observer: Arc<dyn RewriteObserver>,
}

impl RewriteEngine<LopdfCodec> {
    /// Engine over the lopdf codec
    pub fn with_config(config: RewriterConfig) -> Self {
        let codec = LopdfCodec::new(config.layout.clone());
        Self::new(codec, config)
    }
}

impl<C: PdfCodec> RewriteEngine<C> {
    pub fn new(codec: C, config: RewriterConfig) -> Self {
        let info_cleaner = InfoCleaner::new(config.branding.clone(), config.defaults.clone());
        Self {
            codec,
            config,
            info_cleaner,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RewriteObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &RewriterConfig {
        &self.config
    }

    /// Re-emits an existing document under new metadata and the requested
    /// security disposition
    #[instrument(skip(self, spec), fields(source = %spec.source))]
    pub fn rewrite_existing(&self, spec: &RewriteSpec) -> RewriteOutcome {
        let mut outcome = RewriteOutcome::pending();
        match self.run_rewrite(spec, &mut outcome) {
            Ok(()) => outcome.succeed("PDF rewritten successfully"),
            Err(e) => self.fail(&mut outcome, REWRITE, RewriteStage::Opened, &e),
        }
        outcome
    }

    /// Authors a new protected document from a title and body text.
    ///
    /// An owner password is mandatory; its absence is rejected before the
    /// codec is touched.
    #[instrument(skip(self, content, settings, destination))]
    pub fn create_secured(
        &self,
        title: Option<&str>,
        content: Option<&str>,
        settings: &SecuritySettings,
        destination: &Destination,
    ) -> RewriteOutcome {
        let mut outcome = RewriteOutcome::pending();
        match self.run_create(title, content, settings, destination, &mut outcome) {
            Ok(()) => outcome.succeed("Secured PDF created successfully"),
            Err(e) => self.fail(&mut outcome, CREATE_SECURED, RewriteStage::OutputCreated, &e),
        }
        outcome
    }

    /// Re-encrypts an existing document as a whole, keeping its objects and
    /// metadata, under settings built from scratch
    #[instrument(skip(self, source, password, settings, destination), fields(source = %source))]
    pub fn apply_security(
        &self,
        source: &DocumentSource,
        password: Option<&str>,
        settings: &SecuritySettings,
        destination: &Destination,
    ) -> RewriteOutcome {
        let mut outcome = RewriteOutcome::pending();
        match self.run_apply(source, password, settings, destination, &mut outcome) {
            Ok(()) => outcome.succeed("Security settings applied successfully"),
            Err(e) => self.fail(&mut outcome, APPLY_SECURITY, RewriteStage::Opened, &e),
        }
        outcome
    }

    /// Reads the security profile of a document without changing it
    #[instrument(skip(self, source, password), fields(source = %source))]
    pub fn extract_security_profile(&self, source: &DocumentSource, password: Option<&str>) -> Result<SecurityProfile> {
        let opened = self.codec.open(source, password)?;
        let profile = extract_profile(&opened);
        self.observer.profile_extracted(EXTRACT_PROFILE, &profile);
        Ok(profile)
    }

    fn run_rewrite(&self, spec: &RewriteSpec, outcome: &mut RewriteOutcome) -> Result<()> {
        let source = self.codec.open(&spec.source, spec.credentials.opening_password())?;
        outcome.reach(RewriteStage::Opened);

        let profile = extract_profile(&source);
        self.observer.profile_extracted(REWRITE, &profile);
        outcome.original_profile = Some(profile.clone());
        outcome.reach(RewriteStage::ProfileExtracted);

        let pages = source.page_count();
        if pages == 0 {
            return Err(Error::EmptyDocument);
        }
        let page_size = source.page_size(1)?;
        let mut output = self.codec.create(page_size)?;
        output.set_info(&self.info_cleaner.rewrite_info(&source.info()));
        outcome.reach(RewriteStage::OutputCreated);

        let output_password = match spec.disposition() {
            SecurityDisposition::Preserve if profile.encrypted => {
                let settings = self.preserved_encryption(spec, &profile);
                let owner = settings.owner_password.clone();
                output.set_encryption(settings);
                Some(owner)
            }
            SecurityDisposition::Preserve => {
                debug!("Source is not encrypted, nothing to preserve");
                None
            }
            SecurityDisposition::Remove => {
                debug!("Output will be unencrypted");
                None
            }
        };
        outcome.reach(RewriteStage::SecurityApplied);

        for page_number in 1..=pages {
            self.codec.import_page(&mut output, &source, page_number)?;
        }
        debug!(pages, "Pages copied");
        outcome.reach(RewriteStage::PagesCopied);

        self.finish(REWRITE, output, &spec.destination, output_password.as_deref(), outcome)
    }

    fn run_create(
        &self,
        title: Option<&str>,
        content: Option<&str>,
        settings: &SecuritySettings,
        destination: &Destination,
        outcome: &mut RewriteOutcome,
    ) -> Result<()> {
        let owner_password = settings.required_owner_password()?.to_string();

        let mut output = self.codec.create(self.config.layout.page_size)?;
        output.set_info(&self.info_cleaner.secured_info(title));
        outcome.reach(RewriteStage::OutputCreated);

        output.set_encryption(self.explicit_encryption(settings, owner_password.clone()));
        outcome.reach(RewriteStage::SecurityApplied);

        let text = content
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(&self.config.defaults.secured_content);
        output.add_paragraphs(&split_paragraphs(text))?;
        outcome.reach(RewriteStage::PagesCopied);

        self.finish(CREATE_SECURED, output, destination, Some(&owner_password), outcome)
    }

    fn run_apply(
        &self,
        source: &DocumentSource,
        password: Option<&str>,
        settings: &SecuritySettings,
        destination: &Destination,
        outcome: &mut RewriteOutcome,
    ) -> Result<()> {
        let owner_password = settings.required_owner_password()?.to_string();

        let opened = self.codec.open(source, password)?;
        outcome.reach(RewriteStage::Opened);

        let profile = extract_profile(&opened);
        self.observer.profile_extracted(APPLY_SECURITY, &profile);
        outcome.original_profile = Some(profile);
        outcome.reach(RewriteStage::ProfileExtracted);

        let mut output = self.codec.restamp(opened)?;
        outcome.reach(RewriteStage::OutputCreated);

        output.set_encryption(self.explicit_encryption(settings, owner_password.clone()));
        outcome.reach(RewriteStage::SecurityApplied);

        // The whole document is kept, so there is nothing to copy
        outcome.reach(RewriteStage::PagesCopied);

        self.finish(APPLY_SECURITY, output, destination, Some(&owner_password), outcome)
    }

    /// Encryption carried over from the source: same cipher family, the
    /// source's permission mask verbatim
    fn preserved_encryption(&self, spec: &RewriteSpec, profile: &SecurityProfile) -> EncryptionSettings {
        let owner_password = match spec.output_owner_password() {
            Some(owner) => owner.to_string(),
            None => {
                debug!("No owner password supplied, using placeholder");
                self.config.defaults.placeholder_owner_password.clone()
            }
        };
        EncryptionSettings {
            owner_password,
            user_password: spec.output_user_password().map(str::to_string),
            permission_mask: profile.permission_mask,
            mode: resolve_from_profile(profile, self.observer.as_ref()),
        }
    }

    fn explicit_encryption(&self, settings: &SecuritySettings, owner_password: String) -> EncryptionSettings {
        EncryptionSettings {
            owner_password,
            user_password: settings.credentials.user().map(str::to_string),
            permission_mask: encode(&settings.permissions),
            mode: resolve(&settings.encryption, self.observer.as_ref()),
        }
    }

    /// Finalizes, delivers and optionally verifies the output
    fn finish(
        &self,
        operation: &str,
        output: C::Output,
        destination: &Destination,
        password: Option<&str>,
        outcome: &mut RewriteOutcome,
    ) -> Result<()> {
        let pages = output.page_count();
        let bytes = output.finalize()?;

        outcome.page_count = Some(pages);
        outcome.file_size = Some(bytes.len() as u64);
        outcome.sha256 = Some(hex::encode(Sha256::digest(&bytes)));

        let verify_source = match destination {
            Destination::Memory => {
                let source = self.config.verify_output.then(|| DocumentSource::Bytes(bytes.clone()));
                outcome.pdf_bytes = Some(bytes);
                source
            }
            Destination::File(path) => {
                write_atomically(path, &bytes, &self.config.temp_prefix)?;
                outcome.output_path = Some(path.clone());
                self.config.verify_output.then(|| DocumentSource::Path(path.clone()))
            }
        };
        outcome.reach(RewriteStage::Finalized);
        self.observer
            .operation_finalized(operation, pages, outcome.file_size.unwrap_or_default() as usize);

        if let Some(source) = verify_source {
            match self.codec.open(&source, password) {
                Ok(reopened) => outcome.new_profile = Some(extract_profile(&reopened)),
                Err(e) => warn!(operation, "Output verification failed: {}", e),
            }
        }
        Ok(())
    }

    fn fail(&self, outcome: &mut RewriteOutcome, operation: &str, first: RewriteStage, error: &Error) {
        outcome.fail(operation, first, error);
        self.observer
            .operation_failed(operation, outcome.stage_reached, &outcome.message);
    }
}

/// Writes through a temporary file next to `path`, renamed into place once
/// complete
fn write_atomically(path: &Path, bytes: &[u8], prefix: &str) -> Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".pdf.part")
        .tempfile_in(directory)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
