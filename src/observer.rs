//! Observer hooks for the rewrite engine
//!
//! The engine reports its defined points (profile extracted, downgrade
//! applied, operation finalized or failed) through an injected observer
//! instead of writing to a global logger.

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::rewrite::RewriteStage;
use crate::security::{CipherMode, EncryptionRequest, SecurityProfile};

/// Receives engine events. Every method has a no-op default.
pub trait RewriteObserver: Send + Sync {
    fn profile_extracted(&self, _operation: &str, _profile: &SecurityProfile) {}

    /// A requested cipher tier was substituted by a supported one
    fn downgrade_applied(&self, _requested: &EncryptionRequest, _applied: CipherMode) {}

    fn operation_finalized(&self, _operation: &str, _pages: u32, _bytes: usize) {}

    fn operation_failed(&self, _operation: &str, _stage: Option<RewriteStage>, _message: &str) {}
}

/// Forwards engine events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RewriteObserver for TracingObserver {
    fn profile_extracted(&self, operation: &str, profile: &SecurityProfile) {
        info!(
            operation,
            encrypted = profile.encrypted,
            algorithm = %profile.algorithm_name,
            permission_mask = %format!("{:#010x}", profile.permission_mask as u32),
            "Security profile extracted"
        );
    }

    fn downgrade_applied(&self, requested: &EncryptionRequest, applied: CipherMode) {
        warn!(?requested, ?applied, "Requested encryption tier unsupported, downgraded");
    }

    fn operation_finalized(&self, operation: &str, pages: u32, bytes: usize) {
        info!(operation, pages, bytes, "Operation finalized");
    }

    fn operation_failed(&self, operation: &str, stage: Option<RewriteStage>, message: &str) {
        error!(operation, ?stage, message, "Operation failed");
    }
}

/// Event captured by [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    ProfileExtracted { operation: String, encrypted: bool },
    DowngradeApplied { requested: EncryptionRequest, applied: CipherMode },
    OperationFinalized { operation: String, pages: u32, bytes: usize },
    OperationFailed { operation: String, stage: Option<RewriteStage>, message: String },
}

/// Keeps every event in memory, for tests and reports
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().clone()
    }

    pub fn downgrades(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, ObserverEvent::DowngradeApplied { .. }))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn push(&self, event: ObserverEvent) {
        self.events.lock().push(event);
    }
}

impl RewriteObserver for RecordingObserver {
    fn profile_extracted(&self, operation: &str, profile: &SecurityProfile) {
        self.push(ObserverEvent::ProfileExtracted {
            operation: operation.to_string(),
            encrypted: profile.encrypted,
        });
    }

    fn downgrade_applied(&self, requested: &EncryptionRequest, applied: CipherMode) {
        self.push(ObserverEvent::DowngradeApplied {
            requested: requested.clone(),
            applied,
        });
    }

    fn operation_finalized(&self, operation: &str, pages: u32, bytes: usize) {
        self.push(ObserverEvent::OperationFinalized {
            operation: operation.to_string(),
            pages,
            bytes,
        });
    }

    fn operation_failed(&self, operation: &str, stage: Option<RewriteStage>, message: &str) {
        self.push(ObserverEvent::OperationFailed {
            operation: operation.to_string(),
            stage,
            message: message.to_string(),
        });
    }
}
