//! Rewrite requests

use crate::security::Credentials;
use crate::types::{Destination, DocumentSource};

/// What happens to a source's encryption during a rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityDisposition {
    /// Carry the source's cipher tier and permission mask forward
    Preserve,
    /// Emit an unencrypted document
    Remove,
}

/// Input of [`RewriteEngine::rewrite_existing`](super::RewriteEngine::rewrite_existing)
#[derive(Debug, Clone)]
pub struct RewriteSpec {
    pub source: DocumentSource,
    /// Passwords opening the source
    pub credentials: Credentials,
    /// Passwords for the output; each falls back to its `credentials` counterpart
    pub new_credentials: Credentials,
    pub destination: Destination,
    pub preserve_security: bool,
    pub remove_security: bool,
}

impl RewriteSpec {
    pub fn new(source: DocumentSource) -> Self {
        Self {
            source,
            credentials: Credentials::default(),
            new_credentials: Credentials::default(),
            destination: Destination::Memory,
            preserve_security: true,
            remove_security: false,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_new_credentials(mut self, credentials: Credentials) -> Self {
        self.new_credentials = credentials;
        self
    }

    pub fn to(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn preserve_security(mut self, preserve: bool) -> Self {
        self.preserve_security = preserve;
        self
    }

    pub fn remove_security(mut self, remove: bool) -> Self {
        self.remove_security = remove;
        self
    }

    /// Resolves the two flags. Removal wins when both are set.
    pub fn disposition(&self) -> SecurityDisposition {
        if self.remove_security || !self.preserve_security {
            SecurityDisposition::Remove
        } else {
            SecurityDisposition::Preserve
        }
    }

    /// Owner password for the output, if any was supplied
    pub fn output_owner_password(&self) -> Option<&str> {
        self.new_credentials.owner().or_else(|| self.credentials.owner())
    }

    /// User password for the output, if any was supplied
    pub fn output_user_password(&self) -> Option<&str> {
        self.new_credentials.user().or_else(|| self.credentials.user())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(true, false, SecurityDisposition::Preserve)]
    #[case(true, true, SecurityDisposition::Remove)]
    #[case(false, true, SecurityDisposition::Remove)]
    #[case(false, false, SecurityDisposition::Remove)]
    fn test_remove_wins(#[case] preserve: bool, #[case] remove: bool, #[case] expected: SecurityDisposition) {
        let spec = RewriteSpec::new(DocumentSource::Bytes(Vec::new()))
            .preserve_security(preserve)
            .remove_security(remove);
        assert_eq!(spec.disposition(), expected);
    }

    #[test]
    fn test_new_passwords_fall_back_to_source_passwords() {
        let spec = RewriteSpec::new(DocumentSource::Bytes(Vec::new()))
            .with_credentials(Credentials::new(Some("old-owner"), Some("old-user")))
            .with_new_credentials(Credentials::new(Some("new-owner"), None));
        assert_eq!(spec.output_owner_password(), Some("new-owner"));
        assert_eq!(spec.output_user_password(), Some("old-user"));
    }

    #[test]
    fn test_defaults_preserve_into_memory() {
        let spec = RewriteSpec::new(DocumentSource::Bytes(Vec::new()));
        assert_eq!(spec.destination, Destination::Memory);
        assert_eq!(spec.disposition(), SecurityDisposition::Preserve);
    }
}
