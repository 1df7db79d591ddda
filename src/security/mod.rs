//! Security module: permission model, encryption policy and profiles
//! Created: 2025-06-03 15:41:54 UTC
//! Author: kartik4091

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub mod encryption;
pub mod permissions;
pub mod profile;

pub use encryption::{resolve, resolve_from_profile, CipherMode, EncryptionRequest};
pub use permissions::{decode, encode, is_affirmative, PermissionBits, PermissionSet, SecurityFlags};
pub use profile::{
    extract_profile, CipherAlgorithm, CipherDescriptor, EncryptionLevel, SecurityProfile,
};

/// Owner and user passwords as supplied by a caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Credentials {
    pub owner_password: Option<String>,
    pub user_password: Option<String>,
}

impl Credentials {
    pub fn new(owner_password: Option<&str>, user_password: Option<&str>) -> Self {
        Self {
            owner_password: owner_password.map(str::to_string),
            user_password: user_password.map(str::to_string),
        }
    }

    /// Owner password when non-empty
    pub fn owner(&self) -> Option<&str> {
        self.owner_password.as_deref().filter(|p| !p.is_empty())
    }

    /// User password when non-empty
    pub fn user(&self) -> Option<&str> {
        self.user_password.as_deref().filter(|p| !p.is_empty())
    }

    /// Password used to open a source; the owner password wins when both are given
    pub fn opening_password(&self) -> Option<&str> {
        self.owner().or_else(|| self.user())
    }
}

/// Explicit security settings for operations that build protection from scratch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuritySettings {
    pub permissions: PermissionSet,
    pub credentials: Credentials,
    pub encryption: EncryptionRequest,
}

impl SecuritySettings {
    pub fn new(permissions: PermissionSet, credentials: Credentials, encryption: EncryptionRequest) -> Self {
        Self {
            permissions,
            credentials,
            encryption,
        }
    }

    /// Builds settings from loosely typed flags. The encryption label
    /// defaults to `RC4_128` when absent.
    pub fn from_flags(flags: &SecurityFlags, credentials: Credentials, encryption_label: Option<&str>) -> Self {
        Self {
            permissions: flags.to_permission_set(),
            credentials,
            encryption: EncryptionRequest::from_label(Some(encryption_label.unwrap_or("RC4_128"))),
        }
    }

    /// Owner password, rejecting requests without one
    pub fn required_owner_password(&self) -> Result<&str> {
        self.credentials.owner().ok_or_else(|| {
            Error::MissingRequiredCredential("owner password must not be empty".to_string())
        })
    }
}

/// Everything the codec needs to protect an output container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionSettings {
    pub owner_password: String,
    pub user_password: Option<String>,
    /// `/P` value written verbatim
    pub permission_mask: i32,
    pub mode: CipherMode,
}
