//! Encryption policy
//!
//! Resolves a requested or inherited encryption strength into one of the
//! cipher modes the codec can write. Both resolutions are total: every input
//! yields a mode, and the unsupported 256-bit tier is downgraded to AES-128
//! with a warning sent to the observer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::observer::RewriteObserver;
use crate::security::profile::{CipherAlgorithm, EncryptionLevel, SecurityProfile};

/// Concrete cipher modes supported for standard security handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CipherMode {
    /// RC4 with a 40-bit key, `/V 1 /R 2`
    Rc4_40,
    /// RC4 with a 128-bit key, `/V 2 /R 3`
    Rc4_128,
    /// AES-128 through a crypt filter, `/V 4 /R 4`
    Aes128,
}

impl CipherMode {
    pub fn key_bits(self) -> u16 {
        match self {
            CipherMode::Rc4_40 => 40,
            CipherMode::Rc4_128 | CipherMode::Aes128 => 128,
        }
    }

    pub fn algorithm(self) -> CipherAlgorithm {
        match self {
            CipherMode::Rc4_40 | CipherMode::Rc4_128 => CipherAlgorithm::Rc4,
            CipherMode::Aes128 => CipherAlgorithm::Aes,
        }
    }
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherMode::Rc4_40 => write!(f, "RC4_40"),
            CipherMode::Rc4_128 => write!(f, "RC4_128"),
            CipherMode::Aes128 => write!(f, "AES_128"),
        }
    }
}

/// Requested encryption strength, parsed from a case-insensitive label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptionRequest {
    Rc4_40,
    Rc4_128,
    Aes128,
    Aes256,
    /// A 256-bit tier read back from a source document
    InheritedAes256,
    Unrecognized(String),
    Unspecified,
}

impl EncryptionRequest {
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some(label) => Self::parse_label(label),
            None => EncryptionRequest::Unspecified,
        }
    }

    fn parse_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "RC4_40" => EncryptionRequest::Rc4_40,
            "RC4_128" => EncryptionRequest::Rc4_128,
            "AES_128" => EncryptionRequest::Aes128,
            "AES_256" => EncryptionRequest::Aes256,
            "" => EncryptionRequest::Unspecified,
            _ => EncryptionRequest::Unrecognized(label.to_string()),
        }
    }
}

impl FromStr for EncryptionRequest {
    type Err = std::convert::Infallible;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_label(label))
    }
}

/// Maps a requested label to a cipher mode.
///
/// Unrecognised or absent labels fall back to RC4-128.
pub fn resolve(request: &EncryptionRequest, observer: &dyn RewriteObserver) -> CipherMode {
    match request {
        EncryptionRequest::Rc4_40 => CipherMode::Rc4_40,
        EncryptionRequest::Rc4_128 => CipherMode::Rc4_128,
        EncryptionRequest::Aes128 => CipherMode::Aes128,
        EncryptionRequest::Aes256 | EncryptionRequest::InheritedAes256 => {
            observer.downgrade_applied(request, CipherMode::Aes128);
            CipherMode::Aes128
        }
        EncryptionRequest::Unrecognized(_) | EncryptionRequest::Unspecified => CipherMode::Rc4_128,
    }
}

/// Picks the cipher mode used when carrying a source's encryption forward.
///
/// Rules, in order:
/// 1. no recorded level: AES-128
/// 2. 256-bit: AES-128, with a downgrade signal
/// 3. 128-bit: keep the cipher family (AES-128 or RC4-128)
/// 4. 40-bit: RC4-40
pub fn resolve_from_profile(profile: &SecurityProfile, observer: &dyn RewriteObserver) -> CipherMode {
    match (profile.encryption_level, profile.algorithm) {
        (EncryptionLevel::None, _) => CipherMode::Aes128,
        (EncryptionLevel::Bits256, _) => resolve(&EncryptionRequest::InheritedAes256, observer),
        (EncryptionLevel::Bits128, CipherAlgorithm::Aes) => CipherMode::Aes128,
        (EncryptionLevel::Bits128, _) => CipherMode::Rc4_128,
        (EncryptionLevel::Bits40, _) => CipherMode::Rc4_40,
    }
}
