//! Codec-independent snapshot of a document's protection state

use serde::{Deserialize, Serialize};

use crate::codec::SourceDocument;
use crate::security::permissions::{self, PermissionSet, UNRESTRICTED_MASK};

/// Key length tier of a standard security handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptionLevel {
    None,
    Bits40,
    Bits128,
    Bits256,
}

impl EncryptionLevel {
    /// Key length in bits, `None` when unencrypted
    pub fn bits(self) -> Option<u16> {
        match self {
            EncryptionLevel::None => None,
            EncryptionLevel::Bits40 => Some(40),
            EncryptionLevel::Bits128 => Some(128),
            EncryptionLevel::Bits256 => Some(256),
        }
    }

    /// Buckets an arbitrary key length. RC4 lengths between 40 and 128 bits
    /// are reported as 128.
    pub fn from_key_bits(bits: u16) -> Self {
        match bits {
            0..=40 => EncryptionLevel::Bits40,
            41..=128 => EncryptionLevel::Bits128,
            _ => EncryptionLevel::Bits256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CipherAlgorithm {
    None,
    Rc4,
    Aes,
}

/// Approximate description of a source's cipher, as read back from the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherDescriptor {
    pub algorithm: CipherAlgorithm,
    pub key_bits: u16,
}

impl CipherDescriptor {
    pub fn new(algorithm: CipherAlgorithm, key_bits: u16) -> Self {
        Self { algorithm, key_bits }
    }

    pub fn level(&self) -> EncryptionLevel {
        EncryptionLevel::from_key_bits(self.key_bits)
    }

    pub fn display_name(&self) -> String {
        match self.algorithm {
            CipherAlgorithm::Rc4 => format!("{}-bit RC4", self.key_bits),
            CipherAlgorithm::Aes => format!("{}-bit AES", self.key_bits),
            CipherAlgorithm::None => "Unknown".to_string(),
        }
    }
}

/// Normalised security state of one document.
///
/// Built once per document read and never mutated; rewritten output gets a
/// profile of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityProfile {
    pub encrypted: bool,
    pub encryption_level: EncryptionLevel,
    pub algorithm: CipherAlgorithm,
    pub algorithm_name: String,
    /// Raw `/P` value, `-1` when unencrypted
    pub permission_mask: i32,
    pub permissions: PermissionSet,
    pub owner_password_present: bool,
    pub user_password_present: bool,
    pub pdf_version: String,
    pub creator: String,
    pub producer: String,
}

impl SecurityProfile {
    /// Profile of a document without an encryption dictionary
    pub fn unencrypted(pdf_version: String, creator: String, producer: String) -> Self {
        Self {
            encrypted: false,
            encryption_level: EncryptionLevel::None,
            algorithm: CipherAlgorithm::None,
            algorithm_name: "None".to_string(),
            permission_mask: UNRESTRICTED_MASK,
            permissions: PermissionSet::all(),
            owner_password_present: false,
            user_password_present: false,
            pdf_version,
            creator,
            producer,
        }
    }

    /// Profile of an encrypted document. An unknown cipher leaves the level
    /// unrecorded.
    pub fn encrypted(
        cipher: Option<CipherDescriptor>,
        permission_mask: i32,
        user_password_present: bool,
        pdf_version: String,
        creator: String,
        producer: String,
    ) -> Self {
        let (encryption_level, algorithm, algorithm_name) = match cipher {
            Some(descriptor) => (descriptor.level(), descriptor.algorithm, descriptor.display_name()),
            None => (EncryptionLevel::None, CipherAlgorithm::None, "Unknown".to_string()),
        };

        Self {
            encrypted: true,
            encryption_level,
            algorithm,
            algorithm_name,
            permission_mask,
            permissions: permissions::decode(permission_mask, true),
            owner_password_present: true,
            user_password_present,
            pdf_version,
            creator,
            producer,
        }
    }
}

/// Reads the security profile of an opened source. Does not touch the source.
pub fn extract_profile<S: SourceDocument + ?Sized>(source: &S) -> SecurityProfile {
    let info = source.info();
    let creator = info.creator.unwrap_or_else(|| "Unknown".to_string());
    let producer = info.producer.unwrap_or_else(|| "Unknown".to_string());

    if source.is_encrypted() {
        SecurityProfile::encrypted(
            source.cipher(),
            source.permission_bits(),
            source.user_password_required(),
            source.pdf_version(),
            creator,
            producer,
        )
    } else {
        SecurityProfile::unencrypted(source.pdf_version(), creator, producer)
    }
}
