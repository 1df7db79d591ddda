//! PDF permission management
//! Author: kartik4091
//! Created: 2025-06-05
//!
//! Translates between the eight user-facing document capabilities and the
//! signed 32-bit `/P` field of a standard security handler.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Bit positions of the `/P` permission field
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PermissionBits: u32 {
        /// Bit 3
        const PRINT = 1 << 2;
        /// Bit 4
        const MODIFY_CONTENTS = 1 << 3;
        /// Bit 5
        const COPY = 1 << 4;
        /// Bit 6
        const MODIFY_ANNOTATIONS = 1 << 5;
        /// Bit 9
        const FILL_FORMS = 1 << 8;
        /// Bit 10
        const SCREEN_READERS = 1 << 9;
        /// Bit 11
        const ASSEMBLE = 1 << 10;
        /// Bit 12
        const PRINT_HIGH_QUALITY = 1 << 11;
        /// Bits 7, 8 and 13-32 must always be set
        const RESERVED = 0xFFFF_F0C0;
    }
}

/// Mask value reported for documents without an encryption dictionary
pub const UNRESTRICTED_MASK: i32 = -1;

/// The eight independent document capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    pub allow_printing: bool,
    pub allow_high_quality_printing: bool,
    pub allow_modify_contents: bool,
    pub allow_copy: bool,
    pub allow_modify_annotations: bool,
    pub allow_fill_in: bool,
    pub allow_screen_readers: bool,
    pub allow_assembly: bool,
}

impl PermissionSet {
    pub const fn all() -> Self {
        Self {
            allow_printing: true,
            allow_high_quality_printing: true,
            allow_modify_contents: true,
            allow_copy: true,
            allow_modify_annotations: true,
            allow_fill_in: true,
            allow_screen_readers: true,
            allow_assembly: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            allow_printing: false,
            allow_high_quality_printing: false,
            allow_modify_contents: false,
            allow_copy: false,
            allow_modify_annotations: false,
            allow_fill_in: false,
            allow_screen_readers: false,
            allow_assembly: false,
        }
    }

    fn capability_table(&self) -> [(bool, PermissionBits); 8] {
        [
            (self.allow_printing, PermissionBits::PRINT),
            (self.allow_high_quality_printing, PermissionBits::PRINT_HIGH_QUALITY),
            (self.allow_modify_contents, PermissionBits::MODIFY_CONTENTS),
            (self.allow_copy, PermissionBits::COPY),
            (self.allow_modify_annotations, PermissionBits::MODIFY_ANNOTATIONS),
            (self.allow_fill_in, PermissionBits::FILL_FORMS),
            (self.allow_screen_readers, PermissionBits::SCREEN_READERS),
            (self.allow_assembly, PermissionBits::ASSEMBLE),
        ]
    }

    /// Granted capabilities as bits, without the reserved ones
    pub fn bits(&self) -> PermissionBits {
        self.capability_table()
            .into_iter()
            .filter(|(granted, _)| *granted)
            .fold(PermissionBits::empty(), |acc, (_, bit)| acc | bit)
    }
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self::none()
    }
}

/// Encodes a permission set into the `/P` field value.
///
/// Reserved bits are always set regardless of the granted capabilities.
pub fn encode(permissions: &PermissionSet) -> i32 {
    (permissions.bits() | PermissionBits::RESERVED).bits() as i32
}

/// Decodes a `/P` field value.
///
/// A document that was never encrypted carries no enforced restriction, so
/// every capability is reported as granted whatever `mask` says.
pub fn decode(mask: i32, was_encrypted: bool) -> PermissionSet {
    if !was_encrypted {
        return PermissionSet::all();
    }

    let bits = PermissionBits::from_bits_truncate(mask as u32);
    PermissionSet {
        allow_printing: bits.contains(PermissionBits::PRINT),
        allow_high_quality_printing: bits.contains(PermissionBits::PRINT_HIGH_QUALITY),
        allow_modify_contents: bits.contains(PermissionBits::MODIFY_CONTENTS),
        allow_copy: bits.contains(PermissionBits::COPY),
        allow_modify_annotations: bits.contains(PermissionBits::MODIFY_ANNOTATIONS),
        allow_fill_in: bits.contains(PermissionBits::FILL_FORMS),
        allow_screen_readers: bits.contains(PermissionBits::SCREEN_READERS),
        allow_assembly: bits.contains(PermissionBits::ASSEMBLE),
    }
}

/// Normalises a free-form flag value.
///
/// Only `Y`, `TRUE` and `1` (any case, surrounding whitespace ignored) are
/// affirmative; absence and anything else mean "not granted".
pub fn is_affirmative(token: Option<&str>) -> bool {
    match token {
        Some(value) => {
            let value = value.trim();
            value.eq_ignore_ascii_case("y")
                || value.eq_ignore_ascii_case("true")
                || value == "1"
        }
        None => false,
    }
}

/// Loosely typed capability flags as they arrive from an untyped boundary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityFlags {
    pub allow_printing: Option<String>,
    pub allow_high_quality_printing: Option<String>,
    pub allow_assembly: Option<String>,
    pub allow_copy: Option<String>,
    pub allow_screen_readers: Option<String>,
    pub allow_modify_contents: Option<String>,
    pub allow_modify_annotations: Option<String>,
    pub allow_fill_in: Option<String>,
}

impl SecurityFlags {
    /// Converts to the strict permission set, failing closed
    pub fn to_permission_set(&self) -> PermissionSet {
        PermissionSet {
            allow_printing: is_affirmative(self.allow_printing.as_deref()),
            allow_high_quality_printing: is_affirmative(self.allow_high_quality_printing.as_deref()),
            allow_modify_contents: is_affirmative(self.allow_modify_contents.as_deref()),
            allow_copy: is_affirmative(self.allow_copy.as_deref()),
            allow_modify_annotations: is_affirmative(self.allow_modify_annotations.as_deref()),
            allow_fill_in: is_affirmative(self.allow_fill_in.as_deref()),
            allow_screen_readers: is_affirmative(self.allow_screen_readers.as_deref()),
            allow_assembly: is_affirmative(self.allow_assembly.as_deref()),
        }
    }
}
