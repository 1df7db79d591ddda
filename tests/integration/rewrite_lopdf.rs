use pdx_rewrite::codec::LopdfSource;
use pdx_rewrite::security::{CipherAlgorithm, EncryptionLevel, EncryptionRequest, PermissionSet};
use pdx_rewrite::{
    Credentials, Destination, DocumentSource, ErrorKind, LopdfCodec, PageSize, PdfCodec, RewriteEngine,
    RewriteSpec, RewriteStage, RewriterConfig, SecuritySettings, SourceDocument,
};
use pretty_assertions::assert_eq;
use sha2::{Digest, Sha256};

use crate::fixtures::{FixtureCipher, TestFixtures, PRINT_AND_SCREEN_READERS};

fn engine() -> RewriteEngine<LopdfCodec> {
    RewriteEngine::with_config(RewriterConfig::default())
}

fn reopen(bytes: &[u8], password: Option<&str>) -> LopdfSource {
    LopdfCodec::default()
        .open(&DocumentSource::Bytes(bytes.to_vec()), password)
        .unwrap()
}

#[test]
fn test_preserve_aes_source() {
    let engine = engine();
    let spec = RewriteSpec::new(DocumentSource::Bytes(TestFixtures::aes_pdf()))
        .with_credentials(Credentials::new(Some("pw1"), None));

    let outcome = engine.rewrite_existing(&spec);
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.page_count, Some(3));
    assert_eq!(outcome.stage_reached, Some(RewriteStage::Finalized));

    let original = outcome.original_profile.clone().unwrap();
    assert!(original.encrypted);
    assert_eq!(original.algorithm, CipherAlgorithm::Aes);
    assert_eq!(original.encryption_level, EncryptionLevel::Bits128);
    assert!(original.permissions.allow_printing);
    assert!(original.permissions.allow_screen_readers);
    assert!(!original.permissions.allow_copy);

    let new = outcome.new_profile.clone().unwrap();
    assert!(new.encrypted);
    assert_eq!(new.algorithm, CipherAlgorithm::Aes);
    assert_eq!(new.encryption_level, EncryptionLevel::Bits128);
    assert_eq!(new.permission_mask, original.permission_mask);
    assert_eq!(new.creator, "PDF Rewriter Application");
    assert_eq!(new.producer, "PDX Rewriter");

    let reopened = reopen(outcome.bytes().unwrap(), None);
    assert!(reopened.is_encrypted());
    assert_eq!(reopened.page_count(), 3);
}

#[test]
fn test_remove_security() {
    let spec = RewriteSpec::new(DocumentSource::Bytes(TestFixtures::aes_pdf()))
        .with_credentials(Credentials::new(Some("pw1"), None))
        .remove_security(true);

    let outcome = engine().rewrite_existing(&spec);
    assert!(outcome.success, "{}", outcome.message);
    assert!(outcome.original_profile.as_ref().unwrap().encrypted);

    let new = outcome.new_profile.as_ref().unwrap();
    assert!(!new.encrypted);
    assert_eq!(new.permissions, PermissionSet::all());

    let reopened = reopen(outcome.pdf_bytes.as_deref().unwrap(), None);
    assert!(!reopened.is_encrypted());
    assert_eq!(reopened.page_count(), 3);
}

#[test]
fn test_remove_wins_over_preserve() {
    let spec = RewriteSpec::new(DocumentSource::Bytes(TestFixtures::aes_pdf()))
        .preserve_security(true)
        .remove_security(true);

    let outcome = engine().rewrite_existing(&spec);
    assert!(outcome.success, "{}", outcome.message);
    assert!(!outcome.new_profile.as_ref().unwrap().encrypted);
}

#[test]
fn test_plain_source_stays_plain() {
    let outcome = engine().rewrite_existing(&RewriteSpec::new(DocumentSource::Bytes(TestFixtures::plain_pdf(2))));
    assert!(outcome.success, "{}", outcome.message);
    assert!(!outcome.original_profile.as_ref().unwrap().encrypted);

    let new = outcome.new_profile.as_ref().unwrap();
    assert!(!new.encrypted);
    assert_eq!(new.creator, "PDF Rewriter Application");

    let reopened = reopen(outcome.bytes().unwrap(), None);
    let info = reopened.info();
    assert_eq!(info.title.as_deref(), Some("Quarterly Report"));
    assert_eq!(info.author.as_deref(), Some("Finance"));
}

#[test]
fn test_rc4_source_with_user_password() {
    let source = TestFixtures::encrypted_pdf(FixtureCipher::Rc4_128, "owner", "reader", PRINT_AND_SCREEN_READERS);
    let spec = RewriteSpec::new(DocumentSource::Bytes(source))
        .with_credentials(Credentials::new(None, Some("reader")));

    let outcome = engine().rewrite_existing(&spec);
    assert!(outcome.success, "{}", outcome.message);
    let original = outcome.original_profile.clone().unwrap();
    assert_eq!(original.algorithm, CipherAlgorithm::Rc4);
    assert!(original.user_password_present);

    let bytes = outcome.bytes().unwrap();
    assert!(LopdfCodec::default()
        .open(&DocumentSource::Bytes(bytes.to_vec()), None)
        .is_err());
    let reopened = reopen(bytes, Some("reader"));
    assert!(reopened.is_encrypted());
    assert_eq!(reopened.cipher().map(|c| c.algorithm), Some(CipherAlgorithm::Rc4));
    assert_eq!(reopened.permission_bits(), original.permission_mask);
}

#[test]
fn test_rc4_40_source_keeps_its_tier() {
    let source = TestFixtures::encrypted_pdf(FixtureCipher::Rc4_40, "owner", "", PRINT_AND_SCREEN_READERS);
    let spec = RewriteSpec::new(DocumentSource::Bytes(source))
        .with_credentials(Credentials::new(Some("owner"), None));

    let outcome = engine().rewrite_existing(&spec);
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.original_profile.as_ref().unwrap().encryption_level, EncryptionLevel::Bits40);
    assert_eq!(outcome.new_profile.as_ref().unwrap().encryption_level, EncryptionLevel::Bits40);
}

#[test]
fn test_wrong_password_fails_at_open() {
    let source = TestFixtures::encrypted_pdf(FixtureCipher::Rc4_128, "owner", "reader", PRINT_AND_SCREEN_READERS);
    let spec = RewriteSpec::new(DocumentSource::Bytes(source))
        .with_credentials(Credentials::new(None, Some("wrong")));

    let outcome = engine().rewrite_existing(&spec);
    assert!(!outcome.success);
    assert!(outcome.message.starts_with("rewrite failed at Opened"), "{}", outcome.message);
    assert_eq!(outcome.stage_reached, None);
    assert_eq!(outcome.error_kind, Some(ErrorKind::SourceUnreadable));
    assert!(outcome.bytes().is_none());
}

#[test]
fn test_first_page_geometry_applies_to_every_page() {
    let outcome = engine().rewrite_existing(&RewriteSpec::new(DocumentSource::Bytes(TestFixtures::mixed_size_pdf())));
    assert!(outcome.success, "{}", outcome.message);

    let reopened = reopen(outcome.bytes().unwrap(), None);
    assert_eq!(reopened.page_count(), 3);
    for page in 1..=3 {
        assert_eq!(reopened.page_size(page).unwrap(), PageSize::LETTER);
    }
}

#[test]
fn test_rewrite_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.pdf");
    let spec = RewriteSpec::new(DocumentSource::Bytes(TestFixtures::plain_pdf(1))).to(Destination::File(path.clone()));

    let outcome = engine().rewrite_existing(&spec);
    assert!(outcome.success, "{}", outcome.message);
    assert!(outcome.bytes().is_none());
    assert_eq!(outcome.output_path.as_deref(), Some(path.as_path()));

    let written = std::fs::read(&path).unwrap();
    assert_eq!(outcome.file_size, Some(written.len() as u64));
    assert_eq!(outcome.sha256, Some(hex::encode(Sha256::digest(&written))));
    assert!(outcome.new_profile.is_some());
}

#[test]
fn test_missing_source_file() {
    let dir = tempfile::tempdir().unwrap();
    let spec = RewriteSpec::new(DocumentSource::path(dir.path().join("absent.pdf")));

    let outcome = engine().rewrite_existing(&spec);
    assert!(!outcome.success);
    assert_eq!(outcome.error_kind, Some(ErrorKind::SourceUnreadable));
}

#[test]
fn test_create_secured_rc4_128() {
    let settings = SecuritySettings::new(
        PermissionSet {
            allow_printing: true,
            ..PermissionSet::none()
        },
        Credentials::new(Some("owner"), Some("user")),
        EncryptionRequest::from_label(Some("RC4_128")),
    );
    let content = "First paragraph of the memo.\n\nSecond paragraph, which is a little longer.";

    let outcome = engine().create_secured(Some("Memo"), Some(content), &settings, &Destination::Memory);
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.page_count, Some(1));

    let bytes = outcome.bytes().unwrap();
    assert!(LopdfCodec::default()
        .open(&DocumentSource::Bytes(bytes.to_vec()), None)
        .is_err());

    let reopened = reopen(bytes, Some("user"));
    assert_eq!(reopened.cipher().map(|c| c.algorithm), Some(CipherAlgorithm::Rc4));
    assert_eq!(reopened.info().title.as_deref(), Some("Memo"));
    assert_eq!(reopened.info().creator.as_deref(), Some("PDF Security Service"));
    assert_eq!(reopened.page_size(1).unwrap(), PageSize::A4);
}

#[test]
fn test_create_secured_aes_256_is_downgraded() {
    let settings = SecuritySettings::new(
        PermissionSet::all(),
        Credentials::new(Some("owner"), None),
        EncryptionRequest::from_label(Some("AES_256")),
    );

    let outcome = engine().create_secured(None, None, &settings, &Destination::Memory);
    assert!(outcome.success, "{}", outcome.message);

    let new = outcome.new_profile.as_ref().unwrap();
    assert_eq!(new.algorithm, CipherAlgorithm::Aes);
    assert_eq!(new.encryption_level, EncryptionLevel::Bits128);
}

#[test]
fn test_create_secured_without_owner_password() {
    let settings = SecuritySettings::new(
        PermissionSet::all(),
        Credentials::new(None, Some("user")),
        EncryptionRequest::Unspecified,
    );

    let outcome = engine().create_secured(Some("Memo"), Some("text"), &settings, &Destination::Memory);
    assert!(!outcome.success);
    assert_eq!(outcome.error_kind, Some(ErrorKind::MissingRequiredCredential));
    assert_eq!(outcome.stage_reached, None);
    assert!(outcome.bytes().is_none());
}

#[test]
fn test_long_content_flows_onto_several_pages() {
    let settings = SecuritySettings::new(
        PermissionSet::all(),
        Credentials::new(Some("owner"), None),
        EncryptionRequest::from_label(Some("AES_128")),
    );
    let content = (0..200)
        .map(|i| format!("Paragraph {} of a long generated report body.", i))
        .collect::<Vec<_>>()
        .join("\n\n");

    let outcome = engine().create_secured(Some("Report"), Some(&content), &settings, &Destination::Memory);
    assert!(outcome.success, "{}", outcome.message);
    let pages = outcome.page_count.unwrap();
    assert!(pages > 1);

    let reopened = reopen(outcome.bytes().unwrap(), None);
    assert_eq!(reopened.page_count(), pages);
}

#[test]
fn test_apply_security_keeps_metadata() {
    let settings = SecuritySettings::new(
        PermissionSet {
            allow_copy: true,
            ..PermissionSet::none()
        },
        Credentials::new(Some("owner"), None),
        EncryptionRequest::from_label(Some("AES_128")),
    );

    let outcome = engine().apply_security(
        &DocumentSource::Bytes(TestFixtures::plain_pdf(2)),
        None,
        &settings,
        &Destination::Memory,
    );
    assert!(outcome.success, "{}", outcome.message);
    assert!(!outcome.original_profile.as_ref().unwrap().encrypted);

    let new = outcome.new_profile.as_ref().unwrap();
    assert!(new.encrypted);
    assert!(new.permissions.allow_copy);
    assert!(!new.permissions.allow_printing);

    let reopened = reopen(outcome.bytes().unwrap(), None);
    assert_eq!(reopened.page_count(), 2);
    assert_eq!(reopened.info().title.as_deref(), Some("Quarterly Report"));
}

#[test]
fn test_extract_profile_of_aes_source() {
    let profile = engine()
        .extract_security_profile(&DocumentSource::Bytes(TestFixtures::aes_pdf()), None)
        .unwrap();
    assert!(profile.encrypted);
    assert_eq!(profile.algorithm_name, "128-bit AES");
    assert!(!profile.user_password_present);
    assert!(profile.permissions.allow_printing);
    assert!(!profile.permissions.allow_modify_contents);
}
