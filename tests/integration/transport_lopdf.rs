use pdx_rewrite::transport::{
    self, decode_document, encode_document, ApplySecurityRequest, CreateSecuredRequest, UploadRewriteRequest,
};
use pdx_rewrite::{DocumentSource, LopdfCodec, PdfCodec, RewriteEngine, RewriterConfig, SourceDocument};

use crate::fixtures::TestFixtures;

fn engine() -> RewriteEngine<LopdfCodec> {
    RewriteEngine::with_config(RewriterConfig::default())
}

#[test]
fn test_upload_rewrite_round_trip() {
    let request: UploadRewriteRequest = serde_json::from_value(serde_json::json!({
        "pdfFileBase64": encode_document(&TestFixtures::aes_pdf()),
        "fileName": "statement.pdf",
        "ownerPassword": "pw1",
    }))
    .unwrap();
    assert!(request.preserve_security);

    let outcome = transport::upload_and_rewrite(&engine(), &request);
    assert!(outcome.success, "{}", outcome.message);
    assert!(outcome.new_profile.as_ref().unwrap().encrypted);

    let bytes = decode_document(outcome.pdf_base64.as_deref().unwrap()).unwrap();
    assert_eq!(outcome.file_size, Some(bytes.len() as u64));
    let reopened = LopdfCodec::default().open(&DocumentSource::Bytes(bytes), None).unwrap();
    assert_eq!(reopened.page_count(), 3);
}

#[test]
fn test_upload_with_malformed_base64() {
    let request = UploadRewriteRequest {
        pdf_file_base64: "%%% not base64 %%%".to_string(),
        ..Default::default()
    };

    let outcome = transport::upload_and_rewrite(&engine(), &request);
    assert!(!outcome.success);
    assert!(outcome.pdf_base64.is_none());
    assert!(outcome.message.contains("encoding"), "{}", outcome.message);
}

#[test]
fn test_apply_security_base64() {
    let request: ApplySecurityRequest = serde_json::from_value(serde_json::json!({
        "pdfFileBase64": encode_document(&TestFixtures::plain_pdf(1)),
        "allowPrinting": "Y",
        "allowCopy": "N",
        "ownerPassword": "owner",
        "encryptionType": "aes_128",
    }))
    .unwrap();

    let outcome = transport::apply_security_base64(&engine(), &request);
    assert!(outcome.success, "{}", outcome.message);

    let new = outcome.new_profile.as_ref().unwrap();
    assert!(new.encrypted);
    assert!(new.permissions.allow_printing);
    assert!(!new.permissions.allow_copy);
    assert_eq!(new.algorithm_name, "128-bit AES");
}

#[test]
fn test_create_secured_base64_requires_owner() {
    let request: CreateSecuredRequest = serde_json::from_value(serde_json::json!({
        "title": "Memo",
        "content": "Hello",
    }))
    .unwrap();

    let outcome = transport::create_secured_base64(&engine(), &request);
    assert!(!outcome.success);
    assert!(outcome.pdf_base64.is_none());
}
