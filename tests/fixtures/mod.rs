use std::collections::BTreeMap;
use std::sync::Arc;

use lopdf::encryption::crypt_filters::{Aes128CryptFilter, CryptFilter};
use lopdf::{dictionary, Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream, StringFormat};

pub const LETTER: (f32, f32) = (612.0, 792.0);
pub const A4: (f32, f32) = (595.0, 842.0);

/// print (bit 3) and screen readers (bit 10) on top of the reserved bits
pub const PRINT_AND_SCREEN_READERS: i32 = -3904 | (1 << 2) | (1 << 9);

pub enum FixtureCipher {
    Rc4_40,
    Rc4_128,
    Aes128,
}

pub struct TestFixtures;

impl TestFixtures {
    /// Unencrypted document. The first page uses `first_size`, the rest A4.
    pub fn document(pages: u32, first_size: (f32, f32)) -> Document {
        let mut doc = Document::with_version("1.5");
        doc.trailer.set(
            "ID",
            Object::Array(vec![
                Object::String(vec![7u8; 16], StringFormat::Hexadecimal),
                Object::String(vec![7u8; 16], StringFormat::Hexadecimal),
            ]),
        );

        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids: Vec<Object> = Vec::new();
        for number in 1..=pages {
            let (width, height) = if number == 1 { first_size } else { A4 };
            let content = format!("BT\n/F1 12 Tf\n72 700 Td\n(Page {}) Tj\nET\n", number);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), Object::Real(width), Object::Real(height)],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Quarterly Report"),
            "Author" => Object::string_literal("Finance"),
            "Creator" => Object::string_literal("Fixture Writer"),
            "Producer" => Object::string_literal("Fixture Producer 1.0"),
        });
        doc.trailer.set("Info", info_id);
        doc
    }

    pub fn plain_pdf(pages: u32) -> Vec<u8> {
        Self::save(Self::document(pages, A4))
    }

    /// Letter first page followed by A4 pages
    pub fn mixed_size_pdf() -> Vec<u8> {
        Self::save(Self::document(3, LETTER))
    }

    /// Encrypted three page document
    pub fn encrypted_pdf(cipher: FixtureCipher, owner: &str, user: &str, mask: i32) -> Vec<u8> {
        let mut doc = Self::document(3, A4);
        let permissions = Permissions::from_bits_retain((mask as u32).into());

        let version = match cipher {
            FixtureCipher::Rc4_40 => EncryptionVersion::V1 {
                document: &doc,
                owner_password: owner,
                user_password: user,
                permissions,
            },
            FixtureCipher::Rc4_128 => EncryptionVersion::V2 {
                document: &doc,
                owner_password: owner,
                user_password: user,
                key_length: 128,
                permissions,
            },
            FixtureCipher::Aes128 => {
                let crypt_filter: Arc<dyn CryptFilter> = Arc::new(Aes128CryptFilter);
                EncryptionVersion::V4 {
                    document: &doc,
                    encrypt_metadata: true,
                    crypt_filters: BTreeMap::from([(b"StdCF".to_vec(), crypt_filter)]),
                    stream_filter: b"StdCF".to_vec(),
                    string_filter: b"StdCF".to_vec(),
                    owner_password: owner,
                    user_password: user,
                    permissions,
                }
            }
        };

        let state = EncryptionState::try_from(version).unwrap();
        doc.encrypt(&state).unwrap();
        Self::save(doc)
    }

    pub fn aes_pdf() -> Vec<u8> {
        Self::encrypted_pdf(FixtureCipher::Aes128, "pw1", "", PRINT_AND_SCREEN_READERS)
    }

    pub fn save(mut doc: Document) -> Vec<u8> {
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}
