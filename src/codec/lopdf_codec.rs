//! Production codec over `lopdf`

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::encryption::crypt_filters::{Aes128CryptFilter, CryptFilter};
use lopdf::{dictionary, Dictionary, Document, EncryptionState, EncryptionVersion, Object, ObjectId, Permissions, Stream, StringFormat};
use tracing::{debug, instrument, warn};

use crate::codec::page_import::{inherited_attribute, PageImporter};
use crate::codec::text_layout::{layout_paragraphs, LayoutLine};
use crate::codec::{OutputDocument, PdfCodec, SourceDocument};
use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::metadata::{build_info_dictionary, ensure_file_id, read_info, reset_file_id};
use crate::security::permissions::UNRESTRICTED_MASK;
use crate::security::{CipherAlgorithm, CipherDescriptor, CipherMode, EncryptionSettings};
use crate::types::{DocumentInfo, DocumentSource, PageSize};

const OUTPUT_VERSION: &str = "1.7";
const FONT_RESOURCE: &str = "F1";
const CRYPT_FILTER: &[u8] = b"StdCF";

/// Codec built on `lopdf`
#[derive(Debug, Clone, Default)]
pub struct LopdfCodec {
    layout: LayoutConfig,
}

impl LopdfCodec {
    pub fn new(layout: LayoutConfig) -> Self {
        Self { layout }
    }
}

/// A loaded, decrypted document
#[derive(Debug)]
pub struct LopdfSource {
    document: Document,
    pages: BTreeMap<u32, ObjectId>,
    cipher: Option<CipherDescriptor>,
    permission_mask: i32,
    encrypted: bool,
    user_password_required: bool,
}

impl LopdfSource {
    pub fn document(&self) -> &Document {
        &self.document
    }
}

impl SourceDocument for LopdfSource {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page_number: u32) -> Result<PageSize> {
        let page_id = self
            .pages
            .get(&page_number)
            .ok_or_else(|| Error::Codec(format!("page {} out of range", page_number)))?;

        let media_box = match inherited_attribute(&self.document, *page_id, b"MediaBox") {
            Some(Object::Reference(id)) => self.document.get_object(id).ok().cloned(),
            other => other,
        };
        match media_box.as_ref().map(Object::as_array) {
            Some(Ok(rect)) if rect.len() == 4 => {
                let values: Vec<f32> = rect.iter().filter_map(|v| number(&self.document, v)).collect();
                if values.len() == 4 {
                    return Ok(PageSize::from_rect(values[0], values[1], values[2], values[3]));
                }
                Err(Error::Codec(format!("page {} has a malformed MediaBox", page_number)))
            }
            Some(_) => Err(Error::Codec(format!("page {} has a malformed MediaBox", page_number))),
            None => {
                debug!(page_number, "No MediaBox in page tree, using default size");
                Ok(PageSize::default())
            }
        }
    }

    fn info(&self) -> DocumentInfo {
        read_info(&self.document)
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    fn permission_bits(&self) -> i32 {
        self.permission_mask
    }

    fn cipher(&self) -> Option<CipherDescriptor> {
        self.cipher
    }

    fn pdf_version(&self) -> String {
        self.document.version.clone()
    }

    fn user_password_required(&self) -> bool {
        self.user_password_required
    }
}

fn number(document: &Document, object: &Object) -> Option<f32> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok().and_then(|o| o.as_float().ok()),
        other => other.as_float().ok(),
    }
}

/// Reads cipher and permissions from an `/Encrypt` dictionary
fn describe_encryption(dict: &Dictionary) -> (Option<CipherDescriptor>, i32) {
    let permission_mask = dict
        .get(b"P")
        .and_then(Object::as_i64)
        .map(|p| p as i32)
        .unwrap_or(UNRESTRICTED_MASK);

    let version = dict.get(b"V").and_then(Object::as_i64).unwrap_or(0);
    let length = dict
        .get(b"Length")
        .and_then(Object::as_i64)
        .map(|bits| bits.clamp(40, 256) as u16)
        .unwrap_or(40);

    let cipher = match version {
        1 => Some(CipherDescriptor::new(CipherAlgorithm::Rc4, 40)),
        2 | 3 => Some(CipherDescriptor::new(CipherAlgorithm::Rc4, length)),
        4 => Some(match crypt_filter_method(dict).as_deref() {
            Some(b"AESV2") => CipherDescriptor::new(CipherAlgorithm::Aes, 128),
            Some(b"AESV3") => CipherDescriptor::new(CipherAlgorithm::Aes, 256),
            _ => CipherDescriptor::new(CipherAlgorithm::Rc4, 128),
        }),
        5 => Some(CipherDescriptor::new(CipherAlgorithm::Aes, 256)),
        _ => None,
    };
    (cipher, permission_mask)
}

/// `/CFM` of the crypt filter used for streams
fn crypt_filter_method(dict: &Dictionary) -> Option<Vec<u8>> {
    let filter_name = dict.get(b"StmF").and_then(Object::as_name).unwrap_or(CRYPT_FILTER);
    let filters = dict.get(b"CF").and_then(Object::as_dict).ok()?;
    let filter = filters.get(filter_name).and_then(Object::as_dict).ok()?;
    filter.get(b"CFM").and_then(Object::as_name).ok().map(<[u8]>::to_vec)
}

/// Builds the lopdf security state for a cipher mode
fn encryption_state(document: &Document, settings: &EncryptionSettings) -> Result<EncryptionState> {
    let permissions = Permissions::from_bits_retain((settings.permission_mask as u32).into());
    let owner_password = settings.owner_password.as_str();
    let user_password = settings.user_password.as_deref().unwrap_or("");

    let version = match settings.mode {
        CipherMode::Rc4_40 => EncryptionVersion::V1 {
            document,
            owner_password,
            user_password,
            permissions,
        },
        CipherMode::Rc4_128 => EncryptionVersion::V2 {
            document,
            owner_password,
            user_password,
            key_length: 128,
            permissions,
        },
        CipherMode::Aes128 => {
            let crypt_filter: Arc<dyn CryptFilter> = Arc::new(Aes128CryptFilter);
            EncryptionVersion::V4 {
                document,
                encrypt_metadata: true,
                crypt_filters: BTreeMap::from([(CRYPT_FILTER.to_vec(), crypt_filter)]),
                stream_filter: CRYPT_FILTER.to_vec(),
                string_filter: CRYPT_FILTER.to_vec(),
                owner_password,
                user_password,
                permissions,
            }
        }
    };
    EncryptionState::try_from(version).map_err(Error::codec)
}

#[derive(Debug)]
enum OutputKind {
    /// A new page tree assembled page by page
    Fresh {
        pages_id: ObjectId,
        kids: Vec<ObjectId>,
        font_id: Option<ObjectId>,
        importer: PageImporter,
        /// Page ids of the source pages are imported from
        source_pages: BTreeSet<ObjectId>,
    },
    /// An existing document kept whole
    Restamped { page_count: u32 },
}

/// Output container over a `lopdf::Document`
#[derive(Debug)]
pub struct LopdfOutput {
    document: Document,
    kind: OutputKind,
    page_size: PageSize,
    layout: LayoutConfig,
    info: Option<DocumentInfo>,
    encryption: Option<EncryptionSettings>,
}

impl LopdfOutput {
    fn media_box(&self) -> Object {
        vec![
            0.into(),
            0.into(),
            Object::Real(self.page_size.width),
            Object::Real(self.page_size.height),
        ]
        .into()
    }

    fn font(&mut self) -> Result<ObjectId> {
        let OutputKind::Fresh { font_id, .. } = &mut self.kind else {
            return Err(Error::Codec("text can only be added to new documents".into()));
        };
        if let Some(id) = font_id {
            return Ok(*id);
        }
        let id = self.document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        *font_id = Some(id);
        Ok(id)
    }

    fn push_page(&mut self, page: Dictionary) -> Result<ObjectId> {
        let id = self.document.add_object(page);
        match &mut self.kind {
            OutputKind::Fresh { kids, .. } => {
                kids.push(id);
                Ok(id)
            }
            OutputKind::Restamped { .. } => Err(Error::Codec("pages can only be added to new documents".into())),
        }
    }

    fn text_page_content(&self, lines: &[LayoutLine]) -> Result<Vec<u8>> {
        let leading = self.layout.font_size * self.layout.leading;
        let top = self.page_size.height - self.layout.margin - self.layout.font_size;

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![FONT_RESOURCE.into(), Object::Real(self.layout.font_size)]),
            Operation::new("TL", vec![Object::Real(leading)]),
            Operation::new("Td", vec![Object::Real(self.layout.margin), Object::Real(top)]),
        ];
        for (index, line) in lines.iter().enumerate() {
            if index > 0 {
                operations.push(Operation::new("T*", vec![]));
            }
            if let LayoutLine::Text(bytes) = line {
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(bytes.clone(), StringFormat::Literal)],
                ));
            }
        }
        operations.push(Operation::new("ET", vec![]));

        Content { operations }.encode().map_err(Error::codec)
    }

    fn write_page_tree(&mut self) {
        let media_box = self.media_box();
        let OutputKind::Fresh { pages_id, kids, importer, .. } = &mut self.kind else {
            return;
        };
        let stats = importer.finish(&mut self.document);
        debug!(
            pages = stats.pages_imported,
            copied = stats.objects_copied,
            shared = stats.shared_hits,
            dangling = stats.dangling_pages,
            "Imported pages finalized"
        );

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            "Count" => kids.len() as i64,
            "MediaBox" => media_box,
        };
        let pages_id = *pages_id;
        self.document.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        self.document.trailer.set("Root", catalog_id);
    }

    fn write_info(&mut self) {
        let Some(info) = self.info.take() else {
            return;
        };
        let dict = build_info_dictionary(&info);
        match self.document.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(id) => {
                self.document.objects.insert(id, Object::Dictionary(dict));
            }
            Err(_) => {
                let id = self.document.add_object(dict);
                self.document.trailer.set("Info", id);
            }
        }
    }
}

impl OutputDocument for LopdfOutput {
    fn set_info(&mut self, info: &DocumentInfo) {
        self.info = Some(info.clone());
    }

    fn add_paragraphs(&mut self, paragraphs: &[String]) -> Result<()> {
        let font_id = self.font()?;
        let media_box = self.media_box();
        let parent = match &self.kind {
            OutputKind::Fresh { pages_id, .. } => *pages_id,
            OutputKind::Restamped { .. } => {
                return Err(Error::Codec("pages can only be added to new documents".into()))
            }
        };

        let mut layout = self.layout.clone();
        layout.page_size = self.page_size;
        for page_layout in layout_paragraphs(paragraphs, &layout) {
            let content = self.text_page_content(&page_layout.lines)?;
            let content_id = self.document.add_object(Stream::new(dictionary! {}, content));
            self.push_page(dictionary! {
                "Type" => "Page",
                "Parent" => parent,
                "MediaBox" => media_box.clone(),
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { FONT_RESOURCE => font_id },
                },
            })?;
        }
        Ok(())
    }

    fn set_encryption(&mut self, settings: EncryptionSettings) {
        self.encryption = Some(settings);
    }

    fn page_count(&self) -> u32 {
        match &self.kind {
            OutputKind::Fresh { kids, .. } => kids.len() as u32,
            OutputKind::Restamped { page_count } => *page_count,
        }
    }

    #[instrument(skip(self), fields(pages = self.page_count()))]
    fn finalize(mut self) -> Result<Vec<u8>> {
        match self.kind {
            OutputKind::Fresh { .. } => {
                self.write_page_tree();
                reset_file_id(&mut self.document);
            }
            OutputKind::Restamped { .. } => ensure_file_id(&mut self.document),
        }
        self.write_info();

        // Decryption state of the source must not leak into the output
        self.document.encryption_state = None;
        if let Some(settings) = self.encryption.take() {
            let state = encryption_state(&self.document, &settings)?;
            self.document.encrypt(&state).map_err(Error::codec)?;
            debug!(mode = %settings.mode, "Encryption applied");
        }

        let mut bytes = Vec::new();
        self.document.save_to(&mut bytes).map_err(Error::codec)?;
        Ok(bytes)
    }
}

impl PdfCodec for LopdfCodec {
    type Source = LopdfSource;
    type Output = LopdfOutput;

    #[instrument(skip(self, password), fields(source = %source))]
    fn open(&self, source: &DocumentSource, password: Option<&str>) -> Result<LopdfSource> {
        let bytes = source.read_bytes()?;
        let mut document = Document::load_mem(&bytes).map_err(Error::unreadable)?;

        let mut user_password_required = false;
        if document.is_encrypted() {
            user_password_required = true;
            let password = password.ok_or_else(|| {
                Error::SourceUnreadable("document is password protected".to_string())
            })?;
            document = Document::load_mem_with_password(&bytes, password).map_err(|e| match e {
                lopdf::Error::InvalidPassword => Error::SourceUnreadable("incorrect password".to_string()),
                other => Error::unreadable(other),
            })?;
            if document.is_encrypted() {
                return Err(Error::SourceUnreadable("incorrect password".to_string()));
            }
        }

        let (encrypted, cipher, permission_mask) = match document.encryption_state.as_ref() {
            Some(state) => match state.encode() {
                Ok(dict) => {
                    let (cipher, mask) = describe_encryption(&dict);
                    (true, cipher, mask)
                }
                Err(e) => {
                    warn!("Encryption dictionary unreadable: {}", e);
                    (true, None, UNRESTRICTED_MASK)
                }
            },
            None => (false, None, UNRESTRICTED_MASK),
        };

        let pages = document.get_pages();
        debug!(pages = pages.len(), encrypted, version = %document.version, "Document opened");
        Ok(LopdfSource {
            document,
            pages,
            cipher,
            permission_mask,
            encrypted,
            user_password_required,
        })
    }

    fn create(&self, page_size: PageSize) -> Result<LopdfOutput> {
        let mut document = Document::with_version(OUTPUT_VERSION);
        let pages_id = document.new_object_id();
        Ok(LopdfOutput {
            document,
            kind: OutputKind::Fresh {
                pages_id,
                kids: Vec::new(),
                font_id: None,
                importer: PageImporter::new(),
                source_pages: BTreeSet::new(),
            },
            page_size,
            layout: self.layout.clone(),
            info: None,
            encryption: None,
        })
    }

    fn import_page(&self, output: &mut LopdfOutput, source: &LopdfSource, page_number: u32) -> Result<()> {
        let page_id = *source
            .pages
            .get(&page_number)
            .ok_or_else(|| Error::Codec(format!("page {} out of range", page_number)))?;
        let media_box = output.media_box();

        let OutputKind::Fresh { pages_id, kids, importer, source_pages, .. } = &mut output.kind else {
            return Err(Error::Codec("pages can only be imported into new documents".into()));
        };
        if source_pages.is_empty() {
            source_pages.extend(source.pages.values().copied());
        }

        let new_id = importer.import(&mut output.document, &source.document, source_pages, page_id, *pages_id, media_box)?;
        kids.push(new_id);
        Ok(())
    }

    fn restamp(&self, source: LopdfSource) -> Result<LopdfOutput> {
        let page_count = source.page_count();
        let page_size = source.page_size(1).unwrap_or_default();
        Ok(LopdfOutput {
            document: source.document,
            kind: OutputKind::Restamped { page_count },
            page_size,
            layout: self.layout.clone(),
            info: None,
            encryption: None,
        })
    }
}
