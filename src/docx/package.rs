//! Package assembly: manifest, relationships and the ZIP container.

use std::collections::{BTreeSet, HashSet};
use std::fmt::Write as _;
use std::io::{Seek, Write};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::xml::{NS_CONTENT_TYPES, NS_PACKAGE_RELS, XML_DECLARATION, escape_xml};
use crate::error::{Error, Result};
use crate::image::ImageFormat;

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_NUMBERING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

const CT_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
const CT_NUMBERING: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";
const CT_CORE: &str = "application/vnd.openxmlformats-package.core-properties+xml";
const CT_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";

/// Member names inside the container.
pub const PART_CONTENT_TYPES: &str = "[Content_Types].xml";
pub const PART_ROOT_RELS: &str = "_rels/.rels";
pub const PART_DOCUMENT: &str = "word/document.xml";
pub const PART_DOCUMENT_RELS: &str = "word/_rels/document.xml.rels";
pub const PART_STYLES: &str = "word/styles.xml";
pub const PART_NUMBERING: &str = "word/numbering.xml";
pub const PART_CORE: &str = "docProps/core.xml";

/// What a document relationship points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    Styles,
    Numbering,
    Image,
    Hyperlink,
}

impl RelationshipKind {
    fn type_uri(self) -> &'static str {
        match self {
            RelationshipKind::Styles => REL_STYLES,
            RelationshipKind::Numbering => REL_NUMBERING,
            RelationshipKind::Image => REL_IMAGE,
            RelationshipKind::Hyperlink => REL_HYPERLINK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub kind: RelationshipKind,
    pub target: String,
}

/// Relationships of the main document part.
///
/// `rId1` is always the style part and `rId2` the numbering part; images
/// and hyperlinks follow in allocation order.
#[derive(Debug, Clone)]
pub struct Relationships {
    entries: Vec<Relationship>,
}

impl Default for Relationships {
    fn default() -> Self {
        Self::new()
    }
}

impl Relationships {
    pub fn new() -> Self {
        let mut rels = Self {
            entries: Vec::new(),
        };
        rels.add(RelationshipKind::Styles, "styles.xml");
        rels.add(RelationshipKind::Numbering, "numbering.xml");
        rels
    }

    /// Allocate the next id for `target`.
    pub fn add(&mut self, kind: RelationshipKind, target: impl Into<String>) -> String {
        let id = format!("rId{}", self.entries.len() + 1);
        self.entries.push(Relationship {
            id: id.clone(),
            kind,
            target: target.into(),
        });
        id
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + self.entries.len() * 160);
        xml.push_str(XML_DECLARATION);
        let _ = write!(xml, r#"<Relationships xmlns="{NS_PACKAGE_RELS}">"#);
        for rel in &self.entries {
            let external = if rel.kind == RelationshipKind::Hyperlink {
                r#" TargetMode="External""#
            } else {
                ""
            };
            let _ = write!(
                xml,
                r#"<Relationship Id="{}" Type="{}" Target="{}"{external}/>"#,
                rel.id,
                rel.kind.type_uri(),
                escape_xml(&rel.target)
            );
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// An embedded image file.
#[derive(Debug, Clone)]
pub struct MediaPart {
    /// File name under `word/media/`, e.g. `image1.png`.
    pub name: String,
    pub format: ImageFormat,
    pub data: Vec<u8>,
}

/// Everything that goes into one container.
#[derive(Debug, Clone)]
pub struct Package {
    pub document: String,
    pub styles: String,
    pub numbering: String,
    pub relationships: Relationships,
    pub media: Vec<MediaPart>,
    /// Document properties part, when metadata is included.
    pub core_properties: Option<String>,
}

impl Package {
    /// Distinct image formats in manifest order.
    pub fn media_formats(&self) -> BTreeSet<ImageFormat> {
        self.media.iter().map(|m| m.format).collect()
    }

    /// Check that media names are unique, match their format, and cover
    /// every image relationship.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for media in &self.media {
            if !names.insert(media.name.as_str()) {
                return Err(Error::Packaging(format!("duplicate media part {}", media.name)));
            }
            let extension = media.name.rsplit_once('.').map(|(_, ext)| ext);
            if extension != Some(media.format.extension()) {
                return Err(Error::Packaging(format!(
                    "media part {} is not named for {}",
                    media.name,
                    media.format.mime_type()
                )));
            }
        }
        for rel in self.relationships.iter() {
            if rel.kind != RelationshipKind::Image {
                continue;
            }
            let name = rel.target.strip_prefix("media/").unwrap_or(&rel.target);
            if !names.contains(name) {
                return Err(Error::Packaging(format!(
                    "{} points at missing media {}",
                    rel.id, rel.target
                )));
            }
        }
        Ok(())
    }

    pub fn content_types_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);
        xml.push_str(XML_DECLARATION);
        let _ = write!(xml, r#"<Types xmlns="{NS_CONTENT_TYPES}">"#);
        let _ = write!(
            xml,
            r#"<Default Extension="rels" ContentType="{CT_RELATIONSHIPS}"/><Default Extension="xml" ContentType="application/xml"/>"#
        );
        for format in self.media_formats() {
            let _ = write!(
                xml,
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                format.extension(),
                format.mime_type()
            );
        }
        let _ = write!(
            xml,
            r#"<Override PartName="/{PART_DOCUMENT}" ContentType="{CT_DOCUMENT}"/><Override PartName="/{PART_STYLES}" ContentType="{CT_STYLES}"/><Override PartName="/{PART_NUMBERING}" ContentType="{CT_NUMBERING}"/>"#
        );
        if self.core_properties.is_some() {
            let _ = write!(
                xml,
                r#"<Override PartName="/{PART_CORE}" ContentType="{CT_CORE}"/>"#
            );
        }
        xml.push_str("</Types>");
        xml
    }

    pub fn root_relationships_xml(&self) -> String {
        let mut xml = String::with_capacity(512);
        xml.push_str(XML_DECLARATION);
        let _ = write!(
            xml,
            r#"<Relationships xmlns="{NS_PACKAGE_RELS}"><Relationship Id="rId1" Type="{REL_OFFICE_DOCUMENT}" Target="{PART_DOCUMENT}"/>"#
        );
        if self.core_properties.is_some() {
            let _ = write!(
                xml,
                r#"<Relationship Id="rId2" Type="{REL_CORE_PROPERTIES}" Target="{PART_CORE}"/>"#
            );
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// Document properties part carrying the title.
pub fn core_properties_xml(title: &str) -> String {
    format!(
        r#"{XML_DECLARATION}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>mdocx</dc:creator></cp:coreProperties>"#,
        escape_xml(title)
    )
}

/// Configuration for writing the container.
#[derive(Debug, Clone, Default)]
pub struct DocxConfig {
    /// Deflate level (0-9, default 6).
    pub compression_level: Option<i64>,
}

/// Writes a [`Package`] as a DOCX container.
///
/// # Example
///
/// ```no_run
/// use mdocx::docx::{DocxWriter, Package};
/// # fn package() -> Package { unimplemented!() }
/// let mut file = std::fs::File::create("out.docx")?;
/// DocxWriter::new().write(&package(), &mut file)?;
/// # Ok::<(), mdocx::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocxWriter {
    config: DocxConfig,
}

impl DocxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: DocxConfig) -> Self {
        self.config = config;
        self
    }

    /// Write the container. Nothing but I/O or ZIP failures can fail here.
    pub fn write<W: Write + Seek>(&self, package: &Package, writer: &mut W) -> Result<()> {
        package.validate()?;
        let mut zip = ZipWriter::new(writer);

        let compression_level = self.config.compression_level.unwrap_or(6);
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(compression_level));
        // Already-compressed image data gains nothing from deflate.
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        zip.start_file(PART_CONTENT_TYPES, deflated)?;
        zip.write_all(package.content_types_xml().as_bytes())?;

        zip.start_file(PART_ROOT_RELS, deflated)?;
        zip.write_all(package.root_relationships_xml().as_bytes())?;

        zip.start_file(PART_DOCUMENT_RELS, deflated)?;
        zip.write_all(package.relationships.to_xml().as_bytes())?;

        zip.start_file(PART_STYLES, deflated)?;
        zip.write_all(package.styles.as_bytes())?;

        zip.start_file(PART_NUMBERING, deflated)?;
        zip.write_all(package.numbering.as_bytes())?;

        zip.start_file(PART_DOCUMENT, deflated)?;
        zip.write_all(package.document.as_bytes())?;

        if let Some(ref core) = package.core_properties {
            zip.start_file(PART_CORE, deflated)?;
            zip.write_all(core.as_bytes())?;
        }

        for media in &package.media {
            let options = match media.format {
                ImageFormat::Svg => deflated,
                _ => stored,
            };
            zip.start_file(format!("word/media/{}", media.name), options)?;
            zip.write_all(&media.data)?;
        }

        zip.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn package(media: Vec<MediaPart>, core: bool) -> Package {
        Package {
            document: "<w:document/>".into(),
            styles: "<w:styles/>".into(),
            numbering: "<w:numbering/>".into(),
            relationships: Relationships::new(),
            media,
            core_properties: core.then(|| core_properties_xml("T")),
        }
    }

    fn media(name: &str, format: ImageFormat) -> MediaPart {
        MediaPart {
            name: name.into(),
            format,
            data: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_relationship_ids() {
        let mut rels = Relationships::new();
        assert_eq!(rels.add(RelationshipKind::Image, "media/image1.png"), "rId3");
        assert_eq!(rels.add(RelationshipKind::Hyperlink, "https://a.b/?x=1&y=2"), "rId4");
        let xml = rels.to_xml();
        assert!(xml.contains(r#"Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles""#));
        assert!(xml.contains(r#"Target="https://a.b/?x=1&amp;y=2" TargetMode="External""#));
        assert!(!xml.contains(r#"Target="media/image1.png" TargetMode"#));
    }

    #[test]
    fn test_content_types_one_default_per_extension() {
        let pkg = package(
            vec![
                media("image1.png", ImageFormat::Png),
                media("image2.png", ImageFormat::Png),
                media("image3.jpeg", ImageFormat::Jpeg),
            ],
            false,
        );
        let xml = pkg.content_types_xml();
        assert_eq!(xml.matches(r#"Extension="png""#).count(), 1);
        assert!(xml.contains(r#"<Default Extension="jpeg" ContentType="image/jpeg"/>"#));
        assert!(!xml.contains("gif"));
        assert!(!xml.contains(PART_CORE));
    }

    #[test]
    fn test_inconsistent_package_is_rejected() {
        let mut pkg = package(vec![media("image1.png", ImageFormat::Png)], false);
        pkg.relationships.add(RelationshipKind::Image, "media/image2.png");
        let mut buffer = Cursor::new(Vec::new());
        let result = DocxWriter::new().write(&pkg, &mut buffer);
        assert!(matches!(result, Err(Error::Packaging(_))));
        assert!(buffer.into_inner().is_empty());

        let pkg = package(
            vec![media("image1.png", ImageFormat::Png), media("image1.png", ImageFormat::Png)],
            false,
        );
        assert!(matches!(pkg.validate(), Err(Error::Packaging(_))));

        let pkg = package(vec![media("image1.png", ImageFormat::Gif)], false);
        assert!(matches!(pkg.validate(), Err(Error::Packaging(_))));
    }

    #[test]
    fn test_write_member_set() {
        let pkg = package(vec![media("image1.gif", ImageFormat::Gif)], true);
        let mut buffer = Cursor::new(Vec::new());
        DocxWriter::new().write(&pkg, &mut buffer).unwrap();

        let archive = zip::ZipArchive::new(Cursor::new(buffer.into_inner())).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "docProps/core.xml",
                "word/_rels/document.xml.rels",
                "word/document.xml",
                "word/media/image1.gif",
                "word/numbering.xml",
                "word/styles.xml",
            ]
        );
    }
}
