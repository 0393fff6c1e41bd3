//! DOCX output: the document serializer and the package assembler.
//!
//! | Member | Produced by |
//! |--------|-------------|
//! | `[Content_Types].xml` | [`Package::content_types_xml`] |
//! | `_rels/.rels` | [`Package::root_relationships_xml`] |
//! | `word/_rels/document.xml.rels` | [`Relationships::to_xml`] |
//! | `word/styles.xml` | [`styles_xml`] |
//! | `word/numbering.xml` | [`Numbering::to_xml`] |
//! | `word/document.xml` | [`DocumentSerializer`] |
//! | `word/media/imageN.ext` | one per embedded image |
//! | `docProps/core.xml` | [`core_properties_xml`], when metadata is on |

mod document;
mod numbering;
mod package;
mod styles;
mod xml;

pub use document::{
    DocumentSerializer, FOOTNOTES_HEADING, MAX_TABLE_COLUMNS, PAGE_MARGIN, RenderError,
    SerializedDocument, callout_colors,
};
pub use numbering::{BULLET_NUM_ID, Numbering};
pub use package::{
    DocxConfig, DocxWriter, MediaPart, PART_CONTENT_TYPES, PART_CORE, PART_DOCUMENT,
    PART_DOCUMENT_RELS, PART_NUMBERING, PART_ROOT_RELS, PART_STYLES, Package, Relationship,
    RelationshipKind, Relationships, core_properties_xml,
};
pub use styles::{LINK_COLOR, styles_xml};
pub use xml::escape_xml;
