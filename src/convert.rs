//! The conversion pipeline.
//!
//! ```text
//! text -> preprocess -> extract footnotes -> (chunk ->) parse -> serialize -> package
//! ```
//!
//! A [`Converter`] holds only immutable configuration. Each call to
//! [`Converter::convert`] builds a fresh serializer that owns every piece of
//! per-call state and is consumed when the package is written, so calls never
//! observe each other.

use std::io::{Cursor, Seek, Write};
use std::sync::Arc;

use log::debug;

use crate::chunk::{Chunker, DEFAULT_CHUNK_TARGET};
use crate::docx::{DocumentSerializer, DocxWriter, Package, core_properties_xml, styles_xml};
use crate::error::Result;
use crate::footnotes::{FootnoteRegistry, extract_footnotes};
use crate::highlight::{SyntectTokenizer, Tokenizer};
use crate::image::ResourceLoader;
use crate::model::Element;
use crate::options::ConvertOptions;
use crate::parser::parse;
use crate::preprocess::preprocess;
use crate::report::{ConversionReport, DegradationKind};

/// A finished document and what happened while producing it.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The DOCX container.
    pub bytes: Vec<u8>,
    pub report: ConversionReport,
}

/// Converts Markdown text to DOCX.
///
/// # Example
///
/// ```no_run
/// use mdocx::{ConvertOptions, Converter, FsLoader};
///
/// # async fn run() -> mdocx::Result<()> {
/// let converter = Converter::new(ConvertOptions::default()).with_loader(FsLoader::new("docs"));
/// let conversion = converter.convert("# Hello\n\n![Logo](logo.png)", "Hello").await?;
/// std::fs::write("hello.docx", &conversion.bytes)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Converter {
    options: ConvertOptions,
    loader: Option<Arc<dyn ResourceLoader>>,
    tokenizer: Arc<dyn Tokenizer>,
    writer: DocxWriter,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            loader: None,
            tokenizer: Arc::new(SyntectTokenizer),
            writer: DocxWriter::new(),
        }
    }

    /// Resolve local image paths through `loader`.
    pub fn with_loader(mut self, loader: impl ResourceLoader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Replace the code tokenizer.
    pub fn with_tokenizer(mut self, tokenizer: impl Tokenizer + 'static) -> Self {
        self.tokenizer = Arc::new(tokenizer);
        self
    }

    pub fn with_writer(mut self, writer: DocxWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert `text` into an in-memory DOCX.
    ///
    /// Only packaging failures are returned as errors.
    pub async fn convert(&self, text: &str, title: &str) -> Result<Conversion> {
        let mut buffer = Cursor::new(Vec::new());
        let report = self.convert_to(text, title, &mut buffer).await?;
        Ok(Conversion {
            bytes: buffer.into_inner(),
            report,
        })
    }

    /// Convert `text` and write the container to `writer`.
    pub async fn convert_to<W: Write + Seek>(
        &self,
        text: &str,
        title: &str,
        writer: &mut W,
    ) -> Result<ConversionReport> {
        let options = &self.options;

        let text = if options.enable_preprocessing {
            preprocess(text)
        } else {
            text.replace("\r\n", "\n")
        };
        let (body, definitions) = extract_footnotes(&text);
        debug!("extracted {} footnote definitions", definitions.len());

        let mut serializer = DocumentSerializer::new(
            self.tokenizer.as_ref(),
            self.loader.as_deref(),
            FootnoteRegistry::new(definitions),
        )
        .with_page_size(options.page_size)
        .with_formatting(options.preserve_formatting);

        let mut elements = parse_chunks(&body, options.chunk_threshold, serializer.report_mut()).await;
        if options.include_title_as_heading {
            prepend_title(&mut elements, title);
        }
        debug!("parsed {} elements", elements.len());

        for element in &elements {
            serializer.push(element).await;
        }
        let document = serializer.finish();

        let package = Package {
            document: document.document,
            styles: styles_xml(&options.effective_typography()),
            numbering: document.numbering.to_xml(),
            relationships: document.relationships,
            media: document.media,
            core_properties: options
                .include_metadata
                .then(|| core_properties_xml(title)),
        };
        self.writer.write(&package, writer)?;

        let report = document.report;
        debug!(
            "wrote {} elements, {} images, {} degradations",
            report.elements,
            report.images,
            report.degradations().len()
        );
        Ok(report)
    }
}

/// Convert with default collaborators and no resource loader.
pub async fn convert(text: &str, title: &str, options: &ConvertOptions) -> Result<Conversion> {
    Converter::new(options.clone()).convert(text, title).await
}

/// Parse `body`, in chunks when it exceeds `threshold` bytes.
///
/// A chunk that fails to parse is recorded and skipped. The runtime gets a
/// chance to run other tasks between chunks.
async fn parse_chunks(body: &str, threshold: usize, report: &mut ConversionReport) -> Vec<Element> {
    if threshold == 0 || body.len() <= threshold {
        return match parse(body) {
            Ok(elements) => {
                report.chunks_parsed = 1;
                elements
            }
            Err(e) => {
                report.record(DegradationKind::Chunk, format!("document: {e}"));
                Vec::new()
            }
        };
    }

    // Chunks never exceed the size that triggered chunking.
    let chunks = Chunker::new(DEFAULT_CHUNK_TARGET.min(threshold)).split(body);
    debug!("parsing {} bytes in {} chunks", body.len(), chunks.len());

    let mut elements = Vec::new();
    for (index, chunk) in chunks.iter().enumerate() {
        match parse(chunk) {
            Ok(parsed) => {
                elements.extend(parsed);
                report.chunks_parsed += 1;
            }
            Err(e) => report.record(DegradationKind::Chunk, format!("chunk {}: {e}", index + 1)),
        }
        tokio::task::yield_now().await;
    }
    elements
}

/// Prepend the title as a level-1 heading unless the document opens with it.
fn prepend_title(elements: &mut Vec<Element>, title: &str) {
    let title = title.trim();
    if title.is_empty() {
        return;
    }
    let opens_with_title = elements
        .iter()
        .find(|e| !matches!(e, Element::Break))
        .is_some_and(|e| matches!(e, Element::Heading { level: 1, text } if text.trim() == title));
    if !opens_with_title {
        elements.insert(0, Element::heading(1, title));
    }
}
