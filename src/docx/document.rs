//! The main document part: block elements to WordprocessingML.
//!
//! [`DocumentSerializer`] walks the parsed elements in order and appends one
//! fragment per element to the body. It owns all per-conversion state:
//! footnote numbering, relationship ids, numbering instances, embedded
//! media and the conversion report. Every element either renders or is
//! replaced by a placeholder; nothing here returns an error to the caller.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use thiserror::Error;

use super::numbering::{BULLET_NUM_ID, Numbering};
use super::package::{MediaPart, RelationshipKind, Relationships};
use super::styles::{
    STYLE_CODE_BLOCK, STYLE_FOOTNOTE, STYLE_HYPERLINK, STYLE_INLINE_CODE, STYLE_LIST,
    STYLE_PLACEHOLDER, STYLE_QUOTE, STYLE_TABLE,
};
use super::xml::{NS_A, NS_PIC, NS_R, NS_W, NS_WP, XML_DECLARATION, escape_xml};
use crate::footnotes::FootnoteRegistry;
use crate::highlight::{Tokenizer, highlight};
use crate::image::{ResolvedImage, ResourceLoader, resolve_image};
use crate::inline::format_inline;
use crate::model::{
    Alignment, Element, ImageRef, ListItem, MAX_LIST_DEPTH, Style, StyleRun, Table, TaskItem,
    merge_runs,
};
use crate::options::PageSize;
use crate::patterns::CALLOUT_MARKER_RE;
use crate::report::{ConversionReport, DegradationKind};
use crate::util::{bookmark_name, slugify};

/// Page margin on every side, in twips.
pub const PAGE_MARGIN: u32 = 1440;

/// Widest table Word accepts.
pub const MAX_TABLE_COLUMNS: usize = 63;

/// Heading text that marks an author-written footnotes section.
pub const FOOTNOTES_HEADING: &str = "Footnotes";

const HEADER_FILL: &str = "F2F2F2";
const QUOTE_BORDER: &str = "BFBFBF";

/// Why one element could not be rendered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("table has {0} columns, at most {MAX_TABLE_COLUMNS} are supported")]
    TooManyColumns(usize),
}

/// Background and border colors of a callout kind.
pub fn callout_colors(kind: &str) -> (&'static str, &'static str) {
    match kind.to_ascii_lowercase().as_str() {
        "tip" | "hint" => ("E8F5E9", "2E7D32"),
        "warning" | "caution" | "important" | "attention" => ("FFF8E1", "F9A825"),
        "error" | "danger" | "bug" | "failure" | "fail" => ("FDECEA", "D32F2F"),
        "success" | "check" | "done" => ("EDF7ED", "43A047"),
        "info" | "abstract" | "summary" | "question" | "example" | "quote" => ("E1F5FE", "0288D1"),
        _ => ("E7F0FD", "2F6FDE"),
    }
}

/// Output of a finished serializer.
#[derive(Debug)]
pub struct SerializedDocument {
    pub document: String,
    pub relationships: Relationships,
    pub numbering: Numbering,
    pub media: Vec<MediaPart>,
    pub report: ConversionReport,
}

pub struct DocumentSerializer<'a> {
    preserve_formatting: bool,
    page_size: PageSize,
    tokenizer: &'a dyn Tokenizer,
    loader: Option<&'a dyn ResourceLoader>,
    footnotes: FootnoteRegistry,
    relationships: Relationships,
    hyperlinks: HashMap<String, String>,
    numbering: Numbering,
    media: Vec<MediaPart>,
    report: ConversionReport,
    body: String,
    bookmarks: HashSet<String>,
    has_footnotes_heading: bool,
    previous_break: bool,
}

impl<'a> DocumentSerializer<'a> {
    pub fn new(
        tokenizer: &'a dyn Tokenizer,
        loader: Option<&'a dyn ResourceLoader>,
        footnotes: FootnoteRegistry,
    ) -> Self {
        Self {
            preserve_formatting: true,
            page_size: PageSize::default(),
            tokenizer,
            loader,
            footnotes,
            relationships: Relationships::new(),
            hyperlinks: HashMap::new(),
            numbering: Numbering::new(),
            media: Vec::new(),
            report: ConversionReport::new(),
            body: String::with_capacity(64 * 1024),
            bookmarks: HashSet::new(),
            has_footnotes_heading: false,
            previous_break: false,
        }
    }

    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_formatting(mut self, preserve: bool) -> Self {
        self.preserve_formatting = preserve;
        self
    }

    /// The report so far, for recording failures outside element rendering.
    pub fn report_mut(&mut self) -> &mut ConversionReport {
        &mut self.report
    }

    /// Append one element to the body.
    pub async fn push(&mut self, element: &Element) {
        self.report.elements += 1;

        let fragment = match element {
            Element::Image(image) => Ok(self.image(image).await),
            other => self.render(other),
        };

        match fragment {
            Ok(xml) => self.body.push_str(&xml),
            Err(e) => {
                self.report
                    .record(DegradationKind::Element, format!("{}: {e}", element.kind()));
                self.body
                    .push_str(&placeholder(&format!("[Unrenderable {}]", element.kind())));
            }
        }
        self.previous_break = matches!(element, Element::Break);
    }

    /// Append the footnotes section and wrap the body.
    pub fn finish(mut self) -> SerializedDocument {
        self.footnotes_section();

        let (width, height) = self.page_size.dimensions();
        let mut document = String::with_capacity(self.body.len() + 1024);
        document.push_str(XML_DECLARATION);
        let _ = write!(
            document,
            r#"<w:document xmlns:w="{NS_W}" xmlns:r="{NS_R}" xmlns:wp="{NS_WP}" xmlns:a="{NS_A}" xmlns:pic="{NS_PIC}"><w:body>"#
        );
        document.push_str(&self.body);
        let _ = write!(
            document,
            r#"<w:sectPr><w:pgSz w:w="{width}" w:h="{height}"/><w:pgMar w:top="{PAGE_MARGIN}" w:right="{PAGE_MARGIN}" w:bottom="{PAGE_MARGIN}" w:left="{PAGE_MARGIN}" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#
        );

        SerializedDocument {
            document,
            relationships: self.relationships,
            numbering: self.numbering,
            media: self.media,
            report: self.report,
        }
    }

    fn render(&mut self, element: &Element) -> Result<String, RenderError> {
        let xml = match element {
            Element::Paragraph { text } => self.paragraph("", text),
            Element::Heading { level, text } => self.heading(*level, text),
            Element::List { ordered, items } => self.list(*ordered, items),
            Element::TaskList { items } => self.task_list(items),
            Element::Table(table) => self.table(table)?,
            Element::CodeBlock { text, language } => self.code_block(text, language.as_deref()),
            Element::Blockquote { text, level } => self.blockquote(text, *level),
            Element::Definition { term, definition } => self.definition(term, definition),
            Element::HorizontalRule => {
                r#"<w:p><w:pPr><w:pBdr><w:bottom w:val="single" w:sz="6" w:space="1" w:color="auto"/></w:pBdr></w:pPr></w:p>"#
                    .to_string()
            }
            // Resolved asynchronously in `push`.
            Element::Image(image) => placeholder(&image_label(image)),
            // A single blank line only separates blocks; a second one in a row
            // becomes an empty paragraph.
            Element::Break if self.previous_break => "<w:p/>".to_string(),
            Element::Break => String::new(),
        };
        Ok(xml)
    }

    // === Inline content ===

    /// Resolve inline markup, dropping styles when formatting is off.
    fn runs(&mut self, text: &str) -> Vec<StyleRun> {
        let mut runs = format_inline(text, &mut self.footnotes);
        if !self.preserve_formatting {
            for run in &mut runs {
                run.style = Style {
                    link: run.style.link.take(),
                    ..Style::default()
                };
            }
            runs = merge_runs(runs);
        }
        runs
    }

    fn runs_xml(&mut self, runs: &[StyleRun]) -> String {
        let mut xml = String::new();
        let mut i = 0;
        while i < runs.len() {
            let Some(target) = runs[i].style.link.as_deref() else {
                write_run(&mut xml, &runs[i].text, &runs[i].style, None);
                i += 1;
                continue;
            };
            let end = runs[i..]
                .iter()
                .position(|r| r.style.link.as_deref() != Some(target))
                .map_or(runs.len(), |offset| i + offset);

            let open = self.hyperlink_open(target);
            xml.push_str(&open);
            for run in &runs[i..end] {
                write_run(&mut xml, &run.text, &run.style, None);
            }
            xml.push_str("</w:hyperlink>");
            i = end;
        }
        xml
    }

    fn hyperlink_open(&mut self, target: &str) -> String {
        if let Some(anchor) = target.strip_prefix('#') {
            return format!(
                r#"<w:hyperlink w:anchor="{}" w:history="1">"#,
                escape_xml(&bookmark_name(&slugify(anchor)))
            );
        }
        let id = match self.hyperlinks.get(target) {
            Some(id) => id.clone(),
            None => {
                let id = self.relationships.add(RelationshipKind::Hyperlink, target);
                self.hyperlinks.insert(target.to_string(), id.clone());
                id
            }
        };
        format!(r#"<w:hyperlink r:id="{id}" w:history="1">"#)
    }

    /// A paragraph with raw `w:pPr` children and inline text.
    fn paragraph(&mut self, properties: &str, text: &str) -> String {
        let runs = self.runs(text);
        self.paragraph_runs(properties, &runs)
    }

    fn paragraph_runs(&mut self, properties: &str, runs: &[StyleRun]) -> String {
        let content = self.runs_xml(runs);
        if properties.is_empty() {
            format!("<w:p>{content}</w:p>")
        } else {
            format!("<w:p><w:pPr>{properties}</w:pPr>{content}</w:p>")
        }
    }

    // === Block elements ===

    fn heading(&mut self, level: u8, text: &str) -> String {
        if text.trim().eq_ignore_ascii_case(FOOTNOTES_HEADING) {
            self.has_footnotes_heading = true;
        }

        let runs = self.runs(text);
        let content = self.runs_xml(&runs);
        let properties = format!(r#"<w:pPr><w:pStyle w:val="Heading{level}"/></w:pPr>"#);

        let name = bookmark_name(&slugify(text));
        if name.len() <= 1 || !self.bookmarks.insert(name.clone()) {
            return format!("<w:p>{properties}{content}</w:p>");
        }
        let id = self.bookmarks.len();
        format!(
            r#"<w:p>{properties}<w:bookmarkStart w:id="{id}" w:name="{}"/>{content}<w:bookmarkEnd w:id="{id}"/></w:p>"#,
            escape_xml(&name)
        )
    }

    fn list(&mut self, ordered: bool, items: &[ListItem]) -> String {
        let num_id = if ordered {
            self.numbering.next_ordered()
        } else {
            BULLET_NUM_ID
        };
        let mut xml = String::new();
        for item in items {
            let level = item.level.min(MAX_LIST_DEPTH);
            let properties = format!(
                r#"<w:pStyle w:val="{STYLE_LIST}"/><w:numPr><w:ilvl w:val="{level}"/><w:numId w:val="{num_id}"/></w:numPr>"#
            );
            xml.push_str(&self.paragraph(&properties, &item.text));
        }
        xml
    }

    fn task_list(&mut self, items: &[TaskItem]) -> String {
        let properties = format!(r#"<w:pStyle w:val="{STYLE_LIST}"/>"#);
        let mut xml = String::new();
        for item in items {
            let glyph = if item.checked { "\u{2611} " } else { "\u{2610} " };
            let mut runs = vec![StyleRun::plain(glyph)];
            runs.extend(self.runs(&item.text));
            xml.push_str(&self.paragraph_runs(&properties, &runs));
        }
        xml
    }

    fn table(&mut self, table: &Table) -> Result<String, RenderError> {
        let columns = table.column_count();
        if columns > MAX_TABLE_COLUMNS {
            return Err(RenderError::TooManyColumns(columns));
        }
        // Word rejects a table without rows.
        if columns == 0 || table.rows.is_empty() {
            return Ok(String::new());
        }

        let (page_width, _) = self.page_size.dimensions();
        let usable = page_width.saturating_sub(2 * PAGE_MARGIN);
        let column_width = usable / columns as u32;

        let mut xml = format!(
            r#"<w:tbl><w:tblPr><w:tblStyle w:val="{STYLE_TABLE}"/><w:tblW w:w="{usable}" w:type="dxa"/><w:tblLook w:val="04A0" w:firstRow="1" w:lastRow="0" w:firstColumn="0" w:lastColumn="0" w:noHBand="0" w:noVBand="1"/></w:tblPr><w:tblGrid>"#
        );
        for _ in 0..columns {
            let _ = write!(xml, r#"<w:gridCol w:w="{column_width}"/>"#);
        }
        xml.push_str("</w:tblGrid>");

        for (index, row) in table.rows.iter().enumerate() {
            let header = index == 0;
            xml.push_str("<w:tr>");
            if header {
                xml.push_str("<w:trPr><w:tblHeader/></w:trPr>");
            }
            for column in 0..columns {
                let cell = row.get(column).map_or("", String::as_str);
                let mut runs = self.runs(cell);
                if header {
                    embolden(&mut runs);
                }
                let shading = if header {
                    format!(r#"<w:shd w:val="clear" w:color="auto" w:fill="{HEADER_FILL}"/>"#)
                } else {
                    String::new()
                };
                let justification = match table.alignment(column) {
                    Alignment::Left => "left",
                    Alignment::Center => "center",
                    Alignment::Right => "right",
                };
                let content = self.runs_xml(&runs);
                let _ = write!(
                    xml,
                    r#"<w:tc><w:tcPr><w:tcW w:w="{column_width}" w:type="dxa"/>{shading}</w:tcPr><w:p><w:pPr><w:jc w:val="{justification}"/></w:pPr>{content}</w:p></w:tc>"#
                );
            }
            xml.push_str("</w:tr>");
        }
        xml.push_str("</w:tbl>");
        // Keeps adjacent tables apart.
        xml.push_str("<w:p/>");
        Ok(xml)
    }

    fn code_block(&mut self, text: &str, language: Option<&str>) -> String {
        let tokens = if self.preserve_formatting {
            match highlight(self.tokenizer, text, language) {
                Ok(tokens) => tokens,
                Err(e) => {
                    self.report.record(DegradationKind::Highlight, format!("code block: {e}"));
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        // Split into lines of (text, color) pieces.
        let mut lines: Vec<Vec<(&str, Option<&'static str>)>> = vec![Vec::new()];
        if tokens.is_empty() {
            lines = text.split('\n').map(|line| vec![(line, None)]).collect();
        } else {
            for token in &tokens {
                let color = Some(token.class.color());
                for (i, piece) in token.text.split('\n').enumerate() {
                    if i > 0 {
                        lines.push(Vec::new());
                    }
                    if let Some(line) = lines.last_mut() {
                        line.push((piece, color));
                    }
                }
            }
            // A trailing newline leaves an empty last line behind.
            if lines.len() > 1 && lines.last().is_some_and(|l| l.iter().all(|(t, _)| t.is_empty())) {
                lines.pop();
            }
        }

        let plain = Style::default();
        let count = lines.len();
        let mut xml = String::new();
        for (index, pieces) in lines.iter().enumerate() {
            let spacing = if index + 1 == count {
                r#"<w:spacing w:after="120"/>"#
            } else {
                ""
            };
            let _ = write!(
                xml,
                r#"<w:p><w:pPr><w:pStyle w:val="{STYLE_CODE_BLOCK}"/>{spacing}</w:pPr>"#
            );
            for (piece, color) in pieces {
                if !piece.is_empty() {
                    write_run(&mut xml, piece, &plain, *color);
                }
            }
            xml.push_str("</w:p>");
        }
        xml
    }

    fn blockquote(&mut self, text: &str, level: u8) -> String {
        let indent = 360 * u32::from(level.max(1));
        let callout = text
            .split('\n')
            .next()
            .and_then(|first| CALLOUT_MARKER_RE.captures(first.trim()))
            .map(|caps| callout_colors(&caps[1]));

        let properties = match callout {
            Some((fill, border)) => format!(
                r#"<w:pStyle w:val="{STYLE_QUOTE}"/><w:pBdr><w:left w:val="single" w:sz="24" w:space="8" w:color="{border}"/></w:pBdr><w:shd w:val="clear" w:color="auto" w:fill="{fill}"/><w:ind w:left="{indent}" w:right="360"/>"#
            ),
            None => format!(
                r#"<w:pStyle w:val="{STYLE_QUOTE}"/><w:pBdr><w:left w:val="single" w:sz="12" w:space="8" w:color="{QUOTE_BORDER}"/></w:pBdr><w:ind w:left="{indent}"/>"#
            ),
        };

        let mut xml = String::new();
        for line in text.split('\n') {
            xml.push_str(&self.paragraph(&properties, line));
        }
        xml
    }

    fn definition(&mut self, term: &str, definition: &str) -> String {
        let mut runs = self.runs(term);
        embolden(&mut runs);
        let mut xml = self.paragraph_runs(r#"<w:keepNext/><w:spacing w:after="0"/>"#, &runs);
        xml.push_str(&self.paragraph(r#"<w:ind w:left="720"/>"#, definition));
        xml
    }

    async fn image(&mut self, image: &ImageRef) -> String {
        match resolve_image(image, self.loader).await {
            Some(resolved) => self.embed(image, resolved),
            None => {
                self.report.record(
                    DegradationKind::ResourceUnavailable,
                    format!("image {}", image.source),
                );
                placeholder(&image_label(image))
            }
        }
    }

    fn embed(&mut self, image: &ImageRef, resolved: ResolvedImage) -> String {
        let index = self.media.len() + 1;
        let name = format!("image{index}.{}", resolved.format.extension());
        let id = self
            .relationships
            .add(RelationshipKind::Image, format!("media/{name}"));
        let (cx, cy) = (resolved.width_emu(), resolved.height_emu());
        let alt = escape_xml(&image.alt);

        let xml = format!(
            r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{index}" name="Picture {index}" descr="{alt}"/><wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic><a:graphicData uri="{NS_PIC}"><pic:pic><pic:nvPicPr><pic:cNvPr id="{index}" name="{name}" descr="{alt}"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
        );

        self.media.push(MediaPart {
            name,
            format: resolved.format,
            data: resolved.data,
        });
        self.report.images += 1;
        xml
    }

    /// Numbered list of referenced footnotes, unless the author wrote one.
    fn footnotes_section(&mut self) {
        if self.footnotes.is_empty() || self.has_footnotes_heading {
            return;
        }

        let heading = self.heading(2, FOOTNOTES_HEADING);
        self.body.push_str(&heading);

        let properties = format!(r#"<w:pStyle w:val="{STYLE_FOOTNOTE}"/>"#);
        // Footnote text may reference further footnotes, which extends the list.
        let mut index = 0;
        while index < self.footnotes.referenced_count() {
            let Some((_, text)) = self.footnotes.referenced(index) else {
                break;
            };
            let text = text.to_string();
            let mut runs = vec![StyleRun::plain(format!("{}. ", index + 1))];
            runs.extend(self.runs(&text));
            let paragraph = self.paragraph_runs(&properties, &runs);
            self.body.push_str(&paragraph);
            index += 1;
        }
        self.report.footnotes = index;
    }
}

fn embolden(runs: &mut [StyleRun]) {
    for run in runs.iter_mut().filter(|r| !r.style.code) {
        run.style.bold = true;
    }
}

fn image_label(image: &ImageRef) -> String {
    let label = if image.alt.trim().is_empty() {
        &image.source
    } else {
        &image.alt
    };
    format!("[Image: {label}]")
}

/// A centered, greyed-out paragraph standing in for missing content.
fn placeholder(text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:pStyle w:val="{STYLE_PLACEHOLDER}"/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape_xml(text)
    )
}

fn write_run(xml: &mut String, text: &str, style: &Style, color: Option<&str>) {
    xml.push_str("<w:r>");

    let mut properties = String::new();
    if style.code {
        let _ = write!(properties, r#"<w:rStyle w:val="{STYLE_INLINE_CODE}"/>"#);
    } else if style.link.is_some() {
        let _ = write!(properties, r#"<w:rStyle w:val="{STYLE_HYPERLINK}"/>"#);
    }
    if style.bold {
        properties.push_str("<w:b/><w:bCs/>");
    }
    if style.italic {
        properties.push_str("<w:i/><w:iCs/>");
    }
    if style.strikethrough {
        properties.push_str("<w:strike/>");
    }
    if let Some(color) = color {
        let _ = write!(properties, r#"<w:color w:val="{color}"/>"#);
    }
    if style.highlight {
        properties.push_str(r#"<w:highlight w:val="yellow"/>"#);
    }
    if style.underline {
        properties.push_str(r#"<w:u w:val="single"/>"#);
    }
    if style.superscript {
        properties.push_str(r#"<w:vertAlign w:val="superscript"/>"#);
    } else if style.subscript {
        properties.push_str(r#"<w:vertAlign w:val="subscript"/>"#);
    }
    if !properties.is_empty() {
        let _ = write!(xml, "<w:rPr>{properties}</w:rPr>");
    }

    for (line_index, line) in text.split('\n').enumerate() {
        if line_index > 0 {
            xml.push_str("<w:br/>");
        }
        for (tab_index, piece) in line.split('\t').enumerate() {
            if tab_index > 0 {
                xml.push_str("<w:tab/>");
            }
            if !piece.is_empty() {
                let _ = write!(xml, r#"<w:t xml:space="preserve">{}</w:t>"#, escape_xml(piece));
            }
        }
    }

    xml.push_str("</w:r>");
}
