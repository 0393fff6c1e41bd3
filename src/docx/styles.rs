//! The style part (`word/styles.xml`).

use std::fmt::Write as _;

use super::xml::{NS_W, XML_DECLARATION, escape_xml};
use crate::options::Typography;

/// Accent color for hyperlinks.
pub const LINK_COLOR: &str = "0563C1";

/// Paragraph style ids referenced from the body.
pub const STYLE_CODE_BLOCK: &str = "CodeBlock";
pub const STYLE_QUOTE: &str = "Quote";
pub const STYLE_LIST: &str = "ListParagraph";
pub const STYLE_FOOTNOTE: &str = "FootnoteText";
pub const STYLE_PLACEHOLDER: &str = "Placeholder";

/// Character style ids referenced from the body.
pub const STYLE_INLINE_CODE: &str = "InlineCode";
pub const STYLE_HYPERLINK: &str = "Hyperlink";

/// Table style id.
pub const STYLE_TABLE: &str = "TableGrid";

/// Font size in half-points, the unit of `w:sz`.
fn half_points(points: f32) -> u32 {
    (points * 2.0).round().max(2.0) as u32
}

/// Render the style part for a typography profile.
pub fn styles_xml(typography: &Typography) -> String {
    let text_font = escape_xml(&typography.text_font);
    let mono_font = escape_xml(&typography.monospace_font);
    let base = half_points(typography.base_size);
    let small = half_points(typography.base_size * 0.85);
    let code = half_points(typography.base_size * 0.9);
    let line = (240.0 * typography.line_height).round() as u32;

    let mut xml = String::with_capacity(8 * 1024);
    xml.push_str(XML_DECLARATION);
    let _ = write!(
        xml,
        r#"<w:styles xmlns:w="{NS_W}"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="{text_font}" w:hAnsi="{text_font}" w:eastAsia="{text_font}" w:cs="{text_font}"/><w:sz w:val="{base}"/><w:szCs w:val="{base}"/><w:lang w:val="en-US"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="120" w:line="{line}" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults>"#
    );

    xml.push_str(
        r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>"#,
    );

    for (index, size) in typography.heading_sizes.iter().enumerate() {
        let level = index + 1;
        let size = half_points(*size);
        let _ = write!(
            xml,
            r#"<w:style w:type="paragraph" w:styleId="Heading{level}"><w:name w:val="heading {level}"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:uiPriority w:val="9"/><w:qFormat/><w:pPr><w:keepNext/><w:keepLines/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="{index}"/></w:pPr><w:rPr><w:b/><w:bCs/><w:sz w:val="{size}"/><w:szCs w:val="{size}"/></w:rPr></w:style>"#
        );
    }

    let _ = write!(
        xml,
        r#"<w:style w:type="paragraph" w:styleId="{STYLE_LIST}"><w:name w:val="List Paragraph"/><w:basedOn w:val="Normal"/><w:uiPriority w:val="34"/><w:qFormat/><w:pPr><w:spacing w:after="60"/><w:ind w:left="720"/><w:contextualSpacing/></w:pPr></w:style>"#
    );
    let _ = write!(
        xml,
        r#"<w:style w:type="paragraph" w:styleId="{STYLE_CODE_BLOCK}"><w:name w:val="Code Block"/><w:basedOn w:val="Normal"/><w:qFormat/><w:pPr><w:shd w:val="clear" w:color="auto" w:fill="F6F8FA"/><w:spacing w:after="0" w:line="240" w:lineRule="auto"/><w:ind w:left="240" w:right="240"/></w:pPr><w:rPr><w:rFonts w:ascii="{mono_font}" w:hAnsi="{mono_font}" w:cs="{mono_font}"/><w:sz w:val="{code}"/><w:szCs w:val="{code}"/></w:rPr></w:style>"#
    );
    let _ = write!(
        xml,
        r#"<w:style w:type="paragraph" w:styleId="{STYLE_QUOTE}"><w:name w:val="Quote"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:uiPriority w:val="29"/><w:qFormat/><w:pPr><w:spacing w:before="60" w:after="60"/></w:pPr><w:rPr><w:color w:val="404040"/></w:rPr></w:style>"#
    );
    let _ = write!(
        xml,
        r#"<w:style w:type="paragraph" w:styleId="{STYLE_FOOTNOTE}"><w:name w:val="footnote text"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:after="60"/></w:pPr><w:rPr><w:sz w:val="{small}"/><w:szCs w:val="{small}"/></w:rPr></w:style>"#
    );
    let _ = write!(
        xml,
        r#"<w:style w:type="paragraph" w:styleId="{STYLE_PLACEHOLDER}"><w:name w:val="Placeholder"/><w:basedOn w:val="Normal"/><w:pPr><w:jc w:val="center"/></w:pPr><w:rPr><w:i/><w:iCs/><w:color w:val="808080"/></w:rPr></w:style>"#
    );
    let _ = write!(
        xml,
        r#"<w:style w:type="character" w:styleId="{STYLE_INLINE_CODE}"><w:name w:val="Inline Code"/><w:rPr><w:rFonts w:ascii="{mono_font}" w:hAnsi="{mono_font}" w:cs="{mono_font}"/><w:sz w:val="{code}"/><w:szCs w:val="{code}"/><w:shd w:val="clear" w:color="auto" w:fill="F3F3F3"/></w:rPr></w:style>"#
    );
    let _ = write!(
        xml,
        r#"<w:style w:type="character" w:styleId="{STYLE_HYPERLINK}"><w:name w:val="Hyperlink"/><w:uiPriority w:val="99"/><w:unhideWhenUsed/><w:rPr><w:color w:val="{LINK_COLOR}"/><w:u w:val="single"/></w:rPr></w:style>"#
    );
    let _ = write!(
        xml,
        r#"<w:style w:type="table" w:styleId="{STYLE_TABLE}"><w:name w:val="Table Grid"/><w:uiPriority w:val="59"/><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr><w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="BFBFBF"/><w:left w:val="single" w:sz="4" w:space="0" w:color="BFBFBF"/><w:bottom w:val="single" w:sz="4" w:space="0" w:color="BFBFBF"/><w:right w:val="single" w:sz="4" w:space="0" w:color="BFBFBF"/><w:insideH w:val="single" w:sz="4" w:space="0" w:color="BFBFBF"/><w:insideV w:val="single" w:sz="4" w:space="0" w:color="BFBFBF"/></w:tblBorders><w:tblCellMar><w:left w:w="108" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style>"#
    );

    xml.push_str("</w:styles>");
    xml
}
