//! The numbering part (`word/numbering.xml`).
//!
//! Two abstract definitions, bullet and ordinal, each with levels 0 and 1.
//! Every bullet list shares one instance; each ordered list gets its own
//! instance restarting at 1.

use std::fmt::Write as _;

use super::xml::{NS_W, XML_DECLARATION};

/// Numbering instance shared by all bullet lists.
pub const BULLET_NUM_ID: u32 = 1;

const BULLET_ABSTRACT_ID: u32 = 0;
const ORDERED_ABSTRACT_ID: u32 = 1;

/// Per-level format: (number format, level text).
const BULLET_LEVELS: [(&str, &str); 2] = [("bullet", "\u{2022}"), ("bullet", "\u{25E6}")];
const ORDERED_LEVELS: [(&str, &str); 2] = [("decimal", "%1."), ("lowerLetter", "%2.")];

/// Allocates numbering instances for one document.
#[derive(Debug, Default)]
pub struct Numbering {
    ordered_lists: u32,
}

impl Numbering {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instance id for a new ordered list.
    pub fn next_ordered(&mut self) -> u32 {
        self.ordered_lists += 1;
        BULLET_NUM_ID + self.ordered_lists
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(2048);
        xml.push_str(XML_DECLARATION);
        let _ = write!(xml, r#"<w:numbering xmlns:w="{NS_W}">"#);

        write_abstract(&mut xml, BULLET_ABSTRACT_ID, &BULLET_LEVELS);
        write_abstract(&mut xml, ORDERED_ABSTRACT_ID, &ORDERED_LEVELS);

        let _ = write!(
            xml,
            r#"<w:num w:numId="{BULLET_NUM_ID}"><w:abstractNumId w:val="{BULLET_ABSTRACT_ID}"/></w:num>"#
        );
        // At least one ordered instance, so both definitions are always reachable.
        for n in 1..=self.ordered_lists.max(1) {
            let num_id = BULLET_NUM_ID + n;
            let _ = write!(
                xml,
                r#"<w:num w:numId="{num_id}"><w:abstractNumId w:val="{ORDERED_ABSTRACT_ID}"/><w:lvlOverride w:ilvl="0"><w:startOverride w:val="1"/></w:lvlOverride></w:num>"#
            );
        }

        xml.push_str("</w:numbering>");
        xml
    }
}

fn write_abstract(xml: &mut String, id: u32, levels: &[(&str, &str)]) {
    let _ = write!(
        xml,
        r#"<w:abstractNum w:abstractNumId="{id}"><w:multiLevelType w:val="hybridMultilevel"/>"#
    );
    for (level, (format, text)) in levels.iter().enumerate() {
        let left = 720 * (level + 1);
        let _ = write!(
            xml,
            r#"<w:lvl w:ilvl="{level}"><w:start w:val="1"/><w:numFmt w:val="{format}"/><w:lvlText w:val="{text}"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="{left}" w:hanging="360"/></w:pPr></w:lvl>"#
        );
    }
    xml.push_str("</w:abstractNum>");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_abstract_definitions() {
        let xml = Numbering::new().to_xml();
        assert_eq!(xml.matches("<w:abstractNum ").count(), 2);
        assert_eq!(xml.matches("<w:lvl ").count(), 4);
        assert!(xml.contains(r#"<w:num w:numId="1">"#));
        assert!(xml.contains(r#"<w:num w:numId="2">"#));
    }

    #[test]
    fn test_ordered_instances_restart() {
        let mut numbering = Numbering::new();
        assert_eq!(numbering.next_ordered(), 2);
        assert_eq!(numbering.next_ordered(), 3);
        let xml = numbering.to_xml();
        assert!(xml.contains(r#"<w:num w:numId="3">"#));
        assert_eq!(xml.matches("<w:startOverride").count(), 2);
    }
}
