//! Conversion configuration.
//!
//! [`ConvertOptions`] carries every recognised option with defaults that
//! produce a plain A4 document in Calibri 11pt. Options deserialize from
//! JSON with missing fields falling back to the defaults, so a config file
//! only needs to name what it changes.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Inputs above this many bytes are split into chunks before parsing.
pub const DEFAULT_CHUNK_THRESHOLD: usize = 500_000;

/// Heading sizes relative to the base font size, levels 1 through 6.
pub const HEADING_SCALE: [f32; 6] = [2.0, 1.6, 1.35, 1.15, 1.0, 0.9];

/// Page sizes in twentieths of a point (twips).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    A5,
    A3,
    Letter,
    Legal,
    Tabloid,
}

impl PageSize {
    /// Page `(width, height)` in twips.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            PageSize::A4 => (11906, 16838),
            PageSize::A5 => (8391, 11906),
            PageSize::A3 => (16838, 23811),
            PageSize::Letter => (12240, 15840),
            PageSize::Legal => (12240, 20160),
            PageSize::Tabloid => (15840, 24480),
        }
    }

    /// Parse a page size name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "a4" => Some(PageSize::A4),
            "a5" => Some(PageSize::A5),
            "a3" => Some(PageSize::A3),
            "letter" => Some(PageSize::Letter),
            "legal" => Some(PageSize::Legal),
            "tabloid" => Some(PageSize::Tabloid),
            _ => None,
        }
    }
}

/// Typography detected from the host environment.
///
/// Only consulted when [`ConvertOptions::match_host_appearance`] is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Typography {
    pub text_font: String,
    pub monospace_font: String,
    /// Base size in points.
    pub base_size: f32,
    /// Heading sizes in points, levels 1 through 6.
    pub heading_sizes: [f32; 6],
    /// Line height as a multiple of the font size.
    pub line_height: f32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            text_font: "Calibri".to_string(),
            monospace_font: "Consolas".to_string(),
            base_size: 11.0,
            heading_sizes: HEADING_SCALE.map(|scale| scale * 11.0),
            line_height: 1.15,
        }
    }
}

/// Configuration for a conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Body text font family.
    pub font_family: String,
    /// Body text size in points.
    pub font_size: f32,
    /// Emit a document properties part carrying the title.
    pub include_metadata: bool,
    /// Keep inline emphasis and code coloring; when off, markup is resolved
    /// but emitted as plain runs.
    pub preserve_formatting: bool,
    /// Take fonts and sizes from [`ConvertOptions::typography`].
    pub match_host_appearance: bool,
    /// Prepend the title as a level-1 heading.
    pub include_title_as_heading: bool,
    pub page_size: PageSize,
    /// Inputs larger than this many bytes are parsed in chunks. Zero disables
    /// chunking.
    pub chunk_threshold: usize,
    /// Run the text normalisation pass before parsing.
    pub enable_preprocessing: bool,
    pub typography: Option<Typography>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            font_family: "Calibri".to_string(),
            font_size: 11.0,
            include_metadata: true,
            preserve_formatting: true,
            match_host_appearance: false,
            include_title_as_heading: false,
            page_size: PageSize::A4,
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            enable_preprocessing: true,
            typography: None,
        }
    }
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Reject values no document could be produced with.
    pub fn validate(&self) -> Result<()> {
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(Error::Config(format!(
                "font size must be positive, got {}",
                self.font_size
            )));
        }
        if self.font_family.trim().is_empty() {
            return Err(Error::Config("font family must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn with_font(mut self, family: impl Into<String>, size: f32) -> Self {
        self.font_family = family.into();
        self.font_size = size;
        self
    }

    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_chunk_threshold(mut self, threshold: usize) -> Self {
        self.chunk_threshold = threshold;
        self
    }

    pub fn with_preprocessing(mut self, enabled: bool) -> Self {
        self.enable_preprocessing = enabled;
        self
    }

    pub fn with_title_heading(mut self, enabled: bool) -> Self {
        self.include_title_as_heading = enabled;
        self
    }

    pub fn with_metadata(mut self, enabled: bool) -> Self {
        self.include_metadata = enabled;
        self
    }

    pub fn with_formatting(mut self, preserve: bool) -> Self {
        self.preserve_formatting = preserve;
        self
    }

    /// Use the host's typography profile for fonts and sizes.
    pub fn with_typography(mut self, typography: Typography) -> Self {
        self.typography = Some(typography);
        self.match_host_appearance = true;
        self
    }

    /// Resolve the effective typography for the style part.
    pub fn effective_typography(&self) -> Typography {
        if self.match_host_appearance
            && let Some(ref profile) = self.typography
        {
            return profile.clone();
        }
        Typography {
            text_font: self.font_family.clone(),
            monospace_font: Typography::default().monospace_font,
            base_size: self.font_size,
            heading_sizes: HEADING_SCALE.map(|scale| scale * self.font_size),
            line_height: Typography::default().line_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_dimensions() {
        assert_eq!(PageSize::A4.dimensions(), (11906, 16838));
        assert_eq!(PageSize::Letter.dimensions(), (12240, 15840));
        assert_eq!(PageSize::Tabloid.dimensions(), (15840, 24480));
    }

    #[test]
    fn test_page_size_from_name() {
        assert_eq!(PageSize::from_name("LEGAL"), Some(PageSize::Legal));
        assert_eq!(PageSize::from_name("b5"), None);
    }

    #[test]
    fn test_from_json_partial() {
        let options =
            ConvertOptions::from_json(r#"{"font_size": 12, "page_size": "letter"}"#).unwrap();
        assert_eq!(options.font_size, 12.0);
        assert_eq!(options.page_size, PageSize::Letter);
        assert_eq!(options.font_family, "Calibri");
        assert!(options.enable_preprocessing);
    }

    #[test]
    fn test_from_json_rejects_bad_size() {
        assert!(ConvertOptions::from_json(r#"{"font_size": 0}"#).is_err());
        assert!(ConvertOptions::from_json("not json").is_err());
    }

    #[test]
    fn test_effective_typography_scales_headings() {
        let options = ConvertOptions::new().with_font("Georgia", 10.0);
        let typography = options.effective_typography();
        assert_eq!(typography.text_font, "Georgia");
        assert_eq!(typography.heading_sizes[0], 20.0);
        assert_eq!(typography.heading_sizes[4], 10.0);
    }

    #[test]
    fn test_effective_typography_from_host() {
        let profile = Typography {
            text_font: "Inter".to_string(),
            base_size: 14.0,
            ..Typography::default()
        };
        let options = ConvertOptions::new().with_typography(profile.clone());
        assert_eq!(options.effective_typography(), profile);

        let mut ignored = options.clone();
        ignored.match_host_appearance = false;
        assert_eq!(ignored.effective_typography().text_font, "Calibri");
    }
}
