//! # mdocx
//!
//! A fast, lightweight library for converting Markdown-style text to Word
//! (DOCX) documents.
//!
//! ## Features
//!
//! - Headings, paragraphs, lists, task lists, tables, block quotes, callouts,
//!   collapsible sections and horizontal rules
//! - Inline emphasis, code, links, sub/superscript and a small set of HTML tags
//! - Footnotes numbered in order of first reference
//! - Code blocks colored by a pluggable tokenizer
//! - Images from data URIs, local files and (optionally) remote URLs
//! - Large inputs parsed in chunks without blocking the async runtime
//!
//! ## Quick Start
//!
//! ```no_run
//! use mdocx::{ConvertOptions, convert};
//!
//! # async fn run() -> mdocx::Result<()> {
//! let conversion = convert("# Notes\n\nSome *text*.", "Notes", &ConvertOptions::default()).await?;
//! std::fs::write("notes.docx", &conversion.bytes)?;
//! for degradation in conversion.report.degradations() {
//!     eprintln!("{}: {}", degradation.kind, degradation.detail);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! [`preprocess`] normalizes the text, [`footnotes`] pulls definitions out,
//! [`chunk`] splits very large inputs, [`parser`] turns lines into
//! [`model::Element`]s, [`inline`] resolves emphasis into runs, and
//! [`docx`] serializes and packages the result. [`Converter`] drives the
//! whole sequence.

pub mod chunk;
pub mod convert;
pub mod docx;
pub mod error;
pub mod footnotes;
pub mod highlight;
pub mod image;
pub mod inline;
pub mod model;
pub mod options;
pub mod parser;
pub(crate) mod patterns;
pub mod preprocess;
pub mod report;
pub mod util;

pub use convert::{Conversion, Converter, convert};
pub use docx::{DocxConfig, DocxWriter};
pub use error::{Error, Result};
pub use highlight::{SyntectTokenizer, Tokenizer};
pub use image::{FsLoader, ResourceLoader};
pub use options::{ConvertOptions, PageSize, Typography};
pub use report::{ConversionReport, Degradation, DegradationKind};
