//! Core data model for document conversion.
//!
//! This module contains:
//! - Block-level document elements produced by the parser
//! - Styled inline runs produced by the inline formatter
//!
//! Everything here is created and dropped within a single conversion.

mod element;
mod run;

pub use element::{Alignment, Element, ImageRef, ListItem, Table, TaskItem, MAX_LIST_DEPTH};
pub use run::{Style, StyleRun, merge_runs};
