// src/ingest/providers/mod.rs
pub mod html_headings;

pub use html_headings::{extract_headings, HtmlHeadingFetcher};
