//! File parsing: PDF page by page, plain text and Markdown whole

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::types::{Document, FileType};

/// Replace typographic characters that PDF fonts commonly emit with plain
/// equivalents and normalise whitespace line by line.
fn cleanup_pdf_text(text: &str) -> String {
    let text = text
        .replace('\0', "")
        .replace(&['\u{2010}', '\u{2011}', '\u{2013}'][..], "-")
        .replace('\u{2014}', "--")
        .replace(&['\u{2018}', '\u{2019}'][..], "'")
        .replace(&['\u{201C}', '\u{201D}'][..], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl");

    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// SHA-256 of raw file bytes, hex encoded
pub fn hash_content(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Turns file bytes into [`Document`]s
pub struct FileParser;

impl FileParser {
    /// Parse a file, choosing the format from its name.
    ///
    /// PDFs yield one document per page with text; an empty vector means
    /// nothing was extractable. Text files yield at most one document and
    /// none when blank.
    pub fn parse(source: &str, data: &[u8]) -> Result<Vec<Document>> {
        let file_type = FileType::from_filename(source)
            .ok_or_else(|| Error::UnsupportedFileType(source.to_string()))?;

        match file_type {
            FileType::Pdf => Self::parse_pdf(source, data),
            FileType::Txt | FileType::Markdown => {
                Ok(Self::parse_text(source, file_type, data)?.into_iter().collect())
            }
        }
    }

    /// Extract each PDF page as its own document, skipping blank pages
    pub fn parse_pdf(source: &str, data: &[u8]) -> Result<Vec<Document>> {
        let pdf = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(source, e.to_string()))?;
        let content_hash = hash_content(data);

        let mut documents = Vec::new();
        for page_number in pdf.get_pages().into_keys() {
            let raw = match pdf.extract_text(&[page_number]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(source, page_number, "Page text extraction failed: {}", e);
                    continue;
                }
            };

            let text = cleanup_pdf_text(&raw);
            if text.trim().is_empty() {
                continue;
            }

            documents.push(
                Document::new(source, FileType::Pdf, content_hash.clone(), text)
                    .with_page(page_number),
            );
        }

        tracing::debug!(source, pages = documents.len(), "Parsed PDF");
        Ok(documents)
    }

    /// Read a UTF-8 text or Markdown file; blank content yields `None`
    pub fn parse_text(source: &str, file_type: FileType, data: &[u8]) -> Result<Option<Document>> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::file_parse(source, format!("Invalid UTF-8: {}", e)))?;

        if text.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(Document::new(source, file_type, hash_content(data), text)))
    }
}
