//! PDF loading module
//!
//! Extracts text page by page using lopdf. Each page with text becomes one
//! [`Document`] tagged with the file path and zero-based page number.

use crate::document::{Document, DocumentMetadata};
use crate::errors::IngestionError;
use std::path::Path;
use tracing::{debug, warn};

/// Load a PDF file as one document per non-empty page
///
/// A PDF without extractable text yields an empty list.
pub fn load_pdf(path: &Path) -> Result<Vec<Document>, IngestionError> {
    let source = path.display().to_string();

    if !path.exists() {
        return Err(IngestionError::FileNotFound(source));
    }

    let doc = lopdf::Document::load(path).map_err(|e| IngestionError::PdfParseError {
        path: source.clone(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut documents = Vec::with_capacity(pages.len());

    for (page_num, page_id) in pages.iter() {
        let text = match extract_page_text(&doc, *page_num, *page_id) {
            Ok(text) => clean_text(&text),
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract text from page, skipping");
                continue;
            }
        };

        if text.is_empty() {
            debug!(page = page_num, "Page has no text, skipping");
            continue;
        }

        documents.push(Document::new(
            text,
            DocumentMetadata {
                source: source.clone(),
                page: page_num - 1,
            },
        ));
    }

    debug!(pages_with_text = documents.len(), "Text extraction complete");

    Ok(documents)
}

/// Extract text from a single page, falling back to a raw content-stream scan
/// when lopdf's font-aware extraction fails or yields nothing.
fn extract_page_text(
    doc: &lopdf::Document,
    page_num: u32,
    page_id: lopdf::ObjectId,
) -> Result<String, String> {
    match doc.extract_text(&[page_num]) {
        Ok(text) if !text.trim().is_empty() => return Ok(text),
        Ok(_) => {}
        Err(e) => debug!(page = page_num, error = %e, "Font-aware extraction failed"),
    }

    let content = doc.get_page_content(page_id).map_err(|e| e.to_string())?;
    Ok(extract_text_from_content(&content))
}

/// Extract text from PDF content stream
fn extract_text_from_content(content: &[u8]) -> String {
    // Text lives between BT and ET operators
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current_text = String::new();

    for line in content_str.lines() {
        let trimmed = line.trim();

        if trimmed == "BT" {
            in_text_block = true;
            continue;
        }

        if trimmed == "ET" {
            in_text_block = false;
            if !current_text.is_empty() {
                text.push_str(&current_text);
                text.push(' ');
                current_text.clear();
            }
            continue;
        }

        if in_text_block {
            if let Some(text_content) = extract_text_from_operator(trimmed) {
                current_text.push_str(&text_content);
            }
        }
    }

    text
}

/// Extract text from a PDF text operator
fn extract_text_from_operator(line: &str) -> Option<String> {
    // (text) Tj, (text) ', (text) "
    if line.ends_with("Tj") || line.ends_with('\'') || line.ends_with('"') {
        let start = line.find('(')?;
        let end = line.rfind(')')?;
        if end > start {
            return Some(decode_pdf_string(&line[start + 1..end]));
        }
        return None;
    }

    // [(text) num (text) num] TJ
    if line.ends_with("TJ") {
        let mut result = String::new();
        let mut in_paren = false;
        let mut escaped = false;
        let mut current = String::new();

        for ch in line.chars() {
            match ch {
                _ if escaped => {
                    current.push(ch);
                    escaped = false;
                }
                '\\' if in_paren => {
                    current.push(ch);
                    escaped = true;
                }
                '(' if !in_paren => in_paren = true,
                ')' if in_paren => {
                    in_paren = false;
                    result.push_str(&decode_pdf_string(&current));
                    current.clear();
                }
                _ if in_paren => current.push(ch),
                _ => {}
            }
        }

        if !result.is_empty() {
            return Some(result);
        }
    }

    None
}

/// Decode PDF string escapes
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some(c) => result.push(c),
                None => {}
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Normalize extracted text
fn clean_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{FEFF}', "")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_pdf;

    #[test]
    fn test_load_pdf_one_document_per_page() {
        let path = write_pdf("pages", &["Vacation policy", "Remote work"]);
        let docs = load_pdf(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(docs.len(), 2);
        assert!(docs[0].page_content.contains("Vacation policy"));
        assert_eq!(docs[0].metadata.page, 0);
        assert!(docs[1].page_content.contains("Remote work"));
        assert_eq!(docs[1].metadata.page, 1);
        assert_eq!(docs[1].metadata.source, path.display().to_string());
    }

    #[test]
    fn test_missing_file() {
        let err = load_pdf(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, IngestionError::FileNotFound(_)));
    }

    #[test]
    fn test_content_stream_fallback() {
        let content = b"BT\n/F1 12 Tf\n(Hello \\(world\\)) Tj\nET\nBT\n[(Sick) -250 (leave)] TJ\nET";
        assert_eq!(extract_text_from_content(content), "Hello (world) Sickleave ");
    }

    #[test]
    fn test_clean_text() {
        let input = "Hello   World\n\n\u{201C}Test\u{201D}";
        assert_eq!(clean_text(input), "Hello World \"Test\"");
    }

    #[test]
    fn test_decode_pdf_string() {
        assert_eq!(decode_pdf_string("Hello\\nWorld"), "Hello\nWorld");
        assert_eq!(decode_pdf_string("Test\\(paren\\)"), "Test(paren)");
    }
}
