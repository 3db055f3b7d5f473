//! Text Extractor — turns a stored résumé file into plain text.
//!
//! Pure and synchronous: callers on the async side wrap `extract_text` in
//! `spawn_blocking` because PDF parsing is CPU-bound.

use std::io::Cursor;
use std::path::Path;

use crate::errors::PipelineError;

pub mod clean;

pub use clean::{clean, validate_extracted_text, TextValidation};

/// Supported résumé file kinds, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    /// Covers both `.docx` and legacy `.doc`; the latter fails extraction
    /// if it is a pre-OOXML binary file.
    Doc,
    Txt,
}

impl FileKind {
    /// Selects the extractor for a path. Unknown extensions are rejected
    /// before any file I/O happens.
    pub fn from_path(path: &str) -> Result<Self, PipelineError> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "doc" | "docx" => Ok(FileKind::Doc),
            "txt" => Ok(FileKind::Txt),
            _ => Err(PipelineError::UnsupportedFormat(if ext.is_empty() {
                path.to_string()
            } else {
                ext
            })),
        }
    }
}

/// Extracts raw text from file bytes. Output still needs `validate` and
/// `clean` before it is fit for the AI call.
pub fn extract_text(bytes: &[u8], kind: FileKind) -> Result<String, PipelineError> {
    match kind {
        FileKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| PipelineError::Extraction(format!("pdf extraction failed: {e}"))),
        FileKind::Doc => extract_docx(bytes),
        FileKind::Txt => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, PipelineError> {
    let file = docx_rust::DocxFile::from_reader(Cursor::new(bytes))
        .map_err(|e| PipelineError::Extraction(format!("docx open failed: {e:?}")))?;
    let docx = file
        .parse()
        .map_err(|e| PipelineError::Extraction(format!("docx parse failed: {e:?}")))?;

    let mut out = String::new();
    for content in &docx.document.body.content {
        if let docx_rust::document::BodyContent::Paragraph(paragraph) = content {
            let line = paragraph
                .iter_text()
                .map(|t| t.as_ref())
                .collect::<Vec<&str>>()
                .join(" ");
            if !line.trim().is_empty() {
                out.push_str(line.trim());
                out.push('\n');
            }
        }
    }
    Ok(out)
}
