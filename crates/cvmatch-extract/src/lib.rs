//! CVMatch Extract - Text extraction from uploaded document bytes
//!
//! Supports extraction from:
//! - PDF documents
//! - Microsoft Word (DOCX)
//! - Plain text files
//!
//! Extraction is the boundary between raw uploads and the retrieval engine:
//! given file bytes and a filename, it either produces cleaned text or fails
//! with an `ExtractError`. An unsupported format is a distinct error from a
//! parse failure on a supported format.

pub mod chunker;

pub use chunker::{Chunk, Chunker};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during text extraction
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    /// File format is not supported
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// A supported format yielded no usable text
    #[error("No text content extracted from {0}")]
    EmptyContent(String),

    /// PDF parsing error
    #[error("PDF extraction error: {0}")]
    PdfError(String),

    /// DOCX parsing error
    #[error("DOCX extraction error: {0}")]
    DocxError(String),

    /// Chunker configured so the window can never advance
    #[error("Invalid chunking configuration: overlap {overlap} >= chunk size {chunk_size}")]
    InvalidChunkConfig { chunk_size: usize, overlap: usize },
}

pub type Result<T> = std::result::Result<T, ExtractError>;

// ============================================================================
// File Types
// ============================================================================

/// Supported file types for extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Docx,
    PlainText,
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" | "doc" => Self::Docx,
            "txt" | "md" => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a filename
    pub fn from_filename(filename: &str) -> Self {
        filename
            .rsplit_once('.')
            .map(|(_, ext)| Self::from_extension(ext))
            .unwrap_or(Self::Unknown)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf => write!(f, "pdf"),
            Self::Docx => write!(f, "docx"),
            Self::PlainText => write!(f, "text"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Extract cleaned text from raw file bytes.
///
/// Routes on the filename extension. Returns `UnsupportedFormat` for unknown
/// extensions and `EmptyContent` when a supported format parses but yields
/// nothing usable.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String> {
    let text = match FileType::from_filename(filename) {
        FileType::Pdf => extract_pdf(bytes)?,
        FileType::Docx => extract_docx(bytes)?,
        FileType::PlainText => extract_plain(bytes),
        FileType::Unknown => {
            return Err(ExtractError::UnsupportedFormat(
                filename
                    .rsplit_once('.')
                    .map(|(_, ext)| ext.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            ));
        }
    };

    let cleaned = clean_text(&text);
    if cleaned.is_empty() {
        return Err(ExtractError::EmptyContent(filename.to_string()));
    }

    tracing::debug!(filename, chars = cleaned.len(), "extracted text");
    Ok(cleaned)
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::PdfError(e.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractError::DocxError(e.to_string()))?;

    let mut content = String::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(para) = child {
            for child in &para.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for run_child in &run.children {
                        if let docx_rs::RunChild::Text(text) = run_child {
                            content.push_str(&text.text);
                        }
                    }
                }
            }
            content.push('\n');
        }
    }

    Ok(content)
}

fn extract_plain(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        // Non-UTF8 uploads still happen; recover what we can
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Clean extracted text: collapse whitespace runs and strip characters that
/// survive extraction as noise (control chars, stray replacement chars).
pub fn clean_text(text: &str) -> String {
    let filtered: String = text
        .chars()
        .map(|c| {
            if c.is_control() || c == '\u{FFFD}' {
                ' '
            } else {
                c
            }
        })
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_filename("cv.pdf"), FileType::Pdf);
        assert_eq!(FileType::from_filename("CV.PDF"), FileType::Pdf);
        assert_eq!(FileType::from_filename("resume.docx"), FileType::Docx);
        assert_eq!(FileType::from_filename("notes.txt"), FileType::PlainText);
        assert_eq!(FileType::from_filename("image.png"), FileType::Unknown);
        assert_eq!(FileType::from_filename("no_extension"), FileType::Unknown);
    }

    #[test]
    fn test_unsupported_format_is_distinct_error() {
        let err = extract_text(b"binary", "photo.png").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_plain_text_extraction() {
        let text = extract_text(b"Hello,  world.\nSecond line.", "notes.txt").unwrap();
        assert_eq!(text, "Hello, world. Second line.");
    }

    #[test]
    fn test_empty_plain_text_is_empty_content() {
        let err = extract_text(b"   \n\t ", "blank.txt").unwrap_err();
        assert!(matches!(err, ExtractError::EmptyContent(_)));
    }

    #[test]
    fn test_clean_text_strips_control_chars() {
        let cleaned = clean_text("line one\x0Cline\ttwo\u{FFFD}three");
        assert_eq!(cleaned, "line one line two three");
    }

    #[test]
    fn test_non_utf8_plain_text_recovers() {
        let bytes = [b'o', b'k', 0xFF, b'!'];
        let text = extract_text(&bytes, "legacy.txt").unwrap();
        assert!(text.starts_with("ok"));
    }
}
