//! Loading a document's text from disk.
//!
//! Only formats that are already text are read here (`.txt`, `.md`). Anything else
//! is rejected up front; binary formats need an external extractor that hands us a
//! string via [`Document::from_text`].

use std::path::{Path, PathBuf};

/// A loaded document: where it came from and its full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name (no directory), used to tell documents apart.
    pub name: String,
    pub text: String,
}

impl Document {
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Markdown,
}

impl DocumentFormat {
    /// Detect the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "txt" | "text" => Ok(DocumentFormat::PlainText),
            "md" | "markdown" => Ok(DocumentFormat::Markdown),
            _ => Err(DocumentError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Reads `path` into a [`Document`]. Invalid UTF-8 is replaced, not rejected.
/// Markdown loses its YAML frontmatter.
pub fn load_document(path: &Path) -> Result<Document, DocumentError> {
    let format = DocumentFormat::from_path(path)?;
    if !path.is_file() {
        return Err(DocumentError::NotAFile(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|e| DocumentError::Read(path.to_path_buf(), e))?;
    let raw = String::from_utf8_lossy(&bytes);
    let text = match format {
        DocumentFormat::PlainText => raw.into_owned(),
        DocumentFormat::Markdown => strip_frontmatter(&raw),
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    tracing::debug!(name = %name, chars = text.chars().count(), "loaded document");
    Ok(Document { name, text })
}

/// Drops a leading YAML frontmatter block: a `---` line, then anything up to a
/// closing `---` or `...` line. A byte-order mark or blank lines before the opener
/// are allowed. Without a closer the text is kept as is.
fn strip_frontmatter(content: &str) -> String {
    let body = content.trim_start_matches('\u{feff}').trim_start();
    let mut end = match body.split_inclusive('\n').next() {
        Some(first) if first.trim_end() == "---" => first.len(),
        _ => return content.to_string(),
    };
    for line in body[end..].split_inclusive('\n') {
        end += line.len();
        if matches!(line.trim_end(), "---" | "...") {
            return body[end..].trim_start().to_string();
        }
    }
    content.to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("unsupported document format: {0} (expected .txt or .md)")]
    UnsupportedFormat(PathBuf),
    #[error("not a file: {0}")]
    NotAFile(PathBuf),
    #[error("read error for {0}: {1}")]
    Read(PathBuf, std::io::Error),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn loads_plain_text() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "The sky is blue.\nCats are mammals.").unwrap();
        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc.text, "The sky is blue.\nCats are mammals.");
        assert!(doc.name.ends_with(".txt"));
    }

    #[test]
    fn markdown_frontmatter_is_stripped() {
        let mut file = tempfile::Builder::new().suffix(".MD").tempfile().unwrap();
        write!(file, "---\ntitle: Foo\n---\n\nActual content here.").unwrap();
        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc.text, "Actual content here.");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        let err = load_document(file.path()).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(&dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, DocumentError::NotAFile(_)));
    }

    #[test]
    fn strip_frontmatter_plain() {
        assert_eq!(strip_frontmatter("Hello world."), "Hello world.");
    }

    #[test]
    fn strip_frontmatter_crlf() {
        assert_eq!(
            strip_frontmatter("---\r\ntitle: Foo\r\n---\r\n\r\nBody.\r\n"),
            "Body.\r\n"
        );
    }

    #[test]
    fn strip_frontmatter_closer_at_end_of_file() {
        assert_eq!(strip_frontmatter("---\ntitle: Foo\n---"), "");
        assert_eq!(strip_frontmatter("---\ntitle: Foo\n---  "), "");
    }

    #[test]
    fn strip_frontmatter_dot_closer_and_bom() {
        assert_eq!(strip_frontmatter("---\ntitle: Foo\n...\nBody"), "Body");
        assert_eq!(strip_frontmatter("\u{feff}---\ntitle: Foo\n---\nBody"), "Body");
    }

    #[test]
    fn strip_frontmatter_needs_whole_line_fences() {
        // "---more" is content, not a closer
        assert_eq!(strip_frontmatter("---\nkey: a\n---more\n---\nBody"), "Body");
        // "----" is a rule, not an opener
        let ruled = "----\ntitle: Foo\n---\nBody";
        assert_eq!(strip_frontmatter(ruled), ruled);
    }

    #[test]
    fn strip_frontmatter_keeps_unterminated_block() {
        let text = "---\ntitle: Foo\nBody without a closer";
        assert_eq!(strip_frontmatter(text), text);
    }

    #[test]
    fn strip_frontmatter_keeps_later_rules() {
        assert_eq!(
            strip_frontmatter("---\na: 1\n---\nOne\n---\nTwo"),
            "One\n---\nTwo"
        );
        let text = "Intro\n\n---\n\nMore";
        assert_eq!(strip_frontmatter(text), text);
    }
}
