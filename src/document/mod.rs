pub mod pdf;
pub mod docx;
pub mod pptx;
pub mod txt;
pub mod chunk;

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

/// Appended after every document when the uploads are flattened into one text.
pub const DOCUMENT_SEPARATOR: &str = "\n\n--- End of Document ---\n\n";

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "pptx", "txt"];

/// A file handed to one processing pass: its name and raw bytes.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let name = path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");
        Ok(Self::new(name, bytes))
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
    }
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Extracts the text of one document. `None` means the file type is not supported.
pub fn extract_text(doc: &UploadedDocument) -> Result<Option<String>> {
    let content = match doc.extension().as_deref() {
        Some("pdf") => pdf::extract(&doc.bytes)?,
        Some("docx") => docx::extract(&doc.bytes)?,
        Some("pptx") => pptx::extract(&doc.bytes)?,
        Some("txt") => txt::extract(&doc.bytes)?,
        _ => return Ok(None),
    };

    Ok(Some(content))
}

/// Flattens all documents into a single text stream, each followed by [`DOCUMENT_SEPARATOR`].
pub fn get_text_from_documents(docs: &[UploadedDocument]) -> Result<String> {
    let mut full_text = String::new();

    for doc in docs {
        match extract_text(doc).with_context(|| format!("Failed to extract text from {}", doc.name))? {
            Some(text) => {
                info!("Extracted {} characters from {}", text.chars().count(), doc.name);
                full_text.push_str(&text);
            }
            None => warn!("Skipping unsupported file type: {}", doc.name),
        }
        full_text.push_str(DOCUMENT_SEPARATOR);
    }

    Ok(full_text)
}
