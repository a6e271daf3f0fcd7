use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::FileHandle;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("file name cannot be empty")]
    EmptyName,
    #[error("only PDF files can be shared, got {content_type:?}")]
    NotPdf { content_type: String },
}

/// A file picked by a faculty user, before it is accepted for sharing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: Option<String>,
    #[serde(skip)]
    pub contents: Vec<u8>,
}

impl UploadRequest {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, contents: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            contents,
        }
    }

    /// Resolves the effective content type. Without an explicit type a
    /// `.pdf` extension counts as PDF.
    pub fn effective_content_type(&self) -> Option<String> {
        match self.content_type.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => Some(explicit.to_ascii_lowercase()),
            _ if self.file_name.to_ascii_lowercase().ends_with(".pdf") => {
                Some(PDF_CONTENT_TYPE.to_string())
            }
            _ => None,
        }
    }

    pub fn into_pdf(self) -> Result<FileHandle, UploadError> {
        if self.file_name.trim().is_empty() {
            return Err(UploadError::EmptyName);
        }

        match self.effective_content_type() {
            Some(content_type) if content_type == PDF_CONTENT_TYPE => {
                Ok(FileHandle::new(self.file_name, content_type, self.contents))
            }
            other => Err(UploadError::NotPdf {
                content_type: other.unwrap_or_default(),
            }),
        }
    }
}
