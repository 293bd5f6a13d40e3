use crate::domain::error::{AppError, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Media types accepted by the upload step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Xml,
    Markdown,
    Text,
}

impl DocumentKind {
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(DocumentKind::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(DocumentKind::Docx)
            }
            "text/xml" | "application/xml" => Some(DocumentKind::Xml),
            "text/markdown" | "text/x-markdown" => Some(DocumentKind::Markdown),
            "text/plain" => Some(DocumentKind::Text),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::Xml => "xml",
            DocumentKind::Markdown => "md",
            DocumentKind::Text => "txt",
        }
    }
}

/// The uploaded requirements file, held only until parsing settles.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: Option<String>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

impl Document {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: Option<String>) -> Self {
        self.file_name = file_name
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    /// Parses `data:<mime>;base64,<payload>` as produced by browser file readers.
    pub fn from_data_uri(data_uri: &str) -> Result<Self> {
        let rest = data_uri
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| AppError::ValidationError("Document must be a data URI.".to_string()))?;
        let (header, payload) = rest.split_once(',').ok_or_else(|| {
            AppError::ValidationError("Data URI is missing its payload.".to_string())
        })?;

        let mut params = header.split(';');
        let mime_type = params.next().unwrap_or_default().trim();
        if !params.any(|param| param.trim().eq_ignore_ascii_case("base64")) {
            return Err(AppError::ValidationError(
                "Data URI must use base64 encoding.".to_string(),
            ));
        }
        let mime_type = if mime_type.is_empty() {
            "text/plain"
        } else {
            mime_type
        };

        let bytes = decode_base64(payload)?;
        Ok(Self::new(bytes, mime_type))
    }

    pub fn from_base64(mime_type: &str, data: &str) -> Result<Self> {
        Ok(Self::new(decode_base64(data)?, mime_type.trim()))
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        DocumentKind::from_mime_type(&self.mime_type)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| AppError::ValidationError(format!("Invalid base64 document payload: {}", e)))
}

/// Where an upload was persisted and which corpus grounds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub digest: String,
    pub location: String,
}

/// Output of one ingestion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRequirements {
    pub parsed_content: String,
    pub corpus_reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_round_trips_payload_and_mime() {
        let document = Document::from_data_uri("data:text/markdown;base64,IyBSZXE=").unwrap();
        assert_eq!(document.mime_type, "text/markdown");
        assert_eq!(document.bytes, b"# Req");
        assert_eq!(document.kind(), Some(DocumentKind::Markdown));
    }

    #[test]
    fn test_data_uri_without_base64_flag_is_rejected() {
        let err = Document::from_data_uri("data:text/plain,hello").unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn test_plain_string_is_not_a_data_uri() {
        assert!(Document::from_data_uri("hello").is_err());
    }

    #[test]
    fn test_mime_parameters_are_ignored_for_kind() {
        assert_eq!(
            DocumentKind::from_mime_type("text/xml; charset=utf-16"),
            Some(DocumentKind::Xml)
        );
        assert_eq!(DocumentKind::from_mime_type("image/png"), None);
    }

    #[test]
    fn test_blank_file_name_is_dropped() {
        let document = Document::new(vec![1], "application/pdf").with_file_name(Some("  ".into()));
        assert_eq!(document.file_name, None);
    }
}
