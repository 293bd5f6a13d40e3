use crate::application::use_cases::grounding::CorpusRegistry;
use crate::application::use_cases::prompts::{build_parse_system_prompt, build_parse_user_prompt};
use crate::domain::document::{Document, DocumentKind, ParsedRequirements, StoredDocument};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{InlineAttachment, LLMConfig, PromptContext};
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::clean_llm_response;
use crate::infrastructure::storage::{sha256_hex, DocumentStore};
use crate::shared::token_counter::TokenCounter;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

mod text_extraction;

/// Upper bound on document text placed in the parse prompt.
const MAX_DOCUMENT_PROMPT_TOKENS: usize = 200_000;

#[derive(Debug, Clone)]
pub struct IngestionOutput {
    pub parsed: ParsedRequirements,
    pub stored: StoredDocument,
}

pub struct DocumentIngestionUseCase {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    store: Arc<DocumentStore>,
    corpora: Arc<CorpusRegistry>,
}

impl DocumentIngestionUseCase {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        store: Arc<DocumentStore>,
        corpora: Arc<CorpusRegistry>,
    ) -> Self {
        Self {
            llm_client,
            store,
            corpora,
        }
    }

    /// Decodes, persists and parses `document`. `cached` is the location of a
    /// previous ingestion of the same upload; it is reused when the digest matches.
    pub async fn execute(
        &self,
        config: &LLMConfig,
        document: &Document,
        cached: Option<&StoredDocument>,
        feedback: Option<&str>,
    ) -> Result<IngestionOutput> {
        if document.is_empty() {
            return Err(AppError::IngestionError("Document is empty.".to_string()));
        }
        let kind = document.kind().ok_or_else(|| {
            AppError::IngestionError(format!(
                "Unsupported document type: {}",
                document.mime_type
            ))
        })?;

        let text = text_extraction::extract_text(kind, &document.bytes)?;
        // PDFs travel to the model as an attachment, so a missing text layer
        // (scanned pages) is still parseable.
        if text.is_empty() && kind != DocumentKind::Pdf {
            return Err(AppError::IngestionError(
                "No readable text found in the document.".to_string(),
            ));
        }

        let stored = self.persist(document, cached)?;
        let corpus_reference = self.corpora.register_document(&stored.digest, &text);

        let prompt_text = TokenCounter::truncate_to_budget(&text, MAX_DOCUMENT_PROMPT_TOKENS);
        let mut context = PromptContext::new(
            build_parse_system_prompt(),
            build_parse_user_prompt(document.file_name.as_deref(), &prompt_text, feedback),
        );
        if kind == DocumentKind::Pdf {
            context = context.with_attachment(InlineAttachment {
                mime_type: "application/pdf".to_string(),
                data: document.bytes.clone(),
            });
        }

        let raw = self
            .llm_client
            .generate_with(config, &context)
            .await
            .map_err(|e| AppError::IngestionError(format!("Model call failed: {}", e.message())))?;

        let parsed_content = clean_llm_response(&raw);
        if parsed_content.is_empty() {
            return Err(AppError::IngestionError(
                "The model returned no parsed content.".to_string(),
            ));
        }

        tracing::info!(
            digest = %stored.digest,
            corpus_reference = %corpus_reference,
            chars = parsed_content.chars().count(),
            with_feedback = feedback.is_some(),
            "Document parsed"
        );

        Ok(IngestionOutput {
            parsed: ParsedRequirements {
                parsed_content,
                corpus_reference,
            },
            stored,
        })
    }

    /// Releases document corpora no live session refers to.
    pub fn retain_corpora(&self, live: &HashSet<String>, cutoff: Instant) -> usize {
        self.corpora.retain_documents(live, cutoff)
    }

    fn persist(&self, document: &Document, cached: Option<&StoredDocument>) -> Result<StoredDocument> {
        if let Some(cached) = cached {
            if cached.digest == sha256_hex(&document.bytes) {
                return Ok(cached.clone());
            }
        }
        self.store
            .persist(document)
            .map_err(|e| AppError::IngestionError(format!("Failed to store document: {}", e.message())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::grounding::GroundingConfig;
    use crate::infrastructure::llm_clients::scripted::ScriptedClient;

    fn temp_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("casewise-ingest-{}", uuid::Uuid::new_v4()))
    }

    fn use_case(client: Arc<ScriptedClient>) -> (DocumentIngestionUseCase, Arc<CorpusRegistry>) {
        let store = Arc::new(DocumentStore::new(&temp_dir()).unwrap());
        let corpora = Arc::new(CorpusRegistry::new(GroundingConfig::default()));
        (
            DocumentIngestionUseCase::new(client, store, corpora.clone()),
            corpora,
        )
    }

    fn text_document() -> Document {
        Document::new(b"REQ-1 The user must log in securely.".to_vec(), "text/plain")
            .with_file_name(Some("srs.txt".to_string()))
    }

    #[tokio::test]
    async fn test_ingestion_returns_parsed_content_and_registers_corpus() {
        let client = Arc::new(ScriptedClient::new().reply("<think>hm</think>Req: user must log in securely"));
        let (use_case, corpora) = use_case(client.clone());

        let output = use_case
            .execute(&LLMConfig::default(), &text_document(), None, None)
            .await
            .unwrap();

        assert_eq!(output.parsed.parsed_content, "Req: user must log in securely");
        assert!(output.parsed.corpus_reference.starts_with("corpus-"));
        assert!(corpora.contains(&output.parsed.corpus_reference));
        assert!(std::path::Path::new(&output.stored.location).exists());

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].user.contains("REQ-1 The user must log in securely."));
        assert!(calls[0].user.contains("Document name: srs.txt"));
        assert!(!calls[0].has_attachment);
    }

    #[tokio::test]
    async fn test_feedback_is_forwarded_and_cached_location_reused() {
        let client = Arc::new(ScriptedClient::new().reply("first").reply("second"));
        let (use_case, _) = use_case(client.clone());
        let document = text_document();

        let first = use_case
            .execute(&LLMConfig::default(), &document, None, None)
            .await
            .unwrap();
        let second = use_case
            .execute(
                &LLMConfig::default(),
                &document,
                Some(&first.stored),
                Some("Split REQ-1 into two requirements"),
            )
            .await
            .unwrap();

        assert_eq!(second.stored, first.stored);
        assert_eq!(second.parsed.corpus_reference, first.parsed.corpus_reference);
        assert_eq!(second.parsed.parsed_content, "second");
        assert!(client.calls()[1]
            .user
            .contains("User feedback: Split REQ-1 into two requirements"));
    }

    #[tokio::test]
    async fn test_unsupported_type_fails_before_model_call() {
        let client = Arc::new(ScriptedClient::new().reply("unused"));
        let (use_case, _) = use_case(client.clone());
        let document = Document::new(vec![1, 2, 3], "image/png");

        let result = use_case
            .execute(&LLMConfig::default(), &document, None, None)
            .await;

        assert!(matches!(result, Err(AppError::IngestionError(_))));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_and_empty_answer_are_ingestion_errors() {
        let client = Arc::new(ScriptedClient::new().fail("quota exceeded").reply("  \n "));
        let (use_case, _) = use_case(client);
        let document = text_document();

        let failed = use_case
            .execute(&LLMConfig::default(), &document, None, None)
            .await;
        match failed {
            Err(AppError::IngestionError(message)) => assert!(message.contains("quota exceeded")),
            other => panic!("unexpected result: {:?}", other),
        }

        let empty = use_case
            .execute(&LLMConfig::default(), &document, None, None)
            .await;
        assert!(matches!(empty, Err(AppError::IngestionError(_))));
    }

    /// One blank page whose content stream draws nothing, like a scan
    /// without an OCR layer.
    fn image_only_pdf() -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Object, Stream};

        let mut pdf = lopdf::Document::with_version("1.5");
        let pages_id = pdf.new_object_id();
        let content = Content {
            operations: vec![Operation::new("q", vec![]), Operation::new("Q", vec![])],
        };
        let content_id = pdf.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        pdf.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = pdf.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        pdf.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        pdf.save_to(&mut bytes).unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_pdf_without_text_layer_is_sent_to_model() {
        let client = Arc::new(ScriptedClient::new().reply("Req: scanned requirement"));
        let (use_case, corpora) = use_case(client.clone());
        let document = Document::new(image_only_pdf(), "application/pdf")
            .with_file_name(Some("scan.pdf".to_string()));

        let output = use_case
            .execute(&LLMConfig::default(), &document, None, None)
            .await
            .unwrap();

        assert_eq!(output.parsed.parsed_content, "Req: scanned requirement");
        assert!(corpora.contains(&output.parsed.corpus_reference));

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].has_attachment);
        assert!(calls[0].user.contains("no text layer"));
    }

    #[tokio::test]
    async fn test_whitespace_only_text_is_rejected() {
        let client = Arc::new(ScriptedClient::new().reply("unused"));
        let (use_case, _) = use_case(client.clone());
        let document = Document::new(b"   \n\t".to_vec(), "text/markdown");

        let result = use_case
            .execute(&LLMConfig::default(), &document, None, None)
            .await;
        assert!(matches!(result, Err(AppError::IngestionError(_))));
        assert!(client.calls().is_empty());
    }
}
