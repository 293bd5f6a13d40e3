use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LLMProvider {
    Local,
    OpenAI,
    OpenRouter,
    Google,
}

impl LLMProvider {
    /// Keyring entry name used when no API key is configured.
    pub fn key_name(&self) -> &'static str {
        match self {
            LLMProvider::Local => "local",
            LLMProvider::OpenAI => "openai",
            LLMProvider::OpenRouter => "openrouter",
            LLMProvider::Google => "google",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LLMProvider::Local)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Google,
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            max_tokens: Some(8192),
            temperature: Some(0.2),
        }
    }
}

/// A document handed to the model alongside the prompt text.
#[derive(Debug, Clone)]
pub struct InlineAttachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Everything a single model call needs beyond the provider config.
///
/// `grounding` carries excerpts already retrieved from the referenced corpora;
/// clients fold them into the instructions so the model answers from them.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub system: String,
    pub user: String,
    pub attachment: Option<InlineAttachment>,
    pub grounding: Vec<GroundingExcerpt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroundingExcerpt {
    pub corpus_id: String,
    pub content: String,
    pub score: f32,
}

impl PromptContext {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            attachment: None,
            grounding: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: InlineAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_grounding(mut self, grounding: Vec<GroundingExcerpt>) -> Self {
        self.grounding = grounding;
        self
    }

    /// System instructions with the grounding sources appended.
    pub fn grounded_system(&self) -> String {
        if self.grounding.is_empty() {
            return self.system.clone();
        }

        let mut body = self.system.clone();
        body.push_str("\n\nYou MUST use ONLY the following retrieved sources. DO NOT use outside knowledge.\n");
        for (index, excerpt) in self.grounding.iter().enumerate() {
            body.push_str(&format!(
                "\n[Source {} | corpus {}]\n{}\n",
                index + 1,
                excerpt.corpus_id,
                excerpt.content.trim()
            ));
        }
        body
    }
}
