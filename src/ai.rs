use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const MISSING_SELECTION_TIPS: &str =
    "<p>Please select a company and role from an experience card.</p>";
pub const DISABLED_TIPS: &str = "<p>API Key not configured. This feature is disabled.</p>";
pub const FAILED_TIPS: &str =
    "<p>Sorry, I couldn't generate tips at the moment. Please try again later.</p>";

const TIPS_MAX_TOKENS: u32 = 1024;

// --- Provider trait ---

#[async_trait]
pub trait AIProvider: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Anthropic,
    OpenAI,
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub model_id: String,
    pub short_name: String,
}

pub fn resolve_model(name: &str) -> Result<ModelSpec> {
    let (provider, model_id, short_name) = match name {
        // Google Gemini (requires GEMINI_API_KEY)
        "gemini-flash" | "gemini" | "flash" => (ProviderKind::Gemini, "gemini-2.5-flash", "gemini-flash"),
        "gemini-pro" => (ProviderKind::Gemini, "gemini-2.5-pro", "gemini-pro"),
        // Anthropic API (requires ANTHROPIC_API_KEY)
        "claude-haiku" | "haiku" => (ProviderKind::Anthropic, "claude-haiku-4-5-20251001", "claude-haiku"),
        "claude-sonnet" | "sonnet" => (ProviderKind::Anthropic, "claude-sonnet-4-5-20250929", "claude-sonnet"),
        // OpenAI (requires OPENAI_API_KEY)
        "gpt-4o-mini" => (ProviderKind::OpenAI, "gpt-4o-mini", "gpt-4o-mini"),
        "gpt-4o" => (ProviderKind::OpenAI, "gpt-4o", "gpt-4o"),
        _ => {
            return Err(anyhow!(
                "Unknown model '{}'. Available: gemini-flash, gemini-pro, claude-haiku, \
                 claude-sonnet, gpt-4o-mini, gpt-4o",
                name
            ));
        }
    };

    Ok(ModelSpec {
        provider,
        model_id: model_id.to_string(),
        short_name: short_name.to_string(),
    })
}

pub fn create_provider(spec: &ModelSpec) -> Result<Box<dyn AIProvider>> {
    match spec.provider {
        ProviderKind::Gemini => Ok(Box::new(GeminiProvider::new(spec.model_id.clone())?)),
        ProviderKind::Anthropic => Ok(Box::new(AnthropicProvider::new(spec.model_id.clone())?)),
        ProviderKind::OpenAI => Ok(Box::new(OpenAIProvider::new(spec.model_id.clone())?)),
    }
}

fn api_key(var: &str) -> Result<String> {
    env::var(var).with_context(|| {
        format!(
            "{} environment variable not set. Set it with: export {}=your-key-here",
            var, var
        )
    })
}

// --- Gemini provider ---

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug)]
pub struct GeminiProvider {
    api_key: String,
    model_id: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(model_id: String) -> Result<Self> {
        let api_key = api_key("GEMINI_API_KEY")?;
        Ok(Self {
            api_key,
            model_id,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl AIProvider for GeminiProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: max_tokens,
            },
        };

        let url = format!("{}/{}:generateContent", GEMINI_API_URL, self.model_id);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Gemini API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: GeminiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        let text: String = api_response
            .candidates
            .first()
            .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
            .ok_or_else(|| anyhow!("No candidates in Gemini API response"))?;
        if text.trim().is_empty() {
            return Err(anyhow!("Empty response from Gemini API"));
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Anthropic provider ---

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

fn user_message(model: &str, prompt: &str, max_tokens: u32) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        max_tokens,
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model_id: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(model_id: String) -> Result<Self> {
        let api_key = api_key("ANTHROPIC_API_KEY")?;
        Ok(Self {
            api_key,
            model_id,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl AIProvider for AnthropicProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = user_message(&self.model_id, prompt, max_tokens);

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Anthropic API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic API response")?;

        api_response
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| anyhow!("No content in Anthropic API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- OpenAI provider ---

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug)]
pub struct OpenAIProvider {
    api_key: String,
    model_id: String,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(model_id: String) -> Result<Self> {
        let api_key = api_key("OPENAI_API_KEY")?;
        Ok(Self {
            api_key,
            model_id,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl AIProvider for OpenAIProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = user_message(&self.model_id, prompt, max_tokens);

        let response = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "OpenAI API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: OpenAIResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        api_response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow!("No choices in OpenAI API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Tip advisor ---

pub fn prep_tips_prompt(company: &str, role: &str) -> String {
    format!(
        "You are a helpful career coach bot for university students.\n\
        Generate concise and actionable preparation tips for a student interviewing for a \"{role}\" position at \"{company}\".\n\n\
        Structure your response as simple HTML. Use <h3> for headings (e.g., <h3>Technical Focus</h3>) and <ul> with <li> for bullet points.\n\
        Do not include <html>, <head>, or <body> tags.\n\
        Provide specific, example-based advice where possible. Keep it friendly and encouraging.",
    )
}

pub struct TipAdvisor {
    provider: Option<Box<dyn AIProvider>>,
}

impl TipAdvisor {
    pub fn new(provider: Option<Box<dyn AIProvider>>) -> Self {
        Self { provider }
    }

    pub fn from_model(model: Option<&str>) -> Self {
        let Some(name) = model else {
            debug!("no tips model configured");
            return Self::new(None);
        };

        match resolve_model(name).and_then(|spec| {
            debug!(model = %spec.short_name, "resolving tips model");
            create_provider(&spec)
        }) {
            Ok(provider) => {
                debug!(model = provider.model_name(), "tip advisor ready");
                Self::new(Some(provider))
            }
            Err(e) => {
                warn!(model = name, error = %e, "tip advisor disabled");
                Self::new(None)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn generate_tips(&self, company: &str, role: &str) -> String {
        if company.trim().is_empty() || role.trim().is_empty() {
            return MISSING_SELECTION_TIPS.to_string();
        }
        let Some(provider) = self.provider.as_deref() else {
            return DISABLED_TIPS.to_string();
        };

        let prompt = prep_tips_prompt(company, role);
        match provider.complete(&prompt, TIPS_MAX_TOKENS).await {
            Ok(text) => {
                let fragment = clean_fragment(&text);
                if fragment.is_empty() {
                    warn!(company, role, "tip advisor returned nothing usable");
                    FAILED_TIPS.to_string()
                } else {
                    fragment
                }
            }
            Err(e) => {
                warn!(company, role, error = %e, "Error generating prep tips");
                FAILED_TIPS.to_string()
            }
        }
    }
}

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*```[a-zA-Z]*\s*$").expect("valid code fence pattern"));

static DOCUMENT_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<!doctype[^>]*>|</?(html|head|body)(\s[^>]*)?>").expect("valid document tag pattern")
});

pub fn clean_fragment(raw: &str) -> String {
    let without_fences = CODE_FENCE.replace_all(raw, "");
    DOCUMENT_TAGS
        .replace_all(&without_fences, "")
        .trim()
        .to_string()
}

pub fn fragment_to_text(fragment: &str, width: usize) -> String {
    let html = Html::parse_fragment(fragment);
    let mut lines: Vec<String> = Vec::new();
    render_children(html.root_element(), width, &mut lines);

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn render_children(element: ElementRef<'_>, width: usize, lines: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    render_element(el, width, lines);
                }
            }
            Node::Text(text) => {
                let text = collapse_whitespace(text);
                if !text.is_empty() {
                    push_wrapped(&text, width, "", lines);
                }
            }
            _ => {}
        }
    }
}

fn render_element(el: ElementRef<'_>, width: usize, lines: &mut Vec<String>) {
    let text = collapse_whitespace(&el.text().collect::<String>());
    match el.value().name() {
        "h1" | "h2" | "h3" | "h4" => {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(text.clone());
            lines.push("-".repeat(text.chars().count()));
        }
        "li" => push_wrapped(&text, width, "  - ", lines),
        "p" => {
            push_wrapped(&text, width, "", lines);
            lines.push(String::new());
        }
        _ => render_children(el, width, lines),
    }
}

fn push_wrapped(text: &str, width: usize, bullet: &str, lines: &mut Vec<String>) {
    let indent = " ".repeat(bullet.chars().count());
    let options = textwrap::Options::new(width.max(20))
        .initial_indent(bullet)
        .subsequent_indent(&indent);
    for line in textwrap::wrap(text, options) {
        lines.push(line.into_owned());
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProvider {
        reply: Result<String, String>,
    }

    #[async_trait]
    impl AIProvider for StubProvider {
        async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
            self.reply.clone().map_err(|e| anyhow!(e))
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn advisor(reply: Result<&str, &str>) -> TipAdvisor {
        TipAdvisor::new(Some(Box::new(StubProvider {
            reply: reply.map(str::to_string).map_err(str::to_string),
        })))
    }

    #[test]
    fn test_resolve_model() {
        let spec = resolve_model("gemini").unwrap();
        assert_eq!(spec.model_id, "gemini-2.5-flash");
        assert_eq!(spec.provider, ProviderKind::Gemini);

        let spec = resolve_model("haiku").unwrap();
        assert_eq!(spec.short_name, "claude-haiku");
        assert_eq!(spec.provider, ProviderKind::Anthropic);

        let spec = resolve_model("gpt-4o").unwrap();
        assert_eq!(spec.provider, ProviderKind::OpenAI);
    }

    #[test]
    fn test_resolve_model_unknown() {
        assert!(resolve_model("gpt-3").is_err());
    }

    #[test]
    fn test_gemini_provider_requires_api_key() {
        let original = env::var("GEMINI_API_KEY").ok();
        unsafe { env::remove_var("GEMINI_API_KEY"); }

        let result = GeminiProvider::new("gemini-2.5-flash".to_string());

        if let Some(val) = original {
            unsafe { env::set_var("GEMINI_API_KEY", val); }
        }

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_prompt_mentions_company_role_and_format() {
        let prompt = prep_tips_prompt("Google", "SDE Intern");
        assert!(prompt.contains("\"SDE Intern\" position at \"Google\""));
        assert!(prompt.contains("<h3>"));
        assert!(prompt.contains("Do not include <html>, <head>, or <body> tags."));
    }

    #[tokio::test]
    async fn test_unconfigured_advisor_returns_disabled_fragment() {
        let advisor = TipAdvisor::from_model(None);
        assert!(!advisor.is_enabled());
        assert_eq!(advisor.generate_tips("Google", "SDE").await, DISABLED_TIPS);
    }

    #[test]
    fn test_unknown_model_disables_advisor() {
        let advisor = TipAdvisor::from_model(Some("not-a-model"));
        assert!(!advisor.is_enabled());
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back() {
        let advisor = advisor(Err("connection refused"));
        assert_eq!(advisor.generate_tips("Google", "SDE").await, FAILED_TIPS);
    }

    #[tokio::test]
    async fn test_blank_selection() {
        let advisor = advisor(Ok("<h3>Ignored</h3>"));
        assert_eq!(advisor.generate_tips("", "SDE").await, MISSING_SELECTION_TIPS);
        assert_eq!(advisor.generate_tips("Google", "  ").await, MISSING_SELECTION_TIPS);
    }

    #[tokio::test]
    async fn test_successful_reply_is_cleaned() {
        let advisor = advisor(Ok("```html\n<html><body><h3>Focus</h3><ul><li>Graphs</li></ul></body></html>\n```"));
        assert_eq!(
            advisor.generate_tips("Google", "SDE").await,
            "<h3>Focus</h3><ul><li>Graphs</li></ul>"
        );
    }

    #[tokio::test]
    async fn test_empty_reply_falls_back() {
        let advisor = advisor(Ok("```\n```"));
        assert_eq!(advisor.generate_tips("Google", "SDE").await, FAILED_TIPS);
    }

    #[test]
    fn test_fragment_to_text() {
        let text = fragment_to_text(
            "<h3>Technical Focus</h3><ul><li>Practice graphs</li><li>Review   DP</li></ul><p>Good luck!</p>",
            80,
        );
        assert_eq!(
            text,
            "Technical Focus\n---------------\n  - Practice graphs\n  - Review DP\nGood luck!"
        );
    }
}
