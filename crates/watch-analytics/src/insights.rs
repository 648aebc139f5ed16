//! Natural-language summaries of watch history from a language-model provider.
//!
//! The history is sent as-is in a single prompt; the provider's documented
//! request and response shapes are followed directly. Unlike the analytics,
//! this layer fails loudly: a missing provider or credential is an error the
//! user has to act on.

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::config::LlmConfig;
use shared::store::{get_string, keys, set_typed};
use shared::{day_key, HistoryEntry, HistoryStore, KeyValueStore};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "You are a helpful assistant that analyzes YouTube watch history.";

const PROMPT_PREFIX: &str = concat!(
    "Analyze my YouTube watch history for content distribution, ",
    "viewing patterns, and recommendations. Here is the data: "
);

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Errors surfaced to the user by the insights layer
#[derive(Debug, Error)]
pub enum InsightsError {
    #[error("Please configure your LLM provider and API key first")]
    NotConfigured,

    #[error("Please enter valid API keys for both the LLM provider and the catalog")]
    MissingKeys,

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("No watch history found for {0}")]
    NoHistory(String),

    #[error("No response from LLM")]
    EmptyResponse,

    #[error("LLM API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM call failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Supported language-model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Claude,
    Gemini,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::OpenAi => write!(f, "openai"),
            LlmProvider::Claude => write!(f, "claude"),
            LlmProvider::Gemini => write!(f, "gemini"),
        }
    }
}

impl FromStr for LlmProvider {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "claude" => Ok(LlmProvider::Claude),
            "gemini" => Ok(LlmProvider::Gemini),
            _ => Err(InsightsError::UnknownProvider(s.trim().to_string())),
        }
    }
}

/// A fully described provider request
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub query: Vec<(&'static str, String)>,
    pub body: Value,
}

/// Prompt sent for a day of history
pub fn build_prompt(history: &[HistoryEntry]) -> Result<String, InsightsError> {
    let data = serde_json::to_string(history).map_err(anyhow::Error::from)?;
    Ok(format!("{}{}", PROMPT_PREFIX, data))
}

/// Build the provider-specific request for a prompt
pub fn build_request(
    config: &LlmConfig,
    provider: LlmProvider,
    api_key: &str,
    prompt: &str,
) -> LlmRequest {
    match provider {
        LlmProvider::OpenAi => LlmRequest {
            url: config.openai_endpoint.clone(),
            headers: vec![("Authorization", format!("Bearer {}", api_key))],
            query: Vec::new(),
            body: json!({
                "model": config.openai_model,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": prompt },
                ],
            }),
        },
        LlmProvider::Claude => LlmRequest {
            url: config.claude_endpoint.clone(),
            headers: vec![
                ("x-api-key", api_key.to_string()),
                ("anthropic-version", ANTHROPIC_VERSION.to_string()),
            ],
            query: Vec::new(),
            body: json!({
                "model": config.claude_model,
                "max_tokens": config.max_tokens,
                "messages": [
                    { "role": "user", "content": prompt },
                ],
            }),
        },
        LlmProvider::Gemini => LlmRequest {
            url: config.gemini_endpoint.clone(),
            headers: Vec::new(),
            query: vec![("key", api_key.to_string())],
            body: json!({
                "contents": [
                    { "parts": [{ "text": prompt }] },
                ],
            }),
        },
    }
}

/// Pull the generated text out of a provider response
pub fn extract_text(provider: LlmProvider, response: &Value) -> Option<String> {
    let pointer = match provider {
        LlmProvider::OpenAi => "/choices/0/message/content",
        LlmProvider::Claude => "/content/0/text",
        LlmProvider::Gemini => "/candidates/0/content/parts/0/text",
    };

    response
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

fn parse_error_message(response: &Value) -> Option<String> {
    response
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// HTTP client for the configured providers
pub struct InsightsClient {
    client: Client,
    config: LlmConfig,
}

impl InsightsClient {
    /// Create a new client
    pub fn new(config: LlmConfig, timeout: Duration) -> Result<Self, InsightsError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("watchlens/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    /// Send a prompt and return the generated text
    pub async fn complete(
        &self,
        provider: LlmProvider,
        api_key: &str,
        prompt: &str,
    ) -> Result<String, InsightsError> {
        let request = build_request(&self.config, provider, api_key, prompt);
        debug!(provider = %provider, url = %request.url, "Calling LLM provider");

        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        let response = builder.send().await?;
        let status = response.status();
        let raw = response.text().await?;
        let body: Value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));

        if !status.is_success() {
            return Err(InsightsError::Api {
                status: status.as_u16(),
                message: parse_error_message(&body).unwrap_or_else(|| match body {
                    Value::String(raw) => raw,
                    other => other.to_string(),
                }),
            });
        }

        extract_text(provider, &body).ok_or(InsightsError::EmptyResponse)
    }
}

/// Summarize the history stored for `date` and store the text under `insights`
pub async fn generate_insights(
    history: &HistoryStore,
    client: &InsightsClient,
    date: NaiveDate,
) -> Result<String, InsightsError> {
    let store = history.store().as_ref();

    let provider = get_string(store, keys::LLM_PROVIDER).await?;
    let api_key = get_string(store, keys::LLM_API_KEY).await?;
    let (provider, api_key) = match (provider, api_key) {
        (Some(provider), Some(api_key)) => (provider.parse::<LlmProvider>()?, api_key),
        _ => return Err(InsightsError::NotConfigured),
    };

    let entries = history.load(date).await?;
    if entries.is_empty() {
        return Err(InsightsError::NoHistory(day_key(date)));
    }

    info!(
        date = %day_key(date),
        entries = entries.len(),
        provider = %provider,
        "Requesting watch history insights"
    );

    let prompt = build_prompt(&entries)?;
    let text = client.complete(provider, &api_key, &prompt).await?;

    set_typed(store, keys::INSIGHTS, &text).await?;
    info!(chars = text.len(), "Insights stored");

    Ok(text)
}

/// Save the provider choice and both credentials
///
/// Both keys are required; nothing is written when either is blank.
pub async fn save_settings(
    store: &dyn KeyValueStore,
    provider: &str,
    llm_api_key: &str,
    catalog_api_key: &str,
) -> Result<LlmProvider, InsightsError> {
    let llm_api_key = llm_api_key.trim();
    let catalog_api_key = catalog_api_key.trim();
    if llm_api_key.is_empty() || catalog_api_key.is_empty() {
        return Err(InsightsError::MissingKeys);
    }
    let provider: LlmProvider = provider.parse()?;

    let mut items = serde_json::Map::new();
    items.insert(keys::LLM_PROVIDER.to_string(), json!(provider.to_string()));
    items.insert(keys::LLM_API_KEY.to_string(), json!(llm_api_key));
    items.insert(keys::CATALOG_API_KEY.to_string(), json!(catalog_api_key));
    store.set(items).await?;

    info!(provider = %provider, "Configuration saved");
    Ok(provider)
}
