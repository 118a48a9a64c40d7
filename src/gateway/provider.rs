use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Versioned wire-protocol tag carried by every inference request.
const PROTOCOL_VERSION: &str = "bedrock-2023-05-31";

/// One completion request as handed to the inference service.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Combined system + user text, sent as a single user-role message.
    pub text: String,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// Provider speaking the versioned messages protocol over HTTP.
///
/// The request carries the protocol tag, token limit, sampling temperature and
/// one user-role message; the response carries a single text content block.
pub struct MessagesApiProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl MessagesApiProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl LlmProvider for MessagesApiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = json!({
            "anthropic_version": PROTOCOL_VERSION,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [
                {
                    "role": "user",
                    "content": [{ "type": "text", "text": request.text }],
                }
            ],
        });

        let url = format!(
            "{}/model/{}/invoke",
            self.base_url.trim_end_matches('/'),
            request.model_id
        );

        let mut req = self.client.post(url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.header("x-api-key", key);
        }

        let res = req.send().await?.error_for_status()?;
        let json: serde_json::Value = res.json().await?;

        let content = json["content"][0]["text"]
            .as_str()
            .context("no text content block in inference response")?;

        Ok(content.trim().to_string())
    }
}
