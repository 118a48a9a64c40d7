//! LLM gateway: bounded-concurrency access to the inference service with
//! raw-call response caching.
//!
//! The gateway's semaphore is the real global throttle: row-level concurrency
//! only determines how many rows are logically in flight, while this pool
//! bounds how many are actually talking to the inference service.

mod extract;
mod provider;

pub use extract::extract_json;
pub use provider::{CompletionRequest, LlmProvider, MessagesApiProvider};

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, warn};

/// Soft ceiling on raw-call cache entries.
const RAW_CACHE_CEILING: usize = 1000;
/// How many of the oldest entries to drop when the ceiling is exceeded.
const RAW_CACHE_EVICT_BATCH: usize = 100;

/// Named model configuration selecting a capability/cost/latency tradeoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTier {
    /// Higher capability; used where accuracy matters.
    Sonnet,
    /// Faster and cheaper; used for high-volume matching.
    Haiku,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Sonnet => "sonnet",
            ModelTier::Haiku => "haiku",
        }
    }
}

/// Fixed token-limit and sampling settings for one tier.
#[derive(Debug, Clone)]
pub struct TierConfig {
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub sonnet: TierConfig,
    pub haiku: TierConfig,
    /// Upper bound on concurrent in-flight inference calls.
    pub max_concurrent: usize,
    /// Per-call deadline; expiry resolves to the no-result signal.
    pub call_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("INFERENCE_BASE_URL").unwrap_or_else(|_| {
                "https://bedrock-runtime.us-west-2.amazonaws.com".to_string()
            }),
            api_key: std::env::var("INFERENCE_API_KEY").ok(),
            sonnet: TierConfig {
                model_id: "anthropic.claude-3-5-sonnet-20241022-v2:0".to_string(),
                max_tokens: 4096,
                temperature: 0.7,
            },
            haiku: TierConfig {
                model_id: "anthropic.claude-3-haiku-20240307-v1:0".to_string(),
                max_tokens: 4096,
                temperature: 0.5,
            },
            max_concurrent: 50,
            call_timeout: Duration::from_secs(60),
        }
    }
}

/// Insertion-ordered map so eviction can drop the structurally oldest
/// entries. FIFO approximation, not strict LRU.
#[derive(Default)]
struct RawCache {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl RawCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: String, value: String) {
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }
        if self.entries.len() > RAW_CACHE_CEILING {
            for _ in 0..RAW_CACHE_EVICT_BATCH {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                self.entries.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Bounded-concurrency async call primitive over an [`LlmProvider`].
pub struct LlmGateway {
    provider: Arc<dyn LlmProvider>,
    semaphore: Semaphore,
    cache: Mutex<RawCache>,
    config: GatewayConfig,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn LlmProvider>, config: GatewayConfig) -> Self {
        Self {
            semaphore: Semaphore::new(config.max_concurrent.max(1)),
            cache: Mutex::new(RawCache::default()),
            provider,
            config,
        }
    }

    /// Build a gateway backed by the HTTP provider, configured from the
    /// environment.
    pub fn from_env() -> Self {
        let config = GatewayConfig::default();
        let provider = Arc::new(MessagesApiProvider::new(
            config.base_url.clone(),
            config.api_key.clone(),
        ));
        Self::new(provider, config)
    }

    fn tier_config(&self, tier: ModelTier) -> &TierConfig {
        match tier {
            ModelTier::Sonnet => &self.config.sonnet,
            ModelTier::Haiku => &self.config.haiku,
        }
    }

    fn cache_key(tier: ModelTier, system_prompt: Option<&str>, prompt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(tier.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(system_prompt.unwrap_or("").as_bytes());
        hasher.update(b":");
        hasher.update(prompt.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Call the inference service.
    ///
    /// Resolves to `None` on transport failure, bad status, or timeout;
    /// callers treat absence of text as a first-class outcome, never an
    /// exception. Cache hits return immediately without taking a pool slot.
    pub async fn call(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        tier: ModelTier,
        use_cache: bool,
    ) -> Option<String> {
        let key = Self::cache_key(tier, system_prompt, prompt);
        if use_cache {
            if let Some(cached) = self.cache.lock().await.get(&key) {
                debug!(key = %&key[..16], "raw-call cache hit");
                return Some(cached);
            }
        }

        let _permit = self.semaphore.acquire().await.ok()?;

        let tier_config = self.tier_config(tier);
        let text = match system_prompt {
            Some(system) => {
                format!("[SYSTEM INSTRUCTIONS]\n{system}\n\n[USER QUERY]\n{prompt}\n")
            }
            None => prompt.to_string(),
        };
        let request = CompletionRequest {
            model_id: tier_config.model_id.clone(),
            max_tokens: tier_config.max_tokens,
            temperature: tier_config.temperature,
            text,
        };

        let outcome =
            tokio::time::timeout(self.config.call_timeout, self.provider.complete(request)).await;

        match outcome {
            Ok(Ok(response)) => {
                if use_cache {
                    self.cache.lock().await.insert(key, response.clone());
                }
                Some(response)
            }
            Ok(Err(e)) => {
                error!(tier = tier.as_str(), "inference call failed: {e:#}");
                None
            }
            Err(_) => {
                warn!(
                    tier = tier.as_str(),
                    "inference call timed out after {:?}", self.config.call_timeout
                );
                None
            }
        }
    }

    /// Current raw-call cache size, exposed for observability.
    pub async fn cache_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}
