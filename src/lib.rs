//! LLM-backed vendor/product record enrichment.
//!
//! Given rows of (vendor name, vendor URL, product name, product URL), the
//! pipeline fetches vendor and product details, classifies the product
//! against a fixed reference taxonomy, tags it with catalog attributes, and
//! emits one enriched output record per input row, with per-row failure
//! isolation.

pub mod batch;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod table;

// Re-exports for convenience
pub use batch::{BatchScheduler, DEFAULT_MAX_CONCURRENT_ROWS};
pub use cache::ResultCache;
pub use catalog::ReferenceCatalog;
pub use error::EnrichError;
pub use gateway::{GatewayConfig, LlmGateway, LlmProvider, ModelTier};
pub use pipeline::{enrich_single, EnrichedRecord, RowInput, Services, NOT_AVAILABLE};
