//! Site content retrieval
//!
//! A small corpus of website passages is embedded once per refresh interval
//! and searched by cosine similarity to ground completions in site content.

mod retriever;
mod source;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::ProviderKind;
use crate::services::provider::ProviderError;

pub use retriever::ContentRetriever;
pub use source::StaticContentSource;

/// One passage of site content. `embedding` is `None` until the corpus is embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub source_locator: String,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
}

impl ContentItem {
    pub fn new(source_locator: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_locator: source_locator.into(),
            text: text.into(),
            embedding: None,
        }
    }
}

/// Searchable items plus refresh bookkeeping. Replaced wholesale on refresh.
#[derive(Debug, Clone, Default)]
pub struct ContentCorpus {
    pub items: Vec<ContentItem>,
    pub last_refreshed: Option<DateTime<Utc>>,
    /// Backend whose vector space the item embeddings live in.
    pub embedded_with: Option<ProviderKind>,
}

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Content source error: {0}")]
    Source(String),

    #[error(transparent)]
    Embedding(#[from] ProviderError),
}

/// Where raw site passages come from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, base_url: &str) -> Result<Vec<ContentItem>, RetrievalError>;
}
