use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::{ContentCorpus, ContentItem, ContentSource, RetrievalError};
use crate::config::SettingsHandle;
use crate::services::provider::EmbeddingProvider;
use crate::utils::{cosine_similarity, preview};

/// Embedded site corpus with single-flight refresh.
pub struct ContentRetriever {
    source: Arc<dyn ContentSource>,
    embedder: Arc<dyn EmbeddingProvider>,
    settings: SettingsHandle,
    corpus: RwLock<ContentCorpus>,
    refresh_lock: Mutex<()>,
}

impl ContentRetriever {
    pub fn new(
        source: Arc<dyn ContentSource>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: SettingsHandle,
    ) -> Self {
        Self {
            source,
            embedder,
            settings,
            corpus: RwLock::new(ContentCorpus::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Refresh when the corpus was never loaded, is empty, is older than the
    /// refresh interval, or was embedded by a different backend.
    async fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        let settings = self.settings.current();
        let corpus = self.corpus.read().await;

        match corpus.last_refreshed {
            None => true,
            Some(last) => {
                corpus.items.is_empty()
                    || now - last > settings.retrieval.refresh_interval()
                    || corpus.embedded_with != Some(settings.ai.embedding_provider)
            }
        }
    }

    /// Overlapping callers wait for the refresh in flight instead of starting another.
    pub async fn ensure_fresh(&self) -> Result<(), RetrievalError> {
        if !self.needs_refresh(Utc::now()).await {
            return Ok(());
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have finished while we waited
        if !self.needs_refresh(Utc::now()).await {
            debug!("Corpus refreshed by a concurrent caller");
            return Ok(());
        }

        self.rebuild().await
    }

    /// Unconditional refresh, still serialized with any refresh in flight.
    pub async fn refresh(&self) -> Result<(), RetrievalError> {
        let _guard = self.refresh_lock.lock().await;
        self.rebuild().await
    }

    /// Caller must hold `refresh_lock`.
    async fn rebuild(&self) -> Result<(), RetrievalError> {
        let (base_url, embedding_provider) = {
            let settings = self.settings.current();
            (settings.retrieval.website_base_url.clone(), settings.ai.embedding_provider)
        };

        let raw = self.source.fetch(&base_url).await?;
        let total = raw.len();

        let embedded = join_all(raw.into_iter().map(|item| async move {
            let result = self.embedder.embed(&item.text).await;
            (item, result)
        }))
        .await;

        let items: Vec<ContentItem> = embedded
            .into_iter()
            .filter_map(|(mut item, result)| match result {
                Ok(embedding) => {
                    item.embedding = Some(embedding);
                    Some(item)
                }
                Err(e) => {
                    warn!(source = %item.source_locator, "Dropping content item, embedding failed: {}", e);
                    None
                }
            })
            .collect();

        info!(
            "📚 Content retrieved and embedded: {}/{} items from '{}'",
            items.len(),
            total,
            base_url
        );

        let mut corpus = self.corpus.write().await;
        *corpus = ContentCorpus {
            items,
            last_refreshed: Some(Utc::now()),
            embedded_with: Some(embedding_provider),
        };

        Ok(())
    }

    /// Up to `top_k` passages scoring strictly above the similarity threshold,
    /// best first, joined by blank lines.
    pub async fn find_relevant(&self, query: &str) -> Result<Option<String>, RetrievalError> {
        self.ensure_fresh().await?;

        if self.corpus.read().await.items.is_empty() {
            debug!("Corpus is empty, skipping retrieval");
            return Ok(None);
        }

        let (threshold, top_k) = {
            let settings = self.settings.current();
            (settings.retrieval.similarity_threshold, settings.retrieval.top_k)
        };

        let query_embedding = self.embedder.embed(query).await?;

        let corpus = self.corpus.read().await;

        let mut scored: Vec<(f32, &ContentItem)> = corpus
            .items
            .iter()
            .filter_map(|item| {
                let embedding = item.embedding.as_deref()?;
                match cosine_similarity(&query_embedding, embedding) {
                    Ok(score) => Some((score, item)),
                    Err(e) => {
                        warn!(source = %item.source_locator, "Skipping content item: {}", e);
                        None
                    }
                }
            })
            .collect();

        // Stable sort keeps corpus order among equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        let relevant: Vec<&str> = scored
            .into_iter()
            .filter(|(score, _)| *score > threshold)
            .take(top_k)
            .map(|(score, item)| {
                debug!(source = %item.source_locator, score, "Relevant content: {}", preview(&item.text, 60));
                item.text.as_str()
            })
            .collect();

        if relevant.is_empty() {
            debug!("No content above threshold {}", threshold);
            return Ok(None);
        }

        Ok(Some(relevant.join("\n\n")))
    }

    pub async fn corpus_len(&self) -> usize {
        self.corpus.read().await.items.len()
    }

    pub async fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.corpus.read().await.last_refreshed
    }
}
