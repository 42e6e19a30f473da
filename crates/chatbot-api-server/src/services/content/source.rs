use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ContentItem, ContentSource, RetrievalError};

const BUNDLED_CONTENT: &str = include_str!("../../../data/site_content.json");

#[derive(Debug, Clone, Deserialize)]
struct Passage {
    path: String,
    text: String,
}

/// Fixed set of site passages. Stands in for a crawler: nothing is fetched
/// over the network, the base URL only prefixes each passage's path.
#[derive(Debug, Clone)]
pub struct StaticContentSource {
    passages: Vec<Passage>,
}

impl StaticContentSource {
    pub fn bundled() -> Result<Self, RetrievalError> {
        Self::from_json(BUNDLED_CONTENT)
    }

    pub fn from_json(json: &str) -> Result<Self, RetrievalError> {
        let passages: Vec<Passage> =
            serde_json::from_str(json).map_err(|e| RetrievalError::Source(format!("Invalid content fixture: {}", e)))?;
        Ok(Self { passages })
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

#[async_trait]
impl ContentSource for StaticContentSource {
    async fn fetch(&self, base_url: &str) -> Result<Vec<ContentItem>, RetrievalError> {
        let base = base_url.trim_end_matches('/');
        debug!("Loading {} static passages for '{}'", self.passages.len(), base);

        Ok(self
            .passages
            .iter()
            .map(|p| ContentItem::new(format!("{}{}", base, p.path), p.text.clone()))
            .collect())
    }
}
