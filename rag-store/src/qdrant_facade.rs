//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! The catalog collection is read-only from this service's point of view:
//! only similarity search is exposed. Payload fields are mapped to
//! [`ScoredPassage`] with the same [`FieldMap`] used for Azure.

use std::{collections::HashMap, future::Future, pin::Pin};

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{SearchParamsBuilder, SearchPointsBuilder, Value as QValue};
use tracing::{debug, info};

use crate::config::{FieldMap, RagConfig};
use crate::errors::RagError;
use crate::index::VectorIndex;
use crate::record::ScoredPassage;

/// A facade over the Qdrant client holding the target collection.
pub struct QdrantFacade {
    client: Qdrant,
    collection: String,
    fields: FieldMap,
    exact: bool,
}

impl QdrantFacade {
    /// Creates a new facade from the given configuration.
    ///
    /// Uses the builder-based API of `qdrant-client` and supports
    /// optional API key authentication.
    pub fn new(cfg: &RagConfig) -> Result<Self, RagError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.endpoint);
        if let Some(key) = &cfg.api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| RagError::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: cfg.index.clone(),
            fields: cfg.fields.clone(),
            exact: cfg.exact_search,
        })
    }

    /// Performs a similarity search and maps payloads to passages.
    ///
    /// Hits keep the order returned by Qdrant.
    pub async fn search(
        &self,
        vector: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<ScoredPassage>, RagError> {
        info!(
            collection = %self.collection,
            top_k,
            exact = self.exact,
            "qdrant search"
        );

        let mut builder =
            SearchPointsBuilder::new(&self.collection, vector, top_k).with_payload(true);
        if !self.fields.vector.is_empty() {
            builder = builder.vector_name(self.fields.vector.clone());
        }
        if self.exact {
            builder = builder.params(SearchParamsBuilder::default().exact(true));
        }

        let res = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| RagError::Qdrant(e.to_string()))?;

        let out = res
            .result
            .into_iter()
            .map(|point| {
                let doc = qpayload_to_json(point.payload);
                ScoredPassage::from_document(&doc, &self.fields, point.score)
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(hits = out.len(), "qdrant search completed");
        Ok(out)
    }
}

impl VectorIndex for QdrantFacade {
    fn knn<'a>(
        &'a self,
        vector: Vec<f32>,
        top_k: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredPassage>, RagError>> + Send + 'a>> {
        Box::pin(self.search(vector, top_k))
    }

    fn backend_name(&self) -> &'static str {
        "qdrant"
    }
}

/// Converts a Qdrant payload (`HashMap<String, qdrant::Value>`) into JSON.
///
/// Nested structs/lists are not part of the passage mapping and become `Null`.
fn qpayload_to_json(payload: HashMap<String, QValue>) -> serde_json::Value {
    use qdrant_client::qdrant::value::Kind as K;
    let mut m = serde_json::Map::new();
    for (k, v) in payload {
        let j = match v.kind {
            Some(K::StringValue(s)) => serde_json::Value::String(s),
            Some(K::IntegerValue(i)) => serde_json::Value::Number(i.into()),
            Some(K::DoubleValue(f)) => serde_json::json!(f),
            Some(K::BoolValue(b)) => serde_json::Value::Bool(b),
            _ => serde_json::Value::Null,
        };
        m.insert(k, j);
    }
    serde_json::Value::Object(m)
}
