//! Azure AI Search vector backend (REST).
//!
//! Issues one pure-vector query per call:
//! `POST {endpoint}/indexes/{index}/docs/search?api-version={version}`
//! with an `api-key` header, selecting only the content/source fields.

use std::{future::Future, pin::Pin, time::Duration};

use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::config::{FieldMap, RagConfig};
use crate::errors::RagError;
use crate::index::VectorIndex;
use crate::record::ScoredPassage;

pub struct AzureSearchIndex {
    client: reqwest::Client,
    url: String,
    fields: FieldMap,
}

impl AzureSearchIndex {
    /// Builds the client; the api key is installed as a default header.
    ///
    /// # Errors
    /// Returns `RagError::Config` for a missing/invalid key or client build failure.
    pub fn new(cfg: &RagConfig) -> Result<Self, RagError> {
        cfg.validate()?;
        let key = cfg
            .api_key
            .as_deref()
            .ok_or_else(|| RagError::Config("SEARCH_API_KEY is required for azure".into()))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "api-key",
            header::HeaderValue::from_str(key)
                .map_err(|e| RagError::Config(format!("invalid api key header: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let url = format!(
            "{}/indexes/{}/docs/search?api-version={}",
            cfg.endpoint.trim().trim_end_matches('/'),
            cfg.index,
            cfg.api_version
        );

        Ok(Self {
            client,
            url,
            fields: cfg.fields.clone(),
        })
    }

    async fn search(&self, vector: Vec<f32>, top_k: u64) -> Result<Vec<ScoredPassage>, RagError> {
        let body = SearchRequest::vector_only(&self.fields, vector, top_k);
        debug!(top_k, "POST {}", self.url);

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::AzureSearch(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(240).collect();
            error!(%status, %snippet, "azure search returned non-success status");
            return Err(RagError::AzureSearch(format!("HTTP {status}: {snippet}")));
        }

        let out: SearchResponse = resp
            .json()
            .await
            .map_err(|e| RagError::AzureSearch(format!("decode: {e}")))?;

        out.into_passages(&self.fields)
    }
}

impl VectorIndex for AzureSearchIndex {
    fn knn<'a>(
        &'a self,
        vector: Vec<f32>,
        top_k: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredPassage>, RagError>> + Send + 'a>> {
        Box::pin(self.search(vector, top_k))
    }

    fn backend_name(&self) -> &'static str {
        "azure"
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    select: String,
    top: u64,
    vector_queries: Vec<VectorQuery>,
}

#[derive(Debug, Serialize)]
struct VectorQuery {
    kind: &'static str,
    vector: Vec<f32>,
    k: u64,
    fields: String,
}

impl SearchRequest {
    fn vector_only(fields: &FieldMap, vector: Vec<f32>, top_k: u64) -> Self {
        Self {
            select: format!("{},{}", fields.content, fields.source),
            top: top_k,
            vector_queries: vec![VectorQuery {
                kind: "vector",
                vector,
                k: top_k,
                fields: fields.vector.clone(),
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    value: Vec<Value>,
}

impl SearchResponse {
    /// All-or-nothing: one malformed hit fails the whole call.
    fn into_passages(self, fields: &FieldMap) -> Result<Vec<ScoredPassage>, RagError> {
        self.value
            .iter()
            .map(|doc| {
                let score = doc
                    .get("@search.score")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| RagError::MissingField("@search.score".into()))?;
                ScoredPassage::from_document(doc, fields, score as f32)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_selects_mapped_fields() {
        let body = serde_json::to_value(SearchRequest::vector_only(
            &FieldMap::default(),
            vec![0.1, 0.2],
            3,
        ))
        .unwrap();
        assert_eq!(body["select"], "chunk,parent_id");
        assert_eq!(body["vectorQueries"][0]["kind"], "vector");
        assert_eq!(body["vectorQueries"][0]["k"], 3);
        assert_eq!(body["vectorQueries"][0]["fields"], "text_vector");
    }

    #[test]
    fn response_preserves_index_order() {
        let resp: SearchResponse = serde_json::from_value(json!({
            "value": [
                {"@search.score": 0.5, "chunk": "b", "parent_id": "p2"},
                {"@search.score": 0.9, "chunk": "a", "parent_id": "p1"}
            ]
        }))
        .unwrap();
        let passages = resp.into_passages(&FieldMap::default()).unwrap();
        assert_eq!(passages[0].content, "b");
        assert_eq!(passages[1].score, 0.9);
    }

    #[test]
    fn malformed_hit_fails_whole_response() {
        let resp: SearchResponse = serde_json::from_value(json!({
            "value": [
                {"@search.score": 0.5, "chunk": "b", "parent_id": "p2"},
                {"chunk": "a", "parent_id": "p1"}
            ]
        }))
        .unwrap();
        assert!(resp.into_passages(&FieldMap::default()).is_err());
    }

    #[test]
    fn url_is_built_from_config() {
        let mut cfg = RagConfig::new_default("https://demo.search.windows.net/", "catalog");
        cfg.api_key = Some("secret".into());
        let idx = AzureSearchIndex::new(&cfg).unwrap();
        assert_eq!(
            idx.url,
            "https://demo.search.windows.net/indexes/catalog/docs/search?api-version=2023-11-01"
        );
    }
}
