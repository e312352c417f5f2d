use serde::Deserialize;

/// Request payload for /api/chat.
#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    /// Natural language question about the catalog.
    pub query: String,
}
