use serde::{Deserialize, Serialize};

/// Query-string parameters of `GET /search`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub mode: Option<String>,
    pub limit: Option<usize>,
}

/// One result row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub doc_id: u32,
    pub score: f64,
    pub snippet: String,
}

/// Search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_results: usize,
    pub returned_results: usize,
    pub search_time_ms: f64,
    pub results: Vec<SearchHit>,
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_serializes_camel_case() {
        let hit = SearchHit {
            doc_id: 7,
            score: 1.5,
            snippet: "a 'fox'".to_string(),
        };
        let json = serde_json::to_string(&hit).unwrap();
        assert!(json.contains("\"docId\":7"));
        assert!(json.contains("\"snippet\""));
    }
}
