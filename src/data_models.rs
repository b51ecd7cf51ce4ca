use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One hit from the document search backend. Results arrive already ordered
/// by relevance; `similarity` only drives how a row is tinted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub file_id: String,
    pub display_name: String,
    pub similarity: f32,
    pub metadata: FileMetadata,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub content_type: String,
    pub size: u64,
    pub department: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl SearchResult {
    pub fn new(
        file_id: impl Into<String>,
        display_name: impl Into<String>,
        similarity: f32,
        metadata: FileMetadata,
    ) -> SearchResult {
        SearchResult {
            file_id: file_id.into(),
            display_name: display_name.into(),
            similarity: similarity.clamp(0.0, 1.0),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_uses_camel_case_on_the_wire() {
        let raw = r#"{
            "fileId": "f1",
            "displayName": "Invoice_Q1.pdf",
            "similarity": 0.92,
            "metadata": {
                "contentType": "application/pdf",
                "size": 20480,
                "department": "finance",
                "uploadedAt": "2024-03-01T09:30:00Z",
                "uploadedBy": "j.doe"
            }
        }"#;
        let result: SearchResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.file_id, "f1");
        assert_eq!(result.display_name, "Invoice_Q1.pdf");
        assert_eq!(result.metadata.department, "finance");
        assert!(result.metadata.preview.is_none());

        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("displayName").is_some());
        assert!(value["metadata"].get("preview").is_none());
    }

    #[test]
    fn test_new_clamps_similarity() {
        let metadata = FileMetadata {
            content_type: "text/plain".into(),
            size: 1,
            department: "hr".into(),
            uploaded_at: Utc::now(),
            uploaded_by: "a".into(),
            preview: None,
        };
        assert_eq!(SearchResult::new("x", "x", 1.4, metadata.clone()).similarity, 1.0);
        assert_eq!(SearchResult::new("x", "x", -0.2, metadata).similarity, 0.0);
    }
}
