//! In-memory document catalog backing the development search server.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::api::models::{SearchRequest, SearchResponse};
use crate::data_models::{FileMetadata, SearchResult};

pub const MODEL_NAME: &str = "lexical-dev";
const EXACT_WEIGHT: f32 = 1.0;
const PREFIX_WEIGHT: f32 = 0.75;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(default)]
    pub file_id: Option<String>,
    pub display_name: String,
    pub content_type: String,
    pub size: u64,
    pub department: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
    #[serde(default)]
    pub preview: Option<String>,
}

#[derive(Debug, Clone)]
struct IndexedFile {
    result: SearchResult,
    tokens: HashSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    files: Vec<IndexedFile>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let files = entries.into_iter().map(Self::index_entry).collect();
        Catalog { files }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
        log::info!("loaded {} catalog entries from {}", entries.len(), path.display());
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn index_entry(entry: CatalogEntry) -> IndexedFile {
        let mut tokens = tokenize(&entry.display_name);
        tokens.extend(tokenize(&entry.department));
        if let Some(preview) = &entry.preview {
            tokens.extend(tokenize(preview));
        }
        let file_id = entry.file_id.unwrap_or_else(|| nanoid::nanoid!());
        let result = SearchResult {
            file_id,
            display_name: entry.display_name,
            similarity: 0.0,
            metadata: FileMetadata {
                content_type: entry.content_type,
                size: entry.size,
                department: entry.department,
                uploaded_at: entry.uploaded_at,
                uploaded_by: entry.uploaded_by,
                preview: entry.preview,
            },
        };
        IndexedFile { result, tokens }
    }

    pub fn search(&self, request: &SearchRequest) -> SearchResponse {
        let query_tokens: Vec<String> = tokenize(&request.query).into_iter().collect();
        let department = request.department.as_deref().map(str::to_lowercase);

        let candidates: Vec<&IndexedFile> = self
            .files
            .iter()
            .filter(|f| match &department {
                Some(d) => f.result.metadata.department.to_lowercase() == *d,
                None => true,
            })
            .collect();
        let total_evaluated = candidates.len();

        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .filter_map(|f| {
                let similarity = score(&query_tokens, &f.tokens);
                if similarity >= request.threshold && similarity > 0.0 {
                    let mut result = f.result.clone();
                    result.similarity = similarity;
                    Some(result)
                } else {
                    None
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });
        results.truncate(request.limit as usize);

        SearchResponse {
            count: results.len(),
            total_evaluated,
            embedding_model: MODEL_NAME.to_string(),
            results,
        }
    }

    /// Small built-in catalog so the dev server is usable without a file.
    pub fn sample() -> Self {
        let day = |d: u32| Utc.with_ymd_and_hms(2024, 3, d, 9, 0, 0).single().unwrap_or_default();
        let entry = |id: &str, name: &str, ct: &str, size: u64, dept: &str, d: u32, by: &str, preview: &str| {
            CatalogEntry {
                file_id: Some(id.to_string()),
                display_name: name.to_string(),
                content_type: ct.to_string(),
                size,
                department: dept.to_string(),
                uploaded_at: day(d),
                uploaded_by: by.to_string(),
                preview: Some(preview.to_string()),
            }
        };
        Catalog::new(vec![
            entry("f1", "Invoice_Q1.pdf", "application/pdf", 245_760, "finance", 4, "a.lee", "Quarterly invoice summary for Q1 vendors"),
            entry("f2", "Invoice_Q2.pdf", "application/pdf", 198_656, "finance", 11, "a.lee", "Quarterly invoice summary for Q2 vendors"),
            entry("f3", "Travel_Policy_2024.docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document", 61_440, "hr", 2, "m.ortiz", "Rules for booking travel and claiming expenses"),
            entry("f4", "Onboarding_Checklist.md", "text/markdown", 4_096, "hr", 15, "m.ortiz", "First week checklist for new employees"),
            entry("f5", "Vendor_NDA_Template.docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document", 36_864, "legal", 20, "k.singh", "Mutual non disclosure agreement template"),
            entry("f6", "Expense_Report_Template.xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", 22_528, "finance", 22, "j.doe", "Monthly expense report with invoice references"),
        ])
    }
}

pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Average per-query-token weight: an exact token match counts fully, a
/// document token that merely starts with the query token counts partially.
fn score(query_tokens: &[String], doc_tokens: &HashSet<String>) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let total: f32 = query_tokens
        .iter()
        .map(|q| {
            if doc_tokens.contains(q) {
                EXACT_WEIGHT
            } else if doc_tokens.iter().any(|t| t.starts_with(q.as_str())) {
                PREFIX_WEIGHT
            } else {
                0.0
            }
        })
        .sum();
    total / query_tokens.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("Invoice_Q1.pdf");
        assert!(tokens.contains("invoice"));
        assert!(tokens.contains("q1"));
        assert!(tokens.contains("pdf"));
    }

    #[test]
    fn test_exact_beats_prefix() {
        let catalog = Catalog::sample();
        let response = catalog.search(&SearchRequest::new("invoice"));
        assert!(response.count >= 2);
        assert_eq!(response.results[0].similarity, 1.0);
        assert_eq!(response.embedding_model, MODEL_NAME);
        assert_eq!(response.total_evaluated, catalog.len());

        let partial = catalog.search(&SearchRequest::new("invo"));
        assert!(partial.results.iter().all(|r| r.similarity == PREFIX_WEIGHT));
    }

    #[test]
    fn test_department_filter_and_limit() {
        let catalog = Catalog::sample();
        let mut request = SearchRequest::new("template");
        request.department = Some("Legal".into());
        let response = catalog.search(&request);
        assert_eq!(response.count, 1);
        assert_eq!(response.results[0].file_id, "f5");
        assert_eq!(response.total_evaluated, 1);

        let mut request = SearchRequest::new("invoice");
        request.limit = 1;
        assert_eq!(catalog.search(&request).results.len(), 1);
    }

    #[test]
    fn test_threshold_filters_weak_matches() {
        let catalog = Catalog::sample();
        let mut request = SearchRequest::new("invoice zebra");
        request.threshold = 0.6;
        assert_eq!(catalog.search(&request).count, 0);
        request.threshold = 0.3;
        assert!(catalog.search(&request).count > 0);
    }

    #[test]
    fn test_results_sorted_descending() {
        let catalog = Catalog::sample();
        let response = catalog.search(&SearchRequest::new("invoice q1"));
        assert_eq!(response.results[0].file_id, "f1");
        let sims: Vec<f32> = response.results.iter().map(|r| r.similarity).collect();
        assert!(sims.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_missing_ids_are_generated() {
        let catalog = Catalog::new(vec![CatalogEntry {
            file_id: None,
            display_name: "Notes.txt".into(),
            content_type: "text/plain".into(),
            size: 10,
            department: "ops".into(),
            uploaded_at: Utc::now(),
            uploaded_by: "x".into(),
            preview: None,
        }]);
        let response = catalog.search(&SearchRequest::new("notes"));
        assert_eq!(response.count, 1);
        assert!(!response.results[0].file_id.is_empty());
    }
}
