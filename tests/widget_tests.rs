use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use portal_search::api::models::{SearchRequest, SearchResponse};
use portal_search::backend::SearchBackend;
use portal_search::data_models::{FileMetadata, SearchResult};
use portal_search::error::{SIGN_IN_MESSAGE, SearchError, UNAVAILABLE_MESSAGE};
use portal_search::render::{ConfidenceTint, DropdownView, render_dropdown};
use portal_search::state::WidgetOptions;
use portal_search::widget::{SearchWidget, SearchWidgetHandle};

mod test_helpers {
    use super::*;

    pub fn hit(id: &str, name: &str, similarity: f32) -> SearchResult {
        SearchResult::new(
            id,
            name,
            similarity,
            FileMetadata {
                content_type: "application/pdf".into(),
                size: 4096,
                department: "finance".into(),
                uploaded_at: Utc::now(),
                uploaded_by: "a.lee".into(),
                preview: None,
            },
        )
    }

    pub fn response(results: Vec<SearchResult>) -> SearchResponse {
        SearchResponse {
            count: results.len(),
            total_evaluated: 25,
            embedding_model: "test-embed".into(),
            results,
        }
    }

    /// Backend with per-query latency and canned outcomes. Unknown queries
    /// answer with a single hit named after the query.
    #[derive(Default)]
    pub struct ScriptedBackend {
        pub calls: Mutex<Vec<SearchRequest>>,
        delays: HashMap<String, Duration>,
        outcomes: HashMap<String, Result<SearchResponse, SearchError>>,
    }

    impl ScriptedBackend {
        pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
            self.delays.insert(query.to_string(), delay);
            self
        }

        pub fn with_outcome(
            mut self,
            query: &str,
            outcome: Result<SearchResponse, SearchError>,
        ) -> Self {
            self.outcomes.insert(query.to_string(), outcome);
            self
        }

        pub fn queries(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.query.clone())
                .collect()
        }
    }

    #[async_trait]
    impl SearchBackend for ScriptedBackend {
        async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
            self.calls.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delays.get(&request.query) {
                tokio::time::sleep(*delay).await;
            }
            match self.outcomes.get(&request.query) {
                Some(outcome) => outcome.clone(),
                None => Ok(response(vec![hit(
                    &format!("id-{}", request.query),
                    &format!("{}.pdf", request.query),
                    0.9,
                )])),
            }
        }
    }

    pub fn spawn(backend: Arc<ScriptedBackend>, options: WidgetOptions) -> SearchWidgetHandle {
        SearchWidget::spawn(backend, options, None)
    }

    pub async fn settled_on(handle: &SearchWidgetHandle, query: &str) {
        let query = query.to_string();
        handle
            .wait_for(move |s| {
                !s.query.pending && s.summary.as_ref().is_some_and(|sum| sum.query == query)
                    || s.error.is_some()
            })
            .await
            .expect("widget stopped");
    }

    pub async fn ms(n: u64) {
        tokio::time::sleep(Duration::from_millis(n)).await;
    }
}

use test_helpers::*;

#[tokio::test(start_paused = true)]
async fn test_rapid_keystrokes_dispatch_once() {
    let backend = Arc::new(ScriptedBackend::default());
    let widget = spawn(backend.clone(), WidgetOptions::default());

    widget.input_change("a");
    ms(100).await;
    widget.input_change("ab");
    settled_on(&widget, "ab").await;
    ms(1000).await;

    assert_eq!(backend.queries(), vec!["ab".to_string()]);
    let snap = widget.snapshot();
    assert_eq!(snap.dispatch_count, 1);
    assert!(snap.dropdown_open);
    assert_eq!(snap.results[0].display_name, "ab.pdf");
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_waits_for_quiet_period() {
    let backend = Arc::new(ScriptedBackend::default());
    let widget = spawn(backend.clone(), WidgetOptions::default());

    widget.input_change("budget");
    ms(299).await;
    assert!(backend.queries().is_empty());
    ms(10).await;
    assert_eq!(backend.queries(), vec!["budget".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_type_then_clear_issues_no_request() {
    let backend = Arc::new(ScriptedBackend::default());
    let widget = spawn(backend.clone(), WidgetOptions::default());

    widget.input_change("inv");
    ms(150).await;
    widget.input_change("");
    ms(1000).await;

    assert!(backend.queries().is_empty());
    let snap = widget.snapshot();
    assert_eq!(snap.dispatch_count, 0);
    assert!(!snap.dropdown_open);
    assert!(snap.results.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_stale_response_never_rendered() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .with_delay("inv", Duration::from_millis(1000))
            .with_delay("invoice", Duration::from_millis(50)),
    );
    let widget = spawn(backend.clone(), WidgetOptions::default());

    let mut rx = widget.subscribe();
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let seen_writer = seen.clone();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snap = rx.borrow_and_update().clone();
            if let Some(summary) = snap.summary {
                seen_writer.lock().unwrap().push(summary.query);
            }
        }
    });

    widget.input_change("inv");
    ms(350).await;
    widget.input_change("invoice");
    settled_on(&widget, "invoice").await;
    // the "inv" request resolves well after this point
    ms(2000).await;

    assert_eq!(
        backend.queries(),
        vec!["inv".to_string(), "invoice".to_string()]
    );
    let snap = widget.snapshot();
    assert_eq!(snap.results.len(), 1);
    assert_eq!(snap.results[0].file_id, "id-invoice");
    assert!(seen.lock().unwrap().iter().all(|q| q == "invoice"));
}

#[tokio::test(start_paused = true)]
async fn test_response_landing_during_next_debounce_is_rendered() {
    let backend = Arc::new(ScriptedBackend::default().with_delay("inv", Duration::from_millis(100)));
    let widget = spawn(backend.clone(), WidgetOptions::default());

    widget.input_change("inv");
    ms(350).await;
    // "inv" went out at 300 ms and answers at 400 ms, inside the new window
    widget.input_change("invo");
    ms(100).await;
    let snap = widget.snapshot();
    assert!(!snap.query.pending);
    assert!(snap.dropdown_open);
    assert_eq!(snap.results[0].file_id, "id-inv");
    assert_eq!(snap.dispatch_count, 1);

    settled_on(&widget, "invo").await;
    let snap = widget.snapshot();
    assert_eq!(snap.results[0].file_id, "id-invo");
    assert_eq!(backend.queries(), vec!["inv".to_string(), "invo".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_results_show_no_match_not_error() {
    let backend = Arc::new(ScriptedBackend::default().with_outcome("zebra", Ok(response(vec![]))));
    let widget = spawn(backend, WidgetOptions::default());

    widget.input_change("zebra");
    settled_on(&widget, "zebra").await;

    let snap = widget.snapshot();
    assert!(!snap.dropdown_open);
    assert!(snap.error.is_none());
    assert!(snap.is_no_match());
}

#[tokio::test(start_paused = true)]
async fn test_unauthenticated_then_recovery() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .with_outcome("payroll", Err(SearchError::Unauthenticated))
            .with_outcome(
                "roadmap",
                Err(SearchError::RequestFailed {
                    status: 503,
                    message: "maintenance".into(),
                }),
            )
            .with_outcome("budget", Err(SearchError::Network("connection refused".into()))),
    );
    let widget = spawn(backend, WidgetOptions::default());

    widget.input_change("payroll");
    settled_on(&widget, "payroll").await;
    let snap = widget.snapshot();
    assert!(snap.dropdown_open);
    assert_eq!(
        render_dropdown(&snap),
        DropdownView::Error {
            message: SIGN_IN_MESSAGE.to_string()
        }
    );

    widget.input_change("roadmap");
    ms(400).await;
    let snap = widget.snapshot();
    assert_eq!(
        render_dropdown(&snap),
        DropdownView::Error {
            message: "The search request failed (status 503).".to_string()
        }
    );

    widget.input_change("budget");
    ms(400).await;
    let snap = widget.snapshot();
    assert_eq!(
        render_dropdown(&snap),
        DropdownView::Error {
            message: UNAVAILABLE_MESSAGE.to_string()
        }
    );

    widget.input_change("handbook");
    settled_on(&widget, "handbook").await;
    let snap = widget.wait_for(|s| s.error.is_none()).await.unwrap();
    assert!(snap.dropdown_open);
    assert_eq!(snap.results[0].display_name, "handbook.pdf");
}

#[tokio::test(start_paused = true)]
async fn test_select_updates_text_and_notifies_caller() {
    let backend = Arc::new(ScriptedBackend::default().with_outcome(
        "invoice",
        Ok(response(vec![
            hit("f1", "Invoice_Q1.pdf", 0.92),
            hit("f2", "Invoice_Q2.pdf", 0.71),
        ])),
    ));
    let selected = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = selected.clone();
    let widget = SearchWidget::spawn(
        backend.clone(),
        WidgetOptions::default(),
        Some(Box::new(move |result: &SearchResult| {
            sink.lock().unwrap().push(result.file_id.clone());
        })),
    );

    widget.input_change("invoice");
    settled_on(&widget, "invoice").await;

    match render_dropdown(&widget.snapshot()) {
        DropdownView::Results { rows, .. } => {
            assert_eq!(rows[0].display_name, "Invoice_Q1.pdf");
            assert_eq!(rows[0].tint, ConfidenceTint::High);
            assert_eq!(rows[1].display_name, "Invoice_Q2.pdf");
            assert_eq!(rows[1].tint, ConfidenceTint::Medium);
        }
        other => panic!("unexpected dropdown {:?}", other),
    }

    widget.select_at(1);
    let snap = widget
        .wait_for(|s| s.query.text == "Invoice_Q2.pdf")
        .await
        .unwrap();
    assert!(!snap.dropdown_open);
    assert!(snap.expanded);
    assert_eq!(*selected.lock().unwrap(), vec!["f2".to_string()]);

    // selecting is not a keystroke: no follow-up search for the new text
    ms(1000).await;
    assert_eq!(backend.queries().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_escape_preserves_text_and_click_outside_collapses_empty() {
    let backend = Arc::new(ScriptedBackend::default());
    let widget = spawn(backend.clone(), WidgetOptions::default());

    widget.input_change("quarterly");
    settled_on(&widget, "quarterly").await;
    widget.escape_key();
    let snap = widget.wait_for(|s| !s.dropdown_open).await.unwrap();
    assert!(snap.expanded);
    assert_eq!(snap.query.text, "quarterly");

    widget.input_change("");
    widget.click_outside();
    let snap = widget.wait_for(|s| !s.expanded).await.unwrap();
    assert!(!snap.dropdown_open);
}

#[tokio::test(start_paused = true)]
async fn test_escape_cancels_pending_debounce() {
    let backend = Arc::new(ScriptedBackend::default());
    let widget = spawn(backend.clone(), WidgetOptions::default());

    widget.input_change("draft");
    ms(100).await;
    widget.escape_key();
    ms(1000).await;

    assert!(backend.queries().is_empty());
    let snap = widget.snapshot();
    assert_eq!(snap.query.text, "draft");
    assert!(snap.expanded);
}

#[tokio::test(start_paused = true)]
async fn test_icon_activation_flow() {
    let backend = Arc::new(ScriptedBackend::default());
    let widget = spawn(backend.clone(), WidgetOptions::default().collapsed(true));
    assert!(!widget.snapshot().expanded);

    widget.icon_activate();
    let snap = widget.wait_for(|s| s.expanded).await.unwrap();
    assert!(snap.input_focused);
    assert_eq!(snap.dispatch_count, 0);

    widget.input_change("nda");
    widget.icon_activate();
    ms(10).await;
    // immediate, no debounce
    assert_eq!(backend.queries(), vec!["nda".to_string()]);
    ms(1000).await;
    assert_eq!(backend.queries().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_department_and_limits_reach_backend() {
    let backend = Arc::new(ScriptedBackend::default());
    let options = WidgetOptions {
        limit: 5,
        threshold: 0.5,
        ..WidgetOptions::default().with_department("legal")
    };
    let widget = spawn(backend.clone(), options);

    widget.input_change("  contract  ");
    settled_on(&widget, "contract").await;

    let calls = backend.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].query, "contract");
    assert_eq!(calls[0].limit, 5);
    assert_eq!(calls[0].threshold, 0.5);
    assert_eq!(calls[0].department.as_deref(), Some("legal"));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_event_loop() {
    let backend = Arc::new(ScriptedBackend::default());
    let widget = spawn(backend.clone(), WidgetOptions::default());

    widget.shutdown();
    assert!(widget.wait_for(|_| false).await.is_none());
    assert!(!widget.is_running());

    widget.input_change("ignored");
    ms(1000).await;
    assert!(backend.queries().is_empty());
}
