//! Pure widget state machine.
//!
//! Every UI event is a method on [`WidgetState`] that mutates the state and
//! returns the [`Effect`]s the event loop has to carry out (timers, requests,
//! callbacks). Nothing in here touches the clock or the network.

use std::time::Duration;

use crate::api::models::{SearchRequest, SearchResponse};
use crate::config::Config;
use crate::data_models::SearchResult;
use crate::error::SearchError;

/// Viewports narrower than this start collapsed unless told otherwise.
pub const COLLAPSE_BREAKPOINT_PX: u32 = 768;

#[derive(Debug, Clone)]
pub struct WidgetOptions {
    pub placeholder: String,
    pub department: Option<String>,
    /// Explicit initial state. `None` defers to `viewport_width`.
    pub initially_collapsed: Option<bool>,
    pub viewport_width: Option<u32>,
    pub debounce: Duration,
    pub limit: u32,
    pub threshold: f32,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        WidgetOptions {
            placeholder: "Search documents...".to_string(),
            department: None,
            initially_collapsed: None,
            viewport_width: None,
            debounce: Duration::from_millis(300),
            limit: 8,
            threshold: 0.3,
        }
    }
}

impl WidgetOptions {
    pub fn from_config(config: &Config) -> Self {
        WidgetOptions {
            debounce: config.debounce,
            limit: config.limit,
            threshold: config.threshold,
            ..WidgetOptions::default()
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn collapsed(mut self, collapsed: bool) -> Self {
        self.initially_collapsed = Some(collapsed);
        self
    }

    pub fn starts_collapsed(&self) -> bool {
        match (self.initially_collapsed, self.viewport_width) {
            (Some(collapsed), _) => collapsed,
            (None, Some(width)) => width < COLLAPSE_BREAKPOINT_PX,
            (None, None) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Arm the debounce timer for `generation`, replacing any armed timer.
    ScheduleSearch { generation: u64, delay: Duration },
    /// Disarm the debounce timer.
    CancelScheduled,
    Dispatch {
        generation: u64,
        request: SearchRequest,
    },
    NotifySelected(SearchResult),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchQuery {
    pub text: String,
    pub pending: bool,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSummary {
    pub query: String,
    pub count: usize,
    pub total_evaluated: usize,
    pub embedding_model: String,
}

/// Everything a renderer needs to draw the widget.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WidgetSnapshot {
    pub query: SearchQuery,
    pub expanded: bool,
    pub dropdown_open: bool,
    pub input_focused: bool,
    pub results: Vec<SearchResult>,
    pub error: Option<SearchError>,
    /// Set by the last applied successful response.
    pub summary: Option<ResponseSummary>,
    pub dispatch_count: u64,
}

impl WidgetSnapshot {
    pub fn has_text(&self) -> bool {
        !self.query.text.trim().is_empty()
    }

    /// A search for the current text came back empty.
    pub fn is_no_match(&self) -> bool {
        self.error.is_none()
            && self.results.is_empty()
            && self.has_text()
            && self
                .summary
                .as_ref()
                .is_some_and(|s| s.query == self.query.text.trim())
    }
}

#[derive(Debug, Clone)]
pub struct WidgetState {
    view: WidgetSnapshot,
    scheduled: Option<u64>,
    /// Generation and trimmed query of the newest request still allowed to
    /// land. Cleared by select, dismiss and clearing the input.
    last_dispatched: Option<(u64, String)>,
    options: WidgetOptions,
}

impl WidgetState {
    pub fn new(options: WidgetOptions) -> Self {
        let view = WidgetSnapshot {
            expanded: !options.starts_collapsed(),
            ..WidgetSnapshot::default()
        };
        WidgetState {
            view,
            scheduled: None,
            last_dispatched: None,
            options,
        }
    }

    pub fn snapshot(&self) -> &WidgetSnapshot {
        &self.view
    }

    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    pub fn input_change(&mut self, text: impl Into<String>) -> Vec<Effect> {
        let text = text.into();
        self.view.query.text = text;
        self.view.expanded = true;
        let generation = self.bump_generation();

        if !self.view.has_text() {
            self.scheduled = None;
            self.last_dispatched = None;
            self.view.query.pending = false;
            self.clear_outcome();
            self.view.dropdown_open = false;
            return self.checked(vec![Effect::CancelScheduled]);
        }

        self.scheduled = Some(generation);
        self.checked(vec![Effect::ScheduleSearch {
            generation,
            delay: self.options.debounce,
        }])
    }

    /// The debounce timer armed for `generation` fired.
    pub fn debounce_elapsed(&mut self, generation: u64) -> Vec<Effect> {
        if self.scheduled != Some(generation) || generation != self.view.query.generation {
            return Vec::new();
        }
        self.scheduled = None;
        let effect = self.begin_dispatch();
        self.checked(vec![effect])
    }

    pub fn search_completed(
        &mut self,
        generation: u64,
        outcome: Result<SearchResponse, SearchError>,
    ) -> Vec<Effect> {
        // Keystrokes after a dispatch do not invalidate it; only a newer
        // dispatch (or select/dismiss/clear) does.
        let query = match self.last_dispatched.take() {
            Some((latest, query)) if latest == generation => query,
            other => {
                log::debug!(
                    "discarding stale search response (generation {generation}, latest dispatched {:?})",
                    other.as_ref().map(|(g, _)| *g)
                );
                self.last_dispatched = other;
                return Vec::new();
            }
        };
        self.view.query.pending = false;

        match outcome {
            Ok(response) => {
                self.view.error = None;
                self.view.summary = Some(ResponseSummary {
                    query,
                    count: response.count,
                    total_evaluated: response.total_evaluated,
                    embedding_model: response.embedding_model,
                });
                self.view.results = response.results;
                self.view.dropdown_open = !self.view.results.is_empty();
            }
            Err(e) => {
                log::warn!("search failed: {}", e);
                self.view.results.clear();
                self.view.summary = None;
                self.view.error = Some(e);
                self.view.dropdown_open = true;
            }
        }
        self.checked(Vec::new())
    }

    pub fn select(&mut self, result: SearchResult) -> Vec<Effect> {
        self.view.query.text = result.display_name.clone();
        self.view.dropdown_open = false;
        self.view.query.pending = false;
        self.scheduled = None;
        self.last_dispatched = None;
        self.bump_generation();
        self.checked(vec![Effect::CancelScheduled, Effect::NotifySelected(result)])
    }

    /// Click outside the widget or Escape.
    pub fn dismiss(&mut self) -> Vec<Effect> {
        self.view.dropdown_open = false;
        self.view.query.pending = false;
        self.scheduled = None;
        self.last_dispatched = None;
        self.bump_generation();
        if !self.view.has_text() {
            self.view.expanded = false;
            self.view.input_focused = false;
        }
        self.checked(vec![Effect::CancelScheduled])
    }

    pub fn icon_activate(&mut self) -> Vec<Effect> {
        if !self.view.expanded {
            self.view.expanded = true;
            self.view.input_focused = true;
            return self.checked(Vec::new());
        }
        self.view.input_focused = true;
        if !self.view.has_text() {
            return self.checked(Vec::new());
        }

        self.scheduled = None;
        self.bump_generation();
        let effect = self.begin_dispatch();
        self.checked(vec![Effect::CancelScheduled, effect])
    }

    fn begin_dispatch(&mut self) -> Effect {
        self.view.query.pending = true;
        self.view.dispatch_count += 1;
        let query = self.view.query.text.trim().to_string();
        self.last_dispatched = Some((self.view.query.generation, query.clone()));
        let request = SearchRequest {
            query,
            limit: self.options.limit,
            threshold: self.options.threshold,
            department: self.options.department.clone(),
        };
        Effect::Dispatch {
            generation: self.view.query.generation,
            request,
        }
    }

    fn bump_generation(&mut self) -> u64 {
        self.view.query.generation += 1;
        self.view.query.generation
    }

    fn clear_outcome(&mut self) {
        self.view.results.clear();
        self.view.error = None;
        self.view.summary = None;
    }

    fn checked(&self, effects: Vec<Effect>) -> Vec<Effect> {
        debug_assert!(
            !self.view.dropdown_open || self.view.expanded,
            "dropdown open on a collapsed widget"
        );
        effects
    }
}
