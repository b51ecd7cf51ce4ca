use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::api::models::SearchResponse;
use crate::backend::SearchBackend;
use crate::data_models::SearchResult;
use crate::error::SearchError;
use crate::state::{Effect, WidgetOptions, WidgetSnapshot, WidgetState};

pub type SelectCallback = Box<dyn Fn(&SearchResult) + Send + Sync>;

#[derive(Debug)]
enum WidgetEvent {
    InputChanged(String),
    IconActivated,
    ClickedOutside,
    EscapePressed,
    Selected(SearchResult),
    SelectedAt(usize),
}

struct Completion {
    generation: u64,
    outcome: Result<SearchResponse, SearchError>,
}

/// Cheap handle to a running search widget. All UI events go through here;
/// the widget's state lives in a single event-loop task.
#[derive(Clone)]
pub struct SearchWidgetHandle {
    events: mpsc::UnboundedSender<WidgetEvent>,
    snapshots: watch::Receiver<WidgetSnapshot>,
    shutdown: CancellationToken,
}

impl SearchWidgetHandle {
    pub fn input_change(&self, text: impl Into<String>) {
        self.send(WidgetEvent::InputChanged(text.into()));
    }

    pub fn icon_activate(&self) {
        self.send(WidgetEvent::IconActivated);
    }

    pub fn click_outside(&self) {
        self.send(WidgetEvent::ClickedOutside);
    }

    pub fn escape_key(&self) {
        self.send(WidgetEvent::EscapePressed);
    }

    pub fn select(&self, result: SearchResult) {
        self.send(WidgetEvent::Selected(result));
    }

    /// Select the `index`-th row of the currently shown results. Out of range
    /// indices are ignored.
    pub fn select_at(&self, index: usize) {
        self.send(WidgetEvent::SelectedAt(index));
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WidgetSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`. Returns `None`
    /// once the widget has shut down.
    pub async fn wait_for<F>(&self, predicate: F) -> Option<WidgetSnapshot>
    where
        F: FnMut(&WidgetSnapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        rx.wait_for(predicate).await.ok().map(|s| s.clone())
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.events.is_closed()
    }

    fn send(&self, event: WidgetEvent) {
        if let Err(e) = self.events.send(event) {
            log::debug!("search widget is gone, dropping {:?}", e.0);
        }
    }
}

pub struct SearchWidget {
    state: WidgetState,
    backend: Arc<dyn SearchBackend>,
    on_select: Option<SelectCallback>,
    events: mpsc::UnboundedReceiver<WidgetEvent>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    snapshots: watch::Sender<WidgetSnapshot>,
    debounce: Option<(Instant, u64)>,
    shutdown: CancellationToken,
}

impl SearchWidget {
    /// Start the widget's event loop on the current tokio runtime.
    pub fn spawn(
        backend: Arc<dyn SearchBackend>,
        options: WidgetOptions,
        on_select: Option<SelectCallback>,
    ) -> SearchWidgetHandle {
        let state = WidgetState::new(options);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(state.snapshot().clone());
        let shutdown = CancellationToken::new();

        let widget = SearchWidget {
            state,
            backend,
            on_select,
            events: events_rx,
            completions_tx,
            completions_rx,
            snapshots: snapshots_tx,
            debounce: None,
            shutdown: shutdown.clone(),
        };
        tokio::spawn(widget.run());

        SearchWidgetHandle {
            events: events_tx,
            snapshots: snapshots_rx,
            shutdown,
        }
    }

    async fn run(mut self) {
        loop {
            let deadline = self.debounce.map(|(at, _)| at);
            let effects = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                Some(done) = self.completions_rx.recv() => {
                    self.state.search_completed(done.generation, done.outcome)
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    match self.debounce.take() {
                        Some((_, generation)) => self.state.debounce_elapsed(generation),
                        None => Vec::new(),
                    }
                }
            };
            self.apply(effects);
            self.snapshots.send_replace(self.state.snapshot().clone());
        }
        // in-flight requests observe this and stop
        self.shutdown.cancel();
        log::debug!("search widget event loop stopped");
    }

    fn handle_event(&mut self, event: WidgetEvent) -> Vec<Effect> {
        match event {
            WidgetEvent::InputChanged(text) => self.state.input_change(text),
            WidgetEvent::IconActivated => self.state.icon_activate(),
            WidgetEvent::ClickedOutside | WidgetEvent::EscapePressed => self.state.dismiss(),
            WidgetEvent::Selected(result) => self.state.select(result),
            WidgetEvent::SelectedAt(index) => {
                match self.state.snapshot().results.get(index).cloned() {
                    Some(result) => self.state.select(result),
                    None => Vec::new(),
                }
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ScheduleSearch { generation, delay } => {
                    self.debounce = Some((Instant::now() + delay, generation));
                }
                Effect::CancelScheduled => self.debounce = None,
                Effect::Dispatch {
                    generation,
                    request,
                } => {
                    let backend = self.backend.clone();
                    let tx = self.completions_tx.clone();
                    let shutdown = self.shutdown.clone();
                    log::debug!("dispatching search {:?} (generation {generation})", request.query);
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = shutdown.cancelled() => {}
                            outcome = backend.search(request) => {
                                let _ = tx.send(Completion { generation, outcome });
                            }
                        }
                    });
                }
                Effect::NotifySelected(result) => {
                    if let Some(callback) = &self.on_select {
                        callback(&result);
                    }
                }
            }
        }
    }
}
