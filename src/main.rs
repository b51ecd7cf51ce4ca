use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use portal_search::api::{AppState, create_router};
use portal_search::api::models::SearchRequest;
use portal_search::backend::{HttpSearchBackend, SearchBackend};
use portal_search::catalog::Catalog;
use portal_search::config::Config;
use portal_search::data_models::SearchResult;
use portal_search::render;
use portal_search::state::{ResponseSummary, WidgetOptions, WidgetSnapshot};
use portal_search::widget::{SearchWidget, SearchWidgetHandle};

#[derive(Parser)]
#[command(name = "portal-search", about = "Employee portal document search")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single search against the portal backend
    Search {
        query: String,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Drive the search widget from stdin, one line per input change
    Interactive {
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        placeholder: Option<String>,
        #[arg(long)]
        collapsed: bool,
    },
    /// Serve a development search backend over an in-memory catalog
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        catalog: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Bridge log crate -> tracing (so log::info! etc. work)
    tracing_log::LogTracer::init()?;

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Command::Search {
            query,
            department,
            limit,
            threshold,
        } => run_search(query, department, limit, threshold, &config).await,
        Command::Interactive {
            department,
            placeholder,
            collapsed,
        } => run_interactive(department, placeholder, collapsed, &config).await,
        Command::Serve { bind, catalog } => run_server(bind, catalog, &config).await,
    }
}

async fn run_search(
    query: String,
    department: Option<String>,
    limit: Option<u32>,
    threshold: Option<f32>,
    config: &Config,
) -> Result<()> {
    let backend = HttpSearchBackend::from_config(config)?;
    let request = SearchRequest {
        query: query.clone(),
        limit: limit.unwrap_or(config.limit),
        threshold: threshold.unwrap_or(config.threshold),
        department,
    };
    match backend.search(request).await {
        Ok(response) if response.results.is_empty() => println!("No matching documents"),
        Ok(response) => {
            let snapshot = WidgetSnapshot {
                expanded: true,
                dropdown_open: true,
                summary: Some(ResponseSummary {
                    query: query.clone(),
                    count: response.count,
                    total_evaluated: response.total_evaluated,
                    embedding_model: response.embedding_model,
                }),
                results: response.results,
                ..WidgetSnapshot::default()
            };
            print!("{}", render::render_dropdown(&snapshot));
        }
        Err(e) => {
            println!("{}", e.user_message());
            log::debug!("search error: {}", e);
        }
    }
    Ok(())
}

async fn run_interactive(
    department: Option<String>,
    placeholder: Option<String>,
    collapsed: bool,
    config: &Config,
) -> Result<()> {
    let backend: Arc<dyn SearchBackend> = Arc::new(HttpSearchBackend::from_config(config)?);
    let mut options = WidgetOptions::from_config(config).collapsed(collapsed);
    if let Some(department) = department {
        options = options.with_department(department);
    }
    if let Some(placeholder) = placeholder {
        options = options.with_placeholder(placeholder);
    }
    let placeholder = options.placeholder.clone();
    let settle = options.debounce + Duration::from_millis(20);

    let widget = SearchWidget::spawn(
        backend,
        options,
        Some(Box::new(|result: &SearchResult| {
            println!("opened {} ({})", result.display_name, result.file_id)
        })),
    );

    println!("commands: :icon :esc :click-outside :select N :quit, anything else is typed text");
    print_view(&widget, &placeholder);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":quit" => break,
            ":icon" => widget.icon_activate(),
            ":esc" => widget.escape_key(),
            ":click-outside" => widget.click_outside(),
            cmd if cmd.starts_with(":select") => match parse_select(cmd) {
                Some(index) => widget.select_at(index),
                None => {
                    println!("usage: :select N (N starts at 1)");
                    continue;
                }
            },
            _ => {
                widget.input_change(line.clone());
                tokio::time::sleep(settle).await;
            }
        }
        settle_view(&widget, config.request_timeout).await;
        print_view(&widget, &placeholder);
    }

    widget.shutdown();
    Ok(())
}

/// Zero-based row index from a `:select N` command, N counted from 1.
fn parse_select(cmd: &str) -> Option<usize> {
    let n: usize = cmd.strip_prefix(":select")?.trim().parse().ok()?;
    n.checked_sub(1)
}

async fn settle_view(widget: &SearchWidgetHandle, timeout: Duration) {
    let wait = widget.wait_for(|s| !s.query.pending);
    if tokio::time::timeout(timeout, wait).await.is_err() {
        log::warn!("search did not settle within {:?}", timeout);
    }
}

fn print_view(widget: &SearchWidgetHandle, placeholder: &str) {
    let snapshot = widget.snapshot();
    let view = render::render(&snapshot, placeholder);
    println!("{view}");
}

async fn run_server(
    bind: Option<String>,
    catalog_path: Option<String>,
    config: &Config,
) -> Result<()> {
    let catalog = match catalog_path.or_else(|| config.dev_catalog_path.clone()) {
        Some(path) => Catalog::load(path)?,
        None => Catalog::sample(),
    };
    let state = Arc::new(AppState {
        catalog,
        session_token: config.dev_session_token.clone(),
    });
    let addr = bind.unwrap_or_else(|| config.dev_bind_addr.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    log::info!("dev search backend listening on {addr}");
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
