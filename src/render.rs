use std::fmt;

use crate::data_models::SearchResult;
use crate::state::{ResponseSummary, WidgetSnapshot};

pub const HIGH_CONFIDENCE: f32 = 0.8;
pub const MEDIUM_CONFIDENCE: f32 = 0.6;
const PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTint {
    High,
    Medium,
    Low,
}

impl ConfidenceTint {
    pub fn for_similarity(similarity: f32) -> Self {
        if similarity >= HIGH_CONFIDENCE {
            ConfidenceTint::High
        } else if similarity >= MEDIUM_CONFIDENCE {
            ConfidenceTint::Medium
        } else {
            ConfidenceTint::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceTint::High => "high",
            ConfidenceTint::Medium => "medium",
            ConfidenceTint::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub file_id: String,
    pub display_name: String,
    pub tint: ConfidenceTint,
    pub similarity_percent: u8,
    pub size: String,
    pub department: String,
    pub uploaded_by: String,
    pub uploaded_on: String,
    pub preview: Option<String>,
}

impl From<&SearchResult> for ResultRow {
    fn from(result: &SearchResult) -> Self {
        let meta = &result.metadata;
        ResultRow {
            file_id: result.file_id.clone(),
            display_name: result.display_name.clone(),
            tint: ConfidenceTint::for_similarity(result.similarity),
            similarity_percent: (result.similarity.clamp(0.0, 1.0) * 100.0).round() as u8,
            size: format_size(meta.size),
            department: meta.department.clone(),
            uploaded_by: meta.uploaded_by.clone(),
            uploaded_on: meta.uploaded_at.format("%Y-%m-%d").to_string(),
            preview: meta.preview.as_deref().map(truncate_preview),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropdownView {
    Hidden,
    Results { rows: Vec<ResultRow>, footer: Option<String> },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetView {
    Collapsed,
    Expanded {
        input: String,
        showing_placeholder: bool,
        focused: bool,
        /// Inline status under the input: searching / no matches.
        hint: Option<String>,
        dropdown: DropdownView,
    },
}

pub fn render(snapshot: &WidgetSnapshot, placeholder: &str) -> WidgetView {
    if !snapshot.expanded {
        return WidgetView::Collapsed;
    }

    let showing_placeholder = !snapshot.has_text();
    let input = if showing_placeholder {
        placeholder.to_string()
    } else {
        snapshot.query.text.clone()
    };

    let hint = if snapshot.query.pending {
        Some("Searching...".to_string())
    } else if snapshot.is_no_match() {
        Some(format!("No documents match \"{}\"", snapshot.query.text.trim()))
    } else {
        None
    };

    WidgetView::Expanded {
        input,
        showing_placeholder,
        focused: snapshot.input_focused,
        hint,
        dropdown: render_dropdown(snapshot),
    }
}

pub fn render_dropdown(snapshot: &WidgetSnapshot) -> DropdownView {
    if !snapshot.dropdown_open {
        return DropdownView::Hidden;
    }
    if let Some(error) = &snapshot.error {
        return DropdownView::Error {
            message: error.user_message(),
        };
    }
    DropdownView::Results {
        rows: snapshot.results.iter().map(ResultRow::from).collect(),
        footer: snapshot.summary.as_ref().map(footer),
    }
}

fn footer(summary: &ResponseSummary) -> String {
    format!(
        "{} of {} documents · {}",
        summary.count, summary.total_evaluated, summary.embedding_model
    )
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn truncate_preview(preview: &str) -> String {
    let preview = preview.trim();
    match preview.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &preview[..cut]),
        None => preview.to_string(),
    }
}

impl fmt::Display for WidgetView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WidgetView::Collapsed => writeln!(f, "[search]"),
            WidgetView::Expanded {
                input,
                showing_placeholder,
                focused,
                hint,
                dropdown,
            } => {
                let cursor = if *focused { "|" } else { "" };
                if *showing_placeholder {
                    writeln!(f, "[search] ({input}){cursor}")?;
                } else {
                    writeln!(f, "[search] {input}{cursor}")?;
                }
                if let Some(hint) = hint {
                    writeln!(f, "  {hint}")?;
                }
                write!(f, "{dropdown}")
            }
        }
    }
}

impl fmt::Display for DropdownView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropdownView::Hidden => Ok(()),
            DropdownView::Error { message } => writeln!(f, "  ! {message}"),
            DropdownView::Results { rows, footer } => {
                for (i, row) in rows.iter().enumerate() {
                    writeln!(
                        f,
                        "  {}. {} [{} {}%] {} · {} · {} · {}",
                        i + 1,
                        row.display_name,
                        row.tint.label(),
                        row.similarity_percent,
                        row.size,
                        row.department,
                        row.uploaded_by,
                        row.uploaded_on
                    )?;
                    if let Some(preview) = &row.preview {
                        writeln!(f, "     {preview}")?;
                    }
                }
                if let Some(footer) = footer {
                    writeln!(f, "  {footer}")?;
                }
                Ok(())
            }
        }
    }
}
