//! Application state: single-owner, main-thread only.
//!
//! All TUI state lives here. The worker thread communicates via channels.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender};

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use chartdrill_core::config::{clamp_bar_count, clamp_window_days, ChartDrillConfig};
use chartdrill_core::domain::{Segment, VenueMode};
use chartdrill_core::export::save_segment;
use chartdrill_core::session::SegmentParams;
use chartdrill_core::shortlist::SymbolChoices;

use crate::annotation::{Annotations, Cursor};
use crate::worker::{WorkerCommand, WorkerResponse};

pub const MAX_ERRORS: usize = 50;

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// An error record for the error history overlay.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: NaiveDateTime,
    pub category: ErrorCategory,
    pub message: String,
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Venue,
    Sample,
    Export,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Venue => "NET",
            ErrorCategory::Sample => "DATA",
            ErrorCategory::Export => "IO",
        }
    }
}

/// Which overlay (if any) is shown on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    Help,
    ErrorHistory,
}

/// User-adjustable sampling controls.
#[derive(Debug, Clone)]
pub struct Controls {
    pub symbol_index: usize,
    pub window_days: u32,
    pub bar_count: usize,
}

/// Top-level application state.
pub struct AppState {
    pub running: bool,
    pub config: ChartDrillConfig,

    // Shortlist and controls
    pub choices: Option<SymbolChoices>,
    pub controls: Controls,

    // Current chart
    pub segment: Option<Segment>,
    pub segment_mode: Option<VenueMode>,
    pub last_applied: Option<SegmentParams>,
    pub annotations: Annotations,
    pub cursor: Option<Cursor>,

    // Worker communication
    pub worker_tx: Sender<WorkerCommand>,
    pub worker_rx: Receiver<WorkerResponse>,
    /// A sample request is with the worker.
    pub in_flight: bool,
    /// Force a fresh draw once the in-flight request returns.
    pub redraw_queued: bool,

    // Cross-cutting
    pub fatal: Option<String>,
    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,
    pub overlay: Overlay,
}

impl AppState {
    pub fn new(
        config: ChartDrillConfig,
        worker_tx: Sender<WorkerCommand>,
        worker_rx: Receiver<WorkerResponse>,
    ) -> Self {
        let controls = Controls {
            symbol_index: 0,
            window_days: config.default_window_days,
            bar_count: config.default_bar_count,
        };
        Self {
            running: true,
            config,
            choices: None,
            controls,
            segment: None,
            segment_mode: None,
            last_applied: None,
            annotations: Annotations::default(),
            cursor: None,
            worker_tx,
            worker_rx,
            in_flight: false,
            redraw_queued: false,
            fatal: None,
            status_message: None,
            error_history: VecDeque::with_capacity(MAX_ERRORS),
            error_scroll: 0,
            overlay: Overlay::None,
        }
    }

    pub fn selected_symbol(&self) -> Option<&str> {
        self.choices
            .as_ref()
            .and_then(|c| c.ordered.get(self.controls.symbol_index))
            .map(String::as_str)
    }

    /// Params implied by the current controls, once choices are loaded.
    pub fn current_params(&self) -> Option<SegmentParams> {
        let choices = self.choices.as_ref()?;
        Some(SegmentParams {
            symbol_display: self.selected_symbol()?.to_string(),
            window_days: self.controls.window_days,
            bar_count: self.controls.bar_count,
            mode: choices.mode,
        })
    }

    fn send(&mut self, cmd: WorkerCommand) {
        if self.worker_tx.send(cmd).is_err() {
            self.fatal = Some("background worker stopped".into());
        }
    }

    pub fn request_choices(&mut self) {
        self.set_status("Resolving venue and building shortlist...");
        self.send(WorkerCommand::LoadChoices);
    }

    /// Resample when the controls no longer match the displayed segment.
    pub fn refresh_if_stale(&mut self) {
        let Some(params) = self.current_params() else {
            return;
        };
        if params.needs_refresh(self.last_applied.as_ref()) {
            self.dispatch_sample(params);
        }
    }

    /// Draw a new segment with the current controls, stale or not.
    pub fn request_next_segment(&mut self) {
        let Some(params) = self.current_params() else {
            self.set_warning("Symbols are still loading");
            return;
        };
        self.dispatch_sample(params);
    }

    fn dispatch_sample(&mut self, params: SegmentParams) {
        if self.fatal.is_some() {
            return;
        }
        if self.in_flight {
            self.redraw_queued = true;
            return;
        }
        debug!(symbol = %params.symbol_display, bars = params.bar_count, "requesting segment");
        self.in_flight = true;
        self.set_status(format!("Sampling {}...", params.symbol_display));
        self.send(WorkerCommand::Sample { params });
    }

    pub fn cycle_symbol(&mut self, delta: isize) {
        let Some(len) = self.choices.as_ref().map(|c| c.ordered.len()) else {
            return;
        };
        if len == 0 {
            return;
        }
        let idx = self.controls.symbol_index as isize + delta;
        self.controls.symbol_index = idx.rem_euclid(len as isize) as usize;
        self.refresh_if_stale();
    }

    pub fn adjust_window(&mut self, delta: i64) {
        let days = (i64::from(self.controls.window_days) + delta).max(0);
        self.controls.window_days = clamp_window_days(u32::try_from(days).unwrap_or(u32::MAX));
        self.refresh_if_stale();
    }

    pub fn adjust_bars(&mut self, delta: i64) {
        let bars = (self.controls.bar_count as i64 + delta).max(0) as usize;
        self.controls.bar_count = clamp_bar_count(bars);
        self.refresh_if_stale();
    }

    pub fn handle_worker_response(&mut self, resp: WorkerResponse) {
        match resp {
            WorkerResponse::Choices { choices, defaults } => {
                self.controls.symbol_index = choices
                    .ordered
                    .iter()
                    .position(|d| *d == defaults.symbol_display)
                    .unwrap_or(0);
                let count = choices.ordered.len();
                let label = choices.mode.source_label();
                if choices.mode.is_fallback() {
                    self.set_warning(format!("{count} symbols from {label}"));
                } else {
                    self.set_status(format!("{count} symbols from {label}"));
                }
                self.choices = Some(choices);
                self.refresh_if_stale();
            }
            WorkerResponse::ChoicesRefreshed { choices } => self.replace_choices(choices),
            WorkerResponse::Fatal { message } => {
                self.in_flight = false;
                self.push_error(ErrorCategory::Venue, message.clone(), "venue resolution".into());
                self.fatal = Some(message);
            }
            WorkerResponse::Segment { params, segment } => {
                self.in_flight = false;
                self.set_status(format!(
                    "{} {} → {}",
                    params.symbol_display,
                    segment.start().format("%Y-%m-%d %H:%M"),
                    segment.end().format("%Y-%m-%d %H:%M"),
                ));
                self.cursor = Some(Cursor::centered(&segment));
                self.annotations.clear();
                self.segment_mode = Some(params.mode);
                self.segment = Some(segment);
                self.last_applied = Some(params);
                self.after_response();
            }
            WorkerResponse::SampleFailed { params, message } => {
                self.in_flight = false;
                warn!(symbol = %params.symbol_display, %message, "sampling failed");
                self.segment = None;
                self.cursor = None;
                self.annotations.clear();
                // Counts as applied so the same controls are not retried in a loop.
                self.last_applied = Some(params.clone());
                self.push_error(ErrorCategory::Sample, message, params.symbol_display);
                self.after_response();
            }
        }
    }

    /// Swap in a rebuilt shortlist, keeping the selected symbol when it is
    /// still listed and falling back to the default otherwise.
    ///
    /// Arrives ahead of a sample result, so resampling is left to the
    /// staleness check that result triggers.
    fn replace_choices(&mut self, choices: SymbolChoices) {
        let kept = self
            .selected_symbol()
            .and_then(|s| choices.ordered.iter().position(|d| d == s));
        match kept {
            Some(index) => {
                self.controls.symbol_index = index;
                self.set_status(format!("Shortlist refreshed: {} symbols", choices.ordered.len()));
            }
            None => {
                let dropped = self.selected_symbol().unwrap_or("-").to_string();
                self.controls.symbol_index = choices.default_index();
                self.set_warning(format!("{dropped} left the shortlist"));
            }
        }
        self.choices = Some(choices);
    }

    fn after_response(&mut self) {
        if std::mem::take(&mut self.redraw_queued) {
            self.request_next_segment();
        } else {
            self.refresh_if_stale();
        }
    }

    /// Save the displayed segment as CSV into the export directory.
    pub fn export_current(&mut self) {
        let (Some(segment), Some(params)) = (&self.segment, &self.last_applied) else {
            self.set_warning("Nothing to export");
            return;
        };
        match save_segment(&self.config.export_dir, &params.symbol_display, segment) {
            Ok(path) => self.set_status(format!("Saved {}", path.display())),
            Err(e) => {
                let context = self.config.export_dir.display().to_string();
                self.push_error(ErrorCategory::Export, e.to_string(), context);
            }
        }
    }

    pub fn move_cursor(&mut self, bars: i64, steps: i64) {
        if let (Some(cursor), Some(segment)) = (self.cursor.as_mut(), self.segment.as_ref()) {
            cursor.step(segment, bars, steps);
        }
    }

    pub fn press_annotation(&mut self) {
        let Some(cursor) = self.cursor else {
            return;
        };
        if self.annotations.press(cursor.point()).is_some() {
            self.set_status(format!(
                "{} added ({} total)",
                self.annotations.tool.label(),
                self.annotations.len()
            ));
        }
    }

    /// Push an error to the history, capping at [`MAX_ERRORS`].
    pub fn push_error(&mut self, category: ErrorCategory, message: String, context: String) {
        let record = ErrorRecord {
            timestamp: chrono::Local::now().naive_local(),
            category,
            message: message.clone(),
            context,
        };
        self.error_history.push_front(record);
        if self.error_history.len() > MAX_ERRORS {
            self.error_history.pop_back();
        }
        self.status_message = Some((message, StatusLevel::Error));
    }

    /// Set an info status message.
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    /// Set a warning status message.
    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }
}
