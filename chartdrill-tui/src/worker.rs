//! Background worker thread. Owns the `ChartService`, so venue resolution,
//! ranking calls and bar fetches never block rendering.
//!
//! Commands are processed strictly one at a time.

use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{error, info};

use chartdrill_core::config::ChartDrillConfig;
use chartdrill_core::data::DataError;
use chartdrill_core::domain::Segment;
use chartdrill_core::service::{ChartService, ServiceError};
use chartdrill_core::session::SegmentParams;
use chartdrill_core::shortlist::SymbolChoices;

/// Commands sent from the TUI to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    /// Resolve the venue and build the shortlist.
    LoadChoices,
    /// Draw a fresh segment for these control values.
    Sample { params: SegmentParams },
    Shutdown,
}

/// Responses sent from the worker back to the TUI.
#[derive(Debug)]
pub enum WorkerResponse {
    Choices {
        choices: SymbolChoices,
        defaults: SegmentParams,
    },
    /// The shortlist was rebuilt after its TTL and differs from the one the
    /// UI last received. Sent ahead of the sample result that noticed it.
    ChoicesRefreshed { choices: SymbolChoices },
    /// No venue reachable; nothing else can work.
    Fatal { message: String },
    Segment {
        params: SegmentParams,
        segment: Segment,
    },
    SampleFailed {
        params: SegmentParams,
        message: String,
    },
}

/// Spawn the background worker thread.
pub fn spawn_worker(
    config: ChartDrillConfig,
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("chartdrill-worker".into())
        .spawn(move || match ChartService::from_config(config) {
            Ok(service) => worker_loop(service, rx, tx),
            Err(e) => {
                error!(error = %e, "could not build chart service");
                let _ = tx.send(WorkerResponse::Fatal {
                    message: e.to_string(),
                });
            }
        })
}

pub fn worker_loop(
    mut service: ChartService,
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
) {
    let mut rng = rand::thread_rng();
    // Shortlist the UI is showing.
    let mut shown: Option<SymbolChoices> = None;
    loop {
        let resp = match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(WorkerCommand::LoadChoices) => {
                let resp = load_choices(&mut service);
                if let WorkerResponse::Choices { choices, .. } = &resp {
                    shown = Some(choices.clone());
                }
                resp
            }
            Ok(WorkerCommand::Sample { params }) => {
                let result = service.sample_segment(&params, &mut rng);
                if let Some(choices) = rebuilt_choices(&mut service, &mut shown, &result) {
                    if tx.send(WorkerResponse::ChoicesRefreshed { choices }).is_err() {
                        break;
                    }
                }
                match result {
                    Ok(segment) => WorkerResponse::Segment { params, segment },
                    Err(ServiceError::Data(e @ DataError::VenueUnreachable { .. })) => {
                        WorkerResponse::Fatal {
                            message: e.to_string(),
                        }
                    }
                    Err(e) => WorkerResponse::SampleFailed {
                        params,
                        message: e.to_string(),
                    },
                }
            }
        };
        if tx.send(resp).is_err() {
            break;
        }
    }
    info!("worker stopped");
}

/// The current shortlist, if it differs from `shown`.
///
/// `sample_segment` rebuilds an expired shortlist, so this read is a cache
/// hit. Skipped when the venue is gone.
fn rebuilt_choices(
    service: &mut ChartService,
    shown: &mut Option<SymbolChoices>,
    result: &Result<Segment, ServiceError>,
) -> Option<SymbolChoices> {
    if matches!(result, Err(ServiceError::Data(DataError::VenueUnreachable { .. }))) {
        return None;
    }
    let current = service.symbol_choices().ok()?;
    if shown.as_ref() == Some(&current) {
        return None;
    }
    info!(symbols = current.ordered.len(), "sending rebuilt shortlist");
    *shown = Some(current.clone());
    Some(current)
}

fn load_choices(service: &mut ChartService) -> WorkerResponse {
    let loaded = service
        .symbol_choices()
        .and_then(|choices| Ok((choices, service.default_params()?)));
    match loaded {
        Ok((choices, defaults)) => WorkerResponse::Choices { choices, defaults },
        Err(e) => WorkerResponse::Fatal {
            message: e.to_string(),
        },
    }
}
