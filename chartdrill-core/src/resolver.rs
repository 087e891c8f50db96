//! Market catalog resolver: derivatives first, spot as fallback.
//!
//! The decision is made once per process. `attempt_venue` returns a tagged
//! result so the "both failed" path is an explicit value rather than a
//! swallowed error; `VenueResolver` caches the first success for the rest of
//! the process lifetime.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::cache::{Ttl, TtlCache};
use crate::data::{DataError, Venue, VenueConnector};
use crate::domain::VenueMode;

const VENUE_CACHE: &str = "venue";

/// Outcome of trying both market families.
pub enum VenueResolution {
    Derivatives(Arc<dyn Venue>),
    Spot {
        venue: Arc<dyn Venue>,
        /// Why derivatives was skipped.
        derivatives_error: String,
    },
    Unreachable {
        derivatives: DataError,
        spot: DataError,
    },
}

impl VenueResolution {
    /// Collapse into a handle, turning `Unreachable` into the one fatal error.
    pub fn into_result(self) -> Result<ResolvedVenue, DataError> {
        match self {
            VenueResolution::Derivatives(venue) => Ok(ResolvedVenue {
                venue,
                mode: VenueMode::Derivatives,
            }),
            VenueResolution::Spot { venue, .. } => Ok(ResolvedVenue {
                venue,
                mode: VenueMode::Spot,
            }),
            VenueResolution::Unreachable { derivatives, spot } => {
                Err(DataError::VenueUnreachable {
                    derivatives: derivatives.to_string(),
                    spot: spot.to_string(),
                })
            }
        }
    }
}

impl fmt::Debug for VenueResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueResolution::Derivatives(_) => f.write_str("Derivatives"),
            VenueResolution::Spot {
                derivatives_error, ..
            } => f
                .debug_struct("Spot")
                .field("derivatives_error", derivatives_error)
                .finish(),
            VenueResolution::Unreachable { derivatives, spot } => f
                .debug_struct("Unreachable")
                .field("derivatives", derivatives)
                .field("spot", spot)
                .finish(),
        }
    }
}

/// Try derivatives, then spot.
pub fn attempt_venue(connector: &dyn VenueConnector) -> VenueResolution {
    let derivatives = match connector.connect(VenueMode::Derivatives) {
        Ok(venue) => return VenueResolution::Derivatives(venue),
        Err(e) => e,
    };
    warn!(error = %derivatives, "derivatives venue unavailable, falling back to spot");

    match connector.connect(VenueMode::Spot) {
        Ok(venue) => VenueResolution::Spot {
            venue,
            derivatives_error: derivatives.to_string(),
        },
        Err(spot) => VenueResolution::Unreachable { derivatives, spot },
    }
}

/// A connected venue and the mode it was opened in.
#[derive(Clone)]
pub struct ResolvedVenue {
    pub venue: Arc<dyn Venue>,
    pub mode: VenueMode,
}

impl fmt::Debug for ResolvedVenue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedVenue")
            .field("mode", &self.mode)
            .field("markets", &self.venue.markets().len())
            .finish()
    }
}

/// Process-lifetime cache around `attempt_venue`.
pub struct VenueResolver {
    connector: Arc<dyn VenueConnector>,
    cache: TtlCache<ResolvedVenue>,
}

impl VenueResolver {
    pub fn new(connector: Arc<dyn VenueConnector>) -> Self {
        Self {
            connector,
            cache: TtlCache::new(),
        }
    }

    /// Cached `(catalog handle, mode)`; resolves on first call.
    ///
    /// Only a successful resolution is cached, so an unreachable venue is
    /// retried by the next caller.
    pub fn resolve(&mut self) -> Result<ResolvedVenue, DataError> {
        let connector = self.connector.clone();
        self.cache
            .get_or_try_insert_with(VENUE_CACHE, Ttl::Lifetime, Instant::now(), || {
                let resolved = attempt_venue(connector.as_ref()).into_result()?;
                info!(
                    mode = %resolved.mode,
                    markets = resolved.venue.markets().len(),
                    "venue resolved"
                );
                Ok(resolved)
            })
    }
}
