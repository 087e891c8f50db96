//! Domain types for ChartDrill

pub mod bar;
pub mod market;
pub mod timeframe;

pub use bar::{Bar, RawBar, Segment, SegmentError};
pub use market::{display_symbol, InstrumentClass, MarketDescriptor, VenueMode, QUOTE_ASSET};
pub use timeframe::{Timeframe, UnknownTimeframe};
