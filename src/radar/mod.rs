//! Rotating radar: geometry, shared state, snapshot hand-off and scan loop

pub mod geometry;
pub mod lifecycle;
pub mod scan;
pub mod snapshot;
pub mod state;

pub use lifecycle::{Radar, RadarError};
pub use state::{RadarGeometry, RadarStatus, SharedRadar};
