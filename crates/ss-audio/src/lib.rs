// Band energy, spectral flux and self-calibrating peak detection for soundsense.

pub mod bands;
pub mod calibration;
pub mod engine;
pub mod flux;
pub mod merge;
pub mod peak;
pub mod replay;
pub mod sliding;

pub use calibration::SessionPhase;
pub use engine::SensingEngine;
