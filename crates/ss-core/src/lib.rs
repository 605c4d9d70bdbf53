/// Configuration, types partagés et contrat hôte pour soundsense.
///
/// This crate contains the shared types, the host collaborator trait and
/// configuration logic used across the soundsense workspace.

pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod traits;

pub use clock::{MonotonicClock, TickGate};
pub use config::SensingConfig;
pub use error::CoreError;
pub use frame::{
    AudioBlock, AudioSourcePolicy, Band, BandTable, EnergyVector, InputSource, MagnitudeFrame,
    SessionFormat,
};
pub use traits::AudioHost;
