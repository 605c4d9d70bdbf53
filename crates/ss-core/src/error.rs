use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// Sample rate or FFT size unusable for bin/Hz conversion.
    #[error("Format de session invalide : {sample_rate} Hz, FFT {fft_size}")]
    InvalidSessionFormat {
        /// Sample rate reported by the host.
        sample_rate: u32,
        /// FFT window size reported by the host.
        fft_size: usize,
    },

    /// Band name not in {low, mid, high} or their menu aliases.
    #[error("Bande inconnue : {0}")]
    UnknownBand(String),

    /// Audio input name not in {microphone, project, all}.
    #[error("Source audio inconnue : {0}")]
    UnknownPolicy(String),
}
