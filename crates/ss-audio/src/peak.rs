use ss_core::config::SensingConfig;
use ss_core::frame::{AudioSourcePolicy, Band, BandTable};

/// Variance at or below which the z-score is treated as undefined.
///
/// Rolling sums leave float residue of this order once a constant signal
/// has flushed the window; a true zero is rarely reached.
pub const DEGENERATE_VARIANCE: f64 = 1e-9;

/// Standard score of `current` against a calibrated mean and variance.
///
/// Returns `None` for a degenerate statistic: variance at or below
/// [`DEGENERATE_VARIANCE`] (including negative residue), or a numerator of
/// exactly zero.
///
/// # Example
/// ```
/// use ss_audio::peak::z_score;
/// assert_eq!(z_score(14.0, 10.0, 4.0), Some(2.0));
/// assert_eq!(z_score(14.0, 10.0, 0.0), None);
/// assert_eq!(z_score(10.0, 10.0, 4.0), None);
/// ```
#[must_use]
pub fn z_score(current: f64, mean: f64, variance: f64) -> Option<f64> {
    let delta = current - mean;
    if variance <= DEGENERATE_VARIANCE || delta == 0.0 || variance.is_nan() {
        return None;
    }
    Some(delta / variance.sqrt())
}

/// Self-calibrating peak decision for band energies and spectral flux.
///
/// A value is a peak when its z-score against its own sliding statistics
/// exceeds the threshold. When the microphone takes part in the analysis, a
/// minimum absolute level is also required so the noise floor of an idle
/// microphone cannot fire events.
#[derive(Clone, Debug, PartialEq)]
pub struct PeakDetector {
    band_threshold: f64,
    flux_threshold: f64,
    band_gates: BandTable<f64>,
    flux_gate: f64,
}

impl PeakDetector {
    /// Thresholds and gates from the configuration.
    #[must_use]
    pub fn from_config(config: &SensingConfig) -> Self {
        Self {
            band_threshold: config.band_peak_threshold,
            flux_threshold: config.flux_peak_threshold,
            band_gates: config.microphone_gates,
            flux_gate: config.flux_gate,
        }
    }

    /// `true` if `energy` is a calibrated peak for `band`.
    ///
    /// # Example
    /// ```
    /// use ss_audio::peak::PeakDetector;
    /// use ss_core::config::SensingConfig;
    /// use ss_core::frame::{AudioSourcePolicy, Band};
    ///
    /// let detector = PeakDetector::from_config(&SensingConfig::default());
    /// // z = 2, well above 1, but 60 is under the 100 low-band microphone gate
    /// assert!(detector.is_band_peak(Band::Low, 60.0, 40.0, 100.0, AudioSourcePolicy::Project));
    /// assert!(!detector.is_band_peak(Band::Low, 60.0, 40.0, 100.0, AudioSourcePolicy::Microphone));
    /// ```
    #[must_use]
    pub fn is_band_peak(
        &self,
        band: Band,
        energy: f64,
        mean: f64,
        variance: f64,
        policy: AudioSourcePolicy,
    ) -> bool {
        let Some(norm) = z_score(energy, mean, variance) else {
            return false;
        };
        norm > self.band_threshold
            && (!policy.includes_microphone() || energy > self.band_gates.get(band))
    }

    /// `true` if `flux` is a calibrated peak.
    #[must_use]
    pub fn is_flux_peak(
        &self,
        flux: f64,
        mean: f64,
        variance: f64,
        policy: AudioSourcePolicy,
    ) -> bool {
        let Some(norm) = z_score(flux, mean, variance) else {
            return false;
        };
        norm > self.flux_threshold && (!policy.includes_microphone() || flux > self.flux_gate)
    }

    /// `true` if a low-band reading should snapshot the replay buffer.
    ///
    /// Only the z-score counts here, the microphone gate does not.
    #[must_use]
    pub fn triggers_replay(&self, band: Band, energy: f64, mean: f64, variance: f64) -> bool {
        band == Band::Low
            && z_score(energy, mean, variance).is_some_and(|norm| norm > self.band_threshold)
    }

    /// Z-score threshold for band peaks.
    #[must_use]
    pub fn band_threshold(&self) -> f64 {
        self.band_threshold
    }

    /// Z-score threshold for flux peaks.
    #[must_use]
    pub fn flux_threshold(&self) -> f64 {
        self.flux_threshold
    }
}

impl Default for PeakDetector {
    fn default() -> Self {
        Self::from_config(&SensingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_statistics_are_never_peaks() {
        let d = PeakDetector::default();
        for policy in [
            AudioSourcePolicy::Project,
            AudioSourcePolicy::Microphone,
            AudioSourcePolicy::All,
        ] {
            assert!(!d.is_band_peak(Band::High, 200.0, 10.0, 0.0, policy));
            assert!(!d.is_band_peak(Band::High, 200.0, 10.0, 1e-12, policy));
            assert!(!d.is_band_peak(Band::High, 200.0, 10.0, -3.0, policy));
            assert!(!d.is_band_peak(Band::High, 10.0, 10.0, 50.0, policy));
            assert!(!d.is_flux_peak(900.0, 100.0, 0.0, policy));
        }
    }

    #[test]
    fn band_threshold_is_strict() {
        let d = PeakDetector::default();
        // z exactly 1
        assert!(!d.is_band_peak(Band::Mid, 12.0, 10.0, 4.0, AudioSourcePolicy::Project));
        assert!(d.is_band_peak(Band::Mid, 12.5, 10.0, 4.0, AudioSourcePolicy::Project));
    }

    #[test]
    fn microphone_gates_follow_band_table() {
        let d = PeakDetector::default();
        let mic = AudioSourcePolicy::All;
        // z = 3 for all of these
        assert!(!d.is_band_peak(Band::Low, 100.0, 70.0, 100.0, mic));
        assert!(d.is_band_peak(Band::Low, 101.0, 71.0, 100.0, mic));
        assert!(!d.is_band_peak(Band::Mid, 50.0, 20.0, 100.0, mic));
        assert!(d.is_band_peak(Band::Mid, 51.0, 21.0, 100.0, mic));
        assert!(d.is_band_peak(Band::High, 6.0, 3.0, 1.0, mic));
        assert!(!d.is_band_peak(Band::High, 5.0, 2.0, 1.0, mic));
    }

    #[test]
    fn flux_threshold_is_half_sigma() {
        let d = PeakDetector::default();
        assert!(d.is_flux_peak(106.0, 100.0, 100.0, AudioSourcePolicy::Microphone));
        assert!(!d.is_flux_peak(105.0, 100.0, 100.0, AudioSourcePolicy::Project));
    }

    #[test]
    fn replay_trigger_ignores_gate_and_other_bands() {
        let d = PeakDetector::default();
        assert!(d.triggers_replay(Band::Low, 60.0, 40.0, 100.0));
        assert!(!d.triggers_replay(Band::Mid, 60.0, 40.0, 100.0));
        assert!(!d.triggers_replay(Band::Low, 45.0, 40.0, 100.0));
    }

    #[test]
    fn thresholds_come_from_config() {
        let config = SensingConfig {
            band_peak_threshold: 2.5,
            flux_peak_threshold: 1.5,
            ..SensingConfig::default()
        };
        let d = PeakDetector::from_config(&config);
        assert!((d.band_threshold() - 2.5).abs() < f64::EPSILON);
        assert!((d.flux_threshold() - 1.5).abs() < f64::EPSILON);
        assert!(!d.is_band_peak(Band::Low, 14.0, 10.0, 4.0, AudioSourcePolicy::Project));
    }
}
