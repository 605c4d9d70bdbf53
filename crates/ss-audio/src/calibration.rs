use ss_core::config::SensingConfig;
use ss_core::frame::{BAND_COUNT, Band, EnergyVector};

use crate::sliding::SlidingStatistic;

/// Observable state of an analysis session.
///
/// The detector itself does not distinguish `Calibrating` from `Steady`; both
/// compute best-effort z-scores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No analysis pass has succeeded yet.
    Uninitialized,
    /// Energy history shorter than its window.
    Calibrating,
    /// Energy history full.
    Steady,
}

/// The two sliding mean/variance pairs that calibrate the detector.
///
/// Energy and flux statistics are stepped independently. [`clear_energy`]
/// forgets the energy history only; the flux history survives a stop-all.
///
/// [`clear_energy`]: Calibration::clear_energy
#[derive(Clone, Debug)]
pub struct Calibration {
    energy_mean: SlidingStatistic<BAND_COUNT>,
    energy_var: SlidingStatistic<BAND_COUNT>,
    flux_mean: SlidingStatistic<1>,
    flux_var: SlidingStatistic<1>,
}

impl Calibration {
    /// Empty statistics sized from the configuration.
    #[must_use]
    pub fn new(config: &SensingConfig) -> Self {
        Self {
            energy_mean: SlidingStatistic::mean(config.energy_history),
            energy_var: SlidingStatistic::variance(config.energy_history),
            flux_mean: SlidingStatistic::mean(config.flux_history),
            flux_var: SlidingStatistic::variance(config.flux_history),
        }
    }

    /// Feed one energy vector: mean first, then variance around the new mean.
    pub fn observe_energy(&mut self, energy: &EnergyVector) {
        let mean = *self.energy_mean.step(energy.as_array(), None);
        self.energy_var.step(energy.as_array(), Some(&mean));
    }

    /// Feed one flux value.
    pub fn observe_flux(&mut self, flux: f64) {
        let mean = *self.flux_mean.step(&[flux], None);
        self.flux_var.step(&[flux], Some(&mean));
    }

    /// Calibrated mean energy of `band`.
    #[inline]
    #[must_use]
    pub fn energy_mean(&self, band: Band) -> f64 {
        self.energy_mean.result()[band.index()]
    }

    /// Calibrated energy variance of `band`.
    #[inline]
    #[must_use]
    pub fn energy_variance(&self, band: Band) -> f64 {
        self.energy_var.result()[band.index()]
    }

    /// Calibrated mean flux.
    #[inline]
    #[must_use]
    pub fn flux_mean(&self) -> f64 {
        self.flux_mean.result()[0]
    }

    /// Calibrated flux variance.
    #[inline]
    #[must_use]
    pub fn flux_variance(&self) -> f64 {
        self.flux_var.result()[0]
    }

    /// Forget the energy history (stop-all). Flux history is kept.
    pub fn clear_energy(&mut self) {
        self.energy_mean.clear();
        self.energy_var.clear();
    }

    /// `Steady` once the energy window is full, `Calibrating` before.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.energy_mean.is_warm() {
            SessionPhase::Steady
        } else {
            SessionPhase::Calibrating
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(energy_history: usize, flux_history: usize) -> SensingConfig {
        SensingConfig {
            energy_history,
            flux_history,
            ..SensingConfig::default()
        }
    }

    #[test]
    fn variance_tracks_mean_of_same_step() {
        let mut cal = Calibration::new(&config(2, 2));
        cal.observe_energy(&EnergyVector([4.0, 0.0, 0.0]));
        // mean = 2, variance = (2 - 4)^2 / 1
        assert!((cal.energy_mean(Band::Low) - 2.0).abs() < f64::EPSILON);
        assert!((cal.energy_variance(Band::Low) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clear_energy_keeps_flux_history() {
        let mut cal = Calibration::new(&SensingConfig::default());
        for k in 0..20 {
            let v = f64::from(k % 5) * 10.0;
            cal.observe_energy(&EnergyVector([v, v / 2.0, v / 4.0]));
            cal.observe_flux(v * 3.0);
        }
        let flux_mean = cal.flux_mean();
        let flux_var = cal.flux_variance();
        assert_eq!(cal.phase(), SessionPhase::Steady);

        cal.clear_energy();
        for band in Band::ALL {
            assert!(cal.energy_mean(band).abs() < f64::EPSILON);
            assert!(cal.energy_variance(band).abs() < f64::EPSILON);
        }
        assert!((cal.flux_mean() - flux_mean).abs() < f64::EPSILON);
        assert!((cal.flux_variance() - flux_var).abs() < f64::EPSILON);
        assert_eq!(cal.phase(), SessionPhase::Calibrating);
    }
}
