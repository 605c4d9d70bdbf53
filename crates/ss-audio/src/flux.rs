/// L1 spectral flux between two frames: `Σ |current[i] - previous[i]|`.
///
/// Extra bins in the longer frame are ignored.
///
/// # Example
/// ```
/// use ss_audio::flux::spectral_flux;
/// assert_eq!(spectral_flux(&[0.0; 4], &[255.0; 4]), 1020.0);
/// assert_eq!(spectral_flux(&[3.0, 7.0], &[3.0, 7.0]), 0.0);
/// ```
#[must_use]
pub fn spectral_flux(previous: &[f32], current: &[f32]) -> f64 {
    current
        .iter()
        .zip(previous.iter())
        .map(|(&cur, &prev)| f64::from((cur - prev).abs()))
        .sum()
}

/// Per-source frame history and flux.
///
/// Holds the current and previous magnitude frames of one input. Both start
/// at zero, so the first refresh measures the frame against silence instead
/// of being skipped.
///
/// # Example
/// ```
/// use ss_audio::flux::FluxComputer;
///
/// let mut flux = FluxComputer::new(4);
/// let first = flux.refresh(|out| { out.fill(10.0); true });
/// assert_eq!(first, Some(40.0));
/// let second = flux.refresh(|out| { out.fill(10.0); true });
/// assert_eq!(second, Some(0.0));
/// ```
#[derive(Clone, Debug)]
pub struct FluxComputer {
    /// Frame of the previous successful refresh, allocated once.
    previous: Vec<f32>,
    /// Frame of the latest successful refresh.
    current: Vec<f32>,
    /// Flux of the latest successful refresh.
    flux: f64,
}

impl FluxComputer {
    /// Create a computer for frames of `bins` samples, with an all-zero baseline.
    #[must_use]
    pub fn new(bins: usize) -> Self {
        Self {
            previous: vec![0.0; bins],
            current: vec![0.0; bins],
            flux: 0.0,
        }
    }

    /// Pull a new frame through `fill` and compute its flux against the last one.
    ///
    /// `fill` writes the new frame into the provided buffer and returns `false`
    /// if the source had nothing to deliver; the history is then left as it was
    /// and `None` is returned.
    pub fn refresh(&mut self, fill: impl FnOnce(&mut [f32]) -> bool) -> Option<f64> {
        self.previous.copy_from_slice(&self.current);
        if !fill(&mut self.current) {
            self.current.copy_from_slice(&self.previous);
            return None;
        }
        self.flux = spectral_flux(&self.previous, &self.current);
        Some(self.flux)
    }

    /// Latest frame.
    #[inline(always)]
    #[must_use]
    pub fn current(&self) -> &[f32] {
        &self.current
    }

    /// Flux of the latest successful refresh (0 before the first one).
    #[inline]
    #[must_use]
    pub fn flux(&self) -> f64 {
        self.flux
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_frames_have_no_flux() {
        let mut flux = FluxComputer::new(8);
        flux.refresh(|out| {
            out.copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
            true
        });
        let f = flux.refresh(|out| {
            out.copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
            true
        });
        assert_eq!(f, Some(0.0));
    }

    #[test]
    fn full_scale_step_over_n_bins() {
        let n = 1024;
        let mut flux = FluxComputer::new(n);
        flux.refresh(|out| {
            out.fill(0.0);
            true
        });
        let f = flux.refresh(|out| {
            out.fill(255.0);
            true
        });
        assert_eq!(f, Some(255.0 * n as f64));
    }

    #[test]
    fn first_refresh_compares_against_silence() {
        let mut flux = FluxComputer::new(3);
        let f = flux.refresh(|out| {
            out.copy_from_slice(&[5.0, 0.0, 2.0]);
            true
        });
        assert_eq!(f, Some(7.0));
    }

    #[test]
    fn decreases_count_as_much_as_increases() {
        assert_eq!(spectral_flux(&[10.0, 0.0], &[0.0, 10.0]), 20.0);
    }

    #[test]
    fn failed_refresh_keeps_history() {
        let mut flux = FluxComputer::new(2);
        flux.refresh(|out| {
            out.copy_from_slice(&[4.0, 4.0]);
            true
        });
        let failed = flux.refresh(|out| {
            out.fill(99.0);
            false
        });
        assert_eq!(failed, None);
        assert_eq!(flux.current(), &[4.0, 4.0]);
        assert_eq!(flux.flux(), 8.0);

        let f = flux.refresh(|out| {
            out.copy_from_slice(&[4.0, 6.0]);
            true
        });
        assert_eq!(f, Some(2.0));
    }
}
