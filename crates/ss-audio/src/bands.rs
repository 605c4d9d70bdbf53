use std::ops::Range;

use ss_core::frame::{Band, BandTable, EnergyVector, SessionFormat};

/// Bin ranges of the three bands, fixed for a session.
///
/// Band `b` covers `round(cutoff(b-1) * fft_size / sample_rate)` up to
/// `round(cutoff(b) * fft_size / sample_rate)`, with the low band starting at
/// bin 0. Boundaries are clamped to the bin count and never decrease, so the
/// ranges are contiguous and disjoint.
///
/// # Example
/// ```
/// use ss_audio::bands::BandLayout;
/// use ss_core::frame::{Band, BandTable, SessionFormat};
///
/// let format = SessionFormat::new(48_000, 2048).unwrap();
/// let cutoffs = BandTable { low: 250.0, mid: 2000.0, high: 6000.0 };
/// let layout = BandLayout::new(format, &cutoffs, true);
/// assert_eq!(layout.range(Band::Low), 0..11);
/// assert_eq!(layout.range(Band::Mid), 11..85);
/// assert_eq!(layout.range(Band::High), 85..1024);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BandLayout {
    format: SessionFormat,
    ranges: [Range<usize>; 3],
}

impl BandLayout {
    /// Derive the band table from the session format.
    ///
    /// With `high_to_nyquist`, the high band runs to the last bin and the three
    /// ranges partition the whole frame; otherwise it stops at `cutoffs.high`.
    #[must_use]
    pub fn new(format: SessionFormat, cutoffs: &BandTable<f64>, high_to_nyquist: bool) -> Self {
        let bins = format.bin_count();
        let to_bin = |hz: f64| format.hz_to_bin(hz).min(bins);

        let low_end = to_bin(cutoffs.low);
        let mid_end = to_bin(cutoffs.mid).max(low_end);
        let high_end = if high_to_nyquist {
            bins
        } else {
            to_bin(cutoffs.high).max(mid_end)
        };

        Self {
            format,
            ranges: [0..low_end, low_end..mid_end, mid_end..high_end],
        }
    }

    /// Bin range of `band`.
    #[inline]
    #[must_use]
    pub fn range(&self, band: Band) -> Range<usize> {
        self.ranges[band.index()].clone()
    }

    /// Bins per frame for this session.
    #[inline]
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.format.bin_count()
    }

    /// Session format the layout was derived from.
    #[must_use]
    pub fn format(&self) -> SessionFormat {
        self.format
    }

    /// Mean magnitude of each band.
    ///
    /// The mean (not the sum) keeps bands of different widths on the same scale.
    /// An empty band reports 0.
    #[must_use]
    pub fn energies(&self, frame: &[f32]) -> EnergyVector {
        let mut out = EnergyVector::ZERO;
        for band in Band::ALL {
            out.0[band.index()] = band_mean(frame, self.range(band));
        }
        out
    }

    /// Magnitude at the bin nearest to `hz`, as a percentage of `full_scale`.
    ///
    /// The bin number `round(hz * fft_size / sample_rate)` is clamped to
    /// `[1, bin_count]` and sample `bin - 1` is read.
    ///
    /// # Example
    /// ```
    /// use ss_audio::bands::BandLayout;
    /// use ss_core::frame::{BandTable, SessionFormat};
    ///
    /// let format = SessionFormat::new(8000, 16).unwrap();
    /// let layout = BandLayout::new(format, &BandTable { low: 250.0, mid: 2000.0, high: 6000.0 }, true);
    /// let frame = [0.0, 51.0, 102.0, 153.0, 204.0, 255.0, 0.0, 0.0];
    /// // 1000 Hz -> bin 2 -> sample 1
    /// assert!((layout.bin_energy(&frame, 1000.0, 255.0) - 20.0).abs() < 1e-9);
    /// ```
    #[must_use]
    pub fn bin_energy(&self, frame: &[f32], hz: f64, full_scale: f64) -> f64 {
        let bins = frame.len().max(1);
        let bin = self.format.hz_to_bin(hz).clamp(1, bins);
        let raw = frame.get(bin - 1).copied().unwrap_or(0.0);
        f64::from(raw) / full_scale * 100.0
    }
}

/// Arithmetic mean of `frame[range]`, clipped to the frame length.
#[inline]
fn band_mean(frame: &[f32], range: Range<usize>) -> f64 {
    let hi = range.end.min(frame.len());
    let lo = range.start.min(hi);
    if lo >= hi {
        return 0.0;
    }
    let sum: f64 = frame[lo..hi].iter().map(|&m| f64::from(m)).sum();
    sum / (hi - lo) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_cutoffs() -> BandTable<f64> {
        BandTable {
            low: 250.0,
            mid: 2000.0,
            high: 6000.0,
        }
    }

    fn format(sample_rate: u32, fft_size: usize) -> SessionFormat {
        SessionFormat::new(sample_rate, fft_size).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn bands_partition_the_frame() {
        for &(rate, fft) in &[
            (48_000, 2048),
            (44_100, 2048),
            (44_100, 512),
            (22_050, 4096),
            (8000, 16),
            (4000, 8),
            (192_000, 256),
        ] {
            let layout = BandLayout::new(format(rate, fft), &default_cutoffs(), true);
            let low = layout.range(Band::Low);
            let mid = layout.range(Band::Mid);
            let high = layout.range(Band::High);
            assert_eq!(low.start, 0, "{rate}/{fft}");
            assert_eq!(low.end, mid.start, "{rate}/{fft}");
            assert_eq!(mid.end, high.start, "{rate}/{fft}");
            assert_eq!(high.end, fft / 2, "{rate}/{fft}");
            assert!(low.start <= low.end && mid.start <= mid.end && high.start <= high.end);
        }
    }

    #[test]
    fn high_band_can_stop_at_cutoff() {
        let layout = BandLayout::new(format(48_000, 2048), &default_cutoffs(), false);
        assert_eq!(layout.range(Band::High), 85..256);
    }

    #[test]
    fn cutoffs_above_nyquist_are_clamped() {
        // 4 bins of 500 Hz: 2000 and 6000 Hz are past the last bin
        let layout = BandLayout::new(format(4000, 8), &default_cutoffs(), false);
        assert_eq!(layout.range(Band::Low), 0..1);
        assert_eq!(layout.range(Band::Mid), 1..4);
        assert_eq!(layout.range(Band::High), 4..4);
    }

    #[test]
    fn energies_are_means_per_band() {
        let layout = BandLayout::new(format(8000, 16), &default_cutoffs(), true);
        // low = [0,1), mid = [1,4), high = [4,8)
        let frame = [90.0, 10.0, 20.0, 30.0, 1.0, 2.0, 3.0, 6.0];
        let e = layout.energies(&frame);
        assert!((e.get(Band::Low) - 90.0).abs() < 1e-12);
        assert!((e.get(Band::Mid) - 20.0).abs() < 1e-12);
        assert!((e.get(Band::High) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_band_reports_zero() {
        let layout = BandLayout::new(format(4000, 8), &default_cutoffs(), false);
        let e = layout.energies(&[255.0; 4]);
        assert!(e.get(Band::High).abs() < f64::EPSILON);
    }

    #[test]
    fn bin_energy_clamps_to_frame() {
        let layout = BandLayout::new(format(48_000, 2048), &default_cutoffs(), true);
        let mut frame = vec![0.0f32; 1024];
        frame[0] = 255.0;
        frame[42] = 127.5;
        frame[1023] = 51.0;

        assert!((layout.bin_energy(&frame, 0.0, 255.0) - 100.0).abs() < 1e-9);
        assert!((layout.bin_energy(&frame, 1000.0, 255.0) - 50.0).abs() < 1e-9);
        assert!((layout.bin_energy(&frame, 96_000.0, 255.0) - 20.0).abs() < 1e-9);
        assert!((layout.bin_energy(&frame, f64::NAN, 255.0) - 100.0).abs() < 1e-9);
    }
}
