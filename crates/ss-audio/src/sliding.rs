/// How each incoming sample is weighted before entering the rolling sum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Weighting {
    /// `current / length`: the rolling sum is the window mean.
    Mean,
    /// `(reference - current)² / (length - 1)`: the rolling sum is the sample
    /// variance around an externally supplied mean estimate.
    Variance,
}

impl Weighting {
    #[inline(always)]
    fn weight(self, current: f64, reference: f64, length: usize) -> f64 {
        match self {
            Weighting::Mean => current / length as f64,
            Weighting::Variance => {
                let d = reference - current;
                d * d / (length - 1) as f64
            }
        }
    }
}

/// Fixed-length sliding mean or variance over `W` parallel channels.
///
/// Keeps the last `length` weighted samples in a circular buffer and a
/// running `result` equal to their sum per channel. Each [`step`](Self::step)
/// replaces the oldest entry and adjusts `result` by the difference, so the
/// cost is O(W) regardless of `length`.
///
/// Before `length` steps, unwritten slots count as zero and the estimate is
/// under-weighted. This warm-up bias is not corrected.
///
/// # Example
/// ```
/// use ss_audio::sliding::SlidingStatistic;
///
/// let mut mean = SlidingStatistic::<3>::mean(7);
/// for _ in 0..7 {
///     mean.step(&[10.0, 0.0, 0.0], None);
/// }
/// let result = mean.step(&[100.0, 0.0, 0.0], None);
/// assert!((result[0] - 160.0 / 7.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug)]
pub struct SlidingStatistic<const W: usize> {
    length: usize,
    weighting: Weighting,
    /// Weighted samples, one row per slot.
    values: Vec<[f64; W]>,
    /// Running sum of `values` per channel.
    result: [f64; W],
    /// Slot overwritten by the next step.
    cursor: usize,
    /// Steps since creation or last clear, saturating at `length`.
    filled: usize,
}

impl<const W: usize> SlidingStatistic<W> {
    /// Create an empty statistic over `length` steps.
    ///
    /// # Panics
    /// Panics if `length < 2` (the variance weight divides by `length - 1`).
    #[must_use]
    pub fn new(length: usize, weighting: Weighting) -> Self {
        assert!(length >= 2, "sliding window length must be >= 2");
        Self {
            length,
            weighting,
            values: vec![[0.0; W]; length],
            result: [0.0; W],
            cursor: 0,
            filled: 0,
        }
    }

    /// Sliding mean over `length` steps.
    #[must_use]
    pub fn mean(length: usize) -> Self {
        Self::new(length, Weighting::Mean)
    }

    /// Sliding variance over `length` steps.
    #[must_use]
    pub fn variance(length: usize) -> Self {
        Self::new(length, Weighting::Variance)
    }

    /// Push one sample vector and return the updated estimate.
    ///
    /// `reference` is the mean estimate used by [`Weighting::Variance`]; it is
    /// ignored for [`Weighting::Mean`] and read as all-zero when absent.
    pub fn step(&mut self, current: &[f64; W], reference: Option<&[f64; W]>) -> &[f64; W] {
        let weighting = self.weighting;
        let length = self.length;
        let slot = &mut self.values[self.cursor];

        for (i, (sum, old)) in self.result.iter_mut().zip(slot.iter_mut()).enumerate() {
            let r = reference.map_or(0.0, |r| r[i]);
            let w = weighting.weight(current[i], r, length);
            *sum += w - *old;
            *old = w;
        }

        self.cursor = (self.cursor + 1) % length;
        self.filled = (self.filled + 1).min(length);
        &self.result
    }

    /// Current estimate per channel.
    #[inline(always)]
    #[must_use]
    pub fn result(&self) -> &[f64; W] {
        &self.result
    }

    /// Forget all history. The cursor is left where it is; every slot is zero.
    pub fn clear(&mut self) {
        for row in &mut self.values {
            *row = [0.0; W];
        }
        self.result = [0.0; W];
        self.filled = 0;
    }

    /// `true` once `length` steps have been taken since creation or last clear.
    #[must_use]
    pub fn is_warm(&self) -> bool {
        self.filled == self.length
    }

    /// History depth.
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Weighting mode.
    #[must_use]
    pub fn weighting(&self) -> Weighting {
        self.weighting
    }
}
