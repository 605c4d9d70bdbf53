use ss_core::frame::AudioSourcePolicy;

/// Combines project and microphone input according to the source policy.
///
/// Owns the effective frame of the latest pass so accessors can read it
/// between passes.
///
/// | policy       | microphone active        | microphone inactive |
/// |--------------|--------------------------|---------------------|
/// | `project`    | project                  | project             |
/// | `microphone` | microphone               | unavailable         |
/// | `all`        | per-bin max of both      | project             |
///
/// # Example
/// ```
/// use ss_audio::merge::SourceMerger;
/// use ss_core::frame::AudioSourcePolicy;
///
/// let mut merger = SourceMerger::new(3);
/// let project = [10.0f32, 0.0, 5.0];
/// let mic = [2.0f32, 8.0, 5.0];
/// let out = merger.merge(AudioSourcePolicy::All, Some(&project[..]), Some(&mic[..]));
/// assert_eq!(out, Some(&[10.0, 8.0, 5.0][..]));
/// ```
#[derive(Clone, Debug)]
pub struct SourceMerger {
    effective: Vec<f32>,
    available: bool,
}

impl SourceMerger {
    /// Create a merger for frames of `bins` samples. Nothing is available yet.
    #[must_use]
    pub fn new(bins: usize) -> Self {
        Self {
            effective: vec![0.0; bins],
            available: false,
        }
    }

    /// Build the effective frame for `policy` and return it.
    ///
    /// `None` inputs are sources with nothing to deliver this tick. Returns
    /// `None` when the policy leaves no usable source.
    pub fn merge(
        &mut self,
        policy: AudioSourcePolicy,
        project: Option<&[f32]>,
        microphone: Option<&[f32]>,
    ) -> Option<&[f32]> {
        let source = match policy {
            AudioSourcePolicy::Project => project,
            AudioSourcePolicy::Microphone => microphone,
            AudioSourcePolicy::All => match (project, microphone) {
                (Some(p), Some(m)) => {
                    merge_max(p, m, &mut self.effective);
                    self.available = true;
                    return Some(self.effective.as_slice());
                }
                (p, m) => p.or(m),
            },
        };

        match source {
            Some(frame) => {
                let n = frame.len().min(self.effective.len());
                self.effective[..n].copy_from_slice(&frame[..n]);
                self.effective[n..].fill(0.0);
                self.available = true;
            }
            None => self.available = false,
        }
        self.effective()
    }

    /// Effective frame of the latest merge, `None` if it was unavailable.
    #[inline]
    #[must_use]
    pub fn effective(&self) -> Option<&[f32]> {
        self.available.then_some(self.effective.as_slice())
    }

    /// Scalar counterpart of [`merge`](Self::merge) for per-source values
    /// (spectral flux): `all` takes the larger of the two.
    #[must_use]
    pub fn merge_scalar(
        policy: AudioSourcePolicy,
        project: Option<f64>,
        microphone: Option<f64>,
    ) -> Option<f64> {
        match policy {
            AudioSourcePolicy::Project => project,
            AudioSourcePolicy::Microphone => microphone,
            AudioSourcePolicy::All => match (project, microphone) {
                (Some(p), Some(m)) => Some(p.max(m)),
                (p, m) => p.or(m),
            },
        }
    }
}

/// `out[i] = max(a[i], b[i])` over the common length; the rest of `out` is zeroed.
#[inline]
fn merge_max(a: &[f32], b: &[f32], out: &mut [f32]) {
    let n = a.len().min(b.len()).min(out.len());
    for ((slot, &x), &y) in out[..n].iter_mut().zip(a).zip(b) {
        *slot = x.max(y);
    }
    out[n..].fill(0.0);
}
