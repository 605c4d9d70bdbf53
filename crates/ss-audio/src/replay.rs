use ss_core::frame::AudioBlock;

/// Live raw-audio slot and the replay snapshot taken from it.
///
/// The live block is overwritten on every pass (reusing its allocation).
/// [`snapshot`](Self::snapshot) deep-copies it into the replay slot, so the
/// replay is unaffected by later passes.
///
/// # Example
/// ```
/// use ss_audio::replay::ReplayCapture;
/// use ss_core::frame::AudioBlock;
///
/// let mut capture = ReplayCapture::default();
/// capture.record(&AudioBlock::new(vec![vec![0.5; 4]], 48_000));
/// assert!(capture.snapshot());
/// capture.record(&AudioBlock::new(vec![vec![-0.5; 4]], 48_000));
/// assert_eq!(capture.replay().map(|b| b.channels[0][0]), Some(0.5));
/// ```
#[derive(Clone, Debug, Default)]
pub struct ReplayCapture {
    live: Option<AudioBlock>,
    replay: Option<AudioBlock>,
}

impl ReplayCapture {
    /// Overwrite the live block with the host's latest one.
    pub fn record(&mut self, block: &AudioBlock) {
        match self.live.as_mut() {
            Some(live) => live.clone_from(block),
            None => self.live = Some(block.clone()),
        }
    }

    /// Copy the live block into the replay slot.
    ///
    /// Returns `false` (and keeps the previous replay) if nothing was recorded yet.
    pub fn snapshot(&mut self) -> bool {
        let Some(live) = self.live.as_ref() else {
            return false;
        };
        match self.replay.as_mut() {
            Some(replay) => replay.clone_from(live),
            None => self.replay = Some(live.clone()),
        }
        true
    }

    /// Latest live block.
    #[must_use]
    pub fn live(&self) -> Option<&AudioBlock> {
        self.live.as_ref()
    }

    /// Replay snapshot, if a low-band peak has fired since the session started.
    #[must_use]
    pub fn replay(&self) -> Option<&AudioBlock> {
        self.replay.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_without_live_block_is_a_no_op() {
        let mut capture = ReplayCapture::default();
        assert!(!capture.snapshot());
        assert!(capture.replay().is_none());
    }

    #[test]
    fn later_snapshot_replaces_earlier_one() {
        let mut capture = ReplayCapture::default();
        capture.record(&AudioBlock::new(vec![vec![0.1; 8], vec![0.2; 8]], 44_100));
        capture.snapshot();
        capture.record(&AudioBlock::new(vec![vec![0.9; 2]], 48_000));
        capture.snapshot();

        let replay = capture.replay().unwrap_or_else(|| panic!("no replay"));
        assert_eq!(replay.channels.len(), 1);
        assert_eq!(replay.frames(), 2);
        assert_eq!(replay.sample_rate, 48_000);
    }
}
