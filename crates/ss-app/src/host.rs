use std::time::Duration;

use ss_core::clock::MonotonicClock;
use ss_core::frame::{AudioBlock, InputSource, MagnitudeFrame, SessionFormat};
use ss_core::traits::AudioHost;

use crate::script::{ScriptHeader, Tick};

/// Time source of the scripted host.
#[derive(Clone, Copy, Debug)]
enum HostClock {
    /// Advanced by one frame per script line.
    Simulated { now: Duration, frame: Duration },
    /// Wall clock, for paced playback.
    Realtime(MonotonicClock),
}

/// [`AudioHost`] driven by a JSON-lines script.
///
/// Each [`load`](Self::load) publishes the frames of one tick. The microphone
/// only counts as active once the engine has asked to connect it and the
/// current tick carries a microphone frame.
#[derive(Debug)]
pub struct ScriptedHost {
    format: SessionFormat,
    tick: Duration,
    clock: HostClock,
    project: Option<MagnitudeFrame>,
    microphone: Option<MagnitudeFrame>,
    block: Option<AudioBlock>,
    microphone_connected: bool,
}

impl ScriptedHost {
    /// Host with a simulated clock starting at zero.
    #[must_use]
    pub fn simulated(format: SessionFormat, header: &ScriptHeader) -> Self {
        let clock = HostClock::Simulated {
            now: Duration::ZERO,
            frame: Duration::from_millis(header.frame_ms()),
        };
        Self::with_clock(format, header, clock)
    }

    /// Host reading the wall clock. The caller paces [`load`](Self::load).
    #[must_use]
    pub fn realtime(format: SessionFormat, header: &ScriptHeader) -> Self {
        Self::with_clock(format, header, HostClock::Realtime(MonotonicClock::start()))
    }

    fn with_clock(format: SessionFormat, header: &ScriptHeader, clock: HostClock) -> Self {
        Self {
            format,
            tick: Duration::from_millis(header.tick_ms),
            clock,
            project: None,
            microphone: None,
            block: None,
            microphone_connected: false,
        }
    }

    /// Publish the frames of `tick` and advance the simulated clock.
    pub fn load(&mut self, tick: &Tick) {
        if let HostClock::Simulated { now, frame } = &mut self.clock {
            *now += *frame;
        }
        self.project.clone_from(&tick.project);
        self.microphone.clone_from(&tick.microphone);
        self.block = tick
            .audio
            .as_ref()
            .map(|channels| AudioBlock::new(channels.clone(), self.format.sample_rate()));
    }

    /// `true` once the engine has requested the microphone.
    #[must_use]
    pub fn microphone_connected(&self) -> bool {
        self.microphone_connected
    }
}

impl AudioHost for ScriptedHost {
    fn session_format(&self) -> Option<SessionFormat> {
        Some(self.format)
    }

    fn fill_magnitudes(&mut self, source: InputSource, out: &mut [f32]) -> bool {
        let frame = match source {
            InputSource::Project => self.project.as_ref(),
            InputSource::Microphone => self.microphone.as_ref(),
        };
        let Some(frame) = frame else {
            return false;
        };
        if frame.len() != out.len() {
            log::warn!(
                "Trame {source:?} de {} bins, {} attendus : complétée/tronquée",
                frame.len(),
                out.len()
            );
        }
        frame.copy_into(out);
        true
    }

    fn microphone_active(&self) -> bool {
        self.microphone_connected && self.microphone.is_some()
    }

    fn connect_microphone(&mut self) {
        if !self.microphone_connected {
            log::info!("Microphone connecté");
            self.microphone_connected = true;
        }
    }

    fn raw_audio_block(&self) -> Option<&AudioBlock> {
        self.block.as_ref()
    }

    fn tick_interval(&self) -> Option<Duration> {
        Some(self.tick)
    }

    fn now(&self) -> Duration {
        match self.clock {
            HostClock::Simulated { now, .. } => now,
            HostClock::Realtime(clock) => clock.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> ScriptHeader {
        ScriptHeader {
            sample_rate: 8000,
            fft_size: 16,
            tick_ms: 33,
            frame_ms: None,
        }
    }

    fn host() -> ScriptedHost {
        let h = header();
        let format = SessionFormat::new(h.sample_rate, h.fft_size).unwrap_or_else(|e| panic!("{e}"));
        ScriptedHost::simulated(format, &h)
    }

    #[test]
    fn simulated_clock_advances_one_frame_per_tick() {
        let mut host = host();
        assert_eq!(host.now(), Duration::ZERO);
        host.load(&Tick::default());
        host.load(&Tick::default());
        assert_eq!(host.now(), Duration::from_millis(68));
        assert!(host.now() > host.tick_interval().unwrap_or_default() * 2);
    }

    #[test]
    fn microphone_needs_connection_and_frame() {
        let mut host = host();
        host.load(&Tick {
            microphone: Some(MagnitudeFrame::filled(8, 1.0)),
            ..Tick::default()
        });
        assert!(!host.microphone_active());
        host.connect_microphone();
        assert!(host.microphone_active());
        host.load(&Tick::default());
        assert!(!host.microphone_active());
        assert!(host.microphone_connected());
    }

    #[test]
    fn fills_and_pads_frames() {
        let mut host = host();
        host.load(&Tick {
            project: Some(MagnitudeFrame::new(vec![1.0, 2.0, 3.0])),
            ..Tick::default()
        });
        let mut out = [9.0f32; 8];
        assert!(host.fill_magnitudes(InputSource::Project, &mut out));
        assert_eq!(out, [1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(!host.fill_magnitudes(InputSource::Microphone, &mut out));
    }

    #[test]
    fn audio_block_uses_session_rate() {
        let mut host = host();
        host.load(&Tick {
            audio: Some(vec![vec![0.5; 4], vec![-0.5; 4]]),
            ..Tick::default()
        });
        let block = host.raw_audio_block().map(|b| (b.channels.len(), b.frames(), b.sample_rate));
        assert_eq!(block, Some((2, 4, 8000)));
    }
}
