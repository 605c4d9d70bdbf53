use ss_core::clock::TickGate;
use ss_core::config::SensingConfig;
use ss_core::frame::{
    AudioBlock, AudioSourcePolicy, Band, EnergyVector, InputSource, SessionFormat,
};
use ss_core::traits::AudioHost;

use crate::bands::BandLayout;
use crate::calibration::{Calibration, SessionPhase};
use crate::flux::FluxComputer;
use crate::merge::SourceMerger;
use crate::peak::{PeakDetector, z_score};
use crate::replay::ReplayCapture;

/// Buffers and statistics allocated on the first successful pass.
struct Session {
    layout: BandLayout,
    project: FluxComputer,
    microphone: FluxComputer,
    merger: SourceMerger,
    calibration: Calibration,
    replay: ReplayCapture,
    /// Policy the latest pass ran under. Gating reads this one, not the
    /// engine's, so a switch only applies from the next pass.
    policy: AudioSourcePolicy,
    /// `None` while the selected source is unavailable.
    energy: Option<EnergyVector>,
    flux: Option<f64>,
}

impl Session {
    fn start(format: SessionFormat, config: &SensingConfig) -> Self {
        let bins = format.bin_count();
        Self {
            layout: BandLayout::new(format, &config.band_cutoffs_hz, config.high_band_to_nyquist),
            project: FluxComputer::new(bins),
            microphone: FluxComputer::new(bins),
            merger: SourceMerger::new(bins),
            calibration: Calibration::new(config),
            replay: ReplayCapture::default(),
            policy: config.policy,
            energy: None,
            flux: None,
        }
    }

    fn pass<H: AudioHost>(&mut self, host: &mut H, policy: AudioSourcePolicy) {
        self.policy = policy;

        // An active microphone is tracked on every pass so its flux is always
        // measured against the previous tick; the policy only decides whether
        // it feeds the merge.
        let mic_refresh = if host.microphone_active() {
            self.microphone
                .refresh(|out| host.fill_magnitudes(InputSource::Microphone, out))
        } else {
            None
        };
        let mic_flux = mic_refresh.filter(|_| policy.includes_microphone());
        let project_flux = self
            .project
            .refresh(|out| host.fill_magnitudes(InputSource::Project, out));

        let project_frame = project_flux.map(|_| self.project.current());
        let mic_frame = mic_flux.map(|_| self.microphone.current());

        self.flux = SourceMerger::merge_scalar(policy, project_flux, mic_flux);
        self.energy = self
            .merger
            .merge(policy, project_frame, mic_frame)
            .map(|frame| self.layout.energies(frame));

        if let Some(energy) = &self.energy {
            self.calibration.observe_energy(energy);
        }
        if let Some(flux) = self.flux {
            self.calibration.observe_flux(flux);
        }
        if let Some(block) = host.raw_audio_block() {
            self.replay.record(block);
        }

        log::trace!(
            "analysis pass ({policy}): energy={:?} flux={:?}",
            self.energy,
            self.flux
        );
    }

    fn clear(&mut self) {
        self.calibration.clear_energy();
        self.energy = Some(EnergyVector::ZERO);
    }
}

/// Self-calibrating sound sensing engine.
///
/// Owns the host collaborator and all per-session state. Every accessor first
/// runs the conservative tick gate: a new analysis pass happens only if more
/// than one host tick has elapsed since the last one, otherwise the values
/// of the last pass are returned unchanged.
///
/// Accessors report `None` (unavailable) until the host has delivered a
/// session format and its tick interval, and while the selected source has
/// nothing to deliver.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ss_audio::engine::SensingEngine;
/// use ss_core::config::SensingConfig;
/// use ss_core::frame::{AudioBlock, Band, InputSource, SessionFormat};
/// use ss_core::traits::AudioHost;
///
/// struct Hum;
/// impl AudioHost for Hum {
///     fn session_format(&self) -> Option<SessionFormat> { SessionFormat::new(8000, 16).ok() }
///     fn fill_magnitudes(&mut self, _: InputSource, out: &mut [f32]) -> bool {
///         out.fill(40.0);
///         true
///     }
///     fn microphone_active(&self) -> bool { false }
///     fn raw_audio_block(&self) -> Option<&AudioBlock> { None }
///     fn tick_interval(&self) -> Option<Duration> { Some(Duration::from_millis(33)) }
///     fn now(&self) -> Duration { Duration::ZERO }
/// }
///
/// let mut engine = SensingEngine::new(Hum, SensingConfig::default());
/// assert_eq!(engine.current_energy(Band::Low), Some(40.0));
/// assert_eq!(engine.current_flux(), Some(320.0));
/// ```
pub struct SensingEngine<H: AudioHost> {
    host: H,
    config: SensingConfig,
    detector: PeakDetector,
    policy: AudioSourcePolicy,
    gate: TickGate,
    session: Option<Session>,
}

impl<H: AudioHost> SensingEngine<H> {
    /// Create an engine in the `Uninitialized` state.
    ///
    /// The configuration is clamped to its valid ranges first.
    #[must_use]
    pub fn new(host: H, mut config: SensingConfig) -> Self {
        config.clamp_all();
        Self {
            host,
            detector: PeakDetector::from_config(&config),
            policy: config.policy,
            config,
            gate: TickGate::new(),
            session: None,
        }
    }

    /// Host collaborator.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Host collaborator, mutable (to feed it between ticks).
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SensingConfig {
        &self.config
    }

    /// Policy the next pass will run under.
    #[must_use]
    pub fn audio_source_policy(&self) -> AudioSourcePolicy {
        self.policy
    }

    /// Select the input(s) to listen to. Takes effect on the next pass.
    pub fn set_audio_source_policy(&mut self, policy: AudioSourcePolicy) {
        if policy != self.policy {
            log::info!("Audio source: {} -> {policy}", self.policy);
        }
        self.policy = policy;
    }

    /// Swap in a reloaded configuration.
    ///
    /// Thresholds and gates apply immediately; a changed `policy` applies from
    /// the next pass. History depths and band cutoffs shape buffers allocated
    /// at session start and only apply to the next session.
    pub fn apply_config(&mut self, mut config: SensingConfig) {
        config.clamp_all();
        self.detector = PeakDetector::from_config(&config);
        if config.policy != self.config.policy {
            self.set_audio_source_policy(config.policy);
        }
        self.config = config;
    }

    /// Conservative analysis: run a pass if the host tick has elapsed.
    ///
    /// Returns `false` when the host cannot report its tick interval, in which
    /// case accessors answer unavailable.
    pub fn poll(&mut self) -> bool {
        let Some(interval) = self.host.tick_interval() else {
            return false;
        };
        if self.gate.admit(self.host.now(), interval) {
            self.analyze();
        }
        true
    }

    /// Run one analysis pass now, bypassing the tick gate.
    ///
    /// Starts the session on the first call for which the host reports a
    /// session format.
    pub fn analyze(&mut self) {
        let policy = self.policy;
        if policy.includes_microphone() {
            self.host.connect_microphone();
        }

        if self.session.is_none() {
            let Some(format) = self.host.session_format() else {
                log::debug!("No session format from host yet, analysis skipped");
                return;
            };
            let session = Session::start(format, &self.config);
            log::info!(
                "Sensing session started @ {}Hz, FFT {} ({} bins): low {:?}, mid {:?}, high {:?}",
                format.sample_rate(),
                format.fft_size(),
                format.bin_count(),
                session.layout.range(Band::Low),
                session.layout.range(Band::Mid),
                session.layout.range(Band::High),
            );
            self.session = Some(session);
        }

        if let Some(session) = self.session.as_mut() {
            session.pass(&mut self.host, policy);
        }
    }

    /// Readings of the latest pass, after polling.
    fn readings(&mut self) -> Option<&mut Session> {
        if !self.poll() {
            return None;
        }
        self.session.as_mut()
    }

    /// Mean magnitude of `band` in the effective frame.
    pub fn current_energy(&mut self, band: Band) -> Option<f64> {
        self.readings()?.energy.map(|e| e.get(band))
    }

    /// Calibrated mean energy of `band` (the level a peak is measured against).
    pub fn current_energy_threshold(&mut self, band: Band) -> Option<f64> {
        let session = self.readings()?;
        Some(session.calibration.energy_mean(band))
    }

    /// Calibrated energy variance of `band`.
    pub fn current_energy_variance(&mut self, band: Band) -> Option<f64> {
        let session = self.readings()?;
        Some(session.calibration.energy_variance(band))
    }

    /// Spectral flux of the active source(s).
    pub fn current_flux(&mut self) -> Option<f64> {
        self.readings()?.flux
    }

    /// Calibrated mean flux.
    pub fn current_flux_threshold(&mut self) -> Option<f64> {
        let session = self.readings()?;
        Some(session.calibration.flux_mean())
    }

    /// Z-score of the current energy of `band`; `None` if unavailable or degenerate.
    pub fn normalized_energy(&mut self, band: Band) -> Option<f64> {
        let session = self.readings()?;
        let energy = session.energy?.get(band);
        z_score(
            energy,
            session.calibration.energy_mean(band),
            session.calibration.energy_variance(band),
        )
    }

    /// `true` if `band` is at a calibrated peak.
    ///
    /// A low-band z-score above threshold also snapshots the live audio block
    /// into the replay slot, whether or not the microphone gate lets the
    /// peak through.
    pub fn is_band_peak(&mut self, band: Band) -> bool {
        if !self.poll() {
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let Some(energy) = session.energy.map(|e| e.get(band)) else {
            return false;
        };
        let mean = session.calibration.energy_mean(band);
        let variance = session.calibration.energy_variance(band);

        if self.detector.triggers_replay(band, energy, mean, variance) && session.replay.snapshot() {
            log::debug!("Low-band peak ({energy:.1} vs {mean:.1}): replay buffer captured");
        }
        self.detector
            .is_band_peak(band, energy, mean, variance, session.policy)
    }

    /// `true` if spectral flux is at a calibrated peak.
    pub fn is_flux_peak(&mut self) -> bool {
        if !self.poll() {
            return false;
        }
        let Some(session) = self.session.as_ref() else {
            return false;
        };
        let Some(flux) = session.flux else {
            return false;
        };
        self.detector.is_flux_peak(
            flux,
            session.calibration.flux_mean(),
            session.calibration.flux_variance(),
            session.policy,
        )
    }

    /// Magnitude at the bin nearest `hz`, as a percentage of full scale.
    pub fn bin_energy(&mut self, hz: f64) -> Option<f64> {
        let full_scale = self.config.full_scale;
        let session = self.readings()?;
        let frame = session.merger.effective()?;
        Some(session.layout.bin_energy(frame, hz, full_scale))
    }

    /// Sum of all bins of the effective frame.
    pub fn loudness(&mut self) -> Option<f64> {
        let session = self.readings()?;
        let frame = session.merger.effective()?;
        Some(frame.iter().map(|&m| f64::from(m)).sum())
    }

    /// Audio captured at the latest low-band peak.
    #[must_use]
    pub fn replay_snapshot(&self) -> Option<&AudioBlock> {
        self.session.as_ref()?.replay.replay()
    }

    /// Stop-all: forget the energy calibration and zero the current energies.
    ///
    /// Flux statistics and the started session are kept.
    pub fn reset(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.clear();
            log::debug!("Energy calibration cleared");
        }
    }

    /// Session state, for diagnostics. Does not poll.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.session
            .as_ref()
            .map_or(SessionPhase::Uninitialized, |s| s.calibration.phase())
    }

    /// Session format, once started.
    #[must_use]
    pub fn session_format(&self) -> Option<SessionFormat> {
        self.session.as_ref().map(|s| s.layout.format())
    }

    /// Analysis passes admitted by the tick gate so far.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.gate.passes()
    }
}
