use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Number of tracked frequency bands.
pub const BAND_COUNT: usize = 3;

/// Bande de fréquence suivie par le détecteur.
///
/// # Example
/// ```
/// use ss_core::frame::Band;
/// assert_eq!("bass".parse::<Band>(), Ok(Band::Low));
/// assert_eq!(Band::High.index(), 2);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    /// Up to the low cutoff (250 Hz by default).
    Low,
    /// Low cutoff to mid cutoff (2000 Hz by default).
    Mid,
    /// Mid cutoff upward.
    High,
}

impl Band {
    /// All bands, in bin order.
    pub const ALL: [Band; BAND_COUNT] = [Band::Low, Band::Mid, Band::High];

    /// Channel index of this band in an [`EnergyVector`].
    #[inline(always)]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Band::Low => 0,
            Band::Mid => 1,
            Band::High => 2,
        }
    }

    /// Nom canonique (valeur de menu côté hôte).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Band::Low => "low",
            Band::Mid => "mid",
            Band::High => "high",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Band {
    type Err = CoreError;

    /// Accepts the canonical names and the host menu labels (bass/middle/treble).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "bass" => Ok(Band::Low),
            "mid" | "middle" => Ok(Band::Mid),
            "high" | "treble" => Ok(Band::High),
            _ => Err(CoreError::UnknownBand(s.to_string())),
        }
    }
}

/// One value per band.
///
/// # Example
/// ```
/// use ss_core::frame::{Band, BandTable};
/// let gates = BandTable { low: 100.0, mid: 50.0, high: 5.0 };
/// assert_eq!(gates.get(Band::Mid), 50.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct BandTable<T> {
    /// Value for [`Band::Low`].
    pub low: T,
    /// Value for [`Band::Mid`].
    pub mid: T,
    /// Value for [`Band::High`].
    pub high: T,
}

impl<T: Copy> BandTable<T> {
    /// Value for `band`.
    #[inline]
    #[must_use]
    pub fn get(&self, band: Band) -> T {
        match band {
            Band::Low => self.low,
            Band::Mid => self.mid,
            Band::High => self.high,
        }
    }

    /// Values in bin order (low, mid, high).
    #[must_use]
    pub fn to_array(&self) -> [T; BAND_COUNT] {
        [self.low, self.mid, self.high]
    }
}

/// Énergie moyenne de chaque bande pour la passe courante.
///
/// Échelle brute de l'analyseur (0–255 pour des magnitudes octets).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EnergyVector(pub [f64; BAND_COUNT]);

impl EnergyVector {
    /// All bands at zero.
    pub const ZERO: EnergyVector = EnergyVector([0.0; BAND_COUNT]);

    /// Energy of `band`.
    #[inline(always)]
    #[must_use]
    pub fn get(&self, band: Band) -> f64 {
        self.0[band.index()]
    }

    /// Raw channel array, as fed to the sliding statistics.
    #[inline(always)]
    #[must_use]
    pub fn as_array(&self) -> &[f64; BAND_COUNT] {
        &self.0
    }
}

impl Index<Band> for EnergyVector {
    type Output = f64;

    fn index(&self, band: Band) -> &f64 {
        &self.0[band.index()]
    }
}

/// Which input(s) the engine listens to.
///
/// Process-wide, switched by the host at any time; read once per analysis pass.
///
/// # Example
/// ```
/// use ss_core::frame::AudioSourcePolicy;
/// let policy: AudioSourcePolicy = "all".parse().unwrap();
/// assert!(policy.includes_microphone());
/// assert!(!AudioSourcePolicy::default().includes_microphone());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSourcePolicy {
    /// Microphone input only.
    Microphone,
    /// Project (host) audio only. The microphone is never engaged.
    #[default]
    Project,
    /// Per-bin maximum of project and microphone.
    All,
}

impl AudioSourcePolicy {
    /// `true` when the microphone takes part in the analysis, which also
    /// switches on the minimum-energy gates of the peak detector.
    #[inline]
    #[must_use]
    pub const fn includes_microphone(self) -> bool {
        !matches!(self, AudioSourcePolicy::Project)
    }

    /// Nom canonique (valeur de menu côté hôte).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            AudioSourcePolicy::Microphone => "microphone",
            AudioSourcePolicy::Project => "project",
            AudioSourcePolicy::All => "all",
        }
    }
}

impl fmt::Display for AudioSourcePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AudioSourcePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "microphone" | "mic" => Ok(AudioSourcePolicy::Microphone),
            "project" => Ok(AudioSourcePolicy::Project),
            "all" => Ok(AudioSourcePolicy::All),
            _ => Err(CoreError::UnknownPolicy(s.to_string())),
        }
    }
}

/// A physical input the host can deliver magnitude frames for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputSource {
    /// Audio produced by the host project itself.
    Project,
    /// Live microphone input.
    Microphone,
}

/// Spectre de magnitudes, un échantillon non négatif par bin.
///
/// Longueur fixe (`fft_size / 2`) pour toute la durée d'une session.
///
/// # Example
/// ```
/// use ss_core::frame::MagnitudeFrame;
/// let frame = MagnitudeFrame::from_bytes(&[0, 128, 255]);
/// assert_eq!(frame.len(), 3);
/// assert_eq!(frame.bins()[2], 255.0);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct MagnitudeFrame {
    bins: Vec<f32>,
}

impl MagnitudeFrame {
    /// Wrap owned bins.
    #[must_use]
    pub fn new(bins: Vec<f32>) -> Self {
        Self { bins }
    }

    /// All-zero frame of `len` bins.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self {
            bins: vec![0.0; len],
        }
    }

    /// Frame filled with `value` in every bin.
    #[must_use]
    pub fn filled(len: usize, value: f32) -> Self {
        Self {
            bins: vec![value; len],
        }
    }

    /// Convert byte analyser output (0–255).
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bins: bytes.iter().map(|&b| f32::from(b)).collect(),
        }
    }

    /// Magnitude samples.
    #[inline(always)]
    #[must_use]
    pub fn bins(&self) -> &[f32] {
        &self.bins
    }

    /// Mutable magnitude samples.
    #[inline(always)]
    pub fn bins_mut(&mut self) -> &mut [f32] {
        &mut self.bins
    }

    /// Number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// `true` if the frame holds no bins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Copy into `out`, zero-padding or truncating to its length.
    ///
    /// Hosts use this to honour the fixed-length contract of
    /// [`AudioHost::fill_magnitudes`](crate::traits::AudioHost::fill_magnitudes).
    pub fn copy_into(&self, out: &mut [f32]) {
        let n = self.bins.len().min(out.len());
        out[..n].copy_from_slice(&self.bins[..n]);
        out[n..].fill(0.0);
    }
}

/// Bloc audio brut (PCM par canal), opaque pour le moteur.
///
/// Conservé uniquement pour la capture de relecture ; `Clone` est une copie
/// profonde, donc un instantané n'est jamais affecté par les écritures suivantes.
#[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AudioBlock {
    /// Samples per channel.
    pub channels: Vec<Vec<f32>>,
    /// Sample rate of the block.
    pub sample_rate: u32,
}

impl Clone for AudioBlock {
    fn clone(&self) -> Self {
        Self {
            channels: self.channels.clone(),
            sample_rate: self.sample_rate,
        }
    }

    /// Reuse the channel buffers of `self` where they are large enough.
    fn clone_from(&mut self, source: &Self) {
        self.channels.clone_from(&source.channels);
        self.sample_rate = source.sample_rate;
    }
}

impl AudioBlock {
    /// Build a block from per-channel samples.
    #[must_use]
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    /// Sample frames in the block (length of the longest channel).
    #[must_use]
    pub fn frames(&self) -> usize {
        self.channels.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// `true` if no channel holds any sample.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}

/// Constantes de session : sample rate et taille FFT de l'analyseur.
///
/// # Example
/// ```
/// use ss_core::frame::SessionFormat;
/// let format = SessionFormat::new(48_000, 2048).unwrap();
/// assert_eq!(format.bin_count(), 1024);
/// assert_eq!(format.hz_to_bin(250.0), 11);
/// assert!(SessionFormat::new(0, 2048).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionFormat {
    sample_rate: u32,
    fft_size: usize,
}

impl SessionFormat {
    /// Validate a host-reported format.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidSessionFormat`] if the sample rate is zero
    /// or the FFT size is below 2 (no bins).
    pub fn new(sample_rate: u32, fft_size: usize) -> Result<Self, CoreError> {
        if sample_rate == 0 || fft_size < 2 {
            log::warn!("Format de session invalide : {sample_rate} Hz, FFT {fft_size}");
            return Err(CoreError::InvalidSessionFormat {
                sample_rate,
                fft_size,
            });
        }
        Ok(Self {
            sample_rate,
            fft_size,
        })
    }

    /// Sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// FFT window size.
    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Bins per magnitude frame (`fft_size / 2`).
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Nearest bin index for a frequency: `round(hz * fft_size / sample_rate)`.
    ///
    /// Negative or NaN inputs map to bin 0. Not clamped to `bin_count`.
    #[must_use]
    pub fn hz_to_bin(&self, hz: f64) -> usize {
        (hz * self.fft_size as f64 / f64::from(self.sample_rate)).round() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_session_format_is_rejected() {
        assert_eq!(
            SessionFormat::new(0, 2048),
            Err(CoreError::InvalidSessionFormat {
                sample_rate: 0,
                fft_size: 2048,
            })
        );
        assert!(SessionFormat::new(48_000, 1).is_err());
        assert!(SessionFormat::new(48_000, 2).is_ok_and(|f| f.bin_count() == 1));
    }

    #[test]
    fn audio_block_clone_from_reuses_channel_buffers() {
        let mut live = AudioBlock::new(vec![vec![0.0; 256], vec![0.0; 256]], 44_100);
        let ptrs: Vec<*const f32> = live.channels.iter().map(|c| c.as_ptr()).collect();

        let next = AudioBlock::new(vec![vec![0.25; 128], vec![-0.25; 128]], 48_000);
        live.clone_from(&next);

        assert_eq!(live, next);
        for (channel, ptr) in live.channels.iter().zip(ptrs) {
            assert_eq!(channel.as_ptr(), ptr);
        }
    }

    #[test]
    fn band_parsing_accepts_menu_labels() {
        assert_eq!("middle".parse::<Band>(), Ok(Band::Mid));
        assert_eq!(" Treble ".parse::<Band>(), Ok(Band::High));
        assert!(matches!(
            "sub".parse::<Band>(),
            Err(CoreError::UnknownBand(_))
        ));
    }

    #[test]
    fn policy_parsing() {
        assert_eq!(
            "microphone".parse::<AudioSourcePolicy>(),
            Ok(AudioSourcePolicy::Microphone)
        );
        assert!("speaker".parse::<AudioSourcePolicy>().is_err());
    }

    #[test]
    fn copy_into_pads_and_truncates() {
        let frame = MagnitudeFrame::new(vec![1.0, 2.0, 3.0]);
        let mut short = [9.0f32; 2];
        frame.copy_into(&mut short);
        assert_eq!(short, [1.0, 2.0]);

        let mut long = [9.0f32; 5];
        frame.copy_into(&mut long);
        assert_eq!(long, [1.0, 2.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn hz_to_bin_rounds_and_saturates_nan() {
        let format = SessionFormat::new(48_000, 2048).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(format.hz_to_bin(2000.0), 85);
        assert_eq!(format.hz_to_bin(6000.0), 256);
        assert_eq!(format.hz_to_bin(f64::NAN), 0);
        assert_eq!(format.hz_to_bin(-40.0), 0);
    }

    #[test]
    fn audio_block_clone_is_deep() {
        let block = AudioBlock::new(vec![vec![0.1, 0.2], vec![0.3]], 48_000);
        let mut copy = block.clone();
        copy.channels[0][0] = 1.0;
        assert!((block.channels[0][0] - 0.1).abs() < f32::EPSILON);
        assert_eq!(block.frames(), 2);
    }
}
