use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::frame::{AudioSourcePolicy, BandTable};

/// Configuration complète du détecteur, hot-rechargeable.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use ss_core::config::SensingConfig;
/// let config = SensingConfig::default();
/// assert_eq!(config.energy_history, 7);
/// assert_eq!(config.flux_history, 12);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SensingConfig {
    // === Détection ===
    /// Profondeur d'historique des statistiques d'énergie (ticks).
    pub energy_history: usize,
    /// Profondeur d'historique des statistiques de flux (ticks).
    pub flux_history: usize,
    /// Z-score au-delà duquel une bande est en pic.
    pub band_peak_threshold: f64,
    /// Z-score au-delà duquel le flux spectral est en pic.
    pub flux_peak_threshold: f64,
    /// Source écoutée au démarrage.
    pub policy: AudioSourcePolicy,

    // === Bandes ===
    /// Fréquences de coupure haute de chaque bande, en Hz.
    pub band_cutoffs_hz: BandTable<f64>,
    /// La bande haute s'étend jusqu'à Nyquist (partition complète du spectre).
    /// Si `false`, les bins au-dessus de la coupure haute sont ignorés.
    pub high_band_to_nyquist: bool,
    /// Pleine échelle des magnitudes (255 pour un analyseur octet).
    pub full_scale: f64,

    // === Microphone ===
    /// Énergie minimale par bande quand le micro participe à l'analyse.
    pub microphone_gates: BandTable<f64>,
    /// Flux minimal quand le micro participe à l'analyse.
    pub flux_gate: f64,
}

impl Default for SensingConfig {
    fn default() -> Self {
        Self {
            energy_history: 7,
            flux_history: 12,
            band_peak_threshold: 1.0,
            flux_peak_threshold: 0.5,
            policy: AudioSourcePolicy::Project,
            band_cutoffs_hz: BandTable {
                low: 250.0,
                mid: 2000.0,
                high: 6000.0,
            },
            high_band_to_nyquist: true,
            full_scale: 255.0,
            microphone_gates: BandTable {
                low: 100.0,
                mid: 50.0,
                high: 5.0,
            },
            flux_gate: 0.0,
        }
    }
}

impl SensingConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        // variance divides by (length - 1)
        self.energy_history = self.energy_history.clamp(2, 1024);
        self.flux_history = self.flux_history.clamp(2, 1024);
        self.band_peak_threshold = self.band_peak_threshold.clamp(0.0, 10.0);
        self.flux_peak_threshold = self.flux_peak_threshold.clamp(0.0, 10.0);

        let c = &mut self.band_cutoffs_hz;
        c.low = c.low.max(1.0);
        c.mid = c.mid.max(c.low);
        c.high = c.high.max(c.mid);

        self.full_scale = self.full_scale.max(1.0);
        let g = &mut self.microphone_gates;
        g.low = g.low.max(0.0);
        g.mid = g.mid.max(0.0);
        g.high = g.high.max(0.0);
        self.flux_gate = self.flux_gate.max(0.0);
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    detector: Option<DetectorSection>,
    bands: Option<BandsSection>,
    microphone: Option<MicrophoneSection>,
}

/// Detector section of the TOML config, all fields optional for partial override.
#[derive(Deserialize)]
struct DetectorSection {
    energy_history: Option<usize>,
    flux_history: Option<usize>,
    band_peak_threshold: Option<f64>,
    flux_peak_threshold: Option<f64>,
    policy: Option<AudioSourcePolicy>,
}

/// Bands section of the TOML config.
#[derive(Deserialize)]
struct BandsSection {
    low_hz: Option<f64>,
    mid_hz: Option<f64>,
    high_hz: Option<f64>,
    high_band_to_nyquist: Option<bool>,
    full_scale: Option<f64>,
}

/// Microphone gating section of the TOML config.
#[derive(Deserialize)]
struct MicrophoneSection {
    low_gate: Option<f64>,
    mid_gate: Option<f64>,
    high_gate: Option<f64>,
    flux_gate: Option<f64>,
}

/// Parse un document TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the document is not valid TOML or has unknown sections.
///
/// # Example
/// ```
/// use ss_core::config::parse_config;
/// use ss_core::frame::AudioSourcePolicy;
/// let config = parse_config("[detector]\npolicy = \"all\"\n").unwrap();
/// assert_eq!(config.policy, AudioSourcePolicy::All);
/// assert_eq!(config.energy_history, 7);
/// ```
pub fn parse_config(content: &str) -> Result<SensingConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;

    let mut config = SensingConfig::default();

    if let Some(d) = file.detector {
        if let Some(v) = d.energy_history {
            config.energy_history = v;
        }
        if let Some(v) = d.flux_history {
            config.flux_history = v;
        }
        if let Some(v) = d.band_peak_threshold {
            config.band_peak_threshold = v;
        }
        if let Some(v) = d.flux_peak_threshold {
            config.flux_peak_threshold = v;
        }
        if let Some(v) = d.policy {
            config.policy = v;
        }
    }

    if let Some(b) = file.bands {
        if let Some(v) = b.low_hz {
            config.band_cutoffs_hz.low = v;
        }
        if let Some(v) = b.mid_hz {
            config.band_cutoffs_hz.mid = v;
        }
        if let Some(v) = b.high_hz {
            config.band_cutoffs_hz.high = v;
        }
        if let Some(v) = b.high_band_to_nyquist {
            config.high_band_to_nyquist = v;
        }
        if let Some(v) = b.full_scale {
            config.full_scale = v;
        }
    }

    if let Some(m) = file.microphone {
        if let Some(v) = m.low_gate {
            config.microphone_gates.low = v;
        }
        if let Some(v) = m.mid_gate {
            config.microphone_gates.mid = v;
        }
        if let Some(v) = m.high_gate {
            config.microphone_gates.high = v;
        }
        if let Some(v) = m.flux_gate {
            config.flux_gate = v;
        }
    }

    config.clamp_all();
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use ss_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<SensingConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;

    parse_config(&content).with_context(|| format!("Configuration invalide dans {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(config, SensingConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = parse_config(
            "[microphone]\nlow_gate = 80.0\n\n[bands]\nhigh_band_to_nyquist = false\n",
        )
        .unwrap_or_else(|e| panic!("{e}"));
        assert!((config.microphone_gates.low - 80.0).abs() < f64::EPSILON);
        assert!((config.microphone_gates.mid - 50.0).abs() < f64::EPSILON);
        assert!(!config.high_band_to_nyquist);
        assert_eq!(config.flux_history, 12);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = parse_config(
            "[detector]\nenergy_history = 1\nflux_peak_threshold = -3.0\n\n[bands]\nlow_hz = 500.0\nmid_hz = 100.0\n",
        )
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(config.energy_history, 2);
        assert!(config.flux_peak_threshold.abs() < f64::EPSILON);
        assert!(config.band_cutoffs_hz.mid >= config.band_cutoffs_hz.low);
        assert!(config.band_cutoffs_hz.high >= config.band_cutoffs_hz.mid);
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(parse_config("[render]\nfps = 30\n").is_err());
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(parse_config("[detector]\npolicy = \"speaker\"\n").is_err());
    }

    #[test]
    fn load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("sensing.toml");
        std::fs::write(&path, "[detector]\nflux_history = 24\n").unwrap_or_else(|e| panic!("{e}"));
        let config = load_config(&path).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(config.flux_history, 24);

        assert!(load_config(&dir.path().join("missing.toml")).is_err());
    }
}
