use std::path::PathBuf;

use clap::Parser;
use ss_core::frame::AudioSourcePolicy;

/// soundsense — self-calibrating band and spectral-flux event detection.
///
/// Replays a JSON-lines tick script through the sensing engine and prints one
/// JSON report per tick.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Script JSON-lines : en-tête de session puis une ligne par tick.
    #[arg(long)]
    pub script: PathBuf,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Source audio initiale : microphone, project, all (remplace la config).
    #[arg(long)]
    pub policy: Option<AudioSourcePolicy>,

    /// Rejouer le script en temps réel (une ligne par frame_ms, horloge murale).
    #[arg(long, default_value_t = false)]
    pub realtime: bool,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}
