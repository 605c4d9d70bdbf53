use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use clap::Parser;
use ss_audio::SensingEngine;
use ss_core::config::SensingConfig;

pub mod cli;
pub mod host;
pub mod hotreload;
pub mod runner;
pub mod script;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger le script et la config
    let script = script::load_script(&cli.script)?;
    let config = Arc::new(ArcSwap::from_pointee(resolve_config(&cli)?));
    let options = runner::RunOptions {
        policy_override: cli.policy,
        pace: cli
            .realtime
            .then(|| Duration::from_millis(script.header.frame_ms())),
    };

    // 4. Hot-reload config (thread interne notify)
    let _watcher = if cli.config.exists() {
        hotreload::spawn_config_watcher(&cli.config, &config)
            .inspect_err(|e| log::warn!("Hot-reload indisponible : {e}"))
            .ok()
    } else {
        None
    };

    // 5. Hôte scripté + moteur
    let host = if cli.realtime {
        host::ScriptedHost::realtime(script.format, &script.header)
    } else {
        host::ScriptedHost::simulated(script.format, &script.header)
    };
    let mut engine = SensingEngine::new(host, runner::effective_config(&config.load(), &options));

    log::info!(
        "{} ticks @ {}Hz, FFT {}, tick {} ms",
        script.ticks.len(),
        script.format.sample_rate(),
        script.format.fft_size(),
        script.header.tick_ms
    );

    // 6. Boucle principale
    let mut out = BufWriter::new(std::io::stdout().lock());
    let summary = runner::run_script(&mut engine, &script.ticks, &config, options, &mut out)?;
    out.flush().context("Écriture stdout")?;

    log::info!(
        "Terminé : {} ticks, pics low/mid/high {}/{}/{}, pics de flux {}, stop-all {}",
        summary.ticks,
        summary.band_peaks.low,
        summary.band_peaks.mid,
        summary.band_peaks.high,
        summary.flux_peaks,
        summary.resets
    );
    Ok(())
}

/// Resolve config: --config if present, defaults otherwise.
fn resolve_config(cli: &cli::Cli) -> Result<SensingConfig> {
    if cli.config.exists() {
        ss_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(SensingConfig::default())
    }
}
