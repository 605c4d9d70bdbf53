use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use serde::Serialize;
use ss_audio::SensingEngine;
use ss_core::config::SensingConfig;
use ss_core::frame::{AudioSourcePolicy, Band, BandTable};

use crate::host::ScriptedHost;
use crate::script::{Command, Tick};

/// Engine readings after one script tick, written as one JSON line.
#[derive(Debug, Serialize, PartialEq)]
pub struct TickReport {
    pub tick: usize,
    pub policy: AudioSourcePolicy,
    pub energy: Option<BandTable<f64>>,
    pub flux: Option<f64>,
    pub band_peaks: Vec<Band>,
    pub flux_peak: bool,
}

/// Peak counts over a whole run.
#[derive(Debug, Default, PartialEq)]
pub struct RunSummary {
    pub ticks: usize,
    pub band_peaks: BandTable<usize>,
    pub flux_peaks: usize,
    pub resets: usize,
}

/// Options of a script run.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions {
    /// Policy forced over the configuration (CLI `--policy`).
    pub policy_override: Option<AudioSourcePolicy>,
    /// Sleep between ticks (realtime playback).
    pub pace: Option<Duration>,
}

/// Config with the CLI override applied.
#[must_use]
pub fn effective_config(config: &SensingConfig, options: &RunOptions) -> SensingConfig {
    let mut config = config.clone();
    if let Some(policy) = options.policy_override {
        config.policy = policy;
    }
    config
}

/// Drive `engine` through `ticks`, writing one report per tick to `out`.
///
/// The current value of `config` is applied before the first tick, then again
/// whenever a new one is published (hot reload).
///
/// # Errors
/// Returns an error if a report cannot be serialized or written.
pub fn run_script<W: Write>(
    engine: &mut SensingEngine<ScriptedHost>,
    ticks: &[Tick],
    config: &ArcSwap<SensingConfig>,
    options: RunOptions,
    out: &mut W,
) -> Result<RunSummary> {
    let mut applied: Option<Arc<SensingConfig>> = None;
    let mut summary = RunSummary::default();

    for (index, tick) in ticks.iter().enumerate() {
        if let Some(pace) = options.pace {
            std::thread::sleep(pace);
        }

        let latest = config.load_full();
        if applied.as_ref().is_none_or(|a| !Arc::ptr_eq(a, &latest)) {
            engine.apply_config(effective_config(&latest, &options));
            applied = Some(latest);
        }

        engine.host_mut().load(tick);
        match tick.command {
            Some(Command::StopAll) => {
                log::debug!("Tick {index} : stop-all");
                engine.reset();
                summary.resets += 1;
            }
            Some(Command::Policy(policy)) => engine.set_audio_source_policy(policy),
            None => {}
        }

        let report = read_tick(engine, index);
        for band in &report.band_peaks {
            match band {
                Band::Low => summary.band_peaks.low += 1,
                Band::Mid => summary.band_peaks.mid += 1,
                Band::High => summary.band_peaks.high += 1,
            }
        }
        summary.flux_peaks += usize::from(report.flux_peak);
        summary.ticks += 1;

        serde_json::to_writer(&mut *out, &report).context("Sérialisation du rapport")?;
        writeln!(out).context("Écriture du rapport")?;
    }

    Ok(summary)
}

/// Poll every accessor once, as a block-scripting host would within a tick.
fn read_tick(engine: &mut SensingEngine<ScriptedHost>, tick: usize) -> TickReport {
    let energy = match (
        engine.current_energy(Band::Low),
        engine.current_energy(Band::Mid),
        engine.current_energy(Band::High),
    ) {
        (Some(low), Some(mid), Some(high)) => Some(BandTable { low, mid, high }),
        _ => None,
    };
    let flux = engine.current_flux();
    let band_peaks = Band::ALL
        .into_iter()
        .filter(|&band| engine.is_band_peak(band))
        .collect();

    TickReport {
        tick,
        policy: engine.audio_source_policy(),
        energy,
        flux,
        band_peaks,
        flux_peak: engine.is_flux_peak(),
    }
}
