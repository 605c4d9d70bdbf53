use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use ss_core::frame::{AudioSourcePolicy, MagnitudeFrame, SessionFormat};

/// First line of a script: session constants of the simulated host.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ScriptHeader {
    pub sample_rate: u32,
    pub fft_size: usize,
    /// Minimum interval between analysis passes reported by the host.
    pub tick_ms: u64,
    /// Spacing of script lines on the simulated clock. Défaut : `tick_ms + 1`.
    #[serde(default)]
    pub frame_ms: Option<u64>,
}

impl ScriptHeader {
    /// Spacing between two ticks of the script.
    #[must_use]
    pub fn frame_ms(&self) -> u64 {
        self.frame_ms.unwrap_or(self.tick_ms + 1)
    }
}

/// Host-side event delivered with a tick.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Stop-all signal: clears the energy calibration.
    StopAll,
    /// Switch the audio source policy.
    Policy(AudioSourcePolicy),
}

/// One host tick. Absent sources have nothing to deliver.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Tick {
    #[serde(default)]
    pub project: Option<MagnitudeFrame>,
    #[serde(default)]
    pub microphone: Option<MagnitudeFrame>,
    /// Raw audio, one vector per channel.
    #[serde(default)]
    pub audio: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    pub command: Option<Command>,
}

/// A parsed script: header and ticks in order.
#[derive(Clone, Debug)]
pub struct Script {
    pub header: ScriptHeader,
    pub format: SessionFormat,
    pub ticks: Vec<Tick>,
}

/// Parse a JSON-lines script. Blank lines and lines starting with `#` are skipped.
///
/// # Errors
/// Returns an error on an empty script, malformed JSON, or an invalid session format.
pub fn parse_script(content: &str) -> Result<Script> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

    let (n, first) = lines.next().context("Script vide : en-tête attendu")?;
    let header: ScriptHeader =
        serde_json::from_str(first).with_context(|| format!("En-tête invalide (ligne {n})"))?;
    let format = SessionFormat::new(header.sample_rate, header.fft_size)
        .with_context(|| format!("En-tête invalide (ligne {n})"))?;

    let ticks = lines
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("Tick invalide (ligne {n})"))
        })
        .collect::<Result<Vec<Tick>>>()?;

    Ok(Script {
        header,
        format,
        ticks,
    })
}

/// Load and parse a script file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_script(path: &Path) -> Result<Script> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire le script : {}", path.display()))?;
    parse_script(&content).with_context(|| format!("Script invalide : {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_ticks() {
        let script = parse_script(
            r#"{"sample_rate":8000,"fft_size":16,"tick_ms":33}
# silence, then a policy switch
{"project":[0,0,0,0,0,0,0,0]}

{"project":[9,9,9,9,9,9,9,9],"microphone":[1,2,3,4,5,6,7,8],"audio":[[0.1,0.2]],"command":{"policy":"all"}}
{"command":"stop_all"}
"#,
        )
        .unwrap_or_else(|e| panic!("{e:#}"));

        assert_eq!(script.format.bin_count(), 8);
        assert_eq!(script.header.frame_ms(), 34);
        assert_eq!(script.ticks.len(), 3);
        assert_eq!(script.ticks[0].microphone, None);
        assert_eq!(
            script.ticks[1].command,
            Some(Command::Policy(AudioSourcePolicy::All))
        );
        assert_eq!(script.ticks[1].microphone.as_ref().map(MagnitudeFrame::len), Some(8));
        assert_eq!(script.ticks[2].command, Some(Command::StopAll));
        assert_eq!(script.ticks[2].project, None);
    }

    #[test]
    fn rejects_invalid_format() {
        let err = parse_script(r#"{"sample_rate":0,"fft_size":16,"tick_ms":33}"#)
            .err()
            .map(|e| format!("{e:#}"));
        assert!(err.is_some_and(|e| e.contains("ligne 1")));
    }

    #[test]
    fn reports_line_of_bad_tick() {
        let err = parse_script(
            "{\"sample_rate\":8000,\"fft_size\":16,\"tick_ms\":33}\n{\"project\":[1]}\n{\"projekt\":[1]}\n",
        )
        .err()
        .map(|e| format!("{e:#}"));
        assert!(err.is_some_and(|e| e.contains("ligne 3")), "unexpected error");
    }

    #[test]
    fn empty_script_is_an_error() {
        assert!(parse_script("\n# nothing\n").is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("ticks.jsonl");
        std::fs::write(
            &path,
            "{\"sample_rate\":48000,\"fft_size\":2048,\"tick_ms\":16,\"frame_ms\":20}\n{}\n",
        )
        .unwrap_or_else(|e| panic!("{e}"));

        let script = load_script(&path).unwrap_or_else(|e| panic!("{e:#}"));
        assert_eq!(script.header.frame_ms(), 20);
        assert_eq!(script.ticks, vec![Tick::default()]);
    }
}
