//! Extraction of displayable chat text from game server log lines.

use regex::Regex;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::LazyLock;

static VALHEIM_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<color=.*?>(.*?)</color>").expect("valid regex"));

/// How a raw log line is turned into text worth forwarding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineFormat {
    /// Forward every line unchanged.
    #[default]
    Raw,
    /// Project Zomboid chat log: `Got Message:ChatMessage{... author='x', text='y'}`.
    Zomboid,
    /// Valheim console: `Console: <color=..>name</color>: <color=..>text</color>`.
    Valheim,
}

impl LineFormat {
    /// Returns the text to forward, or `None` when the line carries no message.
    pub fn extract(&self, line: &str) -> Option<String> {
        match self {
            LineFormat::Raw => Some(line.to_string()),
            LineFormat::Zomboid => extract_zomboid(line),
            LineFormat::Valheim => extract_valheim(line),
        }
    }
}

impl FromStr for LineFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(LineFormat::Raw),
            "zomboid" => Ok(LineFormat::Zomboid),
            "valheim" => Ok(LineFormat::Valheim),
            other => Err(format!("unknown line format `{other}`")),
        }
    }
}

fn extract_zomboid(line: &str) -> Option<String> {
    if !line.contains("Got Message:") {
        return None;
    }
    let (_, body) = line.split_once('{')?;
    let body = body.split('}').next()?;

    let mut author = None;
    let mut text = None;
    for part in body.split(',') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('\'');
        match key.trim() {
            "author" => author = Some(value),
            "text" => text = Some(value),
            _ => {}
        }
    }

    Some(format!("{}: {}", author?, text?))
}

fn extract_valheim(line: &str) -> Option<String> {
    if !line.contains("Console:") {
        return None;
    }
    let segments: Vec<&str> = VALHEIM_COLOR
        .captures_iter(line)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments.join(": "))
}
