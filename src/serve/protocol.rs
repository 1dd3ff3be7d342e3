use std::str::FromStr;

use crate::foundation::error::{FramecastError, FramecastResult};
use crate::timeline::clip::ClipRecord;

/// Viewer command, parsed from its text form.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// `play`
    Play,
    /// `pause`
    Pause,
    /// `seek:<n>`; negative targets clamp to 0.
    Seek(u64),
    /// `canvas:<w>x<h>`
    Canvas {
        /// Requested width.
        width: i64,
        /// Requested height.
        height: i64,
    },
    /// `{"type":"clips","data":[...]}` or legacy `videos:[...]`
    Clips {
        /// Clip records in paint order.
        records: Vec<ClipRecord>,
        /// Optional timeline length override.
        total_frames: Option<u64>,
        /// Optional frame rate override.
        fps: Option<f64>,
    },
    /// `refresh`: reload the persisted timeline.
    Refresh,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClipsMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Vec<ClipRecord>,
    #[serde(default)]
    total_frames: Option<u64>,
    #[serde(default)]
    fps: Option<f64>,
}

fn snippet(text: &str) -> String {
    text.chars().take(80).collect()
}

impl Command {
    /// Parse one command. Unknown or malformed input is a protocol error.
    pub fn parse(text: &str) -> FramecastResult<Self> {
        let text = text.trim();
        match text {
            "play" => return Ok(Command::Play),
            "pause" => return Ok(Command::Pause),
            "refresh" => return Ok(Command::Refresh),
            _ => {}
        }

        if let Some(arg) = text.strip_prefix("seek:") {
            let n: i64 = arg.trim().parse().map_err(|_| {
                FramecastError::protocol(format!("invalid seek target '{}'", snippet(arg)))
            })?;
            return Ok(Command::Seek(n.max(0) as u64));
        }

        if let Some(arg) = text.strip_prefix("canvas:") {
            let parsed = arg
                .split_once(['x', 'X'])
                .and_then(|(w, h)| {
                    Some((w.trim().parse::<i64>().ok()?, h.trim().parse::<i64>().ok()?))
                });
            let Some((width, height)) = parsed else {
                return Err(FramecastError::protocol(format!(
                    "invalid canvas size '{}'",
                    snippet(arg)
                )));
            };
            return Ok(Command::Canvas { width, height });
        }

        if let Some(json) = text.strip_prefix("videos:") {
            tracing::warn!("received deprecated 'videos:' command");
            let records: Vec<ClipRecord> = serde_json::from_str(json)
                .map_err(|e| FramecastError::protocol(format!("invalid videos payload: {e}")))?;
            return Ok(Command::Clips {
                records,
                total_frames: None,
                fps: None,
            });
        }

        if text.starts_with('{') {
            let msg: ClipsMessage = serde_json::from_str(text)
                .map_err(|e| FramecastError::protocol(format!("invalid json command: {e}")))?;
            if msg.kind != "clips" {
                return Err(FramecastError::protocol(format!(
                    "unknown message type '{}'",
                    msg.kind
                )));
            }
            return Ok(Command::Clips {
                records: msg.data,
                total_frames: msg.total_frames,
                fps: msg.fps,
            });
        }

        Err(FramecastError::protocol(format!(
            "unknown command '{}'",
            snippet(text)
        )))
    }
}

impl FromStr for Command {
    type Err = FramecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Reply sent after every command.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Whether playback is running.
    pub playing: bool,
    /// Frame playback will render next.
    pub current_frame: u64,
    /// Timeline length in frames.
    pub total_frames: u64,
    /// Timeline frame rate.
    pub fps: f64,
}

#[cfg(test)]
#[path = "../../tests/unit/serve/protocol.rs"]
mod tests;
