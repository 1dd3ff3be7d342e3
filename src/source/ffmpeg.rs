use std::path::Path;

use crate::foundation::error::FramecastResult;
use crate::source::handle::DecodeHandle;

#[cfg(feature = "media-ffmpeg")]
use imp::FfmpegHandle;

/// Open a video file through the system `ffmpeg` binary.
#[cfg(feature = "media-ffmpeg")]
pub(crate) fn open_video(path: &Path) -> FramecastResult<Box<dyn DecodeHandle>> {
    Ok(Box::new(FfmpegHandle::open(path)?))
}

#[cfg(not(feature = "media-ffmpeg"))]
pub(crate) fn open_video(path: &Path) -> FramecastResult<Box<dyn DecodeHandle>> {
    Err(crate::foundation::error::FramecastError::decode(format!(
        "video source '{}' requires the 'media-ffmpeg' feature",
        path.display()
    )))
}

#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}

#[cfg(feature = "media-ffmpeg")]
mod imp {
    use std::io::{BufReader, Read};
    use std::path::{Path, PathBuf};
    use std::process::{Child, ChildStdout, Command, Stdio};

    use anyhow::Context;

    use super::parse_ff_ratio;
    use crate::foundation::core::DEFAULT_FPS;
    use crate::foundation::error::{FramecastError, FramecastResult};
    use crate::render::frame::FrameRGBA;
    use crate::source::handle::{DecodeHandle, SourceProperties};

    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
        avg_frame_rate: Option<String>,
        nb_frames: Option<String>,
    }

    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }

    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    /// Read stream properties with `ffprobe`.
    fn probe(path: &Path) -> FramecastResult<SourceProperties> {
        let out = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .context("failed to run ffprobe")?;
        if !out.status.success() {
            return Err(FramecastError::decode(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
            .map_err(|e| FramecastError::decode(format!("ffprobe json parse failed: {e}")))?;
        let stream = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| {
                FramecastError::decode(format!("no video stream in '{}'", path.display()))
            })?;
        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(FramecastError::decode(format!(
                    "missing video dimensions for '{}'",
                    path.display()
                )));
            }
        };

        let fps = [stream.avg_frame_rate.as_deref(), stream.r_frame_rate.as_deref()]
            .into_iter()
            .flatten()
            .filter_map(parse_ff_ratio)
            .map(|(n, d)| f64::from(n) / f64::from(d))
            .find(|f| *f > 0.0)
            .unwrap_or(DEFAULT_FPS);
        let duration_s = parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(0.0);
        let frame_count = stream
            .nb_frames
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .or_else(|| (duration_s > 0.0).then(|| (duration_s * fps).round() as u64));

        Ok(SourceProperties {
            width,
            height,
            fps,
            frame_count,
            duration_ms: (duration_s * 1000.0).round() as u64,
        })
    }

    struct Decoder {
        child: Child,
        stdout: BufReader<ChildStdout>,
    }

    /// One persistent `ffmpeg` process streaming raw RGBA frames.
    ///
    /// Sequential reads consume the pipe; any other seek restarts the process at the new
    /// position.
    pub(crate) struct FfmpegHandle {
        path: PathBuf,
        props: SourceProperties,
        decoder: Option<Decoder>,
        next_index: u64,
    }

    impl FfmpegHandle {
        pub(crate) fn open(path: &Path) -> FramecastResult<Self> {
            let props = probe(path)?;
            tracing::debug!(path = %path.display(), ?props, "opened ffmpeg source");
            Ok(Self {
                path: path.to_path_buf(),
                props,
                decoder: None,
                next_index: 0,
            })
        }

        fn spawn(&self, index: u64) -> FramecastResult<Decoder> {
            let start_s = index as f64 / self.props.fps;
            let mut child = Command::new("ffmpeg")
                .args(["-v", "error", "-nostdin", "-ss", &format!("{start_s:.9}")])
                .arg("-i")
                .arg(&self.path)
                .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .spawn()
                .with_context(|| format!("failed to spawn ffmpeg for '{}'", self.path.display()))?;
            let stdout = child.stdout.take().ok_or_else(|| {
                FramecastError::decode("ffmpeg stdout was not captured".to_string())
            })?;
            Ok(Decoder {
                child,
                stdout: BufReader::new(stdout),
            })
        }

        fn stop(&mut self) {
            if let Some(mut d) = self.decoder.take() {
                let _ = d.child.kill();
                let _ = d.child.wait();
            }
        }
    }

    impl DecodeHandle for FfmpegHandle {
        fn properties(&self) -> SourceProperties {
            self.props
        }

        fn read_frame(&mut self, index: u64) -> FramecastResult<FrameRGBA> {
            if self.decoder.is_none() || index != self.next_index {
                self.stop();
                tracing::trace!(path = %self.path.display(), index, "ffmpeg seek");
                self.decoder = Some(self.spawn(index)?);
                self.next_index = index;
            }

            let len = self.props.width as usize * self.props.height as usize * 4;
            let mut buf = vec![0u8; len];
            let read = match self.decoder.as_mut() {
                Some(d) => d.stdout.read_exact(&mut buf),
                None => return Err(FramecastError::decode("ffmpeg decoder not running")),
            };
            if let Err(e) = read {
                self.stop();
                return Err(FramecastError::decode(format!(
                    "no frame {index} from '{}': {e}",
                    self.path.display()
                )));
            }
            self.next_index = index + 1;
            FrameRGBA::new(self.props.width, self.props.height, buf)
        }
    }

    impl Drop for FfmpegHandle {
        fn drop(&mut self) {
            self.stop();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/ffmpeg.rs"]
mod tests;
