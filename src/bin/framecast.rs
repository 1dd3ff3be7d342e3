use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::Parser;
use framecast::{
    FramecastError, ImageFormat, JsonTimelineSource, PreviewConfig, PreviewEngine, ServeError,
    StaticTimelineSource, Subscription, TimelineSource,
};
use rouille::{Request, Response, ResponseBody};
use tracing_subscriber::EnvFilter;

const MAX_COMMAND_BYTES: u64 = 4 * 1024 * 1024;
const BOUNDARY: &str = "frame";

#[derive(Parser, Debug)]
#[command(name = "framecast", version, about = "Timeline preview server")]
struct Cli {
    /// JSON config file; missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Project JSON file backing the timeline.
    #[arg(long)]
    project: Option<PathBuf>,

    /// Bind host.
    #[arg(long)]
    host: Option<String>,

    /// Bind port.
    #[arg(long = "http-port")]
    http_port: Option<u16>,

    /// Concurrent pull-path renders.
    #[arg(long)]
    workers: Option<usize>,

    /// Log framecast at debug level.
    #[arg(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let mut config = match &cli.config {
        Some(path) => PreviewConfig::from_path(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => PreviewConfig::default(),
    };
    if let Some(project) = cli.project {
        config.project = Some(project);
    }
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.http_port {
        config.http_port = port;
    }
    if let Some(workers) = cli.workers {
        config.render_workers = workers;
    }

    let source: Box<dyn TimelineSource> = match &config.project {
        Some(path) => Box::new(JsonTimelineSource::new(path)),
        None => Box::new(StaticTimelineSource::default()),
    };
    let engine = PreviewEngine::new(&config, source).context("start preview engine")?;

    let addr = format!("{}:{}", config.host, config.http_port);
    let format = config.format;
    let server = rouille::Server::new(&addr, move |request| {
        handle_request(request, &engine, format)
    })
    .map_err(|e| anyhow::anyhow!("bind {addr}: {e}"))?
    .pool_size(config.render_workers.max(1) * 4);

    tracing::info!(
        addr = %addr,
        project = ?config.project,
        workers = config.render_workers,
        "framecast listening"
    );
    // Serves until the process is terminated.
    server.run();
    Ok(())
}

fn init_tracing(debug: bool) {
    let default = if debug { "info,framecast=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn handle_request(request: &Request, engine: &PreviewEngine, format: ImageFormat) -> Response {
    if request.method() == "GET"
        && let Some(n) = request.url().strip_prefix("/get_frame/")
    {
        return match n.parse::<u64>() {
            Ok(index) => get_frame(engine, index, format),
            Err(_) => error_json(400, "invalid frame index"),
        };
    }

    rouille::router!(request,
        (GET) ["/stream"] => {
            stream(engine.subscribe(), format)
        },
        (POST) ["/command"] => {
            command(request, engine)
        },
        (GET) ["/api/mediainfo"] => {
            media_info(request, engine)
        },
        (GET) ["/health"] => {
            Response::json(&serde_json::json!({"status": "ok"}))
        },
        (GET) ["/debug/timeline"] => {
            debug_timeline(engine)
        },
        _ => {
            error_json(404, "not found")
        }
    )
}

fn error_json(status: u16, message: &str) -> Response {
    Response::json(&serde_json::json!({ "error": message })).with_status_code(status)
}

fn get_frame(engine: &PreviewEngine, index: u64, format: ImageFormat) -> Response {
    match engine.request_frame(index) {
        Ok(bytes) => Response::from_data(format.mime_type(), bytes.to_vec())
            .with_additional_header("Cache-Control", "no-store"),
        Err(ServeError::Unavailable) => error_json(404, "frame not available"),
        Err(e @ (ServeError::Busy | ServeError::ShuttingDown)) => error_json(503, &e.to_string()),
        Err(e @ ServeError::ProcessingTimeout) => error_json(504, &e.to_string()),
    }
}

fn command(request: &Request, engine: &PreviewEngine) -> Response {
    let Some(body) = request.data() else {
        return error_json(400, "missing command body");
    };
    let mut text = String::new();
    if let Err(e) = body.take(MAX_COMMAND_BYTES).read_to_string(&mut text) {
        return error_json(400, &format!("unreadable command body: {e}"));
    }
    match engine.handle_text(&text) {
        Ok(state) => Response::json(&state),
        Err(e) => framecast_error(&e),
    }
}

fn framecast_error(e: &FramecastError) -> Response {
    let status = match e {
        FramecastError::Validation(_) | FramecastError::Protocol(_) => 400,
        FramecastError::NotFound(_) => 404,
        _ => 500,
    };
    error_json(status, &e.to_string())
}

fn media_info(request: &Request, engine: &PreviewEngine) -> Response {
    let Some(path) = request.get_param("path") else {
        return error_json(400, "missing 'path' parameter");
    };
    match engine.media_info(Path::new(&path)) {
        Ok(props) => Response::json(&props),
        Err(e) => framecast_error(&e),
    }
}

fn debug_timeline(engine: &PreviewEngine) -> Response {
    let snapshot = engine.snapshot();
    let clips: Vec<_> = snapshot
        .clips
        .iter()
        .map(|c| {
            serde_json::json!({
                "id": c.id,
                "sourcePath": c.source_path,
                "trackStartFrame": c.track_range.start.0,
                "trackEndFrame": c.track_range.end.0,
                "sourceStartFrame": c.source_start_frame,
                "flip": c.flip,
            })
        })
        .collect();
    Response::json(&serde_json::json!({
        "canvas": snapshot.canvas,
        "fps": snapshot.fps.as_f64(),
        "totalFrames": snapshot.total_frames,
        "fingerprint": snapshot.fingerprint().to_hex(),
        "clips": clips,
        "playback": engine.playback_state(),
        "stats": engine.stats(),
    }))
}

fn stream(subscription: Subscription, format: ImageFormat) -> Response {
    tracing::info!("stream subscriber connected");
    let body = MultipartStream {
        subscription,
        mime: format.mime_type(),
        buf: Vec::new(),
        pos: 0,
    };
    Response {
        status_code: 200,
        headers: vec![
            (
                "Content-Type".into(),
                format!("multipart/x-mixed-replace; boundary={BOUNDARY}").into(),
            ),
            ("Cache-Control".into(), "no-store".into()),
        ],
        data: ResponseBody::from_reader(body),
        upgrade: None,
    }
}

/// `multipart/x-mixed-replace` body fed by a playback subscription; ends when playback stops.
struct MultipartStream {
    subscription: Subscription,
    mime: &'static str,
    buf: Vec<u8>,
    pos: usize,
}

impl Read for MultipartStream {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.buf.len() {
            let Some(frame) = self.subscription.recv() else {
                tracing::info!("stream subscriber finished");
                return Ok(0);
            };
            self.buf.clear();
            self.pos = 0;
            self.buf.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Type: {}\r\nContent-Length: {}\r\nX-Frame-Index: {}\r\n\r\n",
                    self.mime,
                    frame.bytes.len(),
                    frame.index.0
                )
                .as_bytes(),
            );
            self.buf.extend_from_slice(&frame.bytes);
            self.buf.extend_from_slice(b"\r\n");
        }
        let n = (self.buf.len() - self.pos).min(out.len());
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
