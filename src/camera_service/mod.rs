//! CameraService - Frame Acquisition from the Webcam
//!
//! ## Responsibilities
//!
//! - Run one persistent ffmpeg process reading the camera (V4L2 device,
//!   RTSP URL, or video file) and emitting MJPEG on stdout
//! - Split the pipe output into individual JPEG frames (SOI/EOI markers)
//! - Respawn ffmpeg with backoff when the camera drops
//!
//! ffmpeg is spawned with `kill_on_drop(true)` so an aborted reader task
//! never leaves a zombie process behind.

use crate::error::{Error, Result};
use bytes::Bytes;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// JPEG start-of-image marker
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
/// JPEG end-of-image marker
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Initial respawn backoff
const BACKOFF_INITIAL: Duration = Duration::from_secs(1);
/// Maximum respawn backoff
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Camera capture configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// V4L2 device path, `rtsp://` URL, or video file path
    pub input: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

/// CameraService instance
pub struct CameraService {
    config: CameraConfig,
}

impl CameraService {
    /// Create new CameraService
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    /// Build the ffmpeg argument list for the configured input
    fn ffmpeg_args(&self) -> Vec<String> {
        let c = &self.config;
        let mut args: Vec<String> = Vec::new();

        if c.input.starts_with("rtsp://") {
            args.extend([
                "-rtsp_transport".into(),
                "tcp".into(),
                "-i".into(),
                c.input.clone(),
                "-vf".into(),
                format!("scale={}:{}", c.width, c.height),
                "-r".into(),
                c.frame_rate.to_string(),
            ]);
        } else if c.input.starts_with("/dev/") {
            args.extend([
                "-f".into(),
                "v4l2".into(),
                "-framerate".into(),
                c.frame_rate.to_string(),
                "-video_size".into(),
                format!("{}x{}", c.width, c.height),
                "-i".into(),
                c.input.clone(),
            ]);
        } else {
            // Video file input, consumed at native rate
            args.extend([
                "-re".into(),
                "-i".into(),
                c.input.clone(),
                "-vf".into(),
                format!("scale={}:{}", c.width, c.height),
                "-r".into(),
                c.frame_rate.to_string(),
            ]);
        }

        args.extend([
            "-f".into(),
            "image2pipe".into(),
            "-vcodec".into(),
            "mjpeg".into(),
            "-q:v".into(),
            "4".into(),
            "-loglevel".into(),
            "error".into(),
            "-".into(),
        ]);

        args
    }

    /// Start the capture loop.
    ///
    /// Returns a receiver of JPEG frames. The internal task respawns ffmpeg
    /// with backoff whenever it exits; it ends only when all receivers are
    /// dropped.
    pub fn start(self) -> mpsc::Receiver<Bytes> {
        // Small buffer: the pipeline should see fresh frames, not a backlog
        let (tx, rx) = mpsc::channel(4);

        tokio::spawn(async move {
            let mut backoff = BACKOFF_INITIAL;

            loop {
                match self.run_ffmpeg(&tx, &mut backoff).await {
                    Ok(()) => {
                        // Receiver dropped, shut down
                        tracing::info!("Camera capture stopped (no consumers)");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(
                            input = %self.config.input,
                            error = %e,
                            backoff_sec = backoff.as_secs(),
                            "Camera capture failed, respawning ffmpeg"
                        );
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(BACKOFF_MAX);
                    }
                }
            }
        });

        rx
    }

    /// Run one ffmpeg process to completion, feeding frames into `tx`.
    ///
    /// Ok(()) means the consumer went away; Err means ffmpeg failed or the
    /// stream ended and a respawn is needed.
    async fn run_ffmpeg(&self, tx: &mpsc::Sender<Bytes>, backoff: &mut Duration) -> Result<()> {
        let args = self.ffmpeg_args();
        tracing::info!(input = %self.config.input, "Spawning ffmpeg capture");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Camera(format!("ffmpeg spawn failed: {}", e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Camera("ffmpeg stdout not captured".to_string()))?;

        // An undrained stderr pipe fills up and stalls ffmpeg's stdout
        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_logger(stderr);
        }

        let mut splitter = FrameSplitter::new();
        let mut chunk = vec![0u8; 64 * 1024];

        loop {
            let n = stdout
                .read(&mut chunk)
                .await
                .map_err(|e| Error::Camera(format!("ffmpeg read failed: {}", e)))?;

            if n == 0 {
                // ffmpeg exited; collect status for the log
                let status = child.wait().await.ok();
                return Err(Error::Camera(format!(
                    "ffmpeg stream ended (status: {:?})",
                    status.map(|s| s.code())
                )));
            }

            for frame in splitter.push(&chunk[..n]) {
                // First complete frame proves the camera works again
                *backoff = BACKOFF_INITIAL;

                if tx.send(Bytes::from(frame)).await.is_err() {
                    return Ok(());
                }
            }
        }
    }

    /// Check that ffmpeg is available, returning its version line
    pub async fn check_ffmpeg() -> Result<String> {
        let output = Command::new("ffmpeg")
            .arg("-version")
            .output()
            .await
            .map_err(|e| Error::Camera(format!("ffmpeg not found: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Camera("ffmpeg version check failed".to_string()));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        let first_line = version.lines().next().unwrap_or("unknown");
        Ok(first_line.to_string())
    }
}

/// Drain ffmpeg's stderr line by line into the log.
///
/// The task ends when the child exits and the pipe closes.
fn spawn_stderr_logger<R>(stderr: R) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if !line.trim().is_empty() {
                tracing::warn!(line = %line, "ffmpeg stderr");
            }
        }
    })
}

/// Splits a concatenated MJPEG byte stream into complete JPEG frames.
///
/// Bytes before the first SOI marker (ffmpeg noise, partial frames after a
/// respawn) are discarded.
#[derive(Default)]
pub struct FrameSplitter {
    buf: Vec<u8>,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every complete frame it closed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            let Some(start) = find_marker(&self.buf, &JPEG_SOI) else {
                // No frame start in sight; keep a trailing 0xFF in case the
                // SOI marker is split across chunks
                let keep_tail = self.buf.last() == Some(&0xFF);
                self.buf.clear();
                if keep_tail {
                    self.buf.push(0xFF);
                }
                break;
            };
            let Some(end) = find_marker(&self.buf[start + 2..], &JPEG_EOI) else {
                // Incomplete frame; drop leading garbage and wait for more
                self.buf.drain(..start);
                break;
            };
            let end = start + 2 + end + 2;

            frames.push(self.buf[start..end].to_vec());
            self.buf.drain(..end);
        }

        frames
    }
}

/// Find the first occurrence of a 2-byte marker
fn find_marker(haystack: &[u8], marker: &[u8; 2]) -> Option<usize> {
    haystack
        .windows(2)
        .position(|w| w == marker)
}
