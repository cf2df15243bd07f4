//! Camera acquisition with guaranteed release.
//!
//! A [`CameraDevice`] hands out at most one live [`CameraStream`] at a time.
//! Callers never hold the stream directly: they go through a
//! [`CameraSession`], which releases the device when the capture finishes,
//! when the session's cancellation token fires, or when the session is
//! dropped, whichever comes first.
//!
//! [`CommandCamera`] is the shipped device: it holds the video device node
//! open for the lifetime of the session and grabs still frames through an
//! external capture command (by default `ffmpeg` reading one V4L2 frame)
//! that writes an encoded image to stdout.

use crate::error::CardScanError;
use crate::pipeline::capture::{CapturedImage, ImageSource};
use async_trait::async_trait;
use image::DynamicImage;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Which way the requested camera points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    /// Rear camera, pointed at the card. (default)
    #[default]
    Environment,
    /// Front camera.
    User,
}

/// A camera that can be opened exclusively.
pub trait CameraDevice: Send + Sync {
    /// Identifier used in logs and errors (e.g. `/dev/video0`).
    fn name(&self) -> String;

    /// Acquire the device.
    ///
    /// # Errors
    /// [`CardScanError::PermissionDenied`] when access is refused,
    /// [`CardScanError::CameraUnavailable`] when no matching device exists,
    /// [`CardScanError::CameraBusy`] when another session holds it.
    fn open(&self, facing: Facing) -> Result<Box<dyn CameraStream>, CardScanError>;
}

/// A live, exclusively held camera stream.
#[async_trait]
pub trait CameraStream: Send {
    /// Grab the current frame.
    async fn grab_frame(&mut self) -> Result<DynamicImage, CardScanError>;

    /// Give the device back. Must be idempotent.
    fn release(&mut self);
}

/// Scoped ownership of a camera stream.
pub struct CameraSession {
    stream: Option<Box<dyn CameraStream>>,
    device: String,
    cancel: CancellationToken,
}

impl CameraSession {
    /// Open `device` and tie the session to `cancel`.
    pub fn open(
        device: &dyn CameraDevice,
        facing: Facing,
        cancel: CancellationToken,
    ) -> Result<Self, CardScanError> {
        if cancel.is_cancelled() {
            return Err(CardScanError::Cancelled);
        }
        let stream = device.open(facing)?;
        info!("Camera {} acquired ({:?})", device.name(), facing);
        Ok(Self {
            stream: Some(stream),
            device: device.name(),
            cancel,
        })
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Grab one frame and encode it as JPEG at `quality`.
    ///
    /// Cancellation while the frame is being grabbed releases the device
    /// before returning [`CardScanError::Cancelled`]; a failed grab releases
    /// it too, so the camera is never left held by a dead session.
    pub async fn capture(&mut self, quality: u8) -> Result<CapturedImage, CardScanError> {
        let cancel = self.cancel.clone();
        let stream = self.stream.as_mut().ok_or_else(|| CardScanError::CaptureFailed {
            detail: format!("camera {} was already released", self.device),
        })?;

        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CardScanError::Cancelled),
            frame = stream.grab_frame() => frame,
        };

        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                self.release();
                return Err(e);
            }
        };
        debug!("Captured {}x{} frame", frame.width(), frame.height());

        CapturedImage::from_raster(
            &frame,
            quality,
            ImageSource::Camera {
                device: self.device.clone(),
            },
        )
    }

    /// Release the device now. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            info!("Camera {} released", self.device);
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Open `device`, grab a single frame and release the device on every path.
pub async fn capture_once(
    device: &dyn CameraDevice,
    facing: Facing,
    quality: u8,
    cancel: CancellationToken,
) -> Result<CapturedImage, CardScanError> {
    let mut session = CameraSession::open(device, facing, cancel)?;
    let result = session.capture(quality).await;
    session.release();
    result
}

// ── Command-driven V4L2 camera ───────────────────────────────────────────

/// Device nodes currently held by a session in this process.
static HELD_DEVICES: Lazy<Mutex<HashSet<PathBuf>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// A camera read through an external still-capture command.
///
/// `args` may contain the placeholder `{device}`, replaced by the device path.
#[derive(Debug, Clone)]
pub struct CommandCamera {
    pub device: PathBuf,
    pub facing: Facing,
    pub program: String,
    pub args: Vec<String>,
}

impl CommandCamera {
    /// `ffmpeg` grabbing a single MJPEG frame from a V4L2 device.
    pub fn v4l2(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            facing: Facing::Environment,
            program: "ffmpeg".to_string(),
            args: [
                "-loglevel", "error", "-f", "v4l2", "-i", "{device}", "-frames:v", "1", "-f",
                "image2pipe", "-vcodec", "mjpeg", "-",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }

    /// Use a different capture command.
    pub fn with_command(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.program = program.into();
        self.args = args;
        self
    }

    pub fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }
}

impl CameraDevice for CommandCamera {
    fn name(&self) -> String {
        self.device.display().to_string()
    }

    fn open(&self, facing: Facing) -> Result<Box<dyn CameraStream>, CardScanError> {
        if facing != self.facing {
            return Err(CardScanError::CameraUnavailable {
                device: format!("{} ({:?}-facing)", self.name(), facing),
            });
        }

        let handle = open_device_node(&self.device)?;

        let mut held = HELD_DEVICES
            .lock()
            .map_err(|_| CardScanError::Internal("camera registry poisoned".into()))?;
        if !held.insert(self.device.clone()) {
            return Err(CardScanError::CameraBusy { device: self.name() });
        }

        Ok(Box::new(CommandStream {
            device: self.device.clone(),
            program: self.program.clone(),
            args: self.args.clone(),
            handle: Some(handle),
        }))
    }
}

fn open_device_node(path: &Path) -> Result<File, CardScanError> {
    File::open(path).map_err(|e| device_error(path.display().to_string(), e))
}

/// Classify a failure to open a device node.
fn device_error(device: String, e: std::io::Error) -> CardScanError {
    match e.kind() {
        std::io::ErrorKind::NotFound => CardScanError::CameraUnavailable { device },
        std::io::ErrorKind::PermissionDenied => CardScanError::PermissionDenied { device },
        _ => CardScanError::CaptureFailed {
            detail: format!("{device}: {e}"),
        },
    }
}

struct CommandStream {
    device: PathBuf,
    program: String,
    args: Vec<String>,
    handle: Option<File>,
}

#[async_trait]
impl CameraStream for CommandStream {
    async fn grab_frame(&mut self) -> Result<DynamicImage, CardScanError> {
        if self.handle.is_none() {
            return Err(CardScanError::CaptureFailed {
                detail: "stream already released".into(),
            });
        }

        let device = self.device.display().to_string();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace("{device}", &device))
            .collect();
        debug!("Running capture command: {} {:?}", self.program, args);

        // kill_on_drop: a cancelled capture must not leave the child holding the device.
        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CardScanError::CaptureFailed {
                detail: format!("could not run '{}': {e}", self.program),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CardScanError::CaptureFailed {
                detail: format!("'{}' exited with {}: {}", self.program, output.status, stderr.trim()),
            });
        }

        image::load_from_memory(&output.stdout).map_err(|e| CardScanError::CaptureFailed {
            detail: format!("capture command produced no decodable frame: {e}"),
        })
    }

    fn release(&mut self) {
        if self.handle.take().is_some() {
            match HELD_DEVICES.lock() {
                Ok(mut held) => {
                    held.remove(&self.device);
                }
                Err(_) => warn!("camera registry poisoned while releasing {}", self.device.display()),
            }
        }
    }
}

impl Drop for CommandStream {
    fn drop(&mut self) {
        self.release();
    }
}
