// src/video.rs - Webcam capture
use anyhow::{anyhow, Result};
use image::{DynamicImage, ImageBuffer};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;
use tracing::{debug, info, warn};

pub struct WebcamCapture {
    camera: Camera,
    /// Selfie view: flip so moving the hand right moves it right on screen.
    mirror: bool,
}

impl WebcamCapture {
    pub fn open(index: u32, mirror: bool) -> Result<Self> {
        debug!("Attempting to open camera index {}", index);

        let format = CameraFormat::new(Resolution::new(640, 480), FrameFormat::MJPEG, 30);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| anyhow!("Failed to open camera {}: {}", index, e))?;
        camera
            .open_stream()
            .map_err(|e| anyhow!("Failed to open camera stream: {}", e))?;

        info!(
            "Camera {} streaming at {}x{} @ {} fps",
            index,
            camera.resolution().width(),
            camera.resolution().height(),
            camera.frame_rate()
        );
        Ok(Self { camera, mirror })
    }

    /// Blocks until the next frame arrives.
    pub fn read_frame(&mut self) -> Result<DynamicImage> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| anyhow!("Failed to capture frame: {}", e))?;
        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| anyhow!("Failed to decode frame: {}", e))?;

        let (width, height) = (decoded.width(), decoded.height());
        let img: ImageBuffer<image::Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_raw(width, height, decoded.into_raw())
                .ok_or_else(|| anyhow!("Failed to create image buffer"))?;

        if self.mirror {
            Ok(DynamicImage::ImageRgb8(image::imageops::flip_horizontal(&img)))
        } else {
            Ok(DynamicImage::ImageRgb8(img))
        }
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            warn!("Failed to stop camera stream: {}", e);
        }
    }
}

/// Lists cameras for the startup log.
pub fn log_available_cameras() {
    match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
        Ok(cameras) => {
            info!("Found {} camera(s)", cameras.len());
            for (i, camera) in cameras.iter().enumerate() {
                info!("  [{}] {}", i, camera.human_name());
            }
        }
        Err(e) => warn!("Failed to query cameras: {}", e),
    }
}
