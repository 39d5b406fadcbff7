use std::path::Path;

use crate::shared::frame::Frame;
use crate::source::domain::capture_device::CaptureDevice;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("ffmpeg initialisation failed: {0}")]
    Init(#[source] ffmpeg_next::Error),
    #[error("no '{0}' capture backend in this ffmpeg build")]
    BackendUnavailable(&'static str),
    #[error("cannot open {target}: {source}")]
    Open {
        target: String,
        #[source]
        source: ffmpeg_next::Error,
    },
    #[error("{0} has no video stream")]
    NoVideoStream(String),
    #[error("cannot set up decoder for {target}: {source}")]
    Decoder {
        target: String,
        #[source]
        source: ffmpeg_next::Error,
    },
}

#[cfg(target_os = "linux")]
const CAPTURE_FORMAT: &str = "v4l2";
#[cfg(target_os = "macos")]
const CAPTURE_FORMAT: &str = "avfoundation";
#[cfg(target_os = "windows")]
const CAPTURE_FORMAT: &str = "vfwcap";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const CAPTURE_FORMAT: &str = "v4l2";

/// Reads frames from a camera or a video file via ffmpeg-next.
///
/// Each decoded frame is converted to RGB24. Once the input is exhausted or
/// [`release`](CaptureDevice::release) has been called, reads return
/// `Ok(None)`.
pub struct FfmpegCaptureDevice {
    description: String,
    stream: Option<DecodeState>,
}

struct DecodeState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
}

// Safety: FfmpegCaptureDevice is moved onto the capture thread and only
// used from there. The raw pointers inside ffmpeg types are not shared.
unsafe impl Send for FfmpegCaptureDevice {}

impl FfmpegCaptureDevice {
    /// Opens camera `index` through the platform capture backend.
    pub fn open_device(index: u32) -> Result<Self, CaptureError> {
        ffmpeg_next::init().map_err(CaptureError::Init)?;
        ffmpeg_next::device::register_all();

        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name() == CAPTURE_FORMAT)
            .ok_or(CaptureError::BackendUnavailable(CAPTURE_FORMAT))?;

        let url = device_url(index);
        let mut options = ffmpeg_next::Dictionary::new();
        if CAPTURE_FORMAT == "avfoundation" {
            // avfoundation refuses to open without an explicit rate
            options.set("framerate", "30");
        }

        let ictx = ffmpeg_next::format::open_with(&url, &format, options)
            .map_err(|source| CaptureError::Open {
                target: url.clone(),
                source,
            })?
            .input();

        let description = format!("camera {index} ({CAPTURE_FORMAT} {url})");
        Self::from_input(ictx, description)
    }

    /// Opens a video file; its end is reported as end-of-stream.
    pub fn open_file(path: &Path) -> Result<Self, CaptureError> {
        ffmpeg_next::init().map_err(CaptureError::Init)?;
        let ictx = ffmpeg_next::format::input(path).map_err(|source| CaptureError::Open {
            target: path.display().to_string(),
            source,
        })?;
        Self::from_input(ictx, path.display().to_string())
    }

    /// A bare number selects a camera index, anything else is a file path.
    pub fn open(device: &str) -> Result<Self, CaptureError> {
        match device.parse::<u32>() {
            Ok(index) => Self::open_device(index),
            Err(_) => Self::open_file(Path::new(device)),
        }
    }

    fn from_input(
        ictx: ffmpeg_next::format::context::Input,
        description: String,
    ) -> Result<Self, CaptureError> {
        let decoder_error = |source| CaptureError::Decoder {
            target: description.clone(),
            source,
        };

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::NoVideoStream(description.clone()))?;
        let video_stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(decoder_error)?;
        let decoder = codec_ctx.decoder().video().map_err(decoder_error)?;

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(decoder_error)?;

        log::info!("Opened {description} ({width}x{height})");

        Ok(Self {
            description,
            stream: Some(DecodeState {
                ictx,
                decoder,
                scaler,
                width,
                height,
                video_stream_index,
                frame_index: 0,
                flushing: false,
            }),
        })
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.stream.as_ref().map(|s| (s.width, s.height))
    }
}

impl DecodeState {
    fn try_receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;
        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if let Some(frame) = self.try_receive()? {
            return Ok(Some(frame));
        }
        if self.flushing {
            return Ok(None);
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                return self.try_receive();
            };

            if stream.index() != self.video_stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
        }
    }
}

impl CaptureDevice for FfmpegCaptureDevice {
    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let Some(state) = self.stream.as_mut() else {
            return Ok(None);
        };
        let frame = state.next_frame()?;
        if frame.is_none() {
            // Drained; close the input early instead of waiting for release.
            self.stream = None;
        }
        Ok(frame)
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("Closed {}", self.description);
        }
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

#[cfg(target_os = "linux")]
fn device_url(index: u32) -> String {
    format!("/dev/video{index}")
}

#[cfg(not(target_os = "linux"))]
fn device_url(index: u32) -> String {
    index.to_string()
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
