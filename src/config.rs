use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;

/// Delivery video codec, with the encoder it maps to and its default CRF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lower")]
pub enum VideoCodec {
    H264,
    H265,
}

impl VideoCodec {
    pub const fn encoder(self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::H265 => "libx265",
        }
    }

    pub const fn default_crf(self) -> u8 {
        match self {
            VideoCodec::H264 => 22,
            VideoCodec::H265 => 28,
        }
    }
}

/// Delivery audio codec. DVR audio is narrow-band mono, so it is kept mono
/// at the lowest sample rate the encoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lower")]
pub enum AudioCodec {
    Aac,
    Ac3,
}

impl AudioCodec {
    pub const fn encoder(self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Ac3 => "ac3",
        }
    }

    pub const fn sample_rate(self) -> u32 {
        match self {
            AudioCodec::Aac => 8_000,
            // ac3 only supports 32k/44.1k/48k
            AudioCodec::Ac3 => 32_000,
        }
    }
}

/// x264/x265 presets, fastest (largest output) first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
#[value(rename_all = "lower")]
pub enum Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl Preset {
    pub const fn as_str(self) -> &'static str {
        match self {
            Preset::Ultrafast => "ultrafast",
            Preset::Superfast => "superfast",
            Preset::Veryfast => "veryfast",
            Preset::Faster => "faster",
            Preset::Fast => "fast",
            Preset::Medium => "medium",
            Preset::Slow => "slow",
            Preset::Slower => "slower",
            Preset::Veryslow => "veryslow",
        }
    }
}

/// How each recording is turned into a concat-safe intermediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lower")]
pub enum SegmentMode {
    /// Copy video, re-encode audio padded to the video length.
    Pad,
    /// Copy audio, re-encode video to intra-only FFV1.
    Lossless,
    /// Copy both streams untouched.
    Copy,
}

impl fmt::Display for SegmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SegmentMode::Pad => "pad",
            SegmentMode::Lossless => "lossless",
            SegmentMode::Copy => "copy",
        })
    }
}

/// Resolved settings for one run; built once and only read afterwards.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub ffmpeg_path: PathBuf,
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
    pub crf: u8,
    pub preset: Preset,
    pub compat: bool,
    pub segment_mode: SegmentMode,
    pub jobs: usize,
}

impl PipelineConfig {
    /// Applies the compatibility override and fills in the codec's CRF when
    /// none was requested.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ffmpeg_path: PathBuf,
        video_codec: VideoCodec,
        audio_codec: AudioCodec,
        crf: Option<u8>,
        preset: Preset,
        compat: bool,
        segment_mode: SegmentMode,
        jobs: usize,
    ) -> Self {
        let video_codec = if compat { VideoCodec::H264 } else { video_codec };
        Self {
            ffmpeg_path,
            video_codec,
            audio_codec,
            crf: crf.unwrap_or_else(|| video_codec.default_crf()),
            preset,
            compat,
            segment_mode,
            jobs: jobs.max(1),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(
            PathBuf::from("ffmpeg"),
            VideoCodec::H264,
            AudioCodec::Aac,
            None,
            Preset::Medium,
            false,
            SegmentMode::Pad,
            1,
        )
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "video={} crf={} preset={} audio={} segments={} jobs={}",
            self.video_codec.encoder(),
            self.crf,
            self.preset.as_str(),
            self.audio_codec.encoder(),
            self.segment_mode,
            self.jobs,
        )?;
        if self.compat {
            write!(f, " compat=baseline@3.0")?;
        }
        Ok(())
    }
}
