//! Base64 Media Decoder - 图像与音频解码
//!
//! - 图像: base64 → JPEG/PNG → RGBA8
//! - 音频: base64 → symphonia (WAV/MP3) → 交错 f32 → 重采样到固定输出格式

use base64::{engine::general_purpose, Engine as _};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{DecodeError, MediaDecoderPort};
use crate::domain::{AudioClip, DecodedFrame, DecodedMedia, MediaKind};

/// 音频输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
        }
    }
}

/// base64 媒体解码器
#[derive(Debug, Clone, Default)]
pub struct Base64MediaDecoder {
    output: OutputFormat,
}

impl Base64MediaDecoder {
    pub fn new(output: OutputFormat) -> Self {
        Self { output }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output
    }

    fn decode_base64(&self, payload: &str) -> Result<Vec<u8>, DecodeError> {
        // 兼容 data URL 形式
        let encoded = match payload.strip_prefix("data:") {
            Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
            None => payload,
        };
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }

        general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| DecodeError::InvalidBase64(e.to_string()))
    }

    fn decode_image(&self, bytes: &[u8]) -> Result<DecodedFrame, DecodeError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| DecodeError::ImageError(e.to_string()))?;
        Ok(DecodedFrame::new(image.to_rgba8()))
    }

    /// 使用 symphonia 解码为交错 PCM
    fn decode_pcm(&self, bytes: Vec<u8>) -> Result<(Vec<f32>, u32, u16), DecodeError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::AudioError(format!("Probe failed: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| DecodeError::AudioError("No audio track found".to_string()))?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| DecodeError::AudioError("Unknown sample rate".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::AudioError(format!("Decoder creation failed: {}", e)))?;

        let track_id = track.id;
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16);
        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    return Err(DecodeError::AudioError(format!("Packet read error: {}", e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable audio packet");
                    continue;
                }
            };

            let spec = *decoded.spec();
            let num_frames = decoded.frames();
            // MP3 的声道数只有解出第一个包后才知道
            channels.get_or_insert(spec.channels.count() as u16);

            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            let actual_samples = num_frames * spec.channels.count();
            samples.extend(&sample_buf.samples()[..actual_samples]);
        }

        let channels =
            channels.ok_or_else(|| DecodeError::AudioError("Unknown channel count".to_string()))?;
        if samples.is_empty() {
            return Err(DecodeError::AudioError("No audio samples decoded".to_string()));
        }

        Ok((samples, sample_rate, channels))
    }

    fn decode_audio(&self, bytes: Vec<u8>) -> Result<AudioClip, DecodeError> {
        let (samples, sample_rate, channels) = self.decode_pcm(bytes)?;
        let samples = remix(&samples, channels, self.output.channels);
        let samples = resample(
            &samples,
            sample_rate,
            self.output.sample_rate,
            self.output.channels,
        );
        Ok(AudioClip::new(
            samples,
            self.output.sample_rate,
            self.output.channels,
        ))
    }
}

impl MediaDecoderPort for Base64MediaDecoder {
    fn decode(&self, kind: MediaKind, payload: &str) -> Result<DecodedMedia, DecodeError> {
        let bytes = self.decode_base64(payload)?;
        match kind {
            MediaKind::Image => self.decode_image(&bytes).map(DecodedMedia::Frame),
            MediaKind::Audio => self.decode_audio(bytes).map(DecodedMedia::Audio),
        }
    }
}

/// 声道转换: 多声道先平均为单声道，再复制到目标声道数
fn remix(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    let from = usize::from(from.max(1));
    let to = usize::from(to.max(1));
    if from == to {
        return samples.to_vec();
    }

    let mut remixed = Vec::with_capacity(samples.len() / from * to);
    for frame in samples.chunks_exact(from) {
        let mono = frame.iter().sum::<f32>() / from as f32;
        remixed.extend(std::iter::repeat(mono).take(to));
    }
    remixed
}

/// 简单线性重采样
fn resample(samples: &[f32], from_rate: u32, to_rate: u32, channels: u16) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let channel_count = usize::from(channels.max(1));
    let frame_count = samples.len() / channel_count;
    if frame_count == 0 {
        return Vec::new();
    }
    let new_frame_count = (frame_count as f64 * ratio) as usize;
    let mut resampled = Vec::with_capacity(new_frame_count * channel_count);

    for i in 0..new_frame_count {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos as usize;
        let frac = src_pos - src_idx as f64;

        for ch in 0..channel_count {
            let idx0 = src_idx * channel_count + ch;
            let idx1 = ((src_idx + 1).min(frame_count - 1)) * channel_count + ch;

            let s0 = samples.get(idx0).copied().unwrap_or(0.0);
            let s1 = samples.get(idx1).copied().unwrap_or(s0);

            resampled.push(s0 + (s1 - s0) * frac as f32);
        }
    }

    resampled
}
