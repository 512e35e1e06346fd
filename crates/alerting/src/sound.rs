//! Looped alarm playback

use hound::{SampleFormat, WavReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::AlertError;

/// Something that can loop an alarm sound on demand
pub trait AlarmSound {
    /// Start looping from the beginning of the clip
    fn start_loop(&mut self) -> Result<(), AlertError>;

    fn stop(&mut self) -> Result<(), AlertError>;

    /// Release the audio device
    fn shutdown(&mut self) {}
}

/// Decoded WAV clip, interleaved samples in [-1.0, 1.0]
#[derive(Debug, Clone)]
pub struct WavClip {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl WavClip {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AlertError> {
        let path = path.as_ref();
        let reader = WavReader::open(path)
            .map_err(|e| AlertError::Audio(format!("{}: {}", path.display(), e)))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| AlertError::Audio(e.to_string()))?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| AlertError::Audio(e.to_string()))?
            }
        };

        let channels = spec.channels.max(1) as usize;
        if samples.len() < channels {
            return Err(AlertError::Audio(format!("{}: empty clip", path.display())));
        }

        info!(
            "Alarm sound '{}' loaded ({} Hz, {} ch, {} frames)",
            path.display(),
            spec.sample_rate,
            channels,
            samples.len() / channels
        );

        Ok(Self {
            samples,
            channels,
            sample_rate: spec.sample_rate,
        })
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }
}

/// Endless reader over a [`WavClip`], resampled to the output rate.
///
/// Shares its play/rewind flags with the owner so the audio callback thread
/// never needs a lock.
pub struct LoopSource {
    clip: WavClip,
    step: f64,
    cursor: f64,
    playing: Arc<AtomicBool>,
    rewind: Arc<AtomicBool>,
}

impl LoopSource {
    pub fn new(clip: WavClip, output_rate: u32, playing: Arc<AtomicBool>, rewind: Arc<AtomicBool>) -> Self {
        let step = clip.sample_rate as f64 / output_rate.max(1) as f64;
        Self {
            clip,
            step,
            cursor: 0.0,
            playing,
            rewind,
        }
    }

    /// Fill an interleaved output buffer with `out_channels` channels
    pub fn fill(&mut self, out: &mut [f32], out_channels: usize) {
        if self.rewind.swap(false, Ordering::AcqRel) {
            self.cursor = 0.0;
        }
        let frames = self.clip.frames();
        if frames == 0 || !self.playing.load(Ordering::Acquire) {
            out.iter_mut().for_each(|s| *s = 0.0);
            return;
        }

        let channels = self.clip.channels.max(1);
        for frame in out.chunks_mut(out_channels.max(1)) {
            let index = (self.cursor as usize).min(frames - 1);
            for (c, sample) in frame.iter_mut().enumerate() {
                *sample = self.clip.samples[index * channels + c.min(channels - 1)];
            }
            self.cursor += self.step;
            if self.cursor >= frames as f64 {
                self.cursor -= frames as f64;
            }
        }
    }
}

#[cfg(feature = "audio")]
pub use self::device::CpalAlarm;

#[cfg(feature = "audio")]
mod device {
    use super::*;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, SizedSample};
    use tracing::{debug, warn};

    /// Alarm played on the default output device
    pub struct CpalAlarm {
        stream: Option<cpal::Stream>,
        playing: Arc<AtomicBool>,
        rewind: Arc<AtomicBool>,
    }

    impl CpalAlarm {
        /// Decode `path` and open the default output device
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AlertError> {
            let clip = WavClip::open(path)?;

            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| AlertError::Audio("no output device available".into()))?;
            if let Ok(name) = device.name() {
                debug!("Output device: {}", name);
            }
            let supported = device
                .default_output_config()
                .map_err(|e| AlertError::Audio(e.to_string()))?;
            let config: cpal::StreamConfig = supported.config();

            let playing = Arc::new(AtomicBool::new(false));
            let rewind = Arc::new(AtomicBool::new(false));
            let source = LoopSource::new(clip, config.sample_rate.0, playing.clone(), rewind.clone());

            let stream = match supported.sample_format() {
                cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, source)?,
                cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, source)?,
                cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, source)?,
                other => {
                    return Err(AlertError::Audio(format!("unsupported sample format {:?}", other)))
                }
            };
            stream.play().map_err(|e| AlertError::Audio(e.to_string()))?;

            Ok(Self {
                stream: Some(stream),
                playing,
                rewind,
            })
        }
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut source: LoopSource,
    ) -> Result<cpal::Stream, AlertError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = config.channels as usize;
        let mut scratch: Vec<f32> = Vec::new();
        let err_fn = |err: cpal::StreamError| warn!("An error occurred on the output stream: {}", err);

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    source.fill(&mut scratch, channels);
                    for (out, s) in data.iter_mut().zip(scratch.iter()) {
                        *out = T::from_sample(*s);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AlertError::Audio(e.to_string()))
    }

    impl AlarmSound for CpalAlarm {
        fn start_loop(&mut self) -> Result<(), AlertError> {
            if self.stream.is_none() {
                return Err(AlertError::Audio("audio device already released".into()));
            }
            self.rewind.store(true, Ordering::Release);
            self.playing.store(true, Ordering::Release);
            Ok(())
        }

        fn stop(&mut self) -> Result<(), AlertError> {
            self.playing.store(false, Ordering::Release);
            Ok(())
        }

        fn shutdown(&mut self) {
            self.playing.store(false, Ordering::Release);
            if let Some(stream) = self.stream.take() {
                if let Err(e) = stream.pause() {
                    debug!("Failed to pause output stream: {}", e);
                }
            }
        }
    }

    impl Drop for CpalAlarm {
        fn drop(&mut self) {
            self.shutdown();
        }
    }
}
