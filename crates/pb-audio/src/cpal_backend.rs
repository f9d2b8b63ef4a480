//! CPAL-based audio output backend.
//!
//! The render thread pushes frames into a ring buffer; the device callback
//! pops them. A full ring parks the render thread, which is what paces the
//! engine to the device clock. `cpal::Stream` is not `Send` on every
//! platform, so create the output on the thread that will write to it.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use pb_engine::Frame;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::traits::{AudioError, AudioOutput};

/// CPAL-based audio output.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    producer: HeapProd<Frame>,
    running: Arc<AtomicBool>,
    park: Duration,
}

impl CpalOutput {
    /// Open the default device at `sample_rate` with room for
    /// `buffer_frames` frames between render thread and device.
    pub fn new(
        sample_rate: u32,
        buffer_frames: usize,
    ) -> Result<(Self, HeapCons<Frame>), AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // The stream callback assumes 2-channel interleaving
        config.channels = 2;
        config.sample_rate = SampleRate(sample_rate);

        let rb = HeapRb::<Frame>::new(buffer_frames.max(64));
        let (producer, consumer) = rb.split();

        // Sleep for roughly a sixteenth of the ring when it is full.
        let park = Duration::from_micros(
            (buffer_frames.max(64) as u64 * 1_000_000) / (sample_rate.max(1) as u64 * 16),
        );

        info!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            buffer_frames,
            "Opened audio output."
        );

        let output = Self {
            device,
            config,
            stream: None,
            producer,
            running: Arc::new(AtomicBool::new(false)),
            park,
        };

        Ok((output, consumer))
    }

    /// Build the device stream that drains `consumer`.
    pub fn build_stream(&mut self, mut consumer: HeapCons<Frame>) -> Result<(), AudioError> {
        let running = self.running.clone();
        let channels = self.config.channels as usize;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }

                    for chunk in data.chunks_mut(channels) {
                        let frame = consumer.try_pop().unwrap_or_default();
                        let left = frame.left as f32 / 32768.0;
                        let right = frame.right as f32 / 32768.0;
                        for (i, sample) in chunk.iter_mut().enumerate() {
                            *sample = match i {
                                0 => left,
                                1 => right,
                                _ => 0.0,
                            };
                        }
                    }
                },
                |err| error!(err = %err, "Audio stream error."),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        self.stream = Some(stream);
        Ok(())
    }

    /// Open the default device and build its stream in one go.
    pub fn open(sample_rate: u32, buffer_frames: usize) -> Result<Self, AudioError> {
        let (mut output, consumer) = Self::new(sample_rate, buffer_frames)?;
        output.build_stream(consumer)?;
        Ok(output)
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn write(&mut self, frames: &[Frame]) -> Result<(), AudioError> {
        let mut written = 0;
        while written < frames.len() {
            if !self.running.load(Ordering::Relaxed) {
                return Err(AudioError::NotRunning);
            }
            written += self.producer.push_slice(&frames[written..]);
            if written < frames.len() && self.producer.is_full() {
                std::thread::sleep(self.park);
            }
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}
