//! CPAL-based audio output backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use ct_ir::SAMPLE_RATE;
use tracing::{error, info};

use crate::lanes::{lanes, LaneMixer, LaneWriter};
use crate::traits::{AudioError, VoiceSink};

/// CPAL-based audio output. Holds the device stream; dropping it
/// releases the device.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    writer: Arc<LaneWriter>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Create a new CPAL output on the default device with lanes of
    /// `lane_capacity` frames.
    pub fn new(lane_capacity: usize) -> Result<(Self, LaneMixer), AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // Force stereo at the engine rate; the callback assumes 2-channel interleaving
        config.channels = 2;
        config.sample_rate = SampleRate(SAMPLE_RATE);

        let (writer, mixer) = lanes(lane_capacity, SAMPLE_RATE);
        let output = Self {
            device,
            config,
            stream: None,
            writer,
            running: Arc::new(AtomicBool::new(false)),
        };
        Ok((output, mixer))
    }

    /// Open the default device and start streaming.
    pub fn open(lane_capacity: usize) -> Result<Self, AudioError> {
        let (mut output, mixer) = Self::new(lane_capacity)?;
        output.build_stream(mixer)?;
        output.start()?;
        Ok(output)
    }

    /// Build the output stream. It stays paused until [`start`](Self::start).
    pub fn build_stream(&mut self, mut mixer: LaneMixer) -> Result<(), AudioError> {
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
                    mixer.fill(data, channels);
                },
                |err| error!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        info!(
            sample_rate = self.config.sample_rate.0,
            channels = self.config.channels,
            "audio stream open"
        );
        self.stream = Some(stream);
        Ok(())
    }

    /// Shared handle voice threads write into.
    pub fn sink(&self) -> Arc<dyn VoiceSink> {
        self.writer.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Resume the stream and let the lanes through.
    pub fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}
