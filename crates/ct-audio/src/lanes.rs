//! Per-slot ring buffer lanes between voice threads and the device.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use ct_engine::Frame;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::traits::{VoiceSink, VoiceSlot, LANES};

/// Build a set of lanes holding `capacity` frames each.
pub fn lanes(capacity: usize, sample_rate: u32) -> (Arc<LaneWriter>, LaneMixer) {
    let mut producers = Vec::with_capacity(LANES);
    let mut consumers = Vec::with_capacity(LANES);
    for _ in 0..LANES {
        let (producer, consumer) = HeapRb::<i16>::new(capacity.max(1)).split();
        producers.push(Mutex::new(producer));
        consumers.push(consumer);
    }
    let writer = Arc::new(LaneWriter {
        producers,
        pending_skip: (0..LANES).map(|_| AtomicUsize::new(0)).collect(),
        sample_rate,
    });
    let mixer = LaneMixer {
        consumers,
        writer: writer.clone(),
    };
    (writer, mixer)
}

/// Write side of the lanes, shared by all voice threads.
pub struct LaneWriter {
    producers: Vec<Mutex<HeapProd<i16>>>,
    /// Frames the mixer should discard per lane (set by `silence`).
    pending_skip: Vec<AtomicUsize>,
    sample_rate: u32,
}

impl VoiceSink for LaneWriter {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn write(&self, slot: VoiceSlot, samples: &[i16]) -> usize {
        let Some(producer) = self.producers.get(slot.lane()) else {
            return 0;
        };
        let mut producer = producer.lock().unwrap_or_else(PoisonError::into_inner);
        producer.push_slice(samples)
    }

    fn silence(&self, slot: VoiceSlot) {
        let lane = slot.lane();
        let Some(producer) = self.producers.get(lane) else {
            return;
        };
        let producer = producer.lock().unwrap_or_else(PoisonError::into_inner);
        self.pending_skip[lane].store(producer.occupied_len(), Ordering::Release);
    }
}

/// Read side of the lanes, owned by the audio callback.
pub struct LaneMixer {
    consumers: Vec<HeapCons<i16>>,
    writer: Arc<LaneWriter>,
}

impl LaneMixer {
    /// Pop one frame from every lane, pan each by its channel and mix.
    /// Empty lanes contribute silence.
    pub fn next_frame(&mut self) -> Frame {
        let mut frame = Frame::silence();
        for (lane, consumer) in self.consumers.iter_mut().enumerate() {
            let skip = self.writer.pending_skip[lane].swap(0, Ordering::AcqRel);
            for _ in 0..skip {
                if consumer.try_pop().is_none() {
                    break;
                }
            }
            if let Some(sample) = consumer.try_pop() {
                frame.mix(Frame::panned(sample, lane / 2));
            }
        }
        frame
    }

    /// Fill an interleaved f32 device buffer with `channels` samples per
    /// frame. Extra channels beyond stereo are zeroed.
    pub fn fill(&mut self, data: &mut [f32], channels: usize) {
        for chunk in data.chunks_mut(channels.max(1)) {
            let frame = self.next_frame();
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
    }
}
