//! Live voices: one thread per triggered cell, writing into the sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use ct_audio::{VoiceSink, VoiceSlot};
use ct_engine::{RenderMode, SampleBank, Voice, VoiceSpec};
use ct_ir::MAX_CHANNELS;
use tracing::{trace, warn};

/// What every voice thread of a session shares.
#[derive(Clone)]
pub(crate) struct VoiceContext {
    pub sink: Arc<dyn VoiceSink>,
    pub bank: Arc<Mutex<SampleBank>>,
    pub write_poll: Duration,
}

/// Handle to a running voice thread. Dropping the cancel sender wakes
/// the thread, which silences its slot and exits.
pub(crate) struct LiveVoice {
    cancel: Option<Sender<()>>,
    active: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl LiveVoice {
    fn spawn(slot: VoiceSlot, spec: VoiceSpec, ctx: &VoiceContext) -> Self {
        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        let active = Arc::new(AtomicBool::new(true));
        let flag = active.clone();
        let ctx = ctx.clone();
        let thread = thread::Builder::new()
            .name(format!("ct-voice-{}-{:?}", slot.channel, slot.kind))
            .spawn(move || run_voice(slot, spec, &ctx, &cancel_rx, &flag));
        match thread {
            Ok(handle) => Self {
                cancel: Some(cancel_tx),
                active,
                thread: Some(handle),
            },
            Err(err) => {
                warn!(channel = slot.channel, %err, "could not start voice thread");
                active.store(false, Ordering::Release);
                Self {
                    cancel: None,
                    active,
                    thread: None,
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn cancel(&mut self) {
        self.cancel.take();
    }

    fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    fn join(mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("voice thread panicked");
            }
        }
    }
}

/// Voices owned by the scheduler: at most one tone and one sample voice
/// per channel. Cancelled voices are kept until their thread exits.
#[derive(Default)]
pub(crate) struct VoiceTable {
    slots: [[Option<LiveVoice>; 2]; MAX_CHANNELS],
    retired: Vec<LiveVoice>,
}

impl VoiceTable {
    /// Cancel every voice in the table. Returns how many were still
    /// producing audio.
    pub fn cancel_all(&mut self) -> usize {
        let mut cancelled = 0;
        for slot in self.slots.iter_mut().flatten() {
            if let Some(mut voice) = slot.take() {
                if voice.is_active() {
                    cancelled += 1;
                }
                voice.cancel();
                self.retired.push(voice);
            }
        }
        cancelled
    }

    /// Start a voice at `slot`, cancelling whatever held it.
    pub fn activate(&mut self, slot: VoiceSlot, spec: VoiceSpec, ctx: &VoiceContext) {
        let Some(entry) = self
            .slots
            .get_mut(slot.channel)
            .and_then(|kinds| kinds.get_mut(slot.kind.index()))
        else {
            warn!(channel = slot.channel, "voice slot out of range");
            return;
        };
        if let Some(mut old) = entry.take() {
            old.cancel();
            self.retired.push(old);
        }
        *entry = Some(LiveVoice::spawn(slot, spec, ctx));
    }

    /// Join cancelled voices whose threads have exited.
    pub fn reap(&mut self) {
        let (done, running): (Vec<_>, Vec<_>) = self.retired.drain(..).partition(LiveVoice::is_finished);
        self.retired = running;
        done.into_iter().for_each(LiveVoice::join);
    }

    /// Wait for every voice thread, active or cancelled, to exit.
    pub fn join_all(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            if let Some(voice) = slot.take() {
                voice.join();
            }
        }
        self.retired.drain(..).for_each(LiveVoice::join);
    }
}

/// True if the voice was cancelled within `wait`.
fn cancelled(cancel: &Receiver<()>, wait: Duration) -> bool {
    matches!(cancel.recv_timeout(wait), Ok(()) | Err(RecvTimeoutError::Disconnected))
}

fn run_voice(slot: VoiceSlot, spec: VoiceSpec, ctx: &VoiceContext, cancel: &Receiver<()>, active: &AtomicBool) {
    let started = Instant::now();
    let rendered = {
        let mut bank = ctx.bank.lock().unwrap_or_else(PoisonError::into_inner);
        Voice::new(spec, RenderMode::Live).start(&mut bank)
    };
    let output = match rendered {
        Ok(output) if output.asset_error.is_none() => output,
        Ok(_) => {
            // Already logged by the voice; this slot just stays silent
            active.store(false, Ordering::Release);
            return;
        }
        Err(err) => {
            warn!(channel = slot.channel, %err, "voice render failed");
            active.store(false, Ordering::Release);
            return;
        }
    };

    // Cancelled while waiting on the bank: the slot may already belong
    // to the next row's voice, so touch nothing.
    if !matches!(cancel.try_recv(), Err(TryRecvError::Empty)) {
        trace!(channel = slot.channel, "voice cancelled before it sounded");
        active.store(false, Ordering::Release);
        return;
    }

    trace!(channel = slot.channel, frames = output.samples.len(), "voice started");
    let deadline = started + Duration::from_millis(output.duration_ms.into());
    let mut written = 0;
    while written < output.samples.len() {
        written += ctx.sink.write(slot, &output.samples[written..]);
        if written < output.samples.len() && cancelled(cancel, ctx.write_poll) {
            ctx.sink.silence(slot);
            active.store(false, Ordering::Release);
            return;
        }
    }
    if cancelled(cancel, deadline.saturating_duration_since(Instant::now())) {
        ctx.sink.silence(slot);
    }
    active.store(false, Ordering::Release);
}
