//! Offline rendering of a whole song into one stereo buffer.

use std::sync::Arc;

use ct_ir::{Song, SAMPLE_RATE};
use tracing::{debug, info};

use crate::bank::{SampleBank, SampleLoader};
use crate::error::Result;
use crate::frame::Frame;
use crate::mixer::{active_cells, mix_into, mix_row, silent_buffer};
use crate::sequencer::{Advance, RowCursor};

/// Passes through the loop body in an offline render of a looping song.
pub const OFFLINE_LOOP_PASSES: u32 = 4;

/// What an offline render produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderReport {
    pub rows: usize,
    /// Times the loop body was rendered (0 without a loop).
    pub loop_passes: u32,
    pub frames: usize,
    pub voices: usize,
    pub clamped_voices: usize,
    pub failed_voices: usize,
}

impl RenderReport {
    /// Rendered length in seconds.
    pub fn seconds(&self) -> f64 {
        self.frames as f64 / SAMPLE_RATE as f64
    }
}

#[derive(Clone, Debug)]
pub struct Rendered {
    pub frames: Vec<Frame>,
    pub report: RenderReport,
}

/// Rows an offline render visits: the song from row 0 following the same
/// wrap rule as live playback, cut after the last loop pass.
pub fn render_plan(song: &Song) -> Vec<usize> {
    let mut cursor = RowCursor::new(song);
    let mut rows = vec![cursor.row()];
    loop {
        match cursor.advance() {
            Advance::Row(row) => rows.push(row),
            Advance::Wrapped { row, iteration } if iteration < OFFLINE_LOOP_PASSES => rows.push(row),
            Advance::Wrapped { .. } | Advance::End => break,
        }
    }
    rows
}

/// Renders songs offline. Holds a sample bank so repeated renders reuse
/// decoded assets.
pub struct Renderer {
    bank: SampleBank,
}

impl Renderer {
    pub fn new(loader: Arc<dyn SampleLoader>) -> Self {
        Self {
            bank: SampleBank::new(loader),
        }
    }

    /// Mix `song` into a stereo buffer of `rows * row_frames` frames.
    /// All-rest rows contribute silence.
    pub fn render(&mut self, song: &Song) -> Result<Rendered> {
        let plan = render_plan(song);
        let row_frames = song.row_frames();
        let duration_ms = song.row_duration_ms();
        let mut frames = silent_buffer(plan.len() * row_frames)?;
        let mut report = RenderReport {
            rows: plan.len(),
            loop_passes: if song.loop_window().enabled() {
                OFFLINE_LOOP_PASSES
            } else {
                0
            },
            frames: frames.len(),
            ..RenderReport::default()
        };

        for (index, &row) in plan.iter().enumerate() {
            let cells = active_cells(song, row);
            if cells.is_empty() {
                continue;
            }
            let mix = mix_row(&cells, row_frames, duration_ms, &mut self.bank)?;
            debug!(row, voices = mix.voices, "rendered row");
            let start = index * row_frames;
            mix_into(&mut frames[start..start + row_frames], &mix.frames);
            report.voices += mix.voices;
            report.clamped_voices += mix.clamped;
            report.failed_voices += mix.failed;
        }

        info!(
            rows = report.rows,
            frames = report.frames,
            seconds = report.seconds(),
            "offline render complete"
        );
        Ok(Rendered { frames, report })
    }
}
