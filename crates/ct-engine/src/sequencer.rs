//! Row sequencing: which row plays next, with the loop wrap rule.
//!
//! The cursor starts at row 0. After each row it moves to the next one;
//! with looping enabled, stepping past `loop_end` wraps to `loop_start`
//! and counts one completed iteration. Without looping, stepping past
//! the last row ends playback.

use ct_ir::{LoopWindow, Song};

/// Result of [`RowCursor::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the next row.
    Row(usize),
    /// Wrapped back to the loop start; `iteration` loop passes are done.
    Wrapped { row: usize, iteration: u32 },
    /// Nothing left to play.
    End,
}

#[derive(Clone, Debug)]
pub struct RowCursor {
    row: usize,
    rows: usize,
    window: LoopWindow,
    single: bool,
    loops: u32,
}

impl RowCursor {
    /// A cursor over the whole song, starting at row 0.
    pub fn new(song: &Song) -> Self {
        Self {
            row: 0,
            rows: song.row_count(),
            window: song.loop_window(),
            single: false,
            loops: 0,
        }
    }

    /// A cursor that plays `row` once and ends.
    pub fn single_row(song: &Song, row: usize) -> Self {
        Self {
            row,
            single: true,
            ..Self::new(song)
        }
    }

    /// Row currently under the cursor.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Loop iterations completed so far.
    pub fn loops(&self) -> u32 {
        self.loops
    }

    pub fn advance(&mut self) -> Advance {
        if self.single {
            return Advance::End;
        }
        let next = self.row + 1;
        if self.window.enabled() && next > self.window.end() {
            self.row = self.window.start();
            self.loops += 1;
            return Advance::Wrapped {
                row: self.row,
                iteration: self.loops,
            };
        }
        if next >= self.rows {
            return Advance::End;
        }
        self.row = next;
        Advance::Row(next)
    }

    /// Iterate the rows this cursor visits, starting with the current one.
    /// Never ends while looping is enabled.
    pub fn rows(self) -> Rows {
        Rows {
            cursor: self,
            started: false,
            done: false,
        }
    }
}

/// Iterator returned by [`RowCursor::rows`].
#[derive(Clone, Debug)]
pub struct Rows {
    cursor: RowCursor,
    started: bool,
    done: bool,
}

impl Iterator for Rows {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.cursor.row());
        }
        match self.cursor.advance() {
            Advance::Row(row) | Advance::Wrapped { row, .. } => Some(row),
            Advance::End => {
                self.done = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(rows: usize) -> Song {
        Song::new(2, rows).unwrap()
    }

    #[test]
    fn plays_every_row_once_without_loop() {
        let rows: Vec<usize> = RowCursor::new(&song(4)).rows().collect();
        assert_eq!(rows, vec![0, 1, 2, 3]);
    }

    #[test]
    fn loop_wraps_from_end_to_start() {
        let mut song = song(8);
        song.set_loop(2, 5).unwrap();
        let rows: Vec<usize> = RowCursor::new(&song).rows().take(11).collect();
        assert_eq!(rows, vec![0, 1, 2, 3, 4, 5, 2, 3, 4, 5, 2]);
    }

    #[test]
    fn rows_after_loop_end_are_never_played() {
        let mut song = song(8);
        song.set_loop(2, 5).unwrap();
        assert!(RowCursor::new(&song).rows().take(200).all(|row| row <= 5));
    }

    #[test]
    fn wrap_reports_iteration() {
        let mut song = song(4);
        song.set_loop(0, 1).unwrap();
        let mut cursor = RowCursor::new(&song);
        assert_eq!(cursor.advance(), Advance::Row(1));
        assert_eq!(cursor.advance(), Advance::Wrapped { row: 0, iteration: 1 });
        assert_eq!(cursor.advance(), Advance::Row(1));
        assert_eq!(cursor.advance(), Advance::Wrapped { row: 0, iteration: 2 });
        assert_eq!(cursor.loops(), 2);
    }

    #[test]
    fn loop_ending_on_last_row_wraps() {
        let mut song = song(4);
        song.set_loop(1, 3).unwrap();
        let rows: Vec<usize> = RowCursor::new(&song).rows().take(7).collect();
        assert_eq!(rows, vec![0, 1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn invalid_loop_plays_straight_through() {
        let mut song = song(4);
        assert!(song.set_loop(3, 3).is_err());
        let rows: Vec<usize> = RowCursor::new(&song).rows().collect();
        assert_eq!(rows, vec![0, 1, 2, 3]);
    }

    #[test]
    fn single_row_plays_once() {
        let mut song = song(8);
        song.set_loop(0, 7).unwrap();
        let rows: Vec<usize> = RowCursor::single_row(&song, 5).rows().collect();
        assert_eq!(rows, vec![5]);
    }
}
