//! ctracker CLI: live playback, single-row preview and WAV export.
//!
//! Usage:
//!   ct-cli song.json
//!   ct-cli song.json --row 4
//!   ct-cli song.json --bpm 140 --loop 0:7
//!   ct-cli song.json --wav output.wav

mod song_file;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use ct_master::{Controller, Note, PlaybackEvent, Song, WavLoader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use song_file::SongFile;

#[derive(Parser, Debug)]
#[command(name = "ct-cli")]
#[command(about = "Step-sequencer playback and WAV export", long_about = None)]
struct Cli {
    /// Song file (JSON)
    song: PathBuf,

    /// Render offline to this WAV file instead of playing
    #[arg(short, long)]
    wav: Option<PathBuf>,

    /// Play a single row once and exit
    #[arg(short, long, conflicts_with = "wav")]
    row: Option<usize>,

    /// Override the song tempo (20-300 BPM)
    #[arg(short, long)]
    bpm: Option<u32>,

    /// Loop rows START:END (inclusive)
    #[arg(short = 'l', long = "loop", value_name = "START:END", value_parser = parse_loop)]
    loop_range: Option<(usize, usize)>,

    /// Ignore the song file's loop
    #[arg(long, conflicts_with = "loop_range")]
    no_loop: bool,
}

fn parse_loop(s: &str) -> Result<(usize, usize), String> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got {s:?}"))?;
    let start = start.trim().parse::<usize>().map_err(|e| format!("bad loop start: {e}"))?;
    let end = end.trim().parse::<usize>().map_err(|e| format!("bad loop end: {e}"))?;
    Ok((start, end))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    tracing::debug!(?cli, "arguments");

    let text = fs::read_to_string(&cli.song).with_context(|| format!("failed to read {}", cli.song.display()))?;
    let mut song = SongFile::parse(&text)
        .with_context(|| format!("failed to parse {}", cli.song.display()))?
        .into_song()
        .context("invalid song")?;

    if let Some(bpm) = cli.bpm {
        song.set_bpm(bpm)?;
    }
    if let Some((start, end)) = cli.loop_range {
        song.set_loop(start, end)?;
    }
    if cli.no_loop {
        song.disable_loop();
    }

    print_summary(&song);

    let root = cli.song.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut ctrl = Controller::new(Arc::new(WavLoader::with_root(root)));
    ctrl.set_song(song);

    match (cli.wav, cli.row) {
        (Some(path), _) => export(&ctrl, &path),
        (None, Some(row)) => preview_row(&mut ctrl, row),
        (None, None) => play(&mut ctrl),
    }
}

fn print_summary(song: &Song) {
    if !song.title.is_empty() {
        println!("Title:    {}", song.title);
    }
    println!("Channels: {}", song.channels());
    println!("Rows:     {}", song.row_count());
    println!("Tempo:    {} BPM ({} ms/row)", song.bpm(), song.row_duration_ms());
    let window = song.loop_window();
    if window.enabled() {
        println!("Loop:     rows {}-{}", window.start(), window.end());
    } else {
        println!("Loop:     off");
    }
    println!();
}

fn play(ctrl: &mut Controller) -> Result<()> {
    ctrl.play().context("could not start playback")?;
    let events = ctrl.events().context("playback is not running")?;

    // Enter stops playback
    if let Some(stop) = ctrl.stop_handle() {
        thread::spawn(move || {
            let mut line = String::new();
            if matches!(io::stdin().lock().read_line(&mut line), Ok(n) if n > 0) {
                stop.stop();
            }
        });
    }
    println!("Playing... press Enter to stop.");

    for event in events.iter() {
        match event {
            PlaybackEvent::RowStarted { row, .. } => print_row(ctrl.song(), row),
            PlaybackEvent::LoopCompleted { iteration } => println!("Loop {iteration}"),
            PlaybackEvent::Stopped { loops, .. } => {
                println!("Playback finished. Total loops: {loops}");
                break;
            }
        }
    }
    ctrl.wait();
    Ok(())
}

fn preview_row(ctrl: &mut Controller, row: usize) -> Result<()> {
    ctrl.play_row(row).context("could not preview row")?;
    print_row(ctrl.song(), row);
    ctrl.wait();
    Ok(())
}

fn export(ctrl: &Controller, path: &Path) -> Result<()> {
    println!("Rendering to {}...", path.display());
    let report = ctrl
        .export_wav(path)
        .with_context(|| format!("failed to export {}", path.display()))?;
    println!(
        "Rendered {} rows, {} samples ({:.2} seconds)",
        report.rows,
        report.frames,
        report.seconds()
    );
    if report.failed_voices > 0 {
        println!("{} sample voices were silent (missing or unreadable assets)", report.failed_voices);
    }
    if report.clamped_voices > 0 {
        println!("{} voices had their pitch clamped to one octave", report.clamped_voices);
    }
    println!("Done.");
    Ok(())
}

fn print_row(song: &Song, row: usize) {
    let mut line = format!("Row {row:02} |");
    for (_, cell) in song.row(row) {
        let marker = if cell.is_sampled() { '*' } else { ' ' };
        line.push_str(&format!(" {}{marker}|", note_name(cell.note())));
    }
    println!("{line}");
    let _ = io::stdout().flush();
}

fn note_name(note: Note) -> String {
    const NAMES: [&str; 12] = ["C-", "C#", "D-", "D#", "E-", "F-", "F#", "G-", "G#", "A-", "A#", "B-"];
    match note {
        Note::Rest => "---".to_owned(),
        Note::On(midi) => {
            let octave = midi as i32 / 12 - 1;
            format!("{}{}", NAMES[midi as usize % 12], octave)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_argument_parses() {
        assert_eq!(parse_loop("2:5"), Ok((2, 5)));
        assert_eq!(parse_loop(" 0 : 15 "), Ok((0, 15)));
        assert!(parse_loop("5").is_err());
        assert!(parse_loop("a:b").is_err());
    }

    #[test]
    fn note_names() {
        assert_eq!(note_name(Note::On(69)), "A-4");
        assert_eq!(note_name(Note::On(60)), "C-4");
        assert_eq!(note_name(Note::On(1)), "C#-1");
        assert_eq!(note_name(Note::Rest), "---");
    }

    #[test]
    fn cli_flags_parse() {
        let cli = Cli::try_parse_from(["ct-cli", "song.json", "--bpm", "140", "--loop", "0:7"]).unwrap();
        assert_eq!(cli.bpm, Some(140));
        assert_eq!(cli.loop_range, Some((0, 7)));
        assert!(Cli::try_parse_from(["ct-cli", "song.json", "--wav", "a.wav", "--row", "1"]).is_err());
    }
}
