//! WAV export to disk.

use std::io::{BufWriter, Write};
use std::path::Path;

use ct_engine::Frame;
use ct_formats::write_wav;
use ct_ir::SAMPLE_RATE;
use tempfile::NamedTempFile;

use crate::error::ExportError;

/// Write `frames` to `path` as a 16-bit stereo WAV.
///
/// The file is written to a temporary sibling and renamed into place,
/// so `path` is either the complete export or untouched.
pub fn write_wav_file(path: &Path, frames: &[Frame]) -> Result<(), ExportError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        write_wav(&mut w, frames, SAMPLE_RATE)?;
        w.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| ExportError::Io(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        write_wav_file(&path, &[Frame::mono(1); 100]).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 44 + 400);
        assert_eq!(&bytes[0..4], b"RIFF");
    }

    #[test]
    fn leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        write_wav_file(&path, &[Frame::silence(); 10]).unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn missing_directory_is_an_error_and_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("out.wav");
        assert!(matches!(write_wav_file(&path, &[Frame::silence(); 4]), Err(ExportError::Io(_))));
        assert!(!path.exists());
    }
}
