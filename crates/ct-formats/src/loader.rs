//! Filesystem sample loader.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ct_engine::{AssetError, SampleLoader};
use ct_ir::Sample;
use tracing::debug;

use crate::wav_format::load_wav;

/// Loads WAV sample assets from disk. Relative asset paths resolve
/// against `root` when one is set (normally the song file's directory).
#[derive(Clone, Debug, Default)]
pub struct WavLoader {
    root: Option<PathBuf>,
}

impl WavLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, asset: &str) -> PathBuf {
        let path = Path::new(asset);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl SampleLoader for WavLoader {
    fn load(&self, asset: &str) -> Result<Sample, AssetError> {
        let path = self.resolve(asset);
        debug!(path = %path.display(), "loading sample");
        let data = fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => AssetError::NotFound {
                asset: asset.to_owned(),
            },
            _ => AssetError::Unreadable {
                asset: asset.to_owned(),
                reason: err.to_string(),
            },
        })?;
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or(asset);
        load_wav(&data, name).map_err(|err| AssetError::Unreadable {
            asset: asset.to_owned(),
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames_to_wav;
    use ct_engine::Frame;

    #[test]
    fn loads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        let wav = frames_to_wav(&[Frame::mono(42); 8], 44100).unwrap();
        fs::write(dir.path().join("kick.wav"), wav).unwrap();

        let loader = WavLoader::with_root(dir.path());
        let sample = loader.load("kick.wav").unwrap();
        assert_eq!(sample.name.as_str(), "kick");
        assert_eq!(sample.data, vec![42; 8]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = WavLoader::with_root(dir.path());
        assert_eq!(
            loader.load("nope.wav"),
            Err(AssetError::NotFound {
                asset: "nope.wav".to_owned()
            })
        );
    }

    #[test]
    fn garbage_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("junk.wav"), b"definitely not riff data, but long enough to parse").unwrap();
        let loader = WavLoader::with_root(dir.path());
        assert!(matches!(loader.load("junk.wav"), Err(AssetError::Unreadable { .. })));
    }
}
