//! Sample bank: decoded sample assets keyed by asset reference.

use std::collections::HashMap;
use std::sync::Arc;

use ct_ir::{Sample, SAMPLE_RATE};
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, warn};

use crate::error::{AssetError, Result};
use crate::resampler::conform_rate;

new_key_type! {
    /// Key for a sample stored in a [`SampleBank`].
    pub struct SampleKey;
}

/// Source of decoded sample assets.
pub trait SampleLoader: Send + Sync {
    /// Decode the asset named `asset` into mono PCM.
    fn load(&self, asset: &str) -> core::result::Result<Sample, AssetError>;
}

/// Loader serving samples from memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    samples: HashMap<String, Sample>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: &str, sample: Sample) {
        self.samples.insert(asset.to_owned(), sample);
    }
}

impl SampleLoader for MemoryLoader {
    fn load(&self, asset: &str) -> core::result::Result<Sample, AssetError> {
        self.samples.get(asset).cloned().ok_or_else(|| AssetError::NotFound {
            asset: asset.to_owned(),
        })
    }
}

/// Caches decoded samples so each asset is loaded (and rate-converted)
/// at most once. Failures are cached too.
pub struct SampleBank {
    loader: Arc<dyn SampleLoader>,
    samples: SlotMap<SampleKey, Sample>,
    index: HashMap<String, core::result::Result<SampleKey, AssetError>>,
}

impl SampleBank {
    pub fn new(loader: Arc<dyn SampleLoader>) -> Self {
        Self {
            loader,
            samples: SlotMap::with_key(),
            index: HashMap::new(),
        }
    }

    /// Look up `asset`, loading it on first use. Samples recorded at
    /// another rate are conformed to the engine rate.
    pub fn get(&mut self, asset: &str) -> Result<&Sample> {
        let cached = self.index.get(asset).cloned();
        let key = match cached {
            Some(entry) => entry?,
            None => self.load(asset)?,
        };
        self.samples.get(key).ok_or_else(|| {
            AssetError::Unreadable {
                asset: asset.to_owned(),
                reason: "evicted from bank".to_owned(),
            }
            .into()
        })
    }

    /// Number of successfully loaded samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn load(&mut self, asset: &str) -> Result<SampleKey> {
        let mut sample = match self.loader.load(asset) {
            Ok(sample) => sample,
            Err(err) => {
                warn!(asset, error = %err, "sample asset unavailable");
                self.index.insert(asset.to_owned(), Err(err.clone()));
                return Err(err.into());
            }
        };
        if sample.needs_rate_conversion() {
            debug!(asset, from = sample.sample_rate, to = SAMPLE_RATE, "conforming sample rate");
            sample.data = conform_rate(&sample.data, sample.sample_rate, SAMPLE_RATE)?;
            sample.sample_rate = SAMPLE_RATE;
        }
        let key = self.samples.insert(sample);
        self.index.insert(asset.to_owned(), Ok(key));
        Ok(key)
    }
}
