use crate::data::codec::RawVolumeCodec;
use crate::volume::{LabelVolume, ScalarVolume};
use anyhow::Result;
use std::path::Path;
use tracing::info;

/// Source of input volumes
pub trait VolumeLoader: Send + Sync {
    fn load_scalar(&self, path: &Path) -> Result<ScalarVolume>;

    fn load_labels(&self, path: &Path) -> Result<LabelVolume>;
}

impl VolumeLoader for RawVolumeCodec {
    fn load_scalar(&self, path: &Path) -> Result<ScalarVolume> {
        let volume = self.read_scalar_file(path)?;
        info!(path = %path.display(), extent = %volume.extent(), "Loaded image volume");
        Ok(volume)
    }

    fn load_labels(&self, path: &Path) -> Result<LabelVolume> {
        let volume = self.read_label_file(path)?;
        info!(path = %path.display(), extent = %volume.extent(), "Loaded label volume");
        Ok(volume)
    }
}
