use crate::config::OutputLocators;
use crate::data::codec::RawVolumeCodec;
use crate::pipeline::ComparisonArtifacts;
use crate::volume::ScalarVolume;
use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

/// Sink for derived volumes
pub trait VolumeWriter: Send + Sync {
    fn write_scalar(&self, volume: &ScalarVolume, path: &Path) -> Result<()>;
}

impl VolumeWriter for RawVolumeCodec {
    fn write_scalar(&self, volume: &ScalarVolume, path: &Path) -> Result<()> {
        self.write_scalar_file(volume, path)?;
        info!(path = %path.display(), extent = %volume.extent(), "Wrote volume");
        Ok(())
    }
}

/// Persist the artifacts that have a requested locator.
///
/// Masked outputs only exist when a mask was applied; a masked locator
/// without one is skipped with a warning. Returns how many volumes were
/// written.
pub fn write_artifacts(
    writer: &dyn VolumeWriter,
    artifacts: &ComparisonArtifacts,
    outputs: &OutputLocators,
) -> Result<usize> {
    let mut written = 0;

    for (label, locator, volume) in [
        ("masked A", &outputs.masked_a, artifacts.masked_a.as_ref()),
        ("masked B", &outputs.masked_b, artifacts.masked_b.as_ref()),
        ("difference", &outputs.difference, Some(&artifacts.difference)),
    ] {
        let Some(path) = locator else { continue };
        match volume {
            Some(volume) => {
                writer.write_scalar(volume, path)?;
                written += 1;
            }
            None => warn!(
                output = label,
                path = %path.display(),
                "No mask was applied, skipping masked image output"
            ),
        }
    }

    Ok(written)
}
