use crate::data::VolumeLoader;
use crate::error::{CompareError, Result};
use crate::pipeline::{ComparisonInputs, MaskMode, MaskSpec, Statistic, ToleranceSpec};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where derived volumes should be written, if anywhere
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputLocators {
    pub masked_a: Option<PathBuf>,
    pub masked_b: Option<PathBuf>,
    pub difference: Option<PathBuf>,
}

impl OutputLocators {
    pub fn is_empty(&self) -> bool {
        self.masked_a.is_none() && self.masked_b.is_none() && self.difference.is_none()
    }
}

/// Fully resolved options for one comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareOptions {
    pub image_a: PathBuf,
    pub image_b: PathBuf,
    pub mask: Option<PathBuf>,
    /// Keep voxels outside the target label instead of inside it
    pub mask_outside: bool,
    pub mask_label: u16,
    pub mask_value: f32,
    pub tolerance: ToleranceSpec,
    pub outputs: OutputLocators,
}

impl CompareOptions {
    pub fn new(image_a: impl Into<PathBuf>, image_b: impl Into<PathBuf>) -> Self {
        Self {
            image_a: image_a.into(),
            image_b: image_b.into(),
            mask: None,
            mask_outside: false,
            mask_label: 0,
            mask_value: 0.0,
            tolerance: ToleranceSpec::default(),
            outputs: OutputLocators::default(),
        }
    }

    pub fn mask_mode(&self) -> MaskMode {
        if self.mask_outside {
            MaskMode::Exclusive
        } else {
            MaskMode::Inclusive
        }
    }

    /// Reject option combinations before any volume is loaded.
    pub fn validate(&self) -> Result<()> {
        if self.mask_outside && self.mask.is_none() {
            return Err(CompareError::InvalidConfiguration(
                "the outside switch requires a mask image".to_string(),
            ));
        }
        if self.mask_value.is_nan() {
            return Err(CompareError::InvalidConfiguration(
                "mask value must be a number".to_string(),
            ));
        }
        validate_tolerance(&self.tolerance)
    }

    /// Load every input through `loader`.
    pub fn load_inputs(&self, loader: &dyn VolumeLoader) -> anyhow::Result<ComparisonInputs> {
        let image_a = loader
            .load_scalar(&self.image_a)
            .context("cannot load image A")?;
        let image_b = loader
            .load_scalar(&self.image_b)
            .context("cannot load image B")?;

        let mask = match &self.mask {
            Some(path) => {
                let labels = loader.load_labels(path).context("cannot load mask image")?;
                Some(
                    MaskSpec::new(labels, self.mask_label)
                        .with_fill_value(self.mask_value)
                        .with_mode(self.mask_mode()),
                )
            }
            None => None,
        };

        Ok(ComparisonInputs {
            image_a,
            image_b,
            mask,
        })
    }
}

/// Ceilings must be non-negative numbers. Infinity is allowed and disables
/// a check.
pub fn validate_tolerance(tolerance: &ToleranceSpec) -> Result<()> {
    for statistic in Statistic::ALL {
        let ceiling = statistic.ceiling(tolerance);
        if ceiling.is_nan() || ceiling < 0.0 {
            return Err(CompareError::InvalidConfiguration(format!(
                "{} ceiling must be a non-negative number, got {}",
                statistic, ceiling
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outside_without_mask_is_invalid() {
        let mut options = CompareOptions::new("a.vol", "b.vol");
        options.mask_outside = true;
        assert!(matches!(
            options.validate(),
            Err(CompareError::InvalidConfiguration(_))
        ));

        options.mask = Some(PathBuf::from("mask.vol"));
        assert!(options.validate().is_ok());
        assert_eq!(options.mask_mode(), MaskMode::Exclusive);
    }

    #[test]
    fn test_negative_ceiling_is_invalid() {
        let mut options = CompareOptions::new("a.vol", "b.vol");
        options.tolerance = ToleranceSpec::default().with_mean(-0.1);
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("mean ceiling"));
    }

    #[test]
    fn test_defaults() {
        let options = CompareOptions::new("a.vol", "b.vol");
        assert!(options.validate().is_ok());
        assert_eq!(options.mask_mode(), MaskMode::Inclusive);
        assert_eq!(options.tolerance, ToleranceSpec::uniform(0.0));
        assert!(options.outputs.is_empty());
    }
}
