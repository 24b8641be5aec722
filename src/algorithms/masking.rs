use crate::algorithms::geometry::ensure_congruent;
use crate::error::{InputRole, Result};
use crate::pipeline::types::{MaskMode, MaskSpec};
use crate::volume::{LabelVolume, ScalarVolume};
use ndarray::Zip;

/// Keep or replace each voxel depending on whether its label is `target_label`.
///
/// | label == target | Inclusive  | Exclusive  |
/// |-----------------|------------|------------|
/// | yes             | keep       | fill_value |
/// | no              | fill_value | keep       |
///
/// Returns a new volume; `volume` is untouched.
pub fn mask(
    volume: &ScalarVolume,
    labels: &LabelVolume,
    target_label: u16,
    fill_value: f32,
    mode: MaskMode,
) -> Result<ScalarVolume> {
    ensure_congruent(
        InputRole::Image,
        volume.extent(),
        InputRole::Mask,
        labels.extent(),
    )?;

    let keep_on_match = mode == MaskMode::Inclusive;
    let masked = Zip::from(volume.as_array())
        .and(labels.as_array())
        .par_map_collect(|&value, &label| {
            if (label == target_label) == keep_on_match {
                value
            } else {
                fill_value
            }
        });

    Ok(ScalarVolume::from_array(masked))
}

/// Mask both images with the same label, fill value and mode.
pub fn mask_pair(
    image_a: &ScalarVolume,
    image_b: &ScalarVolume,
    spec: &MaskSpec,
) -> Result<(ScalarVolume, ScalarVolume)> {
    let (masked_a, masked_b) = rayon::join(
        || mask(image_a, &spec.labels, spec.target_label, spec.fill_value, spec.mode),
        || mask(image_b, &spec.labels, spec.target_label, spec.fill_value, spec.mode),
    );
    Ok((masked_a?, masked_b?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompareError;
    use crate::volume::Extent;

    fn labels_with_center(extent: Extent, label: u16) -> LabelVolume {
        LabelVolume::from_fn(extent, |c| if c == [1, 1, 1] { label } else { 0 })
    }

    #[test]
    fn test_inclusive_keeps_target() {
        let extent = Extent::new(3, 3, 3);
        let image = ScalarVolume::filled(extent, 4.0);
        let labels = labels_with_center(extent, 7);

        let masked = mask(&image, &labels, 7, -1.0, MaskMode::Inclusive).unwrap();
        assert_eq!(masked.get([1, 1, 1]), Some(&4.0));
        assert_eq!(masked.get([0, 0, 0]), Some(&-1.0));
        assert_eq!(masked.to_vec().iter().filter(|&&v| v == 4.0).count(), 1);
    }

    #[test]
    fn test_exclusive_fills_target() {
        let extent = Extent::new(3, 3, 3);
        let image = ScalarVolume::filled(extent, 4.0);
        let labels = labels_with_center(extent, 7);

        let masked = mask(&image, &labels, 7, -1.0, MaskMode::Exclusive).unwrap();
        assert_eq!(masked.get([1, 1, 1]), Some(&-1.0));
        assert_eq!(masked.get([2, 2, 2]), Some(&4.0));
    }

    #[test]
    fn test_source_is_not_modified() {
        let extent = Extent::new(2, 2, 2);
        let image = ScalarVolume::filled(extent, 9.0);
        let labels = LabelVolume::filled(extent, 0);

        let masked = mask(&image, &labels, 1, 0.0, MaskMode::Inclusive).unwrap();
        assert!(masked.to_vec().iter().all(|&v| v == 0.0));
        assert!(image.to_vec().iter().all(|&v| v == 9.0));
        assert!(!masked.shares_storage(&image));
    }

    #[test]
    fn test_incongruent_labels_rejected() {
        let image = ScalarVolume::filled(Extent::new(2, 2, 2), 1.0);
        let labels = LabelVolume::filled(Extent::new(2, 2, 3), 0);
        let err = mask(&image, &labels, 0, 0.0, MaskMode::Inclusive).unwrap_err();
        assert!(matches!(
            err,
            CompareError::GeometryMismatch {
                left: InputRole::Image,
                right: InputRole::Mask,
                ..
            }
        ));
    }
}
