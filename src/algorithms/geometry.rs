use crate::error::{CompareError, InputRole, Result};
use crate::volume::{Extent, LabelVolume, ScalarVolume};

/// Fail with [`CompareError::GeometryMismatch`] unless both extents match.
pub fn ensure_congruent(
    left: InputRole,
    left_extent: Extent,
    right: InputRole,
    right_extent: Extent,
) -> Result<()> {
    if left_extent == right_extent {
        Ok(())
    } else {
        Err(CompareError::GeometryMismatch {
            left,
            left_extent,
            right,
            right_extent,
        })
    }
}

/// Check that both images, and the mask when present, share one extent.
///
/// Only sample counts are compared. Spacing, origin and orientation are not
/// part of a volume here, and no resampling is attempted.
pub fn validate_geometry(
    image_a: &ScalarVolume,
    image_b: &ScalarVolume,
    mask: Option<&LabelVolume>,
) -> Result<()> {
    let extent_a = image_a.extent();
    ensure_congruent(InputRole::ImageA, extent_a, InputRole::ImageB, image_b.extent())?;

    if let Some(labels) = mask {
        // A == B already holds, so checking A against the mask covers B
        ensure_congruent(InputRole::ImageA, extent_a, InputRole::Mask, labels.extent())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_extents_pass() {
        let a = ScalarVolume::filled(Extent::new(4, 5, 6), 1.0);
        let b = ScalarVolume::filled(Extent::new(4, 5, 6), 2.0);
        let mask = LabelVolume::filled(Extent::new(4, 5, 6), 0);
        assert!(validate_geometry(&a, &b, Some(&mask)).is_ok());
    }

    #[test]
    fn test_mask_mismatch_names_mask() {
        let a = ScalarVolume::filled(Extent::new(4, 5, 6), 1.0);
        let b = ScalarVolume::filled(Extent::new(4, 5, 6), 2.0);
        let mask = LabelVolume::filled(Extent::new(4, 5, 7), 0);
        match validate_geometry(&a, &b, Some(&mask)) {
            Err(CompareError::GeometryMismatch { left, right, right_extent, .. }) => {
                assert_eq!(left, InputRole::ImageA);
                assert_eq!(right, InputRole::Mask);
                assert_eq!(right_extent, Extent::new(4, 5, 7));
            }
            other => panic!("expected geometry mismatch, got {:?}", other),
        }
    }
}
