use crate::algorithms::geometry::ensure_congruent;
use crate::error::{InputRole, Result};
use crate::volume::ScalarVolume;
use ndarray::Zip;

/// Voxel-wise `|a - b|`, with no clamping or scaling.
pub fn difference(a: &ScalarVolume, b: &ScalarVolume) -> Result<ScalarVolume> {
    ensure_congruent(InputRole::ImageA, a.extent(), InputRole::ImageB, b.extent())?;

    let diff = Zip::from(a.as_array())
        .and(b.as_array())
        .par_map_collect(|&x, &y| (x - y).abs());

    Ok(ScalarVolume::from_array(diff))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompareError;
    use crate::volume::Extent;

    #[test]
    fn test_absolute_values() {
        let extent = Extent::new(1, 2, 2);
        let a = ScalarVolume::from_vec(extent, vec![1.0, -3.0, 2.5, 0.0]).unwrap();
        let b = ScalarVolume::from_vec(extent, vec![4.0, 1.0, 2.5, -0.5]).unwrap();

        let diff = difference(&a, &b).unwrap();
        assert_eq!(diff.to_vec(), vec![3.0, 4.0, 0.0, 0.5]);
        assert_eq!(diff.extent(), extent);
    }

    #[test]
    fn test_mismatched_extents() {
        let a = ScalarVolume::filled(Extent::new(10, 10, 10), 0.0);
        let b = ScalarVolume::filled(Extent::new(10, 10, 11), 0.0);
        assert!(matches!(
            difference(&a, &b),
            Err(CompareError::GeometryMismatch { .. })
        ));
    }
}
