//! Immutable 3-D sample grids
//!
//! A [`Volume`] wraps a row-major [`Array3`] behind an [`Arc`], so cloning a
//! volume shares its samples instead of copying them. Nothing in the crate
//! mutates a volume after construction; every stage builds a new one.

use crate::error::{CompareError, Result};
use ndarray::{Array3, ArrayView3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Sample counts along the three axes, slowest-varying first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent([usize; 3]);

impl Extent {
    pub const fn new(d0: usize, d1: usize, d2: usize) -> Self {
        Self([d0, d1, d2])
    }

    pub fn dims(&self) -> [usize; 3] {
        self.0
    }

    /// Total number of voxels, or `None` if the product overflows `usize`
    pub fn voxel_count(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// True when any axis has zero samples
    pub fn is_empty(&self) -> bool {
        self.0.contains(&0)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.0[0], self.0[1], self.0[2])
    }
}

impl From<[usize; 3]> for Extent {
    fn from(dims: [usize; 3]) -> Self {
        Self(dims)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.0[0], self.0[1], self.0[2])
    }
}

/// Immutable 3-D grid of samples with dense row-major addressing.
#[derive(Debug, Clone)]
pub struct Volume<T> {
    data: Arc<Array3<T>>,
}

/// Floating-point image volume
pub type ScalarVolume = Volume<f32>;

/// Integer label volume used for masking
pub type LabelVolume = Volume<u16>;

impl<T> Volume<T> {
    /// Build a volume from row-major samples.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::ShapeMismatch`] when `samples` does not hold
    /// exactly `extent.voxel_count()` values, or when that count overflows.
    pub fn from_vec(extent: Extent, samples: Vec<T>) -> Result<Self> {
        let len = samples.len();
        if extent.voxel_count() != Some(len) {
            return Err(CompareError::ShapeMismatch { extent, len });
        }
        let data = Array3::from_shape_vec(extent.shape(), samples)
            .map_err(|_| CompareError::ShapeMismatch { extent, len })?;
        Ok(Self {
            data: Arc::new(data),
        })
    }

    pub fn extent(&self) -> Extent {
        let (d0, d1, d2) = self.data.dim();
        Extent::new(d0, d1, d2)
    }

    pub fn view(&self) -> ArrayView3<'_, T> {
        self.data.view()
    }

    pub fn as_array(&self) -> &Array3<T> {
        &self.data
    }

    pub fn get(&self, coord: [usize; 3]) -> Option<&T> {
        self.data.get(coord)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether two handles point at the same sample storage
    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl<T: Clone> Volume<T> {
    /// Wrap an array, copying it into standard layout if needed.
    pub fn from_array(array: Array3<T>) -> Self {
        let data = if array.is_standard_layout() {
            array
        } else {
            array.as_standard_layout().into_owned()
        };
        Self {
            data: Arc::new(data),
        }
    }

    pub fn filled(extent: Extent, value: T) -> Self {
        Self {
            data: Arc::new(Array3::from_elem(extent.shape(), value)),
        }
    }

    pub fn from_fn<F>(extent: Extent, mut f: F) -> Self
    where
        F: FnMut([usize; 3]) -> T,
    {
        let data = Array3::from_shape_fn(extent.shape(), |(i, j, k)| f([i, j, k]));
        Self {
            data: Arc::new(data),
        }
    }

    /// Samples in row-major order
    pub fn to_vec(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }
}

impl<T: PartialEq> PartialEq for Volume<T> {
    fn eq(&self, other: &Self) -> bool {
        self.data.as_ref() == other.data.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_rejects_short_buffer() {
        let err = ScalarVolume::from_vec(Extent::new(2, 2, 2), vec![0.0; 7]).unwrap_err();
        assert_eq!(
            err,
            CompareError::ShapeMismatch {
                extent: Extent::new(2, 2, 2),
                len: 7
            }
        );
    }

    #[test]
    fn test_voxel_count_overflow() {
        assert_eq!(Extent::new(2, 3, 4).voxel_count(), Some(24));
        assert_eq!(Extent::new(0, 10, 10).voxel_count(), Some(0));
        let huge = Extent::new(1 << 32, 1 << 32, 2);
        assert_eq!(huge.voxel_count(), None);
        assert!(ScalarVolume::from_vec(huge, vec![0.0; 4]).is_err());
    }

    #[test]
    fn test_row_major_addressing() {
        let samples: Vec<f32> = (0..24).map(|v| v as f32).collect();
        let volume = ScalarVolume::from_vec(Extent::new(2, 3, 4), samples).unwrap();
        // index = i * 12 + j * 4 + k
        assert_eq!(volume.get([1, 2, 3]), Some(&23.0));
        assert_eq!(volume.get([0, 1, 0]), Some(&4.0));
        assert_eq!(volume.get([2, 0, 0]), None);
    }

    #[test]
    fn test_clone_shares_storage() {
        let volume = ScalarVolume::filled(Extent::new(3, 3, 3), 1.5);
        let copy = volume.clone();
        assert!(volume.shares_storage(&copy));
        assert_eq!(volume, copy);
    }

    #[test]
    fn test_zero_dimension_extent() {
        let extent = Extent::new(0, 10, 10);
        let volume = ScalarVolume::filled(extent, 0.0);
        assert!(extent.is_empty());
        assert!(volume.is_empty());
        assert_eq!(volume.extent(), extent);
        assert_eq!(extent.to_string(), "0x10x10");
    }

    #[test]
    fn test_from_array_normalizes_layout() {
        let array = Array3::from_shape_fn((2, 3, 4), |(i, j, k)| (i * 100 + j * 10 + k) as f32);
        let transposed = array.reversed_axes();
        let volume = ScalarVolume::from_array(transposed.clone());
        assert!(volume.as_array().is_standard_layout());
        assert_eq!(volume.extent(), Extent::new(4, 3, 2));
        assert_eq!(volume.get([3, 2, 1]), transposed.get([3, 2, 1]));
    }
}
