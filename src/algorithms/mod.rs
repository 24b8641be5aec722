// Pure stage functions of the comparison pipeline
pub mod difference;
pub mod geometry;
pub mod masking;
pub mod statistics;
pub mod tolerance;

pub use difference::*;
pub use geometry::*;
pub use masking::*;
pub use statistics::*;
pub use tolerance::*;
