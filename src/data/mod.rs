//! Loading and persisting volumes
//!
//! The comparison core never touches storage. These collaborators sit at
//! the edge: the CLI loads inputs through a [`VolumeLoader`] and hands
//! derived volumes to a [`VolumeWriter`].

pub mod codec;
pub mod loader;
pub mod writer;

pub use codec::*;
pub use loader::*;
pub use writer::*;
