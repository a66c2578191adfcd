//! Low-level building blocks for custom pipelines.
//!
//! These types expose the footprint table, per-voxel column computation, and
//! the tile walk for advanced use cases beyond the high-level
//! [`SystemMatrix`](crate::SystemMatrix) API.

pub use crate::column::quant::quantize_column;
pub use crate::column::{ColumnBuilder, VoxelColumn};
pub use crate::profile::{PixelProfile, LEN_DET, LEN_PIX};
pub use crate::sv::tile_count;
