//! Super-voxel tiling and packed bundle assembly.
//!
//! The image is tiled with overlapping squares; each tile (super-voxel) packs
//! the columns of its member voxels against a shared per-view band. Tiles are
//! independent once the columns exist, so the per-tile work parallelizes
//! cleanly when the `rayon` feature is enabled.

pub(crate) mod band;
pub(crate) mod pack;

use crate::column::VoxelColumn;
use crate::geom::{ImageParams, SvParams};
use crate::sv::band::{equalize_bands, BandMap};
use crate::sv::pack::{pack_voxel, PaddedVoxel};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// One super-voxel's packed bundle: its band and one slot per grid position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackedSv {
    /// Per-view detector band shared by all member voxels.
    pub bands: BandMap,
    /// `(2 * sv_length + 1)^2` slots in row-major tile order; unretained
    /// slots are empty.
    pub voxels: Vec<PaddedVoxel>,
}

/// Enumerates super-voxel origins `(jy, jx)` in tile-walk order.
pub(crate) fn tile_origins(img: &ImageParams, svpar: &SvParams) -> Vec<(usize, usize)> {
    let stride = svpar.stride();
    let mut origins = Vec::new();
    for jy in (0..img.ny).step_by(stride) {
        for jx in (0..img.nx).step_by(stride) {
            origins.push((jy, jx));
        }
    }
    origins
}

/// Number of super-voxels the tile walk visits for this geometry.
pub fn tile_count(img: &ImageParams, svpar: &SvParams) -> usize {
    let stride = svpar.stride();
    if stride == 0 {
        return 0;
    }
    img.ny.div_ceil(stride) * img.nx.div_ceil(stride)
}

/// Collects the retained member voxels of one super-voxel.
///
/// A voxel is retained when it lies on the grid, is inside the reconstruction
/// mask, and has a non-empty column. Row-major order within the tile.
fn sv_members(
    origin: (usize, usize),
    img: &ImageParams,
    svpar: &SvParams,
    mask: &[u8],
    columns: &[VoxelColumn],
) -> Vec<usize> {
    let (jy, jx) = origin;
    let mut members = Vec::new();
    for r in jy..=jy + 2 * svpar.sv_length {
        for c in jx..=jx + 2 * svpar.sv_length {
            if r >= img.ny || c >= img.nx {
                continue;
            }
            let idx = r * img.nx + c;
            if mask[idx] != 0 && columns[idx].n_index > 0 {
                members.push(idx);
            }
        }
    }
    members
}

/// Builds the packed bundle of one super-voxel.
pub(crate) fn build_sv(
    origin: (usize, usize),
    img: &ImageParams,
    svpar: &SvParams,
    n_views: usize,
    n_channels: i32,
    mask: &[u8],
    columns: &[VoxelColumn],
    quantized: &[Vec<u8>],
) -> PackedSv {
    let members = sv_members(origin, img, svpar, mask, columns);
    let (bands, _band_width) =
        equalize_bands(&members, columns, n_views, n_channels, svpar.piece_length);

    let (jy, jx) = origin;
    let side = svpar.side();
    let mut voxels = vec![PaddedVoxel::default(); svpar.slots()];
    for &idx in &members {
        let r = idx / img.nx;
        let c = idx % img.nx;
        let slot = (r - jy) * side + (c - jx);
        voxels[slot] = pack_voxel(&columns[idx], &quantized[idx], &bands, svpar.piece_length);
    }

    PackedSv { bands, voxels }
}

/// Builds all super-voxels sequentially, in tile-walk order.
#[allow(clippy::too_many_arguments)]
pub(crate) fn build_all(
    origins: &[(usize, usize)],
    img: &ImageParams,
    svpar: &SvParams,
    n_views: usize,
    n_channels: i32,
    mask: &[u8],
    columns: &[VoxelColumn],
    quantized: &[Vec<u8>],
) -> Vec<PackedSv> {
    origins
        .iter()
        .map(|&origin| {
            build_sv(
                origin, img, svpar, n_views, n_channels, mask, columns, quantized,
            )
        })
        .collect()
}

/// Builds all super-voxels in parallel; output order matches the tile walk.
#[cfg(feature = "rayon")]
#[allow(clippy::too_many_arguments)]
pub(crate) fn build_all_par(
    origins: &[(usize, usize)],
    img: &ImageParams,
    svpar: &SvParams,
    n_views: usize,
    n_channels: i32,
    mask: &[u8],
    columns: &[VoxelColumn],
    quantized: &[Vec<u8>],
) -> Vec<PackedSv> {
    origins
        .par_iter()
        .map(|&origin| {
            build_sv(
                origin, img, svpar, n_views, n_channels, mask, columns, quantized,
            )
        })
        .collect()
}
