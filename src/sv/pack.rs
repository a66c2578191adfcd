//! Padded per-voxel blocks and the piece-transposed final layout.
//!
//! Inside its super-voxel, each voxel stores one rectangular block per piece:
//! `piece_length` views by the voxel's own piecewise width, zero-padded where
//! a view's channel run is narrower. The block is then transposed so that
//! consecutive bytes correspond to consecutive views at a fixed channel
//! offset, the access order of the solver's inner reduction loops.

use crate::column::VoxelColumn;
use crate::sv::band::BandMap;

/// Final packed storage of one voxel inside one super-voxel.
///
/// An unretained slot (masked out, off the grid, or with an empty column)
/// keeps all vectors empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaddedVoxel {
    /// Piece-transposed quantized values, pieces back to back.
    pub values: Vec<u8>,
    /// Per-piece start offset of this voxel's block within the band.
    pub piece_min: Vec<i32>,
    /// Per-piece width of this voxel's block.
    pub piece_width: Vec<i32>,
}

impl PaddedVoxel {
    /// Total packed byte count, `piece_length * sum(piece_width)`.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether this slot holds no packed data.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Packs one voxel's quantized column into its padded, transposed block.
///
/// `quantized` holds the voxel's values in scan order (view outer, channel
/// inner); `bands` is the super-voxel band and `band_width` its per-piece
/// equalized widths.
pub(crate) fn pack_voxel(
    column: &VoxelColumn,
    quantized: &[u8],
    bands: &BandMap,
    piece_length: usize,
) -> PaddedVoxel {
    let n_views = column.counts.len();
    let n_pieces = n_views / piece_length;

    let mut piece_min = Vec::with_capacity(n_pieces);
    let mut piece_width = Vec::with_capacity(n_pieces);
    for piece in 0..n_pieces {
        let base = piece * piece_length;
        let mut lo = column.first_channel[base] - bands.band_min[base];
        let mut hi = lo + column.counts[base] as i32;
        for offset in 0..piece_length {
            let view = base + offset;
            let start = column.first_channel[view] - bands.band_min[view];
            let end = start + column.counts[view] as i32;
            if start < lo {
                lo = start;
            }
            if end > hi {
                hi = end;
            }
        }
        piece_min.push(lo);
        piece_width.push(hi - lo);
    }

    let total: usize = piece_width
        .iter()
        .map(|&width| width as usize * piece_length)
        .sum();

    // View-major padded layout; the pre-zeroed buffer supplies the padding.
    let mut padded = vec![0u8; total];
    let mut src = 0usize;
    let mut row_start = 0usize;
    for view in 0..n_views {
        let piece = view / piece_length;
        let width = piece_width[piece] as usize;
        let lead =
            (column.first_channel[view] - piece_min[piece] - bands.band_min[view]) as usize;
        let count = column.counts[view] as usize;
        padded[row_start + lead..row_start + lead + count]
            .copy_from_slice(&quantized[src..src + count]);
        src += count;
        row_start += width;
    }

    // Transpose each piece block in place of its segment.
    let mut values = vec![0u8; total];
    let mut segment = 0usize;
    for piece in 0..n_pieces {
        let width = piece_width[piece] as usize;
        let block = &padded[segment..segment + width * piece_length];
        let out = &mut values[segment..segment + width * piece_length];
        for channel in 0..width {
            for view in 0..piece_length {
                out[channel * piece_length + view] = block[view * width + channel];
            }
        }
        segment += width * piece_length;
    }

    PaddedVoxel {
        values,
        piece_min,
        piece_width,
    }
}
