//! The packed system matrix and the build pipeline that produces it.
//!
//! [`SystemMatrix::compute`] runs the full dataflow: footprint table, per-voxel
//! columns, quantization, sentinel imputation, then per-super-voxel band
//! equalization and packing. The resulting store owns everything the solver
//! and the serializer need; all intermediate buffers are dropped on return.

pub(crate) mod io;

use crate::column::quant::quantize_column;
use crate::column::{ColumnBuilder, VoxelColumn};
use crate::geom::{ImageParams, SinoParams, SvParams};
use crate::profile::PixelProfile;
use crate::sv::band::impute_first_channels;
use crate::sv::{self, PackedSv};
use crate::trace::{trace_event, trace_span};
use crate::util::{SvMatrixError, SvMatrixResult};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Options controlling how a system matrix build executes.
#[derive(Clone, Debug, Default)]
pub struct ComputeOptions {
    /// Enables parallel execution when the `rayon` feature is available.
    ///
    /// When the feature is disabled, requesting parallelism is an error.
    pub parallel: bool,
}

impl ComputeOptions {
    fn validate(&self) -> SvMatrixResult<()> {
        #[cfg(not(feature = "rayon"))]
        if self.parallel {
            return Err(SvMatrixError::ParallelUnavailable);
        }
        Ok(())
    }

    fn use_parallel(&self) -> bool {
        self.parallel && cfg!(feature = "rayon")
    }
}

/// The packed forward-projection operator.
///
/// Super-voxels appear in tile-walk order; `max_scale` holds one quantization
/// scale per voxel in row-major grid order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SystemMatrix {
    /// Packed bundles, one per super-voxel.
    pub svs: Vec<PackedSv>,
    /// Per-voxel quantization scales, `nx * ny` entries.
    pub max_scale: Vec<f32>,
}

impl SystemMatrix {
    /// Builds the system matrix sequentially.
    ///
    /// `mask` flags the active reconstruction region, one byte per voxel in
    /// row-major order; nonzero means active.
    pub fn compute(
        img: &ImageParams,
        sino: &SinoParams,
        svpar: &SvParams,
        mask: &[u8],
    ) -> SvMatrixResult<Self> {
        Self::compute_with(img, sino, svpar, mask, &ComputeOptions::default())
    }

    /// Builds the system matrix with explicit execution options.
    pub fn compute_with(
        img: &ImageParams,
        sino: &SinoParams,
        svpar: &SvParams,
        mask: &[u8],
        options: &ComputeOptions,
    ) -> SvMatrixResult<Self> {
        img.validate()?;
        sino.validate()?;
        svpar.validate(sino.n_views)?;
        options.validate()?;
        if mask.len() != img.n_voxels() {
            return Err(SvMatrixError::MaskLength {
                expected: img.n_voxels(),
                got: mask.len(),
            });
        }

        let origins = sv::tile_origins(img, svpar);
        if origins.len() != svpar.n_sv {
            return Err(SvMatrixError::SvCount {
                declared: svpar.n_sv,
                tiled: origins.len(),
            });
        }

        let _span = trace_span!(
            "compute_matrix",
            nx = img.nx,
            ny = img.ny,
            n_views = sino.n_views,
            n_sv = origins.len()
        )
        .entered();

        let profile = PixelProfile::build(img, sino);
        let builder = ColumnBuilder::new(img, sino, &profile);

        let (mut columns, quantized, max_scale) = if options.use_parallel() {
            build_columns_par(img, &builder)
        } else {
            build_columns(img, &builder)
        };

        let empty = columns.iter().filter(|c| c.n_index == 0).count();
        trace_event!("columns_built", total = columns.len(), empty = empty);

        // Empty views must be imputed before any super-voxel reads the
        // columns; the tile pass below only reads.
        let n_channels = sino.n_channels as i32;
        for column in &mut columns {
            impute_first_channels(column, n_channels);
        }

        #[cfg(feature = "rayon")]
        let svs = if options.use_parallel() {
            sv::build_all_par(
                &origins, img, svpar, sino.n_views, n_channels, mask, &columns, &quantized,
            )
        } else {
            sv::build_all(
                &origins, img, svpar, sino.n_views, n_channels, mask, &columns, &quantized,
            )
        };
        #[cfg(not(feature = "rayon"))]
        let svs = sv::build_all(
            &origins, img, svpar, sino.n_views, n_channels, mask, &columns, &quantized,
        );

        let packed_bytes: usize = svs
            .iter()
            .flat_map(|sv| sv.voxels.iter())
            .map(|v| v.len())
            .sum();
        trace_event!("svs_packed", count = svs.len(), bytes = packed_bytes);

        Ok(Self { svs, max_scale })
    }
}

type ColumnData = (Vec<VoxelColumn>, Vec<Vec<u8>>, Vec<f32>);

fn build_columns(img: &ImageParams, builder: &ColumnBuilder<'_>) -> ColumnData {
    let n_voxels = img.n_voxels();
    let mut columns = Vec::with_capacity(n_voxels);
    let mut quantized = Vec::with_capacity(n_voxels);
    let mut max_scale = Vec::with_capacity(n_voxels);

    let mut scratch = Vec::new();
    for row in 0..img.ny {
        for col in 0..img.nx {
            let column = builder.build(row, col, &mut scratch);
            let (bytes, scale) = quantize_column(&scratch);
            columns.push(column);
            quantized.push(bytes);
            max_scale.push(scale);
        }
    }

    (columns, quantized, max_scale)
}

#[cfg(feature = "rayon")]
fn build_columns_par(img: &ImageParams, builder: &ColumnBuilder<'_>) -> ColumnData {
    let nx = img.nx;
    let per_voxel: Vec<(VoxelColumn, Vec<u8>, f32)> = (0..img.n_voxels())
        .into_par_iter()
        .map_init(Vec::new, |scratch, idx| {
            let column = builder.build(idx / nx, idx % nx, scratch);
            let (bytes, scale) = quantize_column(scratch);
            (column, bytes, scale)
        })
        .collect();

    let mut columns = Vec::with_capacity(per_voxel.len());
    let mut quantized = Vec::with_capacity(per_voxel.len());
    let mut max_scale = Vec::with_capacity(per_voxel.len());
    for (column, bytes, scale) in per_voxel {
        columns.push(column);
        quantized.push(bytes);
        max_scale.push(scale);
    }
    (columns, quantized, max_scale)
}

#[cfg(not(feature = "rayon"))]
fn build_columns_par(img: &ImageParams, builder: &ColumnBuilder<'_>) -> ColumnData {
    build_columns(img, builder)
}
