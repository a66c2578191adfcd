//! Per-voxel sparse projection columns.
//!
//! A column records, view by view, the run of detector channels a voxel
//! contributes to: the first contributing channel and the channel count. The
//! contributing values themselves are written to a caller-provided scratch
//! buffer in scan order (view outer, channel inner) and quantized separately.

pub(crate) mod quant;

use crate::geom::{ImageParams, ProjectionGeometry, SinoParams};
use crate::profile::{detector_aperture, PixelProfile, LEN_DET, LEN_PIX};

/// Sparse projection column descriptor for one voxel.
#[derive(Clone, Debug, Default)]
pub struct VoxelColumn {
    /// Total number of stored values over all views.
    pub n_index: usize,
    /// Number of contributing channels per view.
    pub counts: Vec<u32>,
    /// First contributing channel per view; `0` when the view is empty.
    pub first_channel: Vec<i32>,
}

/// Computes sparse columns against a prebuilt footprint table.
pub struct ColumnBuilder<'a> {
    img: &'a ImageParams,
    sino: &'a SinoParams,
    geom: ProjectionGeometry,
    profile: &'a PixelProfile,
    aperture: [f32; LEN_DET],
}

impl<'a> ColumnBuilder<'a> {
    /// Prepares projection anchors and the detector aperture for a build.
    pub fn new(img: &'a ImageParams, sino: &'a SinoParams, profile: &'a PixelProfile) -> Self {
        Self {
            img,
            sino,
            geom: ProjectionGeometry::new(img, sino),
            profile,
            aperture: detector_aperture(),
        }
    }

    /// Computes the column of voxel `(row, col)`.
    ///
    /// `values` is cleared and refilled with the strictly positive
    /// contributions in scan order; its final length equals the returned
    /// column's `n_index`. Reusing one buffer across calls avoids per-voxel
    /// allocation.
    pub fn build(&self, row: usize, col: usize, values: &mut Vec<f32>) -> VoxelColumn {
        values.clear();

        let n_views = self.sino.n_views;
        let n_channels = self.sino.n_channels as i32;
        let delta_xy = self.img.delta_xy;
        let delta_channel = self.sino.delta_channel;
        let t0 = self.geom.t0;

        let mut counts = vec![0u32; n_views];
        let mut first_channel = vec![0i32; n_views];

        let (x, y) = self.geom.voxel_center(self.img, row, col);

        for (view, &angle) in self.sino.view_angles.iter().enumerate() {
            let (sin_a, cos_a) = angle.sin_cos();
            let center = y * cos_a - x * sin_a;

            // The footprint spans two voxel widths around the projected center.
            let t_min = center - delta_xy;
            let t_max = t_min + 2.0 * delta_xy;
            if t_max < t0 {
                continue;
            }

            let ind_min = (((t_min - t0) / delta_channel - 0.5).ceil() as i32).max(0);
            let ind_max = (((t_max - t0) / delta_channel + 0.5) as i32).min(n_channels - 1);

            let const1 = t0 - delta_channel / 2.0;
            let const2 = delta_channel / (LEN_DET as f32 - 1.0);
            let const3 = delta_xy - center;
            let const4 = (LEN_PIX as f32 - 1.0) / (2.0 * delta_xy);

            let profile_row = self.profile.view(view);
            let mut first = None;

            for chan in ind_min..=ind_max {
                // Inner product of the detector aperture with the footprint table.
                let mut value = 0.0f32;
                for (k, &weight) in self.aperture.iter().enumerate() {
                    let t = const1 + chan as f32 * delta_channel + k as f32 * const2;
                    let lookup = ((t + const3) * const4 + 0.5) as i32;
                    if lookup >= 0 && (lookup as usize) < LEN_PIX {
                        value += weight * profile_row[lookup as usize];
                    }
                }

                if value > 0.0 {
                    if first.is_none() {
                        first = Some(chan);
                    }
                    values.push(value);
                    counts[view] += 1;
                }
            }

            first_channel[view] = first.unwrap_or(0);
        }

        VoxelColumn {
            n_index: values.len(),
            counts,
            first_channel,
        }
    }
}
