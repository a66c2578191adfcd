//! Trapezoidal pixel-footprint profiles sampled per view.
//!
//! A unit square voxel projected onto the detector axis has a trapezoidal
//! footprint whose shape depends only on the view angle reduced modulo pi/2.
//! The table samples that footprint at [`LEN_PIX`] displacements spanning two
//! voxel widths, which turns the aperture integral in the column builder into
//! a table lookup. Profiles assume square voxels.

use crate::geom::{ImageParams, SinoParams};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

/// Number of displacement samples across the two-voxel footprint support.
///
/// Spatial resolution of the lookup is `2 * delta_xy / LEN_PIX`.
pub const LEN_PIX: usize = 511;

/// Number of sub-elements the detector aperture is split into.
pub const LEN_DET: usize = 101;

/// Dense per-view footprint table, `n_views` rows of [`LEN_PIX`] samples.
pub struct PixelProfile {
    samples: Vec<f32>,
    n_views: usize,
}

impl PixelProfile {
    /// Samples the trapezoidal footprint of one voxel for every view angle.
    pub fn build(img: &ImageParams, sino: &SinoParams) -> Self {
        let rc = FRAC_PI_4.sin();
        let mut samples = vec![0.0f32; sino.n_views * LEN_PIX];

        for (view, &view_angle) in sino.view_angles.iter().enumerate() {
            let mut ang = view_angle;
            while ang >= FRAC_PI_2 {
                ang -= FRAC_PI_2;
            }
            while ang < 0.0 {
                ang += FRAC_PI_2;
            }

            let maxval = if ang <= FRAC_PI_4 {
                img.delta_xy / ang.cos()
            } else {
                img.delta_xy / (FRAC_PI_2 - ang).cos()
            };

            let d1 = rc * (FRAC_PI_4 - ang).cos();
            let d2 = rc * (FRAC_PI_4 - ang).sin().abs();

            let t1 = 1.0 - d1;
            let t2 = 1.0 - d2;
            let t3 = 1.0 + d2;
            let t4 = 1.0 + d1;

            let row = &mut samples[view * LEN_PIX..(view + 1) * LEN_PIX];
            for (j, sample) in row.iter_mut().enumerate() {
                let t = 2.0 * j as f32 / LEN_PIX as f32;
                *sample = if t <= t1 || t > t4 {
                    0.0
                } else if t <= t2 {
                    maxval * (t - t1) / (t2 - t1)
                } else if t <= t3 {
                    maxval
                } else {
                    maxval * (t4 - t) / (t4 - t3)
                };
            }
        }

        Self {
            samples,
            n_views: sino.n_views,
        }
    }

    /// Number of views in the table.
    pub fn n_views(&self) -> usize {
        self.n_views
    }

    /// The [`LEN_PIX`] footprint samples for one view.
    pub fn view(&self, view: usize) -> &[f32] {
        &self.samples[view * LEN_PIX..(view + 1) * LEN_PIX]
    }
}

/// Uniform square detector aperture, [`LEN_DET`] weights summing to one.
pub(crate) fn detector_aperture() -> [f32; LEN_DET] {
    [1.0 / LEN_DET as f32; LEN_DET]
}

#[cfg(test)]
mod tests {
    use super::{detector_aperture, PixelProfile, LEN_PIX};
    use crate::geom::{ImageParams, SinoParams};
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    fn table_for(angles: Vec<f32>, delta_xy: f32) -> PixelProfile {
        let img = ImageParams {
            nx: 1,
            ny: 1,
            delta_xy,
        };
        let sino = SinoParams {
            n_views: angles.len(),
            n_channels: 1,
            delta_channel: 1.0,
            center_offset: 0.0,
            view_angles: angles,
        };
        PixelProfile::build(&img, &sino)
    }

    #[test]
    fn axis_aligned_profile_is_rectangular() {
        // At angle 0 the ramps collapse and the footprint is one voxel wide.
        let table = table_for(vec![0.0], 1.0);
        let row = table.view(0);
        for (j, &value) in row.iter().enumerate() {
            let t = 2.0 * j as f32 / LEN_PIX as f32;
            if t > 0.5 + 1e-4 && t <= 1.5 - 1e-4 {
                assert!((value - 1.0).abs() < 1e-5, "plateau at t={t}: {value}");
            } else if !(0.5 - 1e-4..=1.5 + 1e-4).contains(&t) {
                assert_eq!(value, 0.0, "support at t={t}: {value}");
            }
        }
    }

    #[test]
    fn diagonal_profile_degenerates_to_triangle() {
        let table = table_for(vec![FRAC_PI_4], 1.0);
        let row = table.view(0);
        let peak = 2.0f32.sqrt();
        // The exact apex falls between samples; the nearest one is within a step.
        let near_apex = row[(LEN_PIX - 1) / 2].max(row[(LEN_PIX + 1) / 2]);
        assert!(near_apex > 0.99 * peak);
        // Strictly increasing up to the apex on the left flank.
        assert!(row[100] < row[180] && row[180] < row[250]);
    }

    #[test]
    fn profile_is_invariant_under_quarter_turn() {
        let straight = table_for(vec![0.3], 1.0);
        let turned = table_for(vec![0.3 + FRAC_PI_2], 1.0);
        for (a, b) in straight.view(0).iter().zip(turned.view(0)) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn aperture_weights_sum_to_one() {
        let sum: f32 = detector_aperture().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }
}
