#![cfg(feature = "rayon")]

//! The parallel build must produce the same store as the sequential one.

use std::f32::consts::PI;
use svmatrix::{ComputeOptions, ImageParams, SinoParams, SvParams, SystemMatrix};

#[test]
fn parallel_build_matches_sequential() {
    let img = ImageParams {
        nx: 12,
        ny: 10,
        delta_xy: 1.0,
    };
    let n_views = 8;
    let sino = SinoParams {
        n_views,
        n_channels: 19,
        delta_channel: 1.0,
        center_offset: 0.25,
        view_angles: (0..n_views).map(|i| i as f32 * PI / n_views as f32).collect(),
    };
    let svpar = SvParams {
        sv_length: 2,
        overlap: 1,
        piece_length: 4,
        n_sv: 16,
    };
    let mut mask = vec![1u8; img.n_voxels()];
    // Punch a hole so empty slots take both paths.
    for idx in [0usize, 13, 14, 25, 119] {
        mask[idx] = 0;
    }

    let sequential = SystemMatrix::compute(&img, &sino, &svpar, &mask).unwrap();
    let parallel =
        SystemMatrix::compute_with(&img, &sino, &svpar, &mask, &ComputeOptions { parallel: true })
            .unwrap();

    assert_eq!(sequential, parallel);
}
