//! Randomized structural invariants of columns, bands, and packed blocks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;
use svmatrix::lowlevel::{ColumnBuilder, PixelProfile};
use svmatrix::{ImageParams, SinoParams, SvParams, SystemMatrix};

fn random_setup(rng: &mut StdRng) -> (ImageParams, SinoParams, SvParams, Vec<u8>) {
    let img = ImageParams {
        nx: rng.random_range(2..8),
        ny: rng.random_range(2..8),
        delta_xy: [0.7f32, 1.0, 1.4][rng.random_range(0..3)],
    };
    let piece_length = [1usize, 2, 3][rng.random_range(0..3)];
    let n_views = piece_length * rng.random_range(1..4);
    let sino = SinoParams {
        n_views,
        n_channels: rng.random_range(4..12),
        delta_channel: 1.0,
        center_offset: [-0.5f32, 0.0, 0.25][rng.random_range(0..3)],
        view_angles: (0..n_views).map(|_| rng.random_range(0.0..2.0 * PI)).collect(),
    };
    let mut svpar = SvParams {
        sv_length: rng.random_range(1..3),
        overlap: 1,
        piece_length,
        n_sv: 0,
    };
    svpar.n_sv = svmatrix::lowlevel::tile_count(&img, &svpar);
    let mask = (0..img.n_voxels())
        .map(|_| u8::from(rng.random_range(0..4) > 0))
        .collect();
    (img, sino, svpar, mask)
}

#[test]
fn column_runs_stay_inside_the_detector() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let (img, sino, _, _) = random_setup(&mut rng);
        let profile = PixelProfile::build(&img, &sino);
        let builder = ColumnBuilder::new(&img, &sino, &profile);
        let mut values = Vec::new();
        for row in 0..img.ny {
            for col in 0..img.nx {
                let column = builder.build(row, col, &mut values);
                let mut total = 0usize;
                for view in 0..sino.n_views {
                    let first = column.first_channel[view];
                    let count = column.counts[view] as i32;
                    assert!(first >= 0);
                    assert!(count as usize <= sino.n_channels);
                    if count > 0 {
                        assert!(first + count <= sino.n_channels as i32);
                    }
                    total += count as usize;
                }
                assert_eq!(total, column.n_index);
                assert_eq!(values.len(), column.n_index);
            }
        }
    }
}

#[test]
fn packed_bands_and_blocks_are_consistent() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..20 {
        let (img, sino, svpar, mask) = random_setup(&mut rng);
        let matrix = SystemMatrix::compute(&img, &sino, &svpar, &mask).unwrap();
        let n_pieces = svpar.n_pieces(sino.n_views);

        for sv in &matrix.svs {
            let bands = &sv.bands;
            for view in 0..sino.n_views {
                assert!(bands.band_min[view] >= 0);
                assert!(bands.band_max[view] <= sino.n_channels as i32);
            }

            for voxel in &sv.voxels {
                if voxel.is_empty() {
                    continue;
                }
                assert_eq!(voxel.piece_min.len(), n_pieces);
                assert_eq!(voxel.piece_width.len(), n_pieces);

                // Block length follows the piecewise widths exactly.
                let expected: usize = voxel
                    .piece_width
                    .iter()
                    .map(|&w| w as usize * svpar.piece_length)
                    .sum();
                assert_eq!(voxel.len(), expected);

                for piece in 0..n_pieces {
                    let views = piece * svpar.piece_length..(piece + 1) * svpar.piece_length;
                    let band_width = views
                        .map(|v| bands.band_max[v] - bands.band_min[v])
                        .max()
                        .unwrap();
                    // A voxel's block never outgrows its piece's band.
                    assert!(voxel.piece_width[piece] <= band_width);
                    assert!(voxel.piece_min[piece] >= 0);
                    // The padded band stays inside the detector.
                    for view in piece * svpar.piece_length..(piece + 1) * svpar.piece_length {
                        assert!(
                            bands.band_min[view] + voxel.piece_width[piece]
                                <= sino.n_channels as i32
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn every_packed_voxel_carries_its_maximum() {
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..10 {
        let (img, sino, svpar, mask) = random_setup(&mut rng);
        let matrix = SystemMatrix::compute(&img, &sino, &svpar, &mask).unwrap();
        for sv in &matrix.svs {
            for voxel in &sv.voxels {
                if voxel.len() > 0 {
                    // Quantization is normalized per voxel, so the packed
                    // bytes of every retained voxel peak at 255.
                    assert_eq!(voxel.values.iter().max(), Some(&255));
                }
            }
        }
    }
}

#[test]
fn max_scale_is_positive_exactly_for_nonempty_columns() {
    let mut rng = StdRng::seed_from_u64(41);
    let (img, sino, svpar, mask) = random_setup(&mut rng);
    let matrix = SystemMatrix::compute(&img, &sino, &svpar, &mask).unwrap();

    let profile = PixelProfile::build(&img, &sino);
    let builder = ColumnBuilder::new(&img, &sino, &profile);
    let mut values = Vec::new();
    for row in 0..img.ny {
        for col in 0..img.nx {
            let column = builder.build(row, col, &mut values);
            let scale = matrix.max_scale[row * img.nx + col];
            if column.n_index > 0 {
                assert!(scale > 0.0);
            } else {
                assert_eq!(scale, 0.0);
            }
        }
    }
}
