//! Image-grid, sinogram, and super-voxel geometry parameters.
//!
//! Projection arithmetic is anchored at the detector origin `t0` and the image
//! origin `(x0, y0)`. Both are derived once per matrix build and carried in a
//! [`ProjectionGeometry`] value rather than cached globally, since every input
//! parameter may change between builds.

use crate::util::{SvMatrixError, SvMatrixResult};

/// Reconstruction grid geometry. Voxels are square and slice-invariant.
#[derive(Clone, Debug)]
pub struct ImageParams {
    /// Voxel count along x.
    pub nx: usize,
    /// Voxel count along y.
    pub ny: usize,
    /// Voxel side length.
    pub delta_xy: f32,
}

impl ImageParams {
    /// Total voxel count of the grid.
    pub fn n_voxels(&self) -> usize {
        self.nx * self.ny
    }

    pub(crate) fn validate(&self) -> SvMatrixResult<()> {
        if self.nx == 0 || self.ny == 0 {
            return Err(SvMatrixError::InvalidDimensions {
                nx: self.nx,
                ny: self.ny,
            });
        }
        if !self.delta_xy.is_finite() || self.delta_xy <= 0.0 {
            return Err(SvMatrixError::InvalidConfig {
                reason: "delta_xy must be a positive finite value",
            });
        }
        Ok(())
    }
}

/// Sinogram acquisition geometry for a parallel-beam scanner.
#[derive(Clone, Debug)]
pub struct SinoParams {
    /// Number of projection views.
    pub n_views: usize,
    /// Number of detector channels per view.
    pub n_channels: usize,
    /// Detector channel spacing.
    pub delta_channel: f32,
    /// Rotation-center offset in channel units.
    pub center_offset: f32,
    /// View angles in radians, one per view. No ordering is required.
    pub view_angles: Vec<f32>,
}

impl SinoParams {
    pub(crate) fn validate(&self) -> SvMatrixResult<()> {
        if self.n_views == 0 || self.n_channels == 0 {
            return Err(SvMatrixError::InvalidConfig {
                reason: "n_views and n_channels must be non-zero",
            });
        }
        if !self.delta_channel.is_finite() || self.delta_channel <= 0.0 {
            return Err(SvMatrixError::InvalidConfig {
                reason: "delta_channel must be a positive finite value",
            });
        }
        if !self.center_offset.is_finite() {
            return Err(SvMatrixError::InvalidConfig {
                reason: "center_offset must be finite",
            });
        }
        if self.view_angles.len() != self.n_views {
            return Err(SvMatrixError::ViewAngleCount {
                expected: self.n_views,
                got: self.view_angles.len(),
            });
        }
        Ok(())
    }
}

/// Super-voxel tiling parameters.
///
/// The image is tiled with overlapping squares of side `2 * sv_length + 1`,
/// stepped by `2 * sv_length - overlap` in each axis. `n_sv` is declared by
/// the caller and must equal the number of origins that walk visits; use
/// [`crate::lowlevel::tile_count`] to derive it.
#[derive(Clone, Debug)]
pub struct SvParams {
    /// Half-side of a super-voxel; the square covers `2 * sv_length + 1` voxels per axis.
    pub sv_length: usize,
    /// Overlap between adjacent super-voxels, in voxels.
    pub overlap: usize,
    /// Number of consecutive views sharing one packed band width. Must divide `n_views`.
    pub piece_length: usize,
    /// Number of super-voxels the tile walk produces.
    pub n_sv: usize,
}

impl SvParams {
    /// Side length of a super-voxel in voxels.
    pub fn side(&self) -> usize {
        2 * self.sv_length + 1
    }

    /// Number of voxel slots in one super-voxel.
    pub fn slots(&self) -> usize {
        self.side() * self.side()
    }

    /// Tile-walk step between adjacent super-voxel origins.
    ///
    /// Zero only for parameters that fail validation.
    pub fn stride(&self) -> usize {
        (2 * self.sv_length).saturating_sub(self.overlap)
    }

    /// Number of view pieces for the given view count.
    pub fn n_pieces(&self, n_views: usize) -> usize {
        n_views / self.piece_length
    }

    pub(crate) fn validate(&self, n_views: usize) -> SvMatrixResult<()> {
        if self.overlap >= 2 * self.sv_length {
            return Err(SvMatrixError::InvalidConfig {
                reason: "overlap must be smaller than 2 * sv_length",
            });
        }
        if self.piece_length == 0 || n_views % self.piece_length != 0 {
            return Err(SvMatrixError::PieceLength {
                piece_length: self.piece_length,
                n_views,
            });
        }
        Ok(())
    }
}

/// Derived projection anchors, recomputed once per build.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ProjectionGeometry {
    /// Center of the first detector channel on the projection axis.
    pub(crate) t0: f32,
    /// x coordinate of the first voxel column center.
    pub(crate) x0: f32,
    /// y coordinate of the first voxel row center.
    pub(crate) y0: f32,
}

impl ProjectionGeometry {
    pub(crate) fn new(img: &ImageParams, sino: &SinoParams) -> Self {
        let t0 = -(sino.n_channels as f32 - 1.0) * sino.delta_channel / 2.0
            - sino.center_offset * sino.delta_channel;
        let x0 = -(img.nx as f32 - 1.0) * img.delta_xy / 2.0;
        let y0 = -(img.ny as f32 - 1.0) * img.delta_xy / 2.0;
        Self { t0, x0, y0 }
    }

    /// World coordinates of the voxel center at `(row, col)`.
    pub(crate) fn voxel_center(&self, img: &ImageParams, row: usize, col: usize) -> (f32, f32) {
        let x = self.x0 + col as f32 * img.delta_xy;
        let y = self.y0 + row as f32 * img.delta_xy;
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::{ImageParams, ProjectionGeometry, SinoParams, SvParams};

    fn sino(n_channels: usize, center_offset: f32) -> SinoParams {
        SinoParams {
            n_views: 1,
            n_channels,
            delta_channel: 1.0,
            center_offset,
            view_angles: vec![0.0],
        }
    }

    #[test]
    fn detector_origin_is_centered() {
        let img = ImageParams {
            nx: 1,
            ny: 1,
            delta_xy: 1.0,
        };
        let geom = ProjectionGeometry::new(&img, &sino(3, 0.0));
        assert!((geom.t0 + 1.0).abs() < 1e-6);
    }

    #[test]
    fn center_offset_shifts_detector_origin() {
        let img = ImageParams {
            nx: 1,
            ny: 1,
            delta_xy: 1.0,
        };
        let base = ProjectionGeometry::new(&img, &sino(3, 0.0));
        let shifted = ProjectionGeometry::new(&img, &sino(3, 0.5));
        assert!((base.t0 - shifted.t0 - 0.5).abs() < 1e-6);
    }

    #[test]
    fn voxel_center_is_symmetric_about_origin() {
        let img = ImageParams {
            nx: 3,
            ny: 3,
            delta_xy: 2.0,
        };
        let geom = ProjectionGeometry::new(&img, &sino(3, 0.0));
        let (x, y) = geom.voxel_center(&img, 1, 1);
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
        let (x, y) = geom.voxel_center(&img, 0, 2);
        assert!((x - 2.0).abs() < 1e-6);
        assert!((y + 2.0).abs() < 1e-6);
    }

    #[test]
    fn sv_params_reject_wide_overlap() {
        let svpar = SvParams {
            sv_length: 1,
            overlap: 2,
            piece_length: 1,
            n_sv: 0,
        };
        assert!(svpar.validate(4).is_err());
    }

    #[test]
    fn sv_params_reject_nondividing_piece_length() {
        let svpar = SvParams {
            sv_length: 1,
            overlap: 1,
            piece_length: 3,
            n_sv: 0,
        };
        assert!(svpar.validate(4).is_err());
        assert!(svpar.validate(6).is_ok());
    }
}
