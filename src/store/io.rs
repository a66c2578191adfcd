//! Binary reading and writing of packed system matrices.
//!
//! The file mirrors the in-memory layout exactly, little-endian throughout:
//! for each super-voxel its band arrays, then one length-prefixed voxel slot
//! per grid position (empty slots write only a zero length), and after all
//! super-voxels the per-voxel scale array. Reading walks the same sequence
//! and sizes every allocation from the declared parameters.

use crate::geom::{ImageParams, SinoParams, SvParams};
use crate::store::SystemMatrix;
use crate::sv::band::BandMap;
use crate::sv::pack::PaddedVoxel;
use crate::sv::{self, PackedSv};
use crate::trace::{trace_event, trace_span};
use crate::util::{SvMatrixError, SvMatrixResult};
use lebe::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

fn io_error(path: &Path, source: std::io::Error) -> SvMatrixError {
    SvMatrixError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_error(path: &Path, source: std::io::Error) -> SvMatrixError {
    if source.kind() == ErrorKind::UnexpectedEof {
        SvMatrixError::ShortRead {
            path: path.to_path_buf(),
        }
    } else {
        SvMatrixError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Writes a packed system matrix to `path`.
///
/// The parameters are the ones the matrix was computed with; they fix the
/// array sizes of the fixed layout.
pub fn write_matrix(
    path: impl AsRef<Path>,
    matrix: &SystemMatrix,
    img: &ImageParams,
    sino: &SinoParams,
    svpar: &SvParams,
) -> SvMatrixResult<()> {
    let path = path.as_ref();
    let _span = trace_span!("write_matrix", n_sv = matrix.svs.len()).entered();

    validate_store(matrix, img, sino, svpar)?;

    let file = File::create(path).map_err(|e| io_error(path, e))?;
    let mut writer = BufWriter::new(file);

    for sv in &matrix.svs {
        writer
            .write_as_little_endian(sv.bands.band_min.as_slice())
            .map_err(|e| io_error(path, e))?;
        writer
            .write_as_little_endian(sv.bands.band_max.as_slice())
            .map_err(|e| io_error(path, e))?;

        for voxel in &sv.voxels {
            let length = voxel.len() as i32;
            writer
                .write_as_little_endian(&length)
                .map_err(|e| io_error(path, e))?;
            if length > 0 {
                writer
                    .write_as_little_endian(voxel.values.as_slice())
                    .map_err(|e| io_error(path, e))?;
                writer
                    .write_as_little_endian(voxel.piece_min.as_slice())
                    .map_err(|e| io_error(path, e))?;
                writer
                    .write_as_little_endian(voxel.piece_width.as_slice())
                    .map_err(|e| io_error(path, e))?;
            }
        }
    }

    writer
        .write_as_little_endian(matrix.max_scale.as_slice())
        .map_err(|e| io_error(path, e))?;
    writer.flush().map_err(|e| io_error(path, e))?;

    trace_event!("matrix_written", n_sv = matrix.svs.len());
    Ok(())
}

/// Reads a packed system matrix from `path`.
///
/// The parameters must match the ones the file was written with; a file that
/// ends early or declares a negative slot length is rejected.
pub fn read_matrix(
    path: impl AsRef<Path>,
    img: &ImageParams,
    sino: &SinoParams,
    svpar: &SvParams,
) -> SvMatrixResult<SystemMatrix> {
    let path = path.as_ref();
    let _span = trace_span!("read_matrix", n_sv = svpar.n_sv).entered();

    img.validate()?;
    sino.validate()?;
    svpar.validate(sino.n_views)?;
    let tiled = sv::tile_count(img, svpar);
    if tiled != svpar.n_sv {
        return Err(SvMatrixError::SvCount {
            declared: svpar.n_sv,
            tiled,
        });
    }

    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let mut reader = BufReader::new(file);

    let n_views = sino.n_views;
    let n_pieces = svpar.n_pieces(n_views);
    let slots = svpar.slots();

    let mut svs = Vec::with_capacity(svpar.n_sv);
    for _ in 0..svpar.n_sv {
        let mut band_min = vec![0i32; n_views];
        let mut band_max = vec![0i32; n_views];
        reader
            .read_from_little_endian_into(band_min.as_mut_slice())
            .map_err(|e| read_error(path, e))?;
        reader
            .read_from_little_endian_into(band_max.as_mut_slice())
            .map_err(|e| read_error(path, e))?;

        let mut voxels = Vec::with_capacity(slots);
        for _ in 0..slots {
            let length: i32 = reader
                .read_from_little_endian()
                .map_err(|e| read_error(path, e))?;
            if length < 0 {
                return Err(SvMatrixError::InvalidFile {
                    path: path.to_path_buf(),
                    reason: "negative voxel slot length",
                });
            }
            if length == 0 {
                voxels.push(PaddedVoxel::default());
                continue;
            }

            let mut values = vec![0u8; length as usize];
            let mut piece_min = vec![0i32; n_pieces];
            let mut piece_width = vec![0i32; n_pieces];
            reader
                .read_from_little_endian_into(values.as_mut_slice())
                .map_err(|e| read_error(path, e))?;
            reader
                .read_from_little_endian_into(piece_min.as_mut_slice())
                .map_err(|e| read_error(path, e))?;
            reader
                .read_from_little_endian_into(piece_width.as_mut_slice())
                .map_err(|e| read_error(path, e))?;
            voxels.push(PaddedVoxel {
                values,
                piece_min,
                piece_width,
            });
        }

        svs.push(PackedSv {
            bands: BandMap { band_min, band_max },
            voxels,
        });
    }

    let mut max_scale = vec![0f32; img.n_voxels()];
    reader
        .read_from_little_endian_into(max_scale.as_mut_slice())
        .map_err(|e| read_error(path, e))?;

    trace_event!("matrix_read", n_sv = svs.len());
    Ok(SystemMatrix { svs, max_scale })
}

/// Checks that the store's array shapes agree with the declared parameters.
fn validate_store(
    matrix: &SystemMatrix,
    img: &ImageParams,
    sino: &SinoParams,
    svpar: &SvParams,
) -> SvMatrixResult<()> {
    if matrix.svs.len() != svpar.n_sv {
        return Err(SvMatrixError::SvCount {
            declared: svpar.n_sv,
            tiled: matrix.svs.len(),
        });
    }
    if matrix.max_scale.len() != img.n_voxels() {
        return Err(SvMatrixError::InvalidConfig {
            reason: "max_scale length does not match the image grid",
        });
    }
    let slots = svpar.slots();
    for sv in &matrix.svs {
        if sv.bands.band_min.len() != sino.n_views
            || sv.bands.band_max.len() != sino.n_views
            || sv.voxels.len() != slots
        {
            return Err(SvMatrixError::InvalidConfig {
                reason: "matrix shape does not match the declared parameters",
            });
        }
    }
    Ok(())
}
