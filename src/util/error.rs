//! Error types for svmatrix.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for svmatrix operations.
pub type SvMatrixResult<T> = std::result::Result<T, SvMatrixError>;

/// Errors that can occur while building or persisting a system matrix.
#[derive(Error, Debug)]
pub enum SvMatrixError {
    /// An underlying file operation failed.
    #[error("i/o failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A matrix file ended before the expected payload was consumed.
    #[error("matrix file {path} terminated early")]
    ShortRead { path: PathBuf },
    /// A matrix file declares sizes inconsistent with the fixed layout.
    #[error("matrix file {path} is not valid: {reason}")]
    InvalidFile {
        path: PathBuf,
        reason: &'static str,
    },
    /// The image grid dimensions are invalid (must be non-zero).
    #[error("invalid grid dimensions: nx={nx} ny={ny}")]
    InvalidDimensions { nx: usize, ny: usize },
    /// The view-angle list does not match the declared view count.
    #[error("view angle count mismatch: expected={expected} got={got}")]
    ViewAngleCount { expected: usize, got: usize },
    /// The reconstruction mask length does not match the image grid.
    #[error("mask length mismatch: expected={expected} got={got}")]
    MaskLength { expected: usize, got: usize },
    /// The piece length does not evenly divide the view count.
    #[error("piece length {piece_length} does not divide {n_views} views")]
    PieceLength {
        piece_length: usize,
        n_views: usize,
    },
    /// The declared super-voxel count disagrees with the tile walk.
    #[error("super-voxel count mismatch: declared={declared} tiled={tiled}")]
    SvCount { declared: usize, tiled: usize },
    /// A scalar parameter is out of its valid range.
    #[error("invalid parameter: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Parallel execution was requested but the `rayon` feature is disabled.
    #[error("parallel execution requested but the rayon feature is not enabled")]
    ParallelUnavailable,
}
