//! Error type shared by every fallible entry point in the crate.

use std::fmt;

/// Failure modes for the rasterization pipeline.
///
/// `DegenerateBBox` and `EmptyPath` are not fatal: callers that only want to
/// know "is there anything to draw" can match on them, but every stage that
/// can return one also accepts it as a legitimate "nothing to do" result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    /// No vertices were submitted to the path.
    EmptyPath,
    /// The path's bounding box collapsed (`minx > maxx` or `miny > maxy`).
    DegenerateBBox,
    /// A pixel or scratch buffer could not be obtained.
    AllocationFailed(String),
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::EmptyPath => write!(f, "path has no points"),
            RasterError::DegenerateBBox => write!(f, "path bounding box is degenerate"),
            RasterError::AllocationFailed(what) => write!(f, "allocation failed: {}", what),
        }
    }
}

impl std::error::Error for RasterError {}

pub type Result<T> = std::result::Result<T, RasterError>;
