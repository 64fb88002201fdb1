use thiserror::Error;

/// Errors
///
/// Only construction (`Config::validate`, `Pipeline::new`) and the frame
/// input setters are fallible; everything downstream of a successfully
/// constructed `Pipeline` logs and degrades gracefully instead of returning
/// `Err` - no error propagates out of a tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Errors {
    /// A required intrinsic/extrinsic is missing, or a configured value
    /// violates a structural invariant (e.g. `frame_skip > history_size`).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A depth or aligned-depth frame's dimensions don't match the
    /// configured `image_rows`/`image_cols`.
    #[error("input frame shape {got:?} does not match configured shape {expected:?}")]
    InputShape {
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// A structural invariant inside the pipeline was violated (e.g. fused
    /// boxes and fused clusters of different lengths). Logged and the
    /// current tick produces no detections; never fatal.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}
