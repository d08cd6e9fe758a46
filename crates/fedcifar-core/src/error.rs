use std::path::PathBuf;

use crate::shape::Shape;

/// All errors that can occur within fedcifar.
///
/// Configuration errors (bad epoch counts, bad crop shapes) are raised before
/// any data is read.  Loading errors come from the partition readers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An argument was outside its accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A crop shape was given with the wrong number of dimensions.
    #[error(
        "the crop_shape must have length 3, corresponding to a tensor of shape \
         [height, width, channels]; got {got} dimensions"
    )]
    CropShapeRank { got: usize },

    /// A crop shape could not be turned into a `(height, width, channels)` triple.
    #[error("argument crop_shape must be able to be coerced into a length 3 tuple, got {got:?}")]
    CropShapeCoercion { got: Vec<usize> },

    /// A crop shape exceeds the source image or changes the channel count.
    #[error("invalid crop shape {shape}: must be non-empty, at most {max} element-wise, with {channels} channels")]
    InvalidCropShape {
        shape: Shape,
        max: Shape,
        channels: usize,
    },

    /// Element count mismatch when creating an image from a vec.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// A label byte was outside the class range.
    #[error("label {label} out of range for {num_classes} classes in {}", path.display())]
    InvalidLabel {
        path: PathBuf,
        label: i64,
        num_classes: usize,
    },

    /// The requested client is not part of the partition.
    #[error("unknown client id: {0}")]
    UnknownClient(String),

    /// A split directory of the on-disk partition is missing.
    #[error("partition split not found: {}", .0.display())]
    MissingSplit(PathBuf),

    /// A client file is not a whole number of records.
    #[error("truncated record file {}: {len} bytes is not a multiple of {record_bytes}", path.display())]
    TruncatedRecord {
        path: PathBuf,
        len: usize,
        record_bytes: usize,
    },

    /// A split of the partition contained no clients.
    #[error("partition split `{0}` has no clients")]
    EmptyPartition(String),

    /// Configuration text could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// A client file name cannot be used as a client id.
    #[error("client file name is not valid UTF-8: {}", .0.display())]
    InvalidClientFile(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type used throughout fedcifar.
pub type Result<T> = std::result::Result<T, Error>;

/// Early return with an [`Error::InvalidArgument`] built from a format string.
/// Usage: `bail!("num_epochs must be a positive integer, got {}", n)`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::InvalidArgument(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_epochs(n: usize) -> Result<usize> {
        if n < 1 {
            crate::bail!("num_epochs must be a positive integer, got {}", n);
        }
        Ok(n)
    }

    #[test]
    fn bail_builds_invalid_argument() {
        let err = check_epochs(0).unwrap_err();
        assert!(matches!(&err, Error::InvalidArgument(m) if m.ends_with("got 0")));
        assert_eq!(err.to_string(), "invalid argument: num_epochs must be a positive integer, got 0");
        assert_eq!(check_epochs(2).unwrap(), 2);
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
