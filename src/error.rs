use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, TrakErr>;

/// The featurization error type.
#[derive(Debug)]
pub enum TrakErr {
    /// Invalid dimensions, unknown variants or an unreadable spec.
    Config(String),
    /// The requested gradient extraction mode can't run in this environment.
    UnsupportedMode(String),
    /// A shape invariant was violated.
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// A sample index doesn't address a row of the feature store.
    IndexOutOfBounds { index: usize, len: usize },
    /// A label can't be interpreted as a class index.
    InvalidLabel { row: usize, value: f32 },
    /// A projected gradient row holds NaN or infinite values.
    NonFinite { row: usize },
    Io(io::Error),
}

impl Display for TrakErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrakErr::Config(msg) => write!(f, "invalid configuration: {msg}"),
            TrakErr::UnsupportedMode(msg) => write!(f, "unsupported extraction mode: {msg}"),
            TrakErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "shape mismatch for {what}: got {got}, expected {expected}"
            ),
            TrakErr::IndexOutOfBounds { index, len } => {
                write!(f, "sample index {index} is out of bounds for {len} rows")
            }
            TrakErr::InvalidLabel { row, value } => {
                write!(f, "invalid label {value} at batch row {row}")
            }
            TrakErr::NonFinite { row } => {
                write!(f, "projected gradient of batch row {row} is not finite")
            }
            TrakErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for TrakErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrakErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TrakErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for TrakErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<ndarray::ShapeError> for TrakErr {
    fn from(value: ndarray::ShapeError) -> Self {
        Self::Config(value.to_string())
    }
}
