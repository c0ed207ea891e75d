use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("write error: {0}")]
    Io(#[from] io::Error),
    #[error("capture has {0} samples, at least 2 are needed")]
    TooFewSamples(usize),
    #[error("sample interval must be positive, got {0} s")]
    BadInterval(f64),
    #[error("captures in group `{0}` differ in length or sample interval")]
    Mismatched(String),
    #[error("invalid smoothing: window {window}, order {order} for {len} samples")]
    InvalidSmoothing {
        window: usize,
        order: usize,
        len: usize,
    },
    #[error("{0}")]
    Usage(String),
}
