use std::{fs::File, io::Read, path::Path};

use serde::Deserialize;

use crate::error::Error;

/// One row of an oscilloscope CSV export. Other columns are ignored.
#[derive(Debug, Deserialize)]
struct Row {
    second: f64,
    #[serde(rename = "Volt")]
    volt: f64,
}

/// A uniformly sampled voltage trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    /// Seconds between two samples, taken from the first two rows.
    pub interval: f64,
    pub samples: Vec<f64>,
}

impl Capture {
    pub fn new(interval: f64, samples: Vec<f64>) -> Result<Self, Error> {
        if samples.len() < 2 {
            return Err(Error::TooFewSamples(samples.len()));
        }
        if !(interval.is_finite() && interval > 0.0) {
            return Err(Error::BadInterval(interval));
        }
        Ok(Capture { interval, samples })
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut first_two = [0.0; 2];
        let mut samples = Vec::new();
        for row in reader.deserialize() {
            let row: Row = row?;
            if let Some(t) = first_two.get_mut(samples.len()) {
                *t = row.second;
            }
            samples.push(row.volt);
        }

        Self::new(first_two[1] - first_two[0], samples)
    }
}
