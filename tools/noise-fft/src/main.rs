//! Frequency spectrum of oscilloscope captures taken on the CAN lines.
//!
//! Each `LABEL=FILE[,FILE...]` argument is one group. The spectra of a group's
//! captures are averaged and written as CSV (`label,frequency_hz,amplitude`)
//! to stdout.
use std::{io, process::ExitCode};

mod args;
mod capture;
mod error;
mod smooth;
mod spectrum;

use args::{Group, USAGE};
use capture::Capture;
use error::Error;
use smooth::SavitzkyGolay;
use spectrum::Spectrum;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("noise-fft: {}", e);
            if matches!(e, Error::Usage(_) | Error::InvalidSmoothing { len: 0, .. }) {
                eprintln!("{}", USAGE);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Error> {
    let options = args::parse(std::env::args().skip(1))?;

    let mut out = csv::Writer::from_writer(io::stdout().lock());
    out.write_record(["label", "frequency_hz", "amplitude"])?;
    for group in &options.groups {
        let spectrum = group_spectrum(group, options.smoothing.as_ref())?;
        for (frequency, amplitude) in spectrum.bins() {
            out.serialize((&group.label, frequency, amplitude))?;
        }
    }
    out.flush()?;
    Ok(())
}

fn group_spectrum(group: &Group, smoothing: Option<&SavitzkyGolay>) -> Result<Spectrum, Error> {
    let mut spectra = Vec::with_capacity(group.files.len());
    for path in &group.files {
        let capture = Capture::from_path(path)?;
        let samples = match smoothing {
            Some(filter) => filter.apply(&capture.samples)?,
            None => capture.samples,
        };
        spectra.push(Spectrum::of(&samples, capture.interval));
    }
    Spectrum::mean(&group.label, &spectra)
}
