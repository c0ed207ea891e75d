use std::path::PathBuf;

use crate::{error::Error, smooth::SavitzkyGolay};

pub const USAGE: &str = "usage: noise-fft [--smooth [WINDOW ORDER]] LABEL=FILE[,FILE...]...";

/// Captures averaged together under one label.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub label: String,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub smoothing: Option<SavitzkyGolay>,
    pub groups: Vec<Group>,
}

pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Options, Error> {
    let mut args = args.into_iter().peekable();
    let mut smoothing = None;
    let mut groups = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--smooth" {
            let window = match args.peek().and_then(|next| next.parse::<usize>().ok()) {
                Some(window) => {
                    args.next();
                    window
                }
                None => {
                    smoothing = Some(SavitzkyGolay::default());
                    continue;
                }
            };
            let order = args
                .next()
                .and_then(|order| order.parse::<usize>().ok())
                .ok_or_else(|| Error::Usage("--smooth WINDOW needs an ORDER".into()))?;
            smoothing = Some(SavitzkyGolay::new(window, order)?);
        } else {
            groups.push(group(&arg)?);
        }
    }

    if groups.is_empty() {
        return Err(Error::Usage("no captures given".into()));
    }
    Ok(Options { smoothing, groups })
}

fn group(arg: &str) -> Result<Group, Error> {
    let (label, files) = arg
        .split_once('=')
        .ok_or_else(|| Error::Usage(format!("expected LABEL=FILE, got `{}`", arg)))?;

    let files: Vec<PathBuf> = files
        .split(',')
        .filter(|file| !file.is_empty())
        .map(PathBuf::from)
        .collect();
    if label.is_empty() || files.is_empty() {
        return Err(Error::Usage(format!("expected LABEL=FILE, got `{}`", arg)));
    }

    Ok(Group {
        label: label.to_owned(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn groups_keep_their_order() {
        let options = parse(args("baseline=base.csv rtd=rtd1.csv,rtd2.csv")).unwrap();
        assert_eq!(options.smoothing, None);
        assert_eq!(
            options.groups,
            [
                Group {
                    label: "baseline".into(),
                    files: vec!["base.csv".into()],
                },
                Group {
                    label: "rtd".into(),
                    files: vec!["rtd1.csv".into(), "rtd2.csv".into()],
                },
            ]
        );
    }

    #[test]
    fn smooth_without_values_uses_defaults() {
        let options = parse(args("--smooth base=base.csv")).unwrap();
        assert_eq!(options.smoothing, Some(SavitzkyGolay::default()));
        assert_eq!(options.groups.len(), 1);
    }

    #[test]
    fn smooth_with_values() {
        let options = parse(args("a=1.csv --smooth 21 2")).unwrap();
        assert_eq!(options.smoothing, Some(SavitzkyGolay::new(21, 2).unwrap()));
    }

    #[test]
    fn smooth_window_without_order_is_rejected() {
        assert!(matches!(
            parse(args("a=1.csv --smooth 21")),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn even_window_is_rejected() {
        assert!(matches!(
            parse(args("--smooth 20 2 a=1.csv")),
            Err(Error::InvalidSmoothing { window: 20, .. })
        ));
    }

    #[test]
    fn malformed_groups_are_rejected() {
        for line in ["", "base.csv", "=base.csv", "base="] {
            assert!(matches!(parse(args(line)), Err(Error::Usage(_))), "{}", line);
        }
    }
}
