use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use flate2::read::MultiGzDecoder;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::errs::InputError;

pub(crate) const TAB: char = '\t';

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Default)]
pub enum Strand {
    #[default]
    Positive,
    Negative,
}

impl Strand {
    pub fn parse_char(x: char) -> Result<Self, InputError> {
        match x {
            '+' => Ok(Self::Positive),
            '-' => Ok(Self::Negative),
            _ => Err(format!("failed to parse strand {}", x).into()),
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            Strand::Positive => '+',
            Strand::Negative => '-',
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Strand::Positive => Strand::Negative,
            Strand::Negative => Strand::Positive,
        }
    }

    #[inline]
    pub(crate) fn index(&self) -> usize {
        match self {
            Strand::Positive => 0,
            Strand::Negative => 1,
        }
    }
}

/// Opens a text file, transparently decompressing `.gz` files.
pub fn open_text_reader<P: AsRef<Path>>(
    fp: P,
) -> anyhow::Result<Box<dyn BufRead>> {
    let fp = fp.as_ref();
    let fh = File::open(fp).with_context(|| {
        format!("failed to open {}", fp.to_str().unwrap_or("invalid-UTF-8"))
    })?;
    let is_gzipped =
        fp.extension().map(|ext| ext == "gz").unwrap_or(false);
    if is_gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(fh))))
    } else {
        Ok(Box::new(BufReader::new(fh)))
    }
}

pub(crate) fn get_ticker(suppress: bool) -> ProgressBar {
    let ticker = ProgressBar::new_spinner();
    ticker.set_style(
        ProgressStyle::with_template(
            "{spinner:.blue} [{elapsed_precise}] {pos} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▹▹▹▹▹",
            "▸▹▹▹▹",
            "▹▸▹▹▹",
            "▹▹▸▹▹",
            "▹▹▹▸▹",
            "▹▹▹▹▸",
            "▪▪▪▪▪",
        ]),
    );
    if suppress {
        ticker.set_draw_target(ProgressDrawTarget::hidden());
    }
    ticker
}

#[cfg(test)]
mod util_tests {
    use std::io::{BufRead, Write};

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use crate::util::{open_text_reader, Strand};

    #[test]
    fn test_strand_parse_and_opposite() {
        assert_eq!(Strand::parse_char('+').unwrap(), Strand::Positive);
        assert_eq!(Strand::parse_char('-').unwrap(), Strand::Negative);
        assert!(Strand::parse_char('.').is_err());
        assert_eq!(Strand::Positive.opposite(), Strand::Negative);
        assert_eq!(Strand::Negative.to_char(), '-');
    }

    #[test]
    fn test_open_text_reader_plain_and_gz() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("lines.txt");
        std::fs::write(&plain, "a\nb\n").unwrap();
        let gz = dir.path().join("lines.txt.gz");
        let mut encoder = GzEncoder::new(
            std::fs::File::create(&gz).unwrap(),
            Compression::default(),
        );
        encoder.write_all(b"a\nb\n").unwrap();
        encoder.finish().unwrap();

        for fp in [plain, gz] {
            let lines = open_text_reader(&fp)
                .unwrap()
                .lines()
                .collect::<Result<Vec<String>, _>>()
                .unwrap();
            assert_eq!(lines, vec!["a".to_string(), "b".to_string()]);
        }
        assert!(open_text_reader(dir.path().join("missing.txt")).is_err());
    }
}
