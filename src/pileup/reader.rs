use std::io::{BufRead, Lines};
use std::path::Path;

use anyhow::Context;

use crate::pileup::PileupRecord;
use crate::util::open_text_reader;

/// Streams pileup records from one file, in file order.
pub struct PileupReader {
    name: String,
    lines: Lines<Box<dyn BufRead>>,
    strand_column: usize,
    region: Option<String>,
    line_number: usize,
}

impl PileupReader {
    pub fn open<P: AsRef<Path>>(
        fp: P,
        strand_column: usize,
        region: Option<&str>,
    ) -> anyhow::Result<Self> {
        let name = fp.as_ref().to_str().unwrap_or("invalid-UTF-8").to_owned();
        let reader = open_text_reader(&fp)?;
        Ok(Self::from_reader(name, reader, strand_column, region))
    }

    pub fn from_reader(
        name: String,
        reader: Box<dyn BufRead>,
        strand_column: usize,
        region: Option<&str>,
    ) -> Self {
        Self {
            name,
            lines: reader.lines(),
            strand_column,
            region: region.map(|r| r.to_owned()),
            line_number: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Iterator for PileupReader {
    type Item = anyhow::Result<PileupRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(e).with_context(|| {
                        format!("failed to read from {}", self.name)
                    }))
                }
            };
            self.line_number += 1;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(region) = self.region.as_ref() {
                if !line.starts_with(region.as_str()) {
                    continue;
                }
            }
            let line_number = self.line_number;
            return Some(
                PileupRecord::parse(line, self.strand_column).with_context(
                    || format!("invalid pileup line {line_number} in {}", self.name),
                ),
            );
        }
    }
}

#[cfg(test)]
mod pileup_reader_tests {
    use std::io::Cursor;

    use crate::pileup::PileupReader;
    use crate::test_utils::{pileup_line, STRAND_COLUMN};

    fn reader(text: String, region: Option<&str>) -> PileupReader {
        PileupReader::from_reader(
            "test".to_string(),
            Box::new(Cursor::new(text.into_bytes())),
            STRAND_COLUMN,
            region,
        )
    }

    #[test]
    fn test_reads_records_and_skips_comments() {
        let text = format!(
            "# comment\n{}\n\n{}\n",
            pileup_line("chr1", 1, 'A', "..", "++"),
            pileup_line("chr1", 2, 'C', ".", "+"),
        );
        let positions = reader(text, None)
            .map(|r| r.map(|p| p.position()))
            .collect::<anyhow::Result<Vec<u64>>>()
            .unwrap();
        assert_eq!(positions, vec![1, 2]);
    }

    #[test]
    fn test_region_prefix_filter() {
        let text = format!(
            "{}\n{}\n{}\n",
            pileup_line("chr1", 1, 'A', ".", "+"),
            pileup_line("chr2", 1, 'A', ".", "+"),
            pileup_line("chr2_random", 5, 'A', ".", "+"),
        );
        let chroms = reader(text, Some("chr2"))
            .map(|r| r.map(|p| p.chrom().to_string()))
            .collect::<anyhow::Result<Vec<String>>>()
            .unwrap();
        assert_eq!(chroms, vec!["chr2".to_string(), "chr2_random".to_string()]);
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let text = format!("{}\nchr1\tx\n", pileup_line("chr1", 1, 'A', ".", "+"));
        let results = reader(text, None).collect::<Vec<_>>();
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }
}
