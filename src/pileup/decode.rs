use crate::dna::DnaBase;
use crate::errs::EditError;
use crate::parsing_utils::consume_list;
use crate::pileup::StrandObservations;
use crate::util::Strand;

const MAPPING_COLUMN: usize = 4;
const QUALITY_COLUMN: usize = 5;
const PHRED_OFFSET: u8 = 33;

#[inline]
fn phred_to_error_prob(qual: u8) -> Result<f64, EditError> {
    let phred = qual.checked_sub(PHRED_OFFSET).ok_or_else(|| {
        EditError::new_decode_error(format!(
            "invalid quality character {}",
            qual as char
        ))
    })?;
    Ok(10f64.powf(-(phred as f64) / 10f64))
}

fn parse_strand_tags(raw: &str, column: usize) -> Result<Vec<Strand>, EditError> {
    let misconfigured = || {
        EditError::new_config_error(format!(
            "column {} does not contain a comma-separated list of +/- strand \
             tags (found '{raw}'), check the strand column setting",
            column + 1
        ))
    };
    let (_, tags) = consume_list(raw, ",").map_err(|_| misconfigured())?;
    match tags.first() {
        Some(&"+") | Some(&"-") => {}
        _ => return Err(misconfigured()),
    }
    tags.into_iter()
        .map(|tag| match tag {
            "+" => Ok(Strand::Positive),
            "-" => Ok(Strand::Negative),
            _ => Err(EditError::new_decode_error(format!(
                "invalid strand tag {tag}"
            ))),
        })
        .collect()
}

fn mismatch_base(c: u8) -> Option<DnaBase> {
    match c {
        b'A' | b'a' => Some(DnaBase::A),
        b'C' | b'c' => Some(DnaBase::C),
        b'G' | b'g' => Some(DnaBase::G),
        b'T' | b't' => Some(DnaBase::T),
        _ => None,
    }
}

/// Returns the cursor just past an indel token starting at `cursor`
/// (`+3ACG`, `-1T`).
fn skip_indel(mapping: &[u8], cursor: usize) -> Result<usize, EditError> {
    let digits_start = cursor + 1;
    let digits_end = mapping[digits_start..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map(|offset| digits_start + offset)
        .unwrap_or(mapping.len());
    let indel_length = std::str::from_utf8(&mapping[digits_start..digits_end])
        .ok()
        .and_then(|raw| raw.parse::<usize>().ok())
        .ok_or_else(|| {
            EditError::new_decode_error(format!(
                "indel without length at mapping offset {cursor}"
            ))
        })?;
    let end = digits_end + indel_length;
    if end > mapping.len() {
        Err(EditError::new_decode_error(format!(
            "truncated indel at mapping offset {cursor}"
        )))
    } else {
        Ok(end)
    }
}

/// Walks the mapping string with one cursor and the quality/strand-tag lists
/// with another. Only match, mismatch and skip characters consume a quality
/// slot.
pub(super) fn decode_observations(
    line: &str,
    reference: Option<DnaBase>,
    reported_depth: u64,
    strand_column: usize,
) -> Result<StrandObservations, EditError> {
    let mut observations = StrandObservations::default();
    if reported_depth == 0 {
        return Ok(observations);
    }
    let fields = line.split('\t').collect::<Vec<&str>>();
    if fields.len() <= QUALITY_COLUMN {
        return Err(EditError::new_decode_error(format!(
            "expected at least {} columns, got {}",
            QUALITY_COLUMN + 1,
            fields.len()
        )));
    }
    let raw_strand_tags = fields.get(strand_column).ok_or_else(|| {
        EditError::new_config_error(format!(
            "strand column {} is missing, line only has {} columns",
            strand_column + 1,
            fields.len()
        ))
    })?;
    let strands = parse_strand_tags(raw_strand_tags, strand_column)?;
    let mapping = fields[MAPPING_COLUMN].as_bytes();
    let qualities = fields[QUALITY_COLUMN].as_bytes();

    let mut cursor = 0usize;
    let mut slot = 0usize;
    while cursor < mapping.len() {
        let c = mapping[cursor];
        let observed = match c {
            b'^' => {
                if cursor + 1 >= mapping.len() {
                    return Err(EditError::new_decode_error(
                        "read start marker without mapping quality",
                    ));
                }
                cursor += 2;
                continue;
            }
            b'$' => {
                cursor += 1;
                continue;
            }
            b'+' | b'-' => {
                cursor = skip_indel(mapping, cursor)?;
                continue;
            }
            b'.' | b',' => reference,
            b'<' | b'>' | b'*' | b'#' | b'N' | b'n' => None,
            _ => Some(mismatch_base(c).ok_or_else(|| {
                EditError::new_decode_error(format!(
                    "unexpected character '{}' in mapping string",
                    c as char
                ))
            })?),
        };
        let (qual, strand) = match (qualities.get(slot), strands.get(slot)) {
            (Some(q), Some(s)) => (*q, *s),
            (None, _) => {
                return Err(EditError::new_decode_error(
                    "more alignment events than quality values",
                ))
            }
            (_, None) => {
                return Err(EditError::new_decode_error(
                    "more alignment events than strand tags",
                ))
            }
        };
        if let Some(base) = observed {
            let base = match strand {
                Strand::Positive => base,
                Strand::Negative => base.complement(),
            };
            observations.add_read(strand, base, phred_to_error_prob(qual)?);
        }
        slot += 1;
        cursor += 1;
    }

    if slot != qualities.len() || slot != strands.len() {
        return Err(EditError::new_decode_error(format!(
            "{slot} alignment events but {} quality values and {} strand tags",
            qualities.len(),
            strands.len()
        )));
    }

    Ok(observations)
}

#[cfg(test)]
mod decode_tests {
    use assert_approx_eq::assert_approx_eq;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    use crate::dna::DnaBase;
    use crate::errs::EditError;
    use crate::pileup::decode::{decode_observations, phred_to_error_prob};
    use crate::util::Strand;

    fn decode(line: &str) -> Result<crate::pileup::StrandObservations, EditError> {
        let fields = line.split('\t').collect::<Vec<&str>>();
        let reference = DnaBase::parse_reference(fields[2].chars().next().unwrap());
        let depth = fields[3].parse::<u64>().unwrap();
        decode_observations(line, reference, depth, 6)
    }

    #[test]
    fn test_phred_conversion() {
        assert_approx_eq!(phred_to_error_prob(b'+').unwrap(), 0.1, 1e-12);
        assert_approx_eq!(phred_to_error_prob(b'5').unwrap(), 0.01, 1e-12);
        assert_approx_eq!(phred_to_error_prob(b'!').unwrap(), 1.0, 1e-12);
        assert!(phred_to_error_prob(b' ').is_err());
    }

    #[test]
    fn test_decode_matches_mismatches_and_markers() {
        // ^] starts a read, $ ends one, +2AC is an insertion, > is a skip
        let line = "chr1\t10\tA\t5\t^].G$+2AC,g>\tIIIII\t+,+,-,-,-";
        let observations = decode(line).unwrap();
        assert_eq!(observations.count(DnaBase::A, Strand::Positive), 1);
        assert_eq!(observations.count(DnaBase::G, Strand::Positive), 1);
        // reverse strand tags complement the observed base
        assert_eq!(observations.count(DnaBase::T, Strand::Negative), 1);
        assert_eq!(observations.count(DnaBase::C, Strand::Negative), 1);
        // skip consumed a slot but wasn't counted
        assert_eq!(observations.depth(None), 4);
        let mean = observations.mean_evidence(Strand::Negative);
        assert_approx_eq!(mean.iter().sum::<f64>(), 1f64, 1e-12);
    }

    #[test]
    fn test_error_mass_spread_over_other_bases() {
        let line = "chr1\t10\tA\t1\t.\t+\t+";
        let observations = decode(line).unwrap();
        let mean = observations.mean_evidence(Strand::Positive);
        assert_approx_eq!(mean[0], 0.9, 1e-12);
        for other in &mean[1..] {
            assert_approx_eq!(*other, 0.1 / 3f64, 1e-12);
        }
    }

    #[test]
    fn test_deletions_and_reference_n() {
        let line = "chr1\t10\tN\t3\t.-3ACG,*\tIII\t+,+,+";
        let observations = decode(line).unwrap();
        assert_eq!(observations.depth(None), 0);
    }

    #[test]
    fn test_zero_depth_skips_columns() {
        let line = "chr1\t10\tA\t0\t*\t*\t*";
        let observations = decode(line).unwrap();
        assert_eq!(observations.depth(None), 0);
    }

    #[test]
    fn test_misconfigured_strand_column() {
        let line = "chr1\t10\tA\t2\t..\tII\t60,60\t+,+";
        match decode(line) {
            Err(EditError::Config(_)) => {}
            other => panic!("expected config error, got {other:?}"),
        }
        let line = "chr1\t10\tA\t2\t..\tII";
        assert!(matches!(decode(line), Err(EditError::Config(_))));
    }

    #[test]
    fn test_malformed_mapping_strings() {
        for line in [
            "chr1\t10\tA\t2\t.X\tII\t+,+",
            "chr1\t10\tA\t2\t...\tII\t+,+",
            "chr1\t10\tA\t2\t..\tIII\t+,+,+,",
            "chr1\t10\tA\t2\t.+5AC\tII\t+,+",
            "chr1\t10\tA\t2\t.+AC\tII\t+,+",
            "chr1\t10\tA\t2\t.^\tII\t+,+",
            "chr1\t10\tA\t2\t..\tII\t+,x",
            "chr1\t10\tA\t2\t..\tII\t+",
        ] {
            let result = decode(line);
            assert!(
                matches!(result, Err(EditError::Decode(_))),
                "{line} => {result:?}"
            );
        }
    }

    #[test]
    fn test_counts_equal_depth_minus_skips() {
        let mut rng = StdRng::seed_from_u64(42);
        let alphabet = [".", ",", "A", "c", "G", "t", "*", ">", "^I.", ".$", "+1A", "-2CC"];
        for _ in 0..200 {
            let n_tokens = rng.gen_range(1..40);
            let mut mapping = String::new();
            let mut n_slots = 0usize;
            let mut n_skips = 0usize;
            for _ in 0..n_tokens {
                let token = alphabet[rng.gen_range(0..alphabet.len())];
                mapping.push_str(token);
                match token {
                    "+1A" | "-2CC" => {}
                    "*" | ">" => {
                        n_slots += 1;
                        n_skips += 1;
                    }
                    _ => n_slots += 1,
                }
            }
            if n_slots == 0 {
                continue;
            }
            let quals = "I".repeat(n_slots);
            let tags = (0..n_slots)
                .map(|_| if rng.gen_bool(0.5) { "+" } else { "-" })
                .collect::<Vec<&str>>()
                .join(",");
            let line = format!("chr1\t1\tC\t{n_slots}\t{mapping}\t{quals}\t{tags}");
            let observations = decode(&line).unwrap();
            assert_eq!(observations.depth(None) as usize, n_slots - n_skips);
            assert_eq!(
                observations.depth(None),
                observations.depth(Some(Strand::Positive))
                    + observations.depth(Some(Strand::Negative))
            );
        }
    }
}
