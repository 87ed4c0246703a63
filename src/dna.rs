use std::fmt::{Display, Formatter};

use crate::errs::{EditError, InputError};

pub const BASES: [DnaBase; 4] = [DnaBase::A, DnaBase::C, DnaBase::G, DnaBase::T];

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum DnaBase {
    A,
    C,
    G,
    T,
}

impl DnaBase {
    pub fn parse(nt: char) -> Result<Self, InputError> {
        match nt {
            'A' => Ok(Self::A),
            'C' => Ok(Self::C),
            'G' => Ok(Self::G),
            'T' => Ok(Self::T),
            _ => Err(format!("unknown DNA base {nt}").into()),
        }
    }

    /// Reference column of a pileup, `N` (or anything that isn't ACGT) has
    /// no base.
    pub fn parse_reference(nt: char) -> Option<Self> {
        Self::parse(nt.to_ascii_uppercase()).ok()
    }

    pub fn complement(self) -> Self {
        match self {
            Self::A => Self::T,
            Self::C => Self::G,
            Self::G => Self::C,
            Self::T => Self::A,
        }
    }

    pub fn char(&self) -> char {
        match self {
            Self::A => 'A',
            Self::C => 'C',
            Self::G => 'G',
            Self::T => 'T',
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Self::A => 0,
            Self::C => 1,
            Self::G => 2,
            Self::T => 3,
        }
    }
}

impl Display for DnaBase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.char())
    }
}

/// The substitution searched for, e.g. A-to-G for A-to-I editing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct EditType {
    pub reference: DnaBase,
    pub alternate: DnaBase,
}

impl EditType {
    pub fn parse_str(raw: &str) -> Result<Self, EditError> {
        let bases = raw
            .trim()
            .chars()
            .map(|c| DnaBase::parse(c.to_ascii_uppercase()))
            .collect::<Result<Vec<DnaBase>, InputError>>()
            .map_err(|e| {
                EditError::new_config_error(format!(
                    "invalid edit type {raw}, {e}"
                ))
            })?;
        match bases.as_slice() {
            [reference, alternate] if reference != alternate => {
                Ok(Self { reference: *reference, alternate: *alternate })
            }
            [_, _] => Err(EditError::new_config_error(format!(
                "invalid edit type {raw}, reference and alternate bases must \
                 differ"
            ))),
            _ => Err(EditError::new_config_error(format!(
                "invalid edit type {raw}, expected two bases, e.g. AG"
            ))),
        }
    }
}

impl Display for EditType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.reference, self.alternate)
    }
}

#[cfg(test)]
mod dna_tests {
    use crate::dna::{DnaBase, EditType, BASES};

    #[test]
    fn test_complement_is_involution() {
        for base in BASES {
            assert_eq!(base.complement().complement(), base);
            assert_ne!(base.complement(), base);
        }
        assert_eq!(DnaBase::A.complement(), DnaBase::T);
        assert_eq!(DnaBase::C.complement(), DnaBase::G);
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(DnaBase::parse_reference('a'), Some(DnaBase::A));
        assert_eq!(DnaBase::parse_reference('N'), None);
        assert_eq!(DnaBase::parse_reference('n'), None);
    }

    #[test]
    fn test_parse_edit_type() {
        let edit = EditType::parse_str("AG").unwrap();
        assert_eq!(edit.reference, DnaBase::A);
        assert_eq!(edit.alternate, DnaBase::G);
        assert_eq!(edit.to_string(), "AG");
        assert_eq!(EditType::parse_str("ct").unwrap().to_string(), "CT");
        assert!(EditType::parse_str("AA").is_err());
        assert!(EditType::parse_str("AN").is_err());
        assert!(EditType::parse_str("AGT").is_err());
        assert!(EditType::parse_str("").is_err());
    }
}
