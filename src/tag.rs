/**
This module reads the tags of a NER corpus. A tag is either the outside tag `O` or a position
marker and an entity type joined by a delimiter, such as `B-PER` (or `PER-B` when the marker is a
suffix). Only the entity type matters to the balancer; the marker is used by the statistics to
count mentions.
*/
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt::Display;
use std::str::FromStr;

/// The outside tag. It never carries an entity type.
pub const OUTSIDE: &str = "O";

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Sequence)]
/// Position markers found in the usual tagging schemes (IOB1, IOB2, IOE1, IOE2, IOBES, BILOU).
pub enum Prefix {
    I,
    O,
    B,
    E,
    S,
    U,
    L,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Could not parse a char into a `Prefix`.
pub struct PrefixError(pub char);

impl Display for PrefixError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Could not parse the following char into a Prefix: {}", self.0)
    }
}

impl std::error::Error for PrefixError {}

impl TryFrom<char> for Prefix {
    type Error = PrefixError;
    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'I' => Ok(Self::I),
            'O' => Ok(Self::O),
            'B' => Ok(Self::B),
            'E' => Ok(Self::E),
            'S' => Ok(Self::S),
            'U' => Ok(Self::U),
            'L' => Ok(Self::L),
            c => Err(PrefixError(c)),
        }
    }
}

impl FromStr for Prefix {
    type Err = PrefixError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Prefix::try_from(c),
            (Some(c), Some(_)) => Err(PrefixError(c)),
            (None, _) => Err(PrefixError(' ')),
        }
    }
}

impl Prefix {
    /// Is this the first token of a span? `B` opens a multi-token chunk, `S` and `U` are chunks
    /// of a single token.
    pub fn starts_span(&self) -> bool {
        matches!(self, Prefix::B | Prefix::S | Prefix::U)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
/// Describes how the position marker is attached to the entity type.
pub struct TagFormat {
    /// Char separating the marker from the entity type.
    pub delimiter: char,
    /// If the marker is located at the end of the tag (e.g. `PER-B`), this should be `true`.
    pub suffix: bool,
}

impl Default for TagFormat {
    fn default() -> Self {
        Self {
            delimiter: '-',
            suffix: false,
        }
    }
}

impl TagFormat {
    pub fn new(delimiter: char, suffix: bool) -> Self {
        Self { delimiter, suffix }
    }

    /// Splits a tag into its marker and its entity type. Returns `None` for the outside tag and
    /// for empty tags. A tag without the `marker + delimiter` structure is an entity type on its
    /// own and has no marker.
    pub fn split<'a>(&self, tag: &'a str) -> Option<(Option<char>, &'a str)> {
        if tag.is_empty() || tag == OUTSIDE {
            return None;
        }
        let parts = if self.suffix {
            self.split_suffix(tag)
        } else {
            self.split_prefix(tag)
        };
        match parts {
            Some((_, "")) => None,
            Some((marker, entity)) => Some((Some(marker), entity)),
            None => Some((None, tag)),
        }
    }

    fn split_prefix<'a>(&self, tag: &'a str) -> Option<(char, &'a str)> {
        let mut indices = tag.char_indices();
        let (_, marker) = indices.next()?;
        let (delimiter_index, delimiter) = indices.next()?;
        if delimiter != self.delimiter {
            return None;
        }
        Some((marker, &tag[delimiter_index + delimiter.len_utf8()..]))
    }

    fn split_suffix<'a>(&self, tag: &'a str) -> Option<(char, &'a str)> {
        let mut indices = tag.char_indices().rev();
        let (_, marker) = indices.next()?;
        let (delimiter_index, delimiter) = indices.next()?;
        if delimiter != self.delimiter {
            return None;
        }
        Some((marker, &tag[..delimiter_index]))
    }

    /// The entity type carried by a tag, if any.
    pub fn entity_type<'a>(&self, tag: &'a str) -> Option<&'a str> {
        self.split(tag).map(|(_, entity)| entity)
    }

    /// Does the tag carry the given entity type?
    pub fn has_type(&self, tag: &str, entity: &str) -> bool {
        self.entity_type(tag) == Some(entity)
    }

    /// Is the tag the first token of a span? Tags without a recognizable marker count as a span
    /// start, since each of them is a mention on its own.
    pub fn starts_span(&self, tag: &str) -> bool {
        match self.split(tag) {
            None => false,
            Some((None, _)) => true,
            Some((Some(marker), _)) => Prefix::try_from(marker)
                .map(|p| p.starts_span())
                .unwrap_or(false),
        }
    }

    /// Replaces the entity type of the tag, keeping its marker. The outside tag is returned as
    /// is.
    pub fn rename(&self, tag: &str, new_type: &str) -> String {
        match self.split(tag) {
            None => String::from(tag),
            Some((None, _)) => String::from(new_type),
            Some((Some(marker), _)) if self.suffix => {
                format!("{}{}{}", new_type, self.delimiter, marker)
            }
            Some((Some(marker), _)) => format!("{}{}{}", marker, self.delimiter, new_type),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use enum_iterator::all;
    use rstest::rstest;

    #[rstest]
    #[case("B-PER", Some("PER"))]
    #[case("I-Valor_da_causa", Some("Valor_da_causa"))]
    #[case("B-CNPJ_do_réu", Some("CNPJ_do_réu"))]
    #[case("O", None)]
    #[case("", None)]
    #[case("B-", None)]
    #[case("MISC", Some("MISC"))]
    #[case("É-X", Some("X"))]
    fn test_entity_type_prefix(#[case] tag: &str, #[case] expected: Option<&str>) {
        let format = TagFormat::default();
        assert_eq!(format.entity_type(tag), expected);
    }

    #[rstest]
    #[case("PER-B", Some("PER"))]
    #[case("Data_dos_fatos-I", Some("Data_dos_fatos"))]
    #[case("O", None)]
    #[case("-B", None)]
    fn test_entity_type_suffix(#[case] tag: &str, #[case] expected: Option<&str>) {
        let format = TagFormat::new('-', true);
        assert_eq!(format.entity_type(tag), expected);
    }

    #[test]
    fn test_custom_delimiter() {
        let format = TagFormat::new('_', false);
        assert_eq!(format.entity_type("B_PER"), Some("PER"));
        assert_eq!(format.entity_type("B-PER"), Some("B-PER"));
    }

    #[rstest]
    #[case("B-PER", true)]
    #[case("S-PER", true)]
    #[case("U-PER", true)]
    #[case("I-PER", false)]
    #[case("E-PER", false)]
    #[case("L-PER", false)]
    #[case("O", false)]
    #[case("PER", true)]
    fn test_starts_span(#[case] tag: &str, #[case] expected: bool) {
        assert_eq!(TagFormat::default().starts_span(tag), expected);
    }

    #[test]
    fn test_rename_keeps_marker() {
        let format = TagFormat::default();
        assert_eq!(format.rename("B-Data_do_contrato", "Datas"), "B-Datas");
        assert_eq!(format.rename("I-Data_dos_fatos", "Datas"), "I-Datas");
        assert_eq!(format.rename("O", "Datas"), "O");
        let suffix = TagFormat::new('-', true);
        assert_eq!(suffix.rename("Data_do_contrato-I", "Datas"), "Datas-I");
    }

    #[test]
    fn test_prefix_round_trip_through_char() {
        for prefix in all::<Prefix>() {
            let c = format!("{:?}", prefix);
            assert_eq!(c.parse::<Prefix>(), Ok(prefix));
        }
        assert_eq!("X".parse::<Prefix>(), Err(PrefixError('X')));
    }
}
