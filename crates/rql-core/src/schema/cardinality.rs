use crate::{Error, Result};

/// How many partners an entity may have through a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Card {
    /// `1`
    One,

    /// `?`
    ZeroOrOne,

    /// `*`
    Many,

    /// `+`
    OneOrMore,
}

/// Cardinality of a relation definition, written as two characters: the
/// number of objects per subject followed by the number of subjects per
/// object (`"?*"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cardinality {
    pub subject: Card,
    pub object: Card,
}

impl Card {
    fn parse(c: char) -> Option<Card> {
        Some(match c {
            '1' => Card::One,
            '?' => Card::ZeroOrOne,
            '*' => Card::Many,
            '+' => Card::OneOrMore,
            _ => return None,
        })
    }

    pub fn is_single(self) -> bool {
        matches!(self, Card::One | Card::ZeroOrOne)
    }

    pub fn is_required(self) -> bool {
        matches!(self, Card::One | Card::OneOrMore)
    }
}

impl Cardinality {
    pub const MANY_MANY: Cardinality = Cardinality {
        subject: Card::Many,
        object: Card::Many,
    };

    pub fn parse(src: &str) -> Result<Cardinality> {
        let mut chars = src.chars();
        match (
            chars.next().and_then(Card::parse),
            chars.next().and_then(Card::parse),
            chars.next(),
        ) {
            (Some(subject), Some(object), None) => Ok(Cardinality { subject, object }),
            _ => Err(Error::invalid_schema(format!(
                "invalid cardinality `{src}`"
            ))),
        }
    }

    /// Cardinality seen from the given side: `true` for the subject.
    pub fn of_side(&self, subject: bool) -> Card {
        if subject {
            self.subject
        } else {
            self.object
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cardinality() {
        let card = Cardinality::parse("?*").unwrap();
        assert_eq!(card.subject, Card::ZeroOrOne);
        assert_eq!(card.object, Card::Many);
        assert!(card.subject.is_single());
        assert!(Cardinality::parse("?").is_err());
        assert!(Cardinality::parse("x*").unwrap_err().is_invalid_schema());
    }
}
