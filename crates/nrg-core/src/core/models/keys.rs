use std::fmt;

/// Chain letter written by the engine when a residue has no chain identifier.
pub const BLANK_CHAIN: char = '-';

/// Identifies a flexible side chain the way the docking engine prints it.
///
/// The canonical form is `<residue name><sequence number><chain>`, e.g. `GLU81-`
/// for Glu 81 with a blank chain or `LYS12A` for Lys 12 on chain A. All key
/// construction goes through this type so the format cannot drift between the
/// parser and its consumers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueKey(String);

impl ResidueKey {
    pub fn new(residue_name: &str, sequence_number: isize, chain_id: char) -> Self {
        let chain = if chain_id.is_whitespace() || chain_id == '\0' {
            BLANK_CHAIN
        } else {
            chain_id
        };
        Self(format!("{}{}{}", residue_name.trim(), sequence_number, chain))
    }

    /// Wraps a token exactly as it appeared in the engine output.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() || token.chars().any(char::is_whitespace) {
            return None;
        }
        Some(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the key back into residue name, sequence number and chain.
    ///
    /// Returns `None` for tokens that do not follow the canonical layout; such
    /// keys are still usable as opaque identifiers.
    pub fn parts(&self) -> Option<(&str, isize, char)> {
        let chain = self.0.chars().last()?;
        let body = &self.0[..self.0.len() - chain.len_utf8()];
        let name_len = body.chars().take(3).map(char::len_utf8).sum::<usize>();
        if name_len == 0 || name_len >= body.len() {
            return None;
        }
        let (name, number) = body.split_at(name_len);
        let number = number.parse().ok()?;
        Some((name, number, chain))
    }
}

impl fmt::Display for ResidueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The pair of atoms whose fixed dihedral receives a shift value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomPairKey {
    pub first: String,
    pub second: String,
}

impl AtomPairKey {
    pub fn new(first: &str, second: &str) -> Self {
        Self {
            first: first.trim().to_string(),
            second: second.trim().to_string(),
        }
    }

    /// The legacy string form: both atom numbers concatenated.
    pub fn legacy(&self) -> String {
        format!("{}{}", self.first, self.second)
    }
}

impl fmt::Display for AtomPairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residue_key_uses_dash_for_blank_chain() {
        assert_eq!(ResidueKey::new("GLU", 81, ' ').as_str(), "GLU81-");
        assert_eq!(ResidueKey::new("LYS", 12, 'A').as_str(), "LYS12A");
    }

    #[test]
    fn residue_key_from_token_matches_constructed_key() {
        let parsed = ResidueKey::from_token("GLU81-").unwrap();
        assert_eq!(parsed, ResidueKey::new("GLU", 81, ' '));
    }

    #[test]
    fn residue_key_from_token_rejects_empty_and_spaced_tokens() {
        assert!(ResidueKey::from_token("").is_none());
        assert!(ResidueKey::from_token("GLU 81").is_none());
    }

    #[test]
    fn residue_key_parts_round_trip() {
        let key = ResidueKey::new("ARG", -3, 'B');
        assert_eq!(key.parts(), Some(("ARG", -3, 'B')));
    }

    #[test]
    fn residue_key_parts_is_none_for_non_canonical_tokens() {
        let key = ResidueKey::from_token("X").unwrap();
        assert_eq!(key.parts(), None);
    }

    #[test]
    fn atom_pair_key_legacy_form_concatenates() {
        let key = AtomPairKey::new(" 12", "13 ");
        assert_eq!(key.legacy(), "1213");
        assert_eq!(key.to_string(), "12-13");
    }
}
