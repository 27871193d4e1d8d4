//! License Codes
//!
//! Generation and verification of `PREFIX-YEAR-BODY` license codes.
//!
//! The body is four random characters from `A-Z0-9` followed by one check
//! character. The check character is shared with the browser-side validator,
//! so [`checksum`] must stay bit-exact with it:
//!
//! ```text
//! total = sum of ASCII code points of the 4 payload characters
//! check = 'A' + (total mod 26)
//! ```
//!
//! This is a typo detector, not a signature. Anyone can mint a code that
//! passes [`LicenseCodec::verify`].

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CodeError, LicensingError, Result};

/// Symbols a payload character is drawn from
pub const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random characters per code
pub const PAYLOAD_LEN: usize = 4;

/// Payload plus check character
pub const BODY_LEN: usize = PAYLOAD_LEN + 1;

/// Default product prefix
pub const DEFAULT_PREFIX: &str = "TDC";

/// Default year label. Fixed, not taken from the clock.
pub const DEFAULT_YEAR: &str = "2025";

/// Compute the check character for a payload.
///
/// Code points are summed as plain integers; the only reduction is the final
/// `mod 26`.
pub fn checksum(payload: &str) -> char {
    let total: u64 = payload.chars().map(|c| u64::from(u32::from(c))).sum();
    u8::try_from(total % 26).map_or('A', |offset| char::from(b'A' + offset))
}

/// A license code that passed verification or came out of the generator
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseCode(String);

impl LicenseCode {
    /// Get the code as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 5-character body (payload + check character)
    pub fn body(&self) -> &str {
        self.0.rsplit('-').next().unwrap_or_default()
    }

    /// The 4 random characters
    pub fn payload(&self) -> &str {
        self.body().get(..PAYLOAD_LEN).unwrap_or_default()
    }

    /// The trailing check character
    pub fn check_char(&self) -> char {
        self.body().chars().last().unwrap_or('A')
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for LicenseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LicenseCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The two literal segments every code starts with
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFormat {
    prefix: String,
    year: String,
}

impl CodeFormat {
    /// Build a format, rejecting literals that could not round-trip.
    ///
    /// The prefix must be non-empty and hyphen-free; the year must be exactly
    /// four ASCII digits.
    pub fn new(prefix: impl Into<String>, year: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        let year = year.into();

        if prefix.is_empty() || prefix.contains('-') {
            return Err(LicensingError::Config(format!(
                "license prefix {prefix:?} must be non-empty and contain no '-'"
            )));
        }
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LicensingError::Config(format!(
                "license year {year:?} must be 4 digits"
            )));
        }

        Ok(Self { prefix, year })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn year(&self) -> &str {
        &self.year
    }
}

impl Default for CodeFormat {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.into(),
            year: DEFAULT_YEAR.into(),
        }
    }
}

/// Stateless generator and verifier for one [`CodeFormat`]
#[derive(Clone, Debug, Default)]
pub struct LicenseCodec {
    format: CodeFormat,
}

impl LicenseCodec {
    pub const fn new(format: CodeFormat) -> Self {
        Self { format }
    }

    pub const fn format(&self) -> &CodeFormat {
        &self.format
    }

    /// Generate a code using the calling thread's RNG
    pub fn generate(&self) -> LicenseCode {
        self.generate_with(&mut rand::rng())
    }

    /// Generate a code from an injected randomness source.
    ///
    /// Each payload character is drawn independently and uniformly from
    /// [`ALPHABET`], with replacement.
    pub fn generate_with<R: Rng>(&self, rng: &mut R) -> LicenseCode {
        let mut body: String = (0..PAYLOAD_LEN)
            .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
            .collect();
        let check = checksum(&body);
        body.push(check);

        LicenseCode(format!(
            "{}-{}-{}",
            self.format.prefix, self.format.year, body
        ))
    }

    /// Generate `count` codes. Duplicates are possible and not removed.
    pub fn generate_batch(&self, count: usize) -> Vec<LicenseCode> {
        let mut rng = rand::rng();
        (0..count).map(|_| self.generate_with(&mut rng)).collect()
    }

    /// Check a candidate and say why it was rejected
    pub fn parse(&self, candidate: &str) -> std::result::Result<LicenseCode, CodeError> {
        if candidate.is_empty() {
            return Err(CodeError::Empty);
        }

        let segments: Vec<&str> = candidate.split('-').collect();
        let [prefix, year, body] = segments.as_slice() else {
            return Err(CodeError::SegmentCount(segments.len()));
        };

        if *prefix != self.format.prefix {
            return Err(CodeError::Prefix);
        }
        if *year != self.format.year {
            return Err(CodeError::Year);
        }

        let len = body.chars().count();
        if len != BODY_LEN {
            return Err(CodeError::BodyLength(len));
        }
        if !body
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(CodeError::BodyAlphabet);
        }

        // All-ASCII from here, so byte offsets are char offsets.
        let (payload, check) = body.split_at(PAYLOAD_LEN);
        if check.chars().next() != Some(checksum(payload)) {
            return Err(CodeError::Checksum);
        }

        Ok(LicenseCode(candidate.to_owned()))
    }

    /// Whether `candidate` is a well-formed code. Never panics.
    pub fn verify(&self, candidate: &str) -> bool {
        self.parse(candidate).is_ok()
    }

    /// [`verify`](Self::verify) for a possibly absent value
    pub fn verify_opt(&self, candidate: Option<&str>) -> bool {
        candidate.is_some_and(|c| self.verify(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_checksum_reference_vectors() {
        // 65 * 4 = 260, 260 % 26 = 0
        assert_eq!(checksum("AAAA"), 'A');
        // 84 + 69 + 83 + 84 = 320, 320 % 26 = 8
        assert_eq!(checksum("TEST"), 'I');
        // 48 * 4 = 192, 192 % 26 = 10
        assert_eq!(checksum("0000"), 'K');
        // 66 + 65 * 3 = 261, 261 % 26 = 1
        assert_eq!(checksum("BAAA"), 'B');
    }

    #[test]
    fn test_checksum_depends_on_character_sum() {
        // Same multiset of characters, same sum
        assert_eq!(checksum("AB12"), checksum("21BA"));
        assert_ne!(checksum("AAAA"), checksum("AAAB"));
    }

    #[test]
    fn test_known_codes_verify() {
        let codec = LicenseCodec::default();
        assert!(codec.verify("TDC-2025-AAAAA"));
        assert!(codec.verify("TDC-2025-TESTI"));
        assert!(codec.verify("TDC-2025-0000K"));
    }

    #[test]
    fn test_generated_code_shape() {
        let code = LicenseCodec::default().generate();
        assert!(code.as_str().starts_with("TDC-2025-"));
        assert_eq!(code.body().len(), BODY_LEN);
        assert_eq!(code.payload().len(), PAYLOAD_LEN);
        assert_eq!(code.check_char(), checksum(code.payload()));
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let codec = LicenseCodec::default();
        let a = codec.generate_with(&mut rand::rngs::StdRng::seed_from_u64(7));
        let b = codec.generate_with(&mut rand::rngs::StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(codec.verify(a.as_str()));
    }

    #[test]
    fn test_batch_all_verify_and_mostly_distinct() {
        let codec = LicenseCodec::default();
        let batch = codec.generate_batch(1000);
        assert_eq!(batch.len(), 1000);
        assert!(batch.iter().all(|c| codec.verify(c.as_str())));

        let distinct: HashSet<_> = batch.iter().collect();
        assert!(distinct.len() >= 990, "only {} distinct", distinct.len());
    }

    #[test]
    fn test_payload_mutation_breaks_checksum() {
        let codec = LicenseCodec::default();
        assert!(codec.verify("TDC-2025-AAAAA"));
        // BAAA expects 'B', trailing 'A' left in place
        assert!(!codec.verify("TDC-2025-BAAAA"));
        assert_eq!(codec.parse("TDC-2025-BAAAA"), Err(CodeError::Checksum));
    }

    #[test]
    fn test_rejects_malformed_input() {
        let codec = LicenseCodec::default();
        let cases = [
            ("", CodeError::Empty),
            ("TDC-2025", CodeError::SegmentCount(2)),
            ("TDC-2025-AAAAA-X", CodeError::SegmentCount(4)),
            ("XXX-2025-AAAAA", CodeError::Prefix),
            ("TDC-2024-AAAAA", CodeError::Year),
            ("TDC-2025-AAAA", CodeError::BodyLength(4)),
            ("TDC-2025-AAAAAA", CodeError::BodyLength(6)),
            ("TDC-2025-AA!AA", CodeError::BodyAlphabet),
            ("TDC-2025-aaaaa", CodeError::BodyAlphabet),
            ("TDC-2025-AAAAB", CodeError::Checksum),
            ("TDC-2025-FAKE1", CodeError::Checksum),
        ];

        for (candidate, expected) in cases {
            assert_eq!(codec.parse(candidate), Err(expected), "{candidate:?}");
            assert!(!codec.verify(candidate));
        }
    }

    #[test]
    fn test_rejects_multibyte_body() {
        let codec = LicenseCodec::default();
        // 5 chars, but not ASCII
        assert_eq!(codec.parse("TDC-2025-ÁAAAA"), Err(CodeError::BodyAlphabet));
        // 5 bytes, 4 chars
        assert_eq!(codec.parse("TDC-2025-ÁAAA"), Err(CodeError::BodyLength(4)));
    }

    #[test]
    fn test_verify_absent_value() {
        let codec = LicenseCodec::default();
        assert!(!codec.verify_opt(None));
        assert!(codec.verify_opt(Some("TDC-2025-AAAAA")));
    }

    #[test]
    fn test_custom_format() {
        let codec = LicenseCodec::new(CodeFormat::new("ABC", "2030").unwrap());
        let code = codec.generate();
        assert!(code.as_str().starts_with("ABC-2030-"));
        assert!(codec.verify(code.as_str()));
        assert!(!LicenseCodec::default().verify(code.as_str()));
    }

    #[test]
    fn test_format_validation() {
        assert!(CodeFormat::new("", "2025").is_err());
        assert!(CodeFormat::new("T-DC", "2025").is_err());
        assert!(CodeFormat::new("TDC", "25").is_err());
        assert!(CodeFormat::new("TDC", "20x5").is_err());
    }
}
