use rand::{seq::SliceRandom, Rng};

/// Devanagari letters: vowels, consonants, then ळ and two conjuncts.
pub(crate) const ALPHABET: &[&str] = &[
    "अ", "आ", "इ", "ई", "उ", "ऊ", "ऋ", "ॠ", "ऌ", "ॡ", "ए", "ऐ", "ओ", "औ",
    "क", "ख", "ग", "घ", "ङ",
    "च", "छ", "ज", "झ", "ञ",
    "ट", "ठ", "ड", "ढ", "ण",
    "त", "थ", "द", "ध", "न",
    "प", "फ", "ब", "भ", "म",
    "य", "र", "ल", "व",
    "श", "ष", "स", "ह",
    "ळ", "क्ष", "ज्ञ",
];

/// One symbol of the alphabet. Some entries are several codepoints wide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Glyph(&'static str);

impl Glyph {
    pub(crate) fn as_str(self) -> &'static str {
        self.0
    }
}

/// Uniform draw over the whole alphabet.
pub(crate) fn sample<R: Rng + ?Sized>(rng: &mut R) -> Glyph {
    // ALPHABET is a non-empty constant
    Glyph(ALPHABET.choose(rng).copied().unwrap_or(ALPHABET[0]))
}
