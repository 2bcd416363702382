//! Bomb serial numbers.

use std::{fmt, str::FromStr};

use crate::random::RandomSource;

/// Six-character serial of the form `[any][any][digit][letter][letter][digit]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerialNumber(String);

impl SerialNumber {
    /// Characters a serial may contain. O is replaced with E so it can't be mistaken
    /// for a zero, and Y is left out because not everyone agrees it's a vowel.
    pub const CHARSET: &'static str = "ABCDEFGHIJKLMNEPQRSTUVWXZ0123456789";
    const LETTERS: &'static str = "ABCDEFGHIJKLMNEPQRSTUVWXZ";
    const DIGITS: &'static str = "0123456789";

    /// Draw a fresh serial.
    pub fn generate(rng: &mut RandomSource) -> Self {
        let any = Self::CHARSET.as_bytes();
        let letters = Self::LETTERS.as_bytes();
        let digits = Self::DIGITS.as_bytes();

        let pattern: [&[u8]; 6] = [any, any, digits, letters, letters, digits];
        let serial = pattern
            .iter()
            .map(|class| char::from(class[rng.index(class.len())]))
            .collect();
        Self(serial)
    }

    /// Whether `c` may appear anywhere in a serial.
    pub fn is_valid_character(c: char) -> bool {
        Self::is_valid_letter(c) || Self::is_valid_digit(c)
    }

    /// Whether `c` may appear at a digit position.
    pub fn is_valid_digit(c: char) -> bool {
        c.is_ascii_digit()
    }

    /// Whether `c` may appear at a letter position.
    pub fn is_valid_letter(c: char) -> bool {
        c.is_ascii_uppercase() && c != 'O' && c != 'Y'
    }

    /// The serial as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether any of A, E, I, O, U appears.
    pub fn has_vowel(&self) -> bool {
        self.0.chars().any(|c| "AEIOU".contains(c))
    }

    /// The trailing digit.
    pub fn last_digit(&self) -> u8 {
        self.0.as_bytes()[5] - b'0'
    }

    /// Whether the trailing digit is odd.
    pub fn last_digit_odd(&self) -> bool {
        self.last_digit() % 2 == 1
    }

    /// Whether the first character is a letter.
    pub fn starts_with_letter(&self) -> bool {
        self.0.as_bytes()[0].is_ascii_uppercase()
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SerialNumber {
    type Err = ();

    fn from_str(serial: &str) -> Result<Self, Self::Err> {
        const PATTERN: [fn(char) -> bool; 6] = [
            SerialNumber::is_valid_character,
            SerialNumber::is_valid_character,
            SerialNumber::is_valid_digit,
            SerialNumber::is_valid_letter,
            SerialNumber::is_valid_letter,
            SerialNumber::is_valid_digit,
        ];

        if serial.chars().count() != PATTERN.len() {
            return Err(());
        }
        if !serial.chars().zip(PATTERN).all(|(c, check)| check(c)) {
            return Err(());
        }
        Ok(Self(serial.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_serials_follow_pattern() {
        let mut rng = RandomSource::seeded(1234);
        for _ in 0..500 {
            let serial = SerialNumber::generate(&mut rng);
            let chars: Vec<char> = serial.as_str().chars().collect();
            assert_eq!(chars.len(), 6);
            assert!(chars[2].is_ascii_digit());
            assert!(chars[5].is_ascii_digit());
            for &c in &chars[3..5] {
                assert!(c.is_ascii_uppercase(), "{serial}");
                assert!(c != 'O' && c != 'Y', "{serial}");
            }
            for &c in &chars[0..2] {
                assert!(SerialNumber::is_valid_character(c), "{serial}");
            }
            assert_eq!(serial.as_str().parse::<SerialNumber>(), Ok(serial.clone()));
        }
    }

    #[test]
    fn rejects_malformed_serials() {
        for wrong in [
            "SN1BB3X", "SN1BB", "SN½BB3", "Ab1cD2", "AB!CD2", "SN1234", "ABCDEF", "OB1EC7",
            "YU0NO0",
        ] {
            assert!(wrong.parse::<SerialNumber>().is_err(), "{wrong}");
        }
        for fine in ["AB1CD2", "123AB4", "KT4NE8"] {
            assert!(fine.parse::<SerialNumber>().is_ok(), "{fine}");
        }
    }

    #[test]
    fn derived_queries() -> Result<(), ()> {
        let serial: SerialNumber = "KT4NE7".parse()?;
        assert!(serial.has_vowel());
        assert!(serial.last_digit_odd());
        assert!(serial.starts_with_letter());

        let serial: SerialNumber = "123BC4".parse()?;
        assert!(!serial.has_vowel());
        assert_eq!(serial.last_digit(), 4);
        assert!(!serial.starts_with_letter());
        Ok(())
    }
}
