//! Compact dictionary code generation
//!
//! Codes are little-endian numbers whose digits are printable ASCII
//! characters (`' '..='~'`, 95 values). The first 95 codes are one character
//! long, the next 9025 are two characters long, and so on.

/// Smallest digit value (space)
const MIN_DIGIT: u8 = b' ';
/// Largest digit value (tilde)
const MAX_DIGIT: u8 = b'~';

/// Produces unique, never-shrinking dictionary codes.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    /// Least-significant digit first
    digits: Vec<u8>,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self { digits: vec![MIN_DIGIT] }
    }

    /// Return the current code and advance the counter.
    pub fn next_code(&mut self) -> String {
        let code = self.digits.iter().map(|&d| char::from(d)).collect();

        let len = self.digits.len();
        for i in 0..len {
            if self.digits[i] < MAX_DIGIT {
                self.digits[i] += 1;
                break;
            }

            self.digits[i] = MIN_DIGIT;
            if i == len - 1 {
                self.digits.push(MIN_DIGIT);
            }
        }

        code
    }
}

impl Iterator for CodeGenerator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        Some(self.next_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_first_95_codes_cover_printable_range() {
        let codes: Vec<String> = CodeGenerator::new().take(95).collect();

        let expected: Vec<String> = (b' '..=b'~').map(|b| char::from(b).to_string()).collect();
        assert_eq!(codes, expected);
    }

    #[test]
    fn test_96th_code_has_two_characters() {
        let mut generator = CodeGenerator::new();
        for _ in 0..95 {
            generator.next_code();
        }

        assert_eq!(generator.next_code(), "  ");
        assert_eq!(generator.next_code(), "! ");
    }

    #[test]
    fn test_carry_into_second_digit() {
        let mut generator = CodeGenerator::new();
        let codes: Vec<String> = generator.by_ref().take(95 + 96).collect();

        assert_eq!(codes[95 + 94], "~ ");
        assert_eq!(codes[95 + 95], " !");
    }

    #[test]
    fn test_codes_unique_and_length_non_decreasing() {
        let codes: Vec<String> = CodeGenerator::new().take(20_000).collect();

        let unique: HashSet<&String> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
        assert!(codes.windows(2).all(|w| w[0].len() <= w[1].len()));
        assert_eq!(codes.last().map(String::len), Some(3));
    }
}
