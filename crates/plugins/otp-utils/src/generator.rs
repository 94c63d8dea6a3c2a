//! OTP generation utilities.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Smallest code the generator produces.
pub const CODE_MIN: u32 = 100_000;
/// Largest code the generator produces.
pub const CODE_MAX: u32 = 999_999;
/// Number of digits in every generated code.
pub const CODE_LENGTH: usize = 6;

/// A source of fresh OTP codes.
pub trait CodeSource: Send + Sync {
    /// Returns a new code in canonical string form.
    fn generate(&self) -> String;
}

/// Uniform 6-digit code generator.
///
/// Codes are drawn uniformly from `100000..=999999`, so they never carry
/// a leading zero and their decimal string is their canonical form.
#[derive(Debug)]
pub struct OtpGenerator {
    rng: Mutex<StdRng>,
}

impl OtpGenerator {
    /// Creates a generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Creates a deterministic generator.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    /// Creates a generator over an existing RNG.
    pub fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Draws the next code as a number.
    pub fn next_value(&self) -> u32 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(CODE_MIN..=CODE_MAX)
    }
}

impl Default for OtpGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl CodeSource for OtpGenerator {
    fn generate(&self) -> String {
        self.next_value().to_string()
    }
}

/// Hands out a fixed sequence of codes, then falls back to the last one.
///
/// Intended for tests and demos that need to know the code up front.
#[derive(Debug)]
pub struct FixedCodeSource {
    codes: Mutex<VecDeque<String>>,
    last: String,
}

impl FixedCodeSource {
    /// Creates a source that always returns `code`.
    pub fn new(code: impl Into<String>) -> Self {
        Self::sequence([code.into()])
    }

    /// Creates a source that returns `codes` in order.
    ///
    /// Once exhausted it keeps returning the final code; an empty sequence
    /// yields `"000000"`.
    pub fn sequence<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: VecDeque<String> = codes.into_iter().map(Into::into).collect();
        let last = codes.back().cloned().unwrap_or_else(|| "0".repeat(CODE_LENGTH));
        Self {
            codes: Mutex::new(codes),
            last,
        }
    }
}

impl CodeSource for FixedCodeSource {
    fn generate(&self) -> String {
        let mut codes = self.codes.lock().unwrap_or_else(|e| e.into_inner());
        codes.pop_front().unwrap_or_else(|| self.last.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_numeric_otp() {
        let generator = OtpGenerator::from_entropy();
        for _ in 0..1_000 {
            let otp = generator.generate();
            assert_eq!(otp.len(), CODE_LENGTH);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(otp.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn test_seeded_generators_repeat() {
        let a = OtpGenerator::seeded(42);
        let b = OtpGenerator::seeded(42);
        let first: Vec<String> = (0..10).map(|_| a.generate()).collect();
        let second: Vec<String> = (0..10).map(|_| b.generate()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_uniqueness() {
        let generator = OtpGenerator::seeded(7);
        let codes: HashSet<String> = (0..100).map(|_| generator.generate()).collect();
        assert!(codes.len() > 90);
    }

    #[test]
    fn test_distribution_is_uniform_over_range() {
        // 900 000 possible codes split into 9 equal buckets by leading digit.
        let generator = OtpGenerator::seeded(0x5eed);
        let draws: u32 = 90_000;
        let mut buckets = [0u32; 9];
        for _ in 0..draws {
            let value = generator.next_value();
            assert!((CODE_MIN..=CODE_MAX).contains(&value));
            buckets[(value / 100_000 - 1) as usize] += 1;
        }

        let expected = f64::from(draws) / 9.0;
        let chi_square: f64 = buckets
            .iter()
            .map(|&observed| {
                let diff = f64::from(observed) - expected;
                diff * diff / expected
            })
            .sum();

        // 8 degrees of freedom; 33.72 is the 0.9999 quantile.
        assert!(chi_square < 33.72, "chi-square {chi_square} for {buckets:?}");
    }

    #[test]
    fn test_fixed_sequence() {
        let source = FixedCodeSource::sequence(["111111", "222222"]);
        assert_eq!(source.generate(), "111111");
        assert_eq!(source.generate(), "222222");
        assert_eq!(source.generate(), "222222");

        let empty = FixedCodeSource::sequence(Vec::<String>::new());
        assert_eq!(empty.generate(), "000000");
    }
}
