//! Short code generation and validation utilities.
//!
//! Codes are [`CODE_LENGTH`] characters drawn uniformly from [`ALLOWED_CHARS`]
//! (upper- and lowercase Latin letters).

use rand::Rng;

/// Length of every generated code.
pub const CODE_LENGTH: usize = 8;

/// Alphabet codes are drawn from.
pub const ALLOWED_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Produces candidate short codes.
///
/// Generators are pure: no I/O, no failure. Uniqueness is the caller's concern
/// (see [`crate::application::services::UrlService`]).
#[cfg_attr(test, mockall::automock)]
pub trait CodeGenerator: Send + Sync {
    /// Returns a new candidate code.
    fn generate(&self) -> String;
}

/// Uniform random generator backed by the thread-local RNG.
///
/// Each calling thread draws from its own generator instance, so concurrent
/// callers never share or correlate state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl RandomCodeGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        generate_code()
    }
}

/// Generates a random code of [`CODE_LENGTH`] letters.
///
/// # Examples
///
/// ```ignore
/// let code = generate_code();
/// assert_eq!(code.len(), 8);
/// assert!(code.chars().all(|c| c.is_ascii_alphabetic()));
/// ```
pub fn generate_code() -> String {
    let mut rng = rand::rng();

    (0..CODE_LENGTH)
        .map(|_| ALLOWED_CHARS[rng.random_range(0..ALLOWED_CHARS.len())] as char)
        .collect()
}

/// Returns true if `code` could have been produced by [`generate_code`].
///
/// Used to reject malformed codes without a storage round trip.
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| ALLOWED_CHARS.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_code_has_correct_length() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LENGTH);
    }

    #[test]
    fn test_generate_code_only_letters() {
        for _ in 0..200 {
            let code = generate_code();
            assert!(code.chars().all(|c| c.is_ascii_alphabetic()), "{code}");
        }
    }

    #[test]
    fn test_generate_code_produces_unique_codes() {
        let codes: HashSet<String> = (0..1000).map(|_| generate_code()).collect();
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn test_generate_code_uses_both_cases() {
        let joined: String = (0..200).map(|_| generate_code()).collect();
        assert!(joined.chars().any(|c| c.is_ascii_uppercase()));
        assert!(joined.chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_alphabet_size() {
        assert_eq!(ALLOWED_CHARS.len(), 52);
    }

    #[test]
    fn test_concurrent_generators_do_not_correlate() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    let generator = RandomCodeGenerator::new();
                    (0..250).map(|_| generator.generate()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for code in handle.join().unwrap() {
                all.insert(code);
            }
        }

        assert_eq!(all.len(), 2000);
    }

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed("abcdEFGH"));
        assert!(is_well_formed(&generate_code()));

        assert!(!is_well_formed(""));
        assert!(!is_well_formed("abcdEFG"));
        assert!(!is_well_formed("abcdEFGHI"));
        assert!(!is_well_formed("abcd1234"));
        assert!(!is_well_formed("abcd-EFG"));
        assert!(!is_well_formed("абвгдеёж"));
    }
}
