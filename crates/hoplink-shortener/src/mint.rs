use hoplink_core::ShortCode;
use rand::rngs::OsRng;
use rand::RngCore;

/// Base62 alphabet used for minted codes.
const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default minted-code length. 62^7 is about 3.5 trillion codes, which
/// makes exhausting the mint retries practically impossible.
pub const DEFAULT_CODE_LENGTH: usize = 7;

/// Trait for drawing candidate short codes.
///
/// Minters are pure generators: uniqueness is enforced by the
/// repository's unique constraint, and the service retries with a
/// fresh draw on collision. No portion of a colliding draw is reused.
pub trait CodeMinter: Send + Sync + 'static {
    fn mint(&self) -> ShortCode;
}

/// Uniform random minter backed by the OS entropy source.
///
/// Each byte of a draw is mapped through modulo 62 into the base62
/// alphabet.
#[derive(Debug, Clone)]
pub struct RandomCodeMinter {
    length: usize,
}

impl RandomCodeMinter {
    pub fn new() -> Self {
        Self {
            length: DEFAULT_CODE_LENGTH,
        }
    }

    /// Creates a minter for a custom code length within the valid
    /// short-code bounds.
    pub fn with_length(length: usize) -> Self {
        debug_assert!((3..=10).contains(&length));
        Self { length }
    }
}

impl Default for RandomCodeMinter {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeMinter for RandomCodeMinter {
    fn mint(&self) -> ShortCode {
        let mut bytes = vec![0u8; self.length];
        OsRng.fill_bytes(&mut bytes);

        let code: String = bytes
            .iter()
            .map(|b| ALPHABET[usize::from(*b) % ALPHABET.len()] as char)
            .collect();

        ShortCode::new_unchecked(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_codes_have_default_length() {
        let minter = RandomCodeMinter::new();
        for _ in 0..100 {
            assert_eq!(minter.mint().as_str().len(), DEFAULT_CODE_LENGTH);
        }
    }

    #[test]
    fn minted_codes_stay_in_alphabet() {
        let minter = RandomCodeMinter::new();
        for _ in 0..100 {
            let code = minter.mint();
            assert!(code.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn minted_codes_pass_validation() {
        let minter = RandomCodeMinter::new();
        for _ in 0..100 {
            assert!(ShortCode::new(minter.mint().as_str()).is_ok());
        }
    }

    #[test]
    fn custom_length_is_respected() {
        let minter = RandomCodeMinter::with_length(10);
        assert_eq!(minter.mint().as_str().len(), 10);
    }

    #[test]
    fn draws_are_not_repeated() {
        // With 62^7 possibilities, any repeat in a small sample means
        // the entropy source is broken.
        let minter = RandomCodeMinter::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(minter.mint().as_str().to_string()));
        }
    }
}
