//! Decoder for scripts packed with Dean Edwards' p.a.c.k.e.r.
//!
//! A packed script looks like
//!
//! ```text
//! eval(function(p,a,c,k,e,d){...}('0 1="2"',3,3,'var|file|x'.split('|'),0,{}))
//! ```
//!
//! Every word of the payload is a number in base `a` indexing the symbol
//! table `k`. Unpacking substitutes each word with its symbol; words whose
//! symbol is empty stay as they are.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static PACKED_ARGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\}\('(.*)',\s*(\d+),\s*(\d+),\s*'(.*?)'\.split\('\|'\)")
        .expect("packed arguments pattern should compile")
});

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w+\b").expect("word pattern should compile"));

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Why a script could not be unpacked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnpackError {
    #[error("not a packed script")]
    NotPacked,
    #[error("unsupported radix {0}")]
    Radix(u32),
    #[error("symbol table has {actual} entries, expected {expected}")]
    Count { expected: usize, actual: usize },
}

/// Unpack a p.a.c.k.e.r. script (the argument of `eval(...)` or the whole
/// `eval(...)` call).
pub fn unpack(source: &str) -> Result<String, UnpackError> {
    let caps = PACKED_ARGS.captures(source).ok_or(UnpackError::NotPacked)?;
    let payload = caps[1].replace("\\\\", "\\").replace("\\'", "'");
    let radix: u32 = caps[2].parse().map_err(|_| UnpackError::NotPacked)?;
    let count: usize = caps[3].parse().map_err(|_| UnpackError::NotPacked)?;
    let symbols: Vec<&str> = caps[4].split('|').collect();

    if !(2..=62).contains(&radix) {
        return Err(UnpackError::Radix(radix));
    }
    if symbols.len() != count {
        return Err(UnpackError::Count {
            expected: count,
            actual: symbols.len(),
        });
    }

    let unpacked = WORD.replace_all(&payload, |word: &Captures<'_>| {
        let word = &word[0];
        unbase(word, radix)
            .and_then(|index| symbols.get(index))
            .filter(|symbol| !symbol.is_empty())
            .map_or_else(|| word.to_string(), |symbol| (*symbol).to_string())
    });
    Ok(unpacked.into_owned())
}

/// Parse `word` as a number in `radix`. Up to base 36 digits are
/// case-insensitive; above that lowercase precedes uppercase.
fn unbase(word: &str, radix: u32) -> Option<usize> {
    let word = if radix <= 36 {
        word.to_ascii_lowercase()
    } else {
        word.to_string()
    };
    let radix = radix as usize;
    word.bytes().try_fold(0usize, |acc, byte| {
        let digit = ALPHABET.iter().position(|&c| c == byte)?;
        if digit >= radix {
            return None;
        }
        acc.checked_mul(radix)?.checked_add(digit)
    })
}
