// Document identifiers: short random strings without vowels, so generated
// ids never spell words.

use crate::error::{DocModelError, Result};

/// Length of a generated document id.
pub const ID_LENGTH: usize = 12;

/// Digits plus the lowercase consonants.
pub const ID_ALPHABET: [char; 31] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'b', 'c', 'd', 'f', 'g', 'h', 'j', 'k',
    'l', 'm', 'n', 'p', 'q', 'r', 's', 't', 'v', 'w', 'x', 'y', 'z',
];

/// Generate a random id of `ID_LENGTH` characters drawn uniformly from `ID_ALPHABET`.
pub fn generate_id() -> String {
    nanoid::nanoid!(ID_LENGTH, &ID_ALPHABET)
}

/// Check an explicitly supplied id. Any non-empty string without a `/` is
/// accepted; a slash would let a top-level id forge a nested document's uid.
pub fn check_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains('/') {
        return Err(DocModelError::InvalidId(id.to_string()));
    }
    Ok(())
}
