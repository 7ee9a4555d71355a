/*!
 * Short body identifiers for single-body mode
 */

use rand::seq::index;
use rand::Rng;

/// Number of characters in a generated identifier
pub const ID_LENGTH: usize = 5;

/// Characters identifiers are drawn from
pub const ALPHABET: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Generates human-readable body ids when no external id is available.
///
/// Ids are a prefix of a random permutation of the lowercase alphabet, so no
/// letter repeats within one id. They are labels for logs and topic names,
/// not globally unique keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdAllocator;

impl IdAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Generate an id using the thread-local RNG
    pub fn generate(&self) -> String {
        self.generate_with(&mut rand::rng())
    }

    /// Generate an id from the given RNG
    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        index::sample(rng, ALPHABET.len(), ID_LENGTH)
            .iter()
            .map(|i| ALPHABET[i] as char)
            .collect()
    }
}
