//! Motion-hash mixing.
//!
//! The motion hash is a running 32-bit change-detection signature threaded
//! through driver nodes and then every instance node. Each step folds one
//! node identity word into the accumulator; downstream consumers compare a
//! node's stored value between frames to detect upstream motion.
//!
//! Mixing uses MurmurHash3's 32-bit round and finalizer (original algorithm
//! by Austin Appleby).

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// Fold one identity word into a running hash.
///
/// Pure function of `(hash, word)`: deterministic, and order-dependent by
/// construction since the accumulator is rotated and remixed before the next
/// word lands.
#[inline]
pub fn mix(hash: u32, word: u32) -> u32 {
    let mut k = word.wrapping_mul(C1);
    k = k.rotate_left(15);
    k = k.wrapping_mul(C2);

    let mut h = hash ^ k;
    h = h.rotate_left(13);
    h = h.wrapping_mul(5).wrapping_add(0xe654_6b64);
    fmix32(h)
}

/// Thread a hash through a sequence of identity words, returning the final
/// accumulator value.
#[inline]
pub fn chain(hash: u32, words: impl IntoIterator<Item = u32>) -> u32 {
    words.into_iter().fold(hash, mix)
}

/// Final avalanche step.
#[inline]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}
