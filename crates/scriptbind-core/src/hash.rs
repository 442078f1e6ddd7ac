//! Engine string hash.
//!
//! The engine identifies property components, remote-call messages and a few
//! other content-addressed names by a 32-bit MurmurHash2 of the name (seed 0),
//! rendered as a *signed* decimal literal. Generated code must reproduce the
//! engine's values bit for bit, so the algorithm is implemented here rather
//! than taken from a general-purpose hashing crate.

/// MurmurHash2 (32-bit, seed 0) of a name, as the signed value the engine
/// renders into generated enum literals.
pub fn script_hash(input: &str) -> i32 {
    const M: u32 = 0x5bd1_e995;
    const R: u32 = 24;

    let bytes = input.as_bytes();
    let mut h: u32 = bytes.len() as u32;

    let mut chunks = bytes.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = chunks.remainder();
    match tail.len() {
        3 => {
            h ^= (tail[2] as u32) << 16;
            h ^= (tail[1] as u32) << 8;
            h ^= tail[0] as u32;
            h = h.wrapping_mul(M);
        }
        2 => {
            h ^= (tail[1] as u32) << 8;
            h ^= tail[0] as u32;
            h = h.wrapping_mul(M);
        }
        1 => {
            h ^= tail[0] as u32;
            h = h.wrapping_mul(M);
        }
        _ => {}
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;

    h as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    // Known-answer vectors from the engine.
    #[test]
    fn known_vectors() {
        assert_eq!(script_hash("abcd"), 646393889);
        assert_eq!(script_hash("abcde"), 1594468574);
        assert_eq!(script_hash("abcdef"), 1271458169);
        assert_eq!(script_hash("abcdefg"), -106836237);
    }

    #[test]
    fn empty_and_short_inputs() {
        // Deterministic, and short tails take the partial-block path.
        assert_eq!(script_hash(""), script_hash(""));
        assert_ne!(script_hash("a"), script_hash("b"));
        assert_ne!(script_hash("ab"), script_hash("ba"));
    }

    #[test]
    fn deterministic_across_calls() {
        let name = "ItemAnimation";
        assert_eq!(script_hash(name), script_hash(name));
    }
}
