//! Hashing primitives for determinism checks: a 32-bit per-event digest
//! folded into the frame digest, and 64-bit FNV-1a over raw bytes.

use crate::api::types::EffectEvent;

pub const FNV_OFFSET_BASIS: u64 = 1_469_598_103_934_665_603;
pub const FNV_PRIME: u64 = 1_099_511_628_211;

/// Initial frame digest, xored with the frame index at `frame_begin`.
pub const FRAME_DIGEST_SEED: u32 = 0xC001_C0DE;

pub fn fnv1a64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |h, &b| (h ^ b as u64).wrapping_mul(FNV_PRIME))
}

/// Digest contribution of one compacted event. Covers kind, priority,
/// dispatch slot (`seq`), repeat count and every id byte. Position is not
/// part of the digest.
pub fn digest_event32(ev: &EffectEvent) -> u32 {
    let mut h: u32 = 0x85EB_CA6B;
    h ^= (ev.kind as u32).wrapping_mul(0x9E37_79B9);
    h = h.rotate_left(5);
    h ^= (ev.priority as u32).wrapping_mul(0x85EB_CA6B);
    h = h.rotate_left(7);
    h ^= ev.seq.wrapping_mul(0x27D4_EB2D);
    h = h.rotate_left(11);
    h ^= (ev.effective_repeats() as u32).wrapping_mul(0xC2B2_AE35);
    h = h.rotate_left(9);
    for (i, &b) in ev.id.iter().enumerate() {
        h ^= (b as u32).wrapping_add((i as u32).wrapping_mul(131));
        h = h.wrapping_mul(0x27D4_EB2D);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Priority;

    #[test]
    fn fnv_of_empty_is_offset_basis() {
        assert_eq!(fnv1a64(&[]), FNV_OFFSET_BASIS);
    }

    #[test]
    fn fnv_known_vector() {
        // FNV-1a 64 of "a"
        assert_eq!(fnv1a64(b"a"), 0xAF63_DC4C_8601_EC8C);
    }

    #[test]
    fn digest_ignores_position() {
        let a = EffectEvent::audio("hit", Priority::Combat, 1.0, 1.0);
        let b = EffectEvent::audio("hit", Priority::Combat, 50.0, -3.0);
        assert_eq!(digest_event32(&a), digest_event32(&b));
    }

    #[test]
    fn digest_sees_repeats_and_priority() {
        let a = EffectEvent::audio("hit", Priority::Combat, 0.0, 0.0);
        assert_ne!(digest_event32(&a), digest_event32(&a.with_repeats(3)));
        let b = EffectEvent::audio("hit", Priority::Ui, 0.0, 0.0);
        assert_ne!(digest_event32(&a), digest_event32(&b));
    }
}
