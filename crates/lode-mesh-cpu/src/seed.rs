use fastrand::Rng;

/// Per-block seed from a global block coordinate. The `x` product wraps in
/// 32 bits before widening, matching the server-side model randomizer.
#[inline]
pub fn position_hash(x: i32, y: i32, z: i32) -> i64 {
    let mut l = i64::from(x.wrapping_mul(3_129_871)) ^ i64::from(z).wrapping_mul(116_129_781) ^ i64::from(y);
    l = l.wrapping_mul(l).wrapping_mul(42_317_861).wrapping_add(l.wrapping_mul(11));
    l >> 16
}

/// Variant index in `0..variants` for the block at `(x, y, z)`.
pub fn pick_variant(rng: &mut Rng, x: i32, y: i32, z: i32, variants: u8) -> u8 {
    if variants <= 1 {
        return 0;
    }
    rng.seed(position_hash(x, y, z) as u64);
    rng.u8(..variants)
}
