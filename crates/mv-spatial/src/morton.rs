//! Morton (Z-order) directory keys
//!
//! Bit `i` of the block X coordinate lands on key bit `2i`, bit `i` of Z on
//! key bit `2i + 1`. The mapping is a bijection between `u32 x u32` and
//! `u64`, and neighbouring blocks share their high-order key bits.

use std::fmt;

use mv_core::Vec3;

/// Offset that maps signed block indices into the unsigned block domain
const BLOCK_ORIGIN: f64 = 2_147_483_648.0; // 2^31

/// 64-bit directory key
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SpatialKey(pub u64);

impl SpatialKey {
    #[inline]
    pub fn from_block(block: BlockCoord) -> Self {
        SpatialKey(encode(block.x, block.z))
    }

    #[inline]
    pub fn block(self) -> BlockCoord {
        let (x, z) = decode(self.0);
        BlockCoord { x, z }
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SpatialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:016x})", self.0)
    }
}

impl fmt::Display for SpatialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Quantized horizontal block coordinate
///
/// Block index 0 (the block containing the world origin) sits at `2^31` so
/// that negative positions quantize to distinct coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockCoord {
    pub x: u32,
    pub z: u32,
}

impl BlockCoord {
    pub const ORIGIN: BlockCoord = BlockCoord {
        x: 1 << 31,
        z: 1 << 31,
    };

    /// Quantize a world position into block units
    ///
    /// Returns `None` for non-finite positions, non-positive block sizes, or
    /// positions outside the representable block range.
    pub fn from_position(position: Vec3, block_size: f32) -> Option<Self> {
        if !(block_size.is_finite() && block_size > 0.0) {
            return None;
        }
        Some(BlockCoord {
            x: quantize(position.x, block_size)?,
            z: quantize(position.z, block_size)?,
        })
    }
}

fn quantize(coord: f32, block_size: f32) -> Option<u32> {
    let block = (f64::from(coord) / f64::from(block_size)).floor() + BLOCK_ORIGIN;
    if !block.is_finite() || block < 0.0 || block > f64::from(u32::MAX) {
        return None;
    }
    // In range and integral after floor(), so the cast is exact
    Some(block as u32)
}

/// Interleave two 32-bit coordinates into a 64-bit Morton code
#[inline]
pub fn encode(x: u32, z: u32) -> u64 {
    spread(x) | (spread(z) << 1)
}

/// Split a Morton code back into its coordinates
#[inline]
pub fn decode(code: u64) -> (u32, u32) {
    (compact(code), compact(code >> 1))
}

#[inline]
fn spread(v: u32) -> u64 {
    let mut x = u64::from(v);
    x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    x = (x | (x << 1)) & 0x5555_5555_5555_5555;
    x
}

#[inline]
fn compact(v: u64) -> u32 {
    let mut x = v & 0x5555_5555_5555_5555;
    x = (x | (x >> 1)) & 0x3333_3333_3333_3333;
    x = (x | (x >> 2)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x >> 4)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x >> 8)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x >> 16)) & 0x0000_0000_FFFF_FFFF;
    x as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encode_bitwise(x: u32, z: u32) -> u64 {
        let mut code = 0u64;
        for i in 0..32 {
            code |= u64::from((x >> i) & 1) << (2 * i);
            code |= u64::from((z >> i) & 1) << (2 * i + 1);
        }
        code
    }

    #[test]
    fn test_bit_layout() {
        assert_eq!(encode(1, 0), 0b01);
        assert_eq!(encode(0, 1), 0b10);
        assert_eq!(encode(0b11, 0), 0b0101);
        assert_eq!(encode(0, 0b11), 0b1010);
        assert_eq!(encode(u32::MAX, u32::MAX), u64::MAX);
        assert_eq!(encode(u32::MAX, 0), 0x5555_5555_5555_5555);
    }

    #[test]
    fn test_neighbours_share_high_bits() {
        // Blocks inside the same aligned 2x2 square differ only in the low 2 bits
        let base = encode(0x1000, 0x2000);
        for (dx, dz) in [(0, 1), (1, 0), (1, 1)] {
            assert_eq!(encode(0x1000 + dx, 0x2000 + dz) >> 2, base >> 2);
        }
    }

    #[test]
    fn test_quantize_origin_and_negatives() {
        let origin = BlockCoord::from_position(Vec3::new(0.0, 50.0, 999.0), 1000.0).unwrap();
        assert_eq!(origin, BlockCoord::ORIGIN);

        let west = BlockCoord::from_position(Vec3::new(-1.0, 0.0, 0.0), 1000.0).unwrap();
        assert_eq!(west.x, (1 << 31) - 1);
        assert_eq!(west.z, 1 << 31);

        let east = BlockCoord::from_position(Vec3::new(1000.0, 0.0, 0.0), 1000.0).unwrap();
        assert_eq!(east.x, (1 << 31) + 1);
    }

    #[test]
    fn test_quantize_rejects_bad_input() {
        assert!(BlockCoord::from_position(Vec3::new(f32::NAN, 0.0, 0.0), 1000.0).is_none());
        assert!(BlockCoord::from_position(Vec3::new(0.0, 0.0, f32::INFINITY), 1000.0).is_none());
        assert!(BlockCoord::from_position(Vec3::ZERO, 0.0).is_none());
        assert!(BlockCoord::from_position(Vec3::ZERO, -5.0).is_none());
        // f32::MAX / 1e-3 blocks is far outside the u32 domain
        assert!(BlockCoord::from_position(Vec3::new(f32::MAX, 0.0, 0.0), 0.001).is_none());
    }

    #[test]
    fn test_key_block_roundtrip() {
        let block = BlockCoord { x: 12345, z: 67890 };
        assert_eq!(SpatialKey::from_block(block).block(), block);
    }

    proptest! {
        #[test]
        fn prop_matches_bitwise_reference(x in any::<u32>(), z in any::<u32>()) {
            prop_assert_eq!(encode(x, z), encode_bitwise(x, z));
        }

        #[test]
        fn prop_decode_inverts_encode(x in any::<u32>(), z in any::<u32>()) {
            prop_assert_eq!(decode(encode(x, z)), (x, z));
        }

        #[test]
        fn prop_injective(a in any::<(u32, u32)>(), b in any::<(u32, u32)>()) {
            prop_assume!(a != b);
            prop_assert_ne!(encode(a.0, a.1), encode(b.0, b.1));
        }
    }
}
