// Four blocks in lock-step. Word j of block i sits in lane i of vector j, so
// one round is a handful of lane-wise xor/rotate operations plus the table
// lookups. This is the portable rendition of the vector backends.

use core::ops::{BitXor, BitXorAssign};

use super::byteorder::*;
use super::tables::LTAU_TABLE;
use crate::sm4::{RoundKeys, BLOCK_SIZE};

pub(crate) const LANES: usize = 4;

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub(crate) struct Lanes(pub [u32; LANES]);

impl Lanes {
    #[inline(always)]
    fn splat(x: u32) -> Self {
        Lanes([x; LANES])
    }

    #[inline(always)]
    fn rotate_left(self, n: u32) -> Self {
        Lanes(self.0.map(|x| x.rotate_left(n)))
    }

    // per lane lookup of the byte at bit offset `shift`.
    #[inline(always)]
    fn lookup(self, shift: u32) -> Self {
        Lanes(self.0.map(|x| LTAU_TABLE[((x >> shift) & 0xff) as usize]))
    }

    #[inline(always)]
    fn lt(self) -> Self {
        self.lookup(0)
            ^ self.lookup(8).rotate_left(8)
            ^ self.lookup(16).rotate_left(16)
            ^ self.lookup(24).rotate_left(24)
    }
}

impl BitXor for Lanes {
    type Output = Lanes;
    #[inline(always)]
    fn bitxor(self, rhs: Self) -> Self::Output {
        let mut out = self;
        out ^= rhs;
        out
    }
}

impl BitXorAssign for Lanes {
    #[inline(always)]
    fn bitxor_assign(&mut self, rhs: Self) {
        for (x, y) in self.0.iter_mut().zip(rhs.0) {
            *x ^= y;
        }
    }
}

// gather word `word` of each of the four blocks into one vector.
#[inline(always)]
fn load_lane(src: &[u8], word: usize) -> Lanes {
    let mut v = Lanes::default();
    for (i, x) in v.0.iter_mut().enumerate() {
        *x = get_u32_be(&src[BLOCK_SIZE * i + 4 * word..]);
    }
    v
}

#[inline(always)]
pub(crate) fn load_block4(src: &[u8]) -> (Lanes, Lanes, Lanes, Lanes) {
    (load_lane(src, 0), load_lane(src, 1), load_lane(src, 2), load_lane(src, 3))
}

// scatter back, words in reverse order.
#[inline(always)]
pub(crate) fn store_block4(dst: &mut [u8], a: Lanes, b: Lanes, c: Lanes, d: Lanes) {
    for (i, block) in dst[..LANES * BLOCK_SIZE].chunks_exact_mut(BLOCK_SIZE).enumerate() {
        put_u32_be(&mut block[0..4], d.0[i]);
        put_u32_be(&mut block[4..8], c.0[i]);
        put_u32_be(&mut block[8..12], b.0[i]);
        put_u32_be(&mut block[12..16], a.0[i]);
    }
}

pub fn block4_lanes(output: &mut [u8], input: &[u8], rk: &RoundKeys) {
    let (mut a, mut b, mut c, mut d) = load_block4(input);

    for k in rk.chunks_exact(4) {
        a ^= (b ^ c ^ d ^ Lanes::splat(k[0])).lt();
        b ^= (c ^ d ^ a ^ Lanes::splat(k[1])).lt();
        c ^= (d ^ a ^ b ^ Lanes::splat(k[2])).lt();
        d ^= (a ^ b ^ c ^ Lanes::splat(k[3])).lt();
    }

    store_block4(output, a, b, c, d);
}
