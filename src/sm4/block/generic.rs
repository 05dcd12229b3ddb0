use crate::sm4::{RoundKeys, BLOCK_SIZE};

use super::byteorder::*;

pub mod x32 {
    use super::super::tables::*;

    #[inline]
    pub fn tau(x: u32) -> u32 {
        (SBOX[(x & 0xff) as usize] as u32)
            | (SBOX[((x >> 8) & 0xff) as usize] as u32) << 8
            | (SBOX[((x >> 16) & 0xff) as usize] as u32) << 16
            | (SBOX[((x >> 24) & 0xff) as usize] as u32) << 24
    }

    #[inline]
    #[allow(non_snake_case)]
    pub fn L(x: u32) -> u32 {
        x ^ x.rotate_left(2) ^ x.rotate_left(10) ^ x.rotate_left(18) ^ x.rotate_left(24)
    }

    // L' of the key schedule.
    #[inline]
    pub fn l_prime(x: u32) -> u32 {
        x ^ x.rotate_left(13) ^ x.rotate_left(23)
    }

    // lt return L(Tau(x)) from four byte lookups.
    #[inline]
    pub fn lt(x: u32) -> u32 {
        LTAU_TABLE[(x & 0xff) as usize]
            ^ LTAU_TABLE[((x >> 8) & 0xff) as usize].rotate_left(8)
            ^ LTAU_TABLE[((x >> 16) & 0xff) as usize].rotate_left(16)
            ^ LTAU_TABLE[(x >> 24) as usize].rotate_left(24)
    }
}

/// The four-word shift register (X0, X1, X2, X3) shared by the key schedule
/// and the round function. Every round consumes X1 ^ X2 ^ X3, produces one
/// new word from X0 and shifts it in at the end.
#[derive(Clone, Copy, Default)]
pub(crate) struct Window([u32; 4]);

impl Window {
    #[inline(always)]
    pub(crate) fn load(src: &[u8]) -> Self {
        Window([
            get_u32_be(&src[0..4]),
            get_u32_be(&src[4..8]),
            get_u32_be(&src[8..12]),
            get_u32_be(&src[12..16]),
        ])
    }

    #[inline(always)]
    pub(crate) fn xor_words(&mut self, w: &[u32; 4]) {
        for (x, k) in self.0.iter_mut().zip(w) {
            *x ^= *k;
        }
    }

    #[inline(always)]
    pub(crate) fn head(&self) -> u32 {
        self.0[0]
    }

    #[inline(always)]
    pub(crate) fn mix(&self) -> u32 {
        self.0[1] ^ self.0[2] ^ self.0[3]
    }

    // (X0, X1, X2, X3) <- (X1, X2, X3, word)
    #[inline(always)]
    pub(crate) fn shift_in(&mut self, word: u32) {
        self.0 = [self.0[1], self.0[2], self.0[3], word];
    }

    // output (X3, X2, X1, X0), the final reverse transform R.
    #[inline(always)]
    pub(crate) fn store_reversed(&self, dst: &mut [u8]) {
        put_u32_be(&mut dst[..4], self.0[3]);
        put_u32_be(&mut dst[4..8], self.0[2]);
        put_u32_be(&mut dst[8..12], self.0[1]);
        put_u32_be(&mut dst[12..16], self.0[0]);
    }
}

/*
Encrypt (or, with reversed round keys, decrypt) one block.
*/
#[inline]
pub fn block_generic(output: &mut [u8], input: &[u8], rk: &RoundKeys) {
    let mut x = Window::load(input);
    for k in rk {
        let word = x.head() ^ x32::lt(x.mix() ^ k);
        x.shift_in(word);
    }
    x.store_reversed(&mut output[..BLOCK_SIZE]);
}

// four blocks, one after another.
#[inline]
pub fn block4_generic(output: &mut [u8], input: &[u8], rk: &RoundKeys) {
    for (dst, src) in output[..4 * BLOCK_SIZE]
        .chunks_exact_mut(BLOCK_SIZE)
        .zip(input[..4 * BLOCK_SIZE].chunks_exact(BLOCK_SIZE))
    {
        block_generic(dst, src, rk);
    }
}
