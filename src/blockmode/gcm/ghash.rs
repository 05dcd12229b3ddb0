use zeroize::Zeroize;

use super::BLOCK_SIZE;

pub trait GHash {
    fn init(&mut self, key: &[u8; 16]);
    fn reset(&mut self);

    // hash data, padding 0 if data is not of length of multiple of 128
    fn update(&mut self, data: &[u8]);
    fn update_u64x2(&mut self, a: u64, b: u64);
    fn sum(&self, h: &mut [u8; 16]);
}

// Note: For GCM standard, a 16 Bytes sequence represents a polynomial of degree 127 in GF(2)[x]
// The Bytes sequence is in little endian.
// But in each byte is "big-endian". For example, 0x80, the first bit is 1,
// and 0x01, the 7-th bit is 1.
// Example:
// [0x80, 00, ..., 0x01] <=> x^127 + 1
// [b0, b1, b2, ..., b15]:
// coefficient of:
// x^0 = (b0 >> 7) & 1
// x^1 = (b0 >> 6) & 1
// ....
// x^126 = (b15 >> 1) & 1
// x^127 = b15 & 1
//
// Read as a big-endian u128, x^0 is therefore the most significant bit and
// multiplying by x is a right shift.

// x^128 = x^7 + x^2 + x + 1, in the bit order above.
const R: u128 = 0xe1 << 120;

/// x * y in GF(2^128) modulo x^128 + x^7 + x^2 + x + 1.
///
/// The bit-serial reference: walk the bits of `x` from x^0 up, adding the
/// running multiple of `y` for every set bit. Branch free on the operands.
pub fn gf128_mul(x: &[u8; 16], y: &[u8; 16]) -> [u8; 16] {
    let x = u128::from_be_bytes(*x);
    let mut v = u128::from_be_bytes(*y);
    let mut z = 0u128;

    for i in (0..128).rev() {
        let bit = (x >> i) & 1;
        z ^= v & 0u128.wrapping_sub(bit);
        let carry = v & 1;
        v = (v >> 1) ^ (R & 0u128.wrapping_sub(carry));
    }
    z.to_be_bytes()
}

/// GHASH_H over `data`, zero padding the final partial block.
pub fn ghash(h: &[u8; 16], data: &[u8]) -> [u8; 16] {
    let mut g = GHasherReference::default();
    g.init(h);
    g.update(data);
    let mut y = [0u8; 16];
    g.sum(&mut y);
    y
}

/// Runs every block through [`gf128_mul`]. Slow, but it is the definition
/// the table driven hasher is checked against.
#[derive(Default, Clone)]
pub struct GHasherReference {
    h: [u8; 16],
    y: [u8; 16],
}

impl GHasherReference {
    fn update_block(&mut self, block: &[u8]) {
        for (y, b) in self.y.iter_mut().zip(block) {
            *y ^= *b;
        }
        self.y = gf128_mul(&self.y, &self.h);
    }
}

impl GHash for GHasherReference {
    fn init(&mut self, key: &[u8; 16]) {
        self.h = *key;
        self.y = [0; 16];
    }

    fn reset(&mut self) {
        self.y = [0; 16];
    }

    fn update(&mut self, data: &[u8]) {
        // a short final chunk only touches its own bytes, the same as
        // xoring in a zero padded block.
        for chunk in data.chunks(BLOCK_SIZE) {
            self.update_block(chunk);
        }
    }

    fn update_u64x2(&mut self, a: u64, b: u64) {
        let mut block = [0u8; 16];
        block[..8].copy_from_slice(&a.to_be_bytes());
        block[8..].copy_from_slice(&b.to_be_bytes());
        self.update_block(&block);
    }

    fn sum(&self, h: &mut [u8; 16]) {
        h.copy_from_slice(&self.y);
    }
}

impl Drop for GHasherReference {
    fn drop(&mut self) {
        self.h.zeroize();
        self.y.zeroize();
    }
}
