use core::ops::{Add, AddAssign};

use zeroize::Zeroize;

use super::ghash::GHash;
use super::BLOCK_SIZE;

// Four bits of y at a time against sixteen precomputed multiples of H.
#[derive(Default, Clone)]
pub struct GHasherTable {
    // product_table[reverse_bits(i)] = i * H for every 4 bit i, because the
    // lookups below index it with bits taken from a field element, which are
    // in reverse order.
    product_table: [FieldElement; 16],

    y: FieldElement,
}

// reverse order of bits of f(x) * (x^7 + x^2 + x + 1) for deg(x) <= 3.
// The result is represented by two bytes.
// EX: f(x) = 1 and x^7 + x^2 + x + 1 = 0b0000_0000_1000_0111 => 0b1110_0001_0000_0000 = 0xe100
// reverse bits of f(x) = 1 is 1000 = 8.
// So REDUCTION_TABLE[8] = 0xe100.
const REDUCTION_TABLE: [u64; 16] = [
    0x0000, 0x1c20, 0x3840, 0x2460, 0x7080, 0x6ca0, 0x48c0, 0x54e0, 0xe100,
    0xfd20, 0xd940, 0xc560, 0x9180, 0x8da0, 0xa9c0, 0xb5e0,
];

impl GHash for GHasherTable {
    fn init(&mut self, key: &[u8; 16]) {
        let h = FieldElement::from_bytes(key);

        self.product_table[reverse_bits(1)] = h;
        for i in (2..16).step_by(2) {
            self.product_table[reverse_bits(i)] = self.product_table[reverse_bits(i / 2)].double();
            self.product_table[reverse_bits(i + 1)] = self.product_table[reverse_bits(i)] + h;
        }
        self.y = FieldElement::default();
    }

    fn reset(&mut self) {
        self.y = FieldElement::default();
    }

    fn update(&mut self, data: &[u8]) {
        let mut blocks = data.chunks_exact(BLOCK_SIZE);
        for block in &mut blocks {
            self.y += FieldElement::from_bytes(block);
            self.mul_h();
        }

        let rest = blocks.remainder();
        if !rest.is_empty() {
            let mut partial_block = [0u8; BLOCK_SIZE];
            partial_block[..rest.len()].copy_from_slice(rest);
            self.y += FieldElement::from_bytes(&partial_block);
            self.mul_h();
            partial_block.zeroize();
        }
    }

    fn update_u64x2(&mut self, a: u64, b: u64) {
        self.y += FieldElement { low: a, high: b };
        self.mul_h();
    }

    fn sum(&self, h: &mut [u8; 16]) {
        *h = self.y.bytes();
    }
}

impl GHasherTable {
    // y = y * H. Horner's rule over nibbles: shift z by four (multiply by
    // x^4), reduce the bits that fell off, add the multiple of H picked by
    // the next nibble of y.
    fn mul_h(&mut self) {
        let mut z = FieldElement::default();
        for mut word in [self.y.high, self.y.low] {
            for _ in 0..16 {
                let msw = z.high & 0xf;
                z.high = (z.high >> 4) | (z.low << 60);
                z.low = (z.low >> 4) ^ (REDUCTION_TABLE[msw as usize] << 48);

                z += self.product_table[(word & 0xf) as usize];
                word >>= 4;
            }
        }
        self.y = z;
    }
}

impl Drop for GHasherTable {
    fn drop(&mut self) {
        for e in self.product_table.iter_mut() {
            e.low.zeroize();
            e.high.zeroize();
        }
        self.y.low.zeroize();
        self.y.high.zeroize();
    }
}

// An element of GF(2^128) = GF(2)[x]/(x^128 + x^7 + x^2 + x + 1), bits in
// the GCM order:
//
//	the coefficient of x⁰ can be obtained by v.low >> 63.
//	the coefficient of x⁶³ can be obtained by v.low & 1.
//	the coefficient of x⁶⁴ can be obtained by v.high >> 63.
//	the coefficient of x¹²⁷ can be obtained by v.high & 1.
#[derive(Default, Copy, Clone, Eq, PartialEq, Debug)]
struct FieldElement {
    low: u64,
    high: u64,
}

impl Add for FieldElement {
    type Output = FieldElement;
    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        FieldElement {
            low: self.low ^ rhs.low,
            high: self.high ^ rhs.high,
        }
    }
}

impl AddAssign for FieldElement {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.low ^= rhs.low;
        self.high ^= rhs.high;
    }
}

impl FieldElement {
    #[inline]
    fn from_bytes(b: &[u8]) -> Self {
        let mut low = [0u8; 8];
        let mut high = [0u8; 8];
        low.copy_from_slice(&b[..8]);
        high.copy_from_slice(&b[8..16]);
        FieldElement {
            low: u64::from_be_bytes(low),
            high: u64::from_be_bytes(high),
        }
    }

    // multiply by x.
    #[inline]
    fn double(self) -> Self {
        let msb = self.high & 1;

        let high = (self.high >> 1) | (self.low << 63);
        let mut low = self.low >> 1;

        // x^128 falls out of range; add x^7 + x^2 + x + 1 instead.
        if msb == 1 {
            low ^= 0xe100000000000000;
        }
        FieldElement { low, high }
    }

    #[inline]
    fn bytes(self) -> [u8; 16] {
        let mut out = [0; 16];
        out[..8].copy_from_slice(&self.low.to_be_bytes());
        out[8..16].copy_from_slice(&self.high.to_be_bytes());
        out
    }
}

// reverse_bits reverses the order of the bits of 4-bit number in i.
#[inline]
fn reverse_bits(i: usize) -> usize {
    let i = ((i << 2) & 0xc) | ((i >> 2) & 0x3);
    ((i << 1) & 0xa) | ((i >> 1) & 0x5)
}

#[cfg(test)]
mod tests {
    use super::super::ghash::{ghash, gf128_mul, GHasherReference};
    use super::*;
    use hex_literal::hex;
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    fn table_ghash(h: &[u8; 16], parts: &[&[u8]]) -> [u8; 16] {
        let mut g = GHasherTable::default();
        g.init(h);
        for p in parts {
            g.update(p);
        }
        let mut y = [0u8; 16];
        g.sum(&mut y);
        y
    }

    #[test]
    fn test_reverse_bits() {
        assert_eq!(reverse_bits(1), 8);
        assert_eq!(reverse_bits(0b0110), 0b0110);
        assert_eq!(reverse_bits(0b0011), 0b1100);
    }

    #[test]
    fn test_double_matches_mul_by_x() {
        let x1 = hex!("40000000000000000000000000000000");
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..64 {
            let mut a = [0u8; 16];
            rng.fill_bytes(&mut a);
            assert_eq!(FieldElement::from_bytes(&a).double().bytes(), gf128_mul(&a, &x1));
        }
    }

    #[test]
    fn test_table_matches_reference() {
        let h = hex!("66e94bd4ef8a2c3b884cfa59ca342b2e");
        let data: [u8; 37] = core::array::from_fn(|i| i as u8);
        for n in [0, 16, 37] {
            assert_eq!(table_ghash(&h, &[&data[..n]]), ghash(&h, &data[..n]));
        }

        let mut rng = StdRng::seed_from_u64(3);
        for len in 0..100 {
            let mut h = [0u8; 16];
            rng.fill_bytes(&mut h);
            let mut data = std::vec![0u8; len];
            rng.fill_bytes(&mut data);
            assert_eq!(table_ghash(&h, &[&data]), ghash(&h, &data), "len {}", len);
        }
    }

    #[test]
    fn test_lengths_block() {
        let h = hex!("b83b533708bf535d0aa6e52980d53b78");
        let aad = [0xa5u8; 20];
        let ct = [0x3cu8; 33];

        let mut table = GHasherTable::default();
        let mut reference = GHasherReference::default();
        table.init(&h);
        reference.init(&h);
        for g in [&mut table as &mut dyn GHash, &mut reference] {
            g.update(&aad);
            g.update(&ct);
            g.update_u64x2(aad.len() as u64 * 8, ct.len() as u64 * 8);
        }

        let (mut a, mut b) = ([0u8; 16], [0u8; 16]);
        table.sum(&mut a);
        reference.sum(&mut b);
        assert_eq!(a, b);
    }
}
