// SSE2 four-lane SM4: one __m128i holds the same word of four blocks.
// The table lookups are gathered lane by lane, the rotations and xors run on
// the vector unit.

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

use super::byteorder::*;
use super::tables::LTAU_TABLE;
use crate::sm4::{RoundKeys, BLOCK_SIZE};

#[inline(always)]
unsafe fn load_lane(src: &[u8], word: usize) -> __m128i {
    let off = 4 * word;
    _mm_set_epi32(
        get_u32_be(&src[16 * 3 + off..]) as i32,
        get_u32_be(&src[16 * 2 + off..]) as i32,
        get_u32_be(&src[16 + off..]) as i32,
        get_u32_be(&src[off..]) as i32,
    )
}

#[inline(always)]
unsafe fn to_words(x: __m128i) -> [u32; 4] {
    let mut v = [0u32; 4];
    _mm_storeu_si128(v.as_mut_ptr() as *mut __m128i, x);
    v
}

#[inline(always)]
unsafe fn lookup(t: &[u32; 4], shift: u32) -> __m128i {
    _mm_set_epi32(
        LTAU_TABLE[((t[3] >> shift) & 0xff) as usize] as i32,
        LTAU_TABLE[((t[2] >> shift) & 0xff) as usize] as i32,
        LTAU_TABLE[((t[1] >> shift) & 0xff) as usize] as i32,
        LTAU_TABLE[((t[0] >> shift) & 0xff) as usize] as i32,
    )
}

#[inline(always)]
unsafe fn rotl8(x: __m128i) -> __m128i {
    _mm_or_si128(_mm_slli_epi32::<8>(x), _mm_srli_epi32::<24>(x))
}

#[inline(always)]
unsafe fn rotl16(x: __m128i) -> __m128i {
    _mm_or_si128(_mm_slli_epi32::<16>(x), _mm_srli_epi32::<16>(x))
}

#[inline(always)]
unsafe fn rotl24(x: __m128i) -> __m128i {
    _mm_or_si128(_mm_slli_epi32::<24>(x), _mm_srli_epi32::<8>(x))
}

// L(tau(x)) on every lane.
#[inline(always)]
unsafe fn lt(x: __m128i) -> __m128i {
    let t = to_words(x);
    let y0 = lookup(&t, 0);
    let y1 = rotl8(lookup(&t, 8));
    let y2 = rotl16(lookup(&t, 16));
    let y3 = rotl24(lookup(&t, 24));
    _mm_xor_si128(_mm_xor_si128(y0, y1), _mm_xor_si128(y2, y3))
}

#[inline(always)]
unsafe fn round(a: __m128i, b: __m128i, c: __m128i, d: __m128i, rk: u32) -> __m128i {
    let t = _mm_xor_si128(_mm_xor_si128(b, c), _mm_xor_si128(d, _mm_set1_epi32(rk as i32)));
    _mm_xor_si128(a, lt(t))
}

#[inline(always)]
fn store(dst: &mut [u8], a: u32, b: u32, c: u32, d: u32) {
    put_u32_be(&mut dst[0..], d);
    put_u32_be(&mut dst[4..], c);
    put_u32_be(&mut dst[8..], b);
    put_u32_be(&mut dst[12..], a);
}

#[target_feature(enable = "sse2")]
unsafe fn block4_sse2_impl(output: &mut [u8], input: &[u8], rk: &RoundKeys) {
    let mut a = load_lane(input, 0);
    let mut b = load_lane(input, 1);
    let mut c = load_lane(input, 2);
    let mut d = load_lane(input, 3);

    for k in rk.chunks_exact(4) {
        a = round(a, b, c, d, k[0]);
        b = round(b, c, d, a, k[1]);
        c = round(c, d, a, b, k[2]);
        d = round(d, a, b, c, k[3]);
    }

    let (va, vb, vc, vd) = (to_words(a), to_words(b), to_words(c), to_words(d));
    for (i, block) in output[..4 * BLOCK_SIZE].chunks_exact_mut(BLOCK_SIZE).enumerate() {
        store(block, va[i], vb[i], vc[i], vd[i]);
    }
}

pub(crate) fn block4_sse2(output: &mut [u8], input: &[u8], rk: &RoundKeys) {
    // SAFETY: `Blocks` installs this only after sse2 support has been confirmed.
    unsafe { block4_sse2_impl(output, input, rk) }
}
