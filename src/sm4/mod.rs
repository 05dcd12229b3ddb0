//! The SM4 block cipher, GB/T 32907-2016.

pub mod block;
pub const BLOCK_SIZE: usize = 16;
pub const KEY_SIZE: usize = 16;
pub const ROUNDS: usize = 32;

/// The 32 round keys, in the order one direction consumes them.
pub type RoundKeys = [u32; ROUNDS];

use core::fmt;

use block::*;
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// The multi-block implementation a [`Cipher`] dispatches to. All of them
/// produce the same bytes as [`Backend::Generic`]; they only differ in how
/// many blocks are transformed together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// One block at a time.
    Generic,
    /// Four blocks in lock-step on plain integer lanes.
    Lanes,
    /// Four blocks in lock-step in SSE2 registers.
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    Sse2,
}

impl Backend {
    /// The fastest backend the running CPU supports.
    pub fn detect() -> Backend {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        if Backend::Sse2.available() {
            return Backend::Sse2;
        }
        Backend::Lanes
    }

    pub fn available(self) -> bool {
        match self {
            Backend::Generic | Backend::Lanes => true,
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Sse2 => crate::internal::cpuid::x86::support_sse2(),
        }
    }
}

type BlockFn = fn(dst: &mut [u8], src: &[u8], rk: &RoundKeys);

#[derive(Clone, Copy)]
pub(crate) struct Blocks {
    block4: BlockFn,
    block: BlockFn,
    backend: Backend,
}

impl Default for Blocks {
    fn default() -> Self {
        Self {
            block4: block4_generic,
            block: block_generic,
            backend: Backend::Generic,
        }
    }
}

impl Blocks {
    fn new(backend: Backend) -> Blocks {
        let backend = if backend.available() {
            backend
        } else {
            tracing::debug!(
                requested = ?backend,
                "sm4 backend not supported by this cpu, using lanes"
            );
            Backend::Lanes
        };

        let blocks = match backend {
            Backend::Generic => Blocks::default(),
            Backend::Lanes => Blocks {
                block4: block4_lanes,
                block: block_generic,
                backend,
            },
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Sse2 => Blocks {
                block4: block4_sse2,
                block: block_generic,
                backend,
            },
        };
        tracing::trace!(backend = ?blocks.backend, "sm4 blocks selected");
        blocks
    }

    // blocks encrypts as much as possible, that is
    // min(dst.len(), src.len()) / BLOCK_SIZE blocks. returns the
    // bytes that were encrypted.
    #[inline(always)]
    pub fn blocks(self, dst: &mut [u8], src: &[u8], rk: &RoundKeys) -> usize {
        let n_blocks = core::cmp::min(dst.len(), src.len()) / BLOCK_SIZE;
        let mut n = n_blocks;
        let mut dst = dst;
        let mut src = src;

        while n >= 4 {
            (self.block4)(dst, src, rk);
            dst = &mut dst[BLOCK_SIZE * 4..];
            src = &src[BLOCK_SIZE * 4..];
            n -= 4;
        }

        while n >= 1 {
            (self.block)(dst, src, rk);
            dst = &mut dst[BLOCK_SIZE..];
            src = &src[BLOCK_SIZE..];
            n -= 1;
        }
        n_blocks * BLOCK_SIZE
    }

    #[inline(always)]
    pub fn blocks_inplace(self, dst_src: &mut [u8], rk: &RoundKeys) -> usize {
        let n_blocks = dst_src.len() / BLOCK_SIZE;
        let mut buf = [0u8; 4 * BLOCK_SIZE];

        for chunk in dst_src[..n_blocks * BLOCK_SIZE].chunks_mut(4 * BLOCK_SIZE) {
            let src = &mut buf[..chunk.len()];
            src.copy_from_slice(chunk);
            self.blocks(chunk, src, rk);
        }
        buf.zeroize();
        n_blocks * BLOCK_SIZE
    }
}

/// An expanded SM4 key: the round-key schedule for both directions.
///
/// Immutable once built, so a single `Cipher` can be shared between threads.
/// Re-keying means building a new one. The round keys are wiped on drop.
#[derive(Clone)]
pub struct Cipher {
    rk: RoundKeys,
    rk_rev: RoundKeys,
    blocks: Blocks,
}

impl Cipher {
    /// Expands `key`, which must be exactly [`KEY_SIZE`] bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        Self::with_backend(key, Backend::detect())
    }

    pub fn with_backend(key: &[u8], backend: Backend) -> Result<Self> {
        let key: &[u8; KEY_SIZE] = key.try_into().map_err(|_| {
            tracing::debug!(len = key.len(), "rejecting sm4 key");
            Error::InvalidKeyLength(KEY_SIZE, key.len())
        })?;
        let (rk, rk_rev) = key_schedule(key);
        Ok(Cipher {
            rk,
            rk_rev,
            blocks: Blocks::new(backend),
        })
    }

    pub fn backend(&self) -> Backend {
        self.blocks.backend
    }

    /// The encryption round keys, rk[0] first.
    pub fn round_keys(&self) -> &RoundKeys {
        &self.rk
    }

    // encrypt blocks into dst. returns the bytes encrypted.
    pub fn encrypt(&self, dst: &mut [u8], src: &[u8]) -> usize {
        self.blocks.blocks(dst, src, &self.rk)
    }

    // decrypt blocks into dst. returns the bytes decrypted.
    pub fn decrypt(&self, dst: &mut [u8], src: &[u8]) -> usize {
        self.blocks.blocks(dst, src, &self.rk_rev)
    }

    pub fn encrypt_inplace(&self, in_out: &mut [u8]) -> usize {
        self.blocks.blocks_inplace(in_out, &self.rk)
    }

    pub fn decrypt_inplace(&self, in_out: &mut [u8]) -> usize {
        self.blocks.blocks_inplace(in_out, &self.rk_rev)
    }

    pub fn encrypt_block(&self, block: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
        let mut out = [0u8; BLOCK_SIZE];
        block_generic(&mut out, block, &self.rk);
        out
    }

    pub fn decrypt_block(&self, block: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
        let mut out = [0u8; BLOCK_SIZE];
        block_generic(&mut out, block, &self.rk_rev);
        out
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher")
            .field("backend", &self.blocks.backend)
            .finish_non_exhaustive()
    }
}

impl Drop for Cipher {
    fn drop(&mut self) {
        self.rk.zeroize();
        self.rk_rev.zeroize();
    }
}

/// Expands a 16 byte key into its round-key schedule.
pub fn key_expand(key: &[u8]) -> Result<Cipher> {
    Cipher::new(key)
}

pub fn encrypt_block(cipher: &Cipher, block: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    cipher.encrypt_block(block)
}

pub fn decrypt_block(cipher: &Cipher, block: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    cipher.decrypt_block(block)
}

const FK: [u32; 4] = [0xa3b1bac6, 0x56aa3350, 0x677d9197, 0xb27022dc];
const CK: [u32; 32] = [
    0x00070e15, 0x1c232a31, 0x383f464d, 0x545b6269, 0x70777e85, 0x8c939aa1,
    0xa8afb6bd, 0xc4cbd2d9, 0xe0e7eef5, 0xfc030a11, 0x181f262d, 0x343b4249,
    0x50575e65, 0x6c737a81, 0x888f969d, 0xa4abb2b9, 0xc0c7ced5, 0xdce3eaf1,
    0xf8ff060d, 0x141b2229, 0x30373e45, 0x4c535a61, 0x686f767d, 0x848b9299,
    0xa0a7aeb5, 0xbcc3cad1, 0xd8dfe6ed, 0xf4fb0209, 0x10171e25, 0x2c333a41,
    0x484f565d, 0x646b7279,
];

// rk[i] = K[i] ^ L'(tau(K[i+1] ^ K[i+2] ^ K[i+3] ^ CK[i])), K[0..4] = MK ^ FK.
// Returns the round keys in encryption and in decryption order.
#[inline]
fn key_schedule(key: &[u8; KEY_SIZE]) -> (RoundKeys, RoundKeys) {
    let mut rk = [0u32; ROUNDS];
    let mut rk_rev = [0u32; ROUNDS];

    let mut k = Window::load(key);
    k.xor_words(&FK);
    for i in 0..ROUNDS {
        let word = k.head() ^ x32::l_prime(x32::tau(k.mix() ^ CK[i]));
        k.shift_in(word);
        rk[i] = word;
        rk_rev[ROUNDS - 1 - i] = word;
    }
    (rk, rk_rev)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hex_literal::hex;
    use rand::{rngs::StdRng, RngCore, SeedableRng};
    use std::vec::Vec;

    // returns (plain, cipher) of n bytes (n / 16 copies of the standard block)
    pub fn get_tests_data(n: usize) -> (Vec<u8>, Vec<u8>) {
        let mut plain = Vec::with_capacity(n);
        let mut cipher = Vec::with_capacity(n);
        for _ in 0..n / 16 {
            plain.extend_from_slice(&TEST_PLAIN);
            cipher.extend_from_slice(&TEST_CIPHER);
        }
        (plain, cipher)
    }

    pub const KEY: [u8; 16] = hex!("0123456789abcdeffedcba9876543210");

    pub const TEST_ROUNDKEY: RoundKeys = [
        0xf12186f9, 0x41662b61, 0x5a6ab19a, 0x7ba92077, 0x367360f4, 0x776a0c61, 0xb6bb89b3,
        0x24763151, 0xa520307c, 0xb7584dbd, 0xc30753ed, 0x7ee55b57, 0x6988608c, 0x30d895b7,
        0x44ba14af, 0x104495a1, 0xd120b428, 0x73b55fa3, 0xcc874966, 0x92244439, 0xe89e641f,
        0x98ca015a, 0xc7159060, 0x99e1fd2e, 0xb79bd80c, 0x1d2115b0, 0x0e228aeb, 0xf1780c81,
        0x428d3654, 0x62293496, 0x01cf72e5, 0x9124a012,
    ];

    const TEST_PLAIN: [u8; 16] = hex!("0123456789abcdeffedcba9876543210");
    const TEST_CIPHER: [u8; 16] = hex!("681edf34d206965e86b3e94f536e4246");

    pub fn backends() -> Vec<Backend> {
        let mut all = vec![Backend::Generic, Backend::Lanes];
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        if Backend::Sse2.available() {
            all.push(Backend::Sse2);
        }
        all
    }

    #[test]
    fn test_key_schedule() {
        let (rk, rk_rev) = key_schedule(&KEY);
        assert_eq!(rk, TEST_ROUNDKEY);
        for i in 0..ROUNDS {
            assert_eq!(rk_rev[i], rk[ROUNDS - 1 - i]);
        }
    }

    #[test]
    fn test_known_answer() {
        let c = key_expand(&KEY).unwrap();
        assert_eq!(c.round_keys(), &TEST_ROUNDKEY);
        assert_eq!(encrypt_block(&c, &TEST_PLAIN), TEST_CIPHER);
        assert_eq!(decrypt_block(&c, &TEST_CIPHER), TEST_PLAIN);
    }

    // GB/T 32907-2016 example 2: encrypt the plaintext 1,000,000 times.
    #[test]
    fn test_known_answer_million() {
        let c = Cipher::new(&KEY).unwrap();
        let mut block = TEST_PLAIN;
        for _ in 0..1_000_000 {
            block = c.encrypt_block(&block);
        }
        assert_eq!(block, hex!("595298c7c6fd271f0402f804c33d3f66"));
    }

    #[test]
    fn test_invalid_key_length() {
        for n in [0, 15, 17, 32] {
            let key = vec![0u8; n];
            assert_eq!(Cipher::new(&key).unwrap_err(), Error::InvalidKeyLength(16, n));
        }
    }

    #[test]
    fn test_round_trip() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..256 {
            let mut key = [0u8; 16];
            let mut block = [0u8; 16];
            rng.fill_bytes(&mut key);
            rng.fill_bytes(&mut block);
            let c = key_expand(&key).unwrap();
            assert_eq!(decrypt_block(&c, &encrypt_block(&c, &block)), block);
        }
    }

    #[test]
    fn test_blocks() {
        for backend in backends() {
            let c = Cipher::with_backend(&KEY, backend).unwrap();
            assert_eq!(c.backend(), backend);
            for n in 0..512 {
                let (plain, wanted_cipher) = get_tests_data(n);
                let mut cipher = vec![0u8; n];
                let nn = c.encrypt(&mut cipher, &plain);
                assert_eq!(nn, n / 16 * 16);
                assert_eq!(&cipher[..nn], &wanted_cipher[..nn], "{:?} {}", backend, n);

                let mut back = cipher.clone();
                assert_eq!(c.decrypt_inplace(&mut back), nn);
                assert_eq!(&back[..nn], &plain[..nn]);
            }
        }
    }

    #[test]
    fn test_blocks_short_dst() {
        let c = Cipher::new(&KEY).unwrap();
        let (plain, wanted) = get_tests_data(160);
        let mut cipher = [0u8; 40];
        assert_eq!(c.encrypt(&mut cipher, &plain), 32);
        assert_eq!(&cipher[..32], &wanted[..32]);
        assert_eq!(&cipher[32..], &[0u8; 8]);
    }

    // Independent pseudo-random blocks through the four-lane paths must match
    // the one-block transform.
    #[test]
    fn test_four_lanes_equal_scalar() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut key = [0u8; 16];
        rng.fill_bytes(&mut key);
        let mut input = [0u8; 16 * 8];
        rng.fill_bytes(&mut input);

        let reference = Cipher::with_backend(&key, Backend::Generic).unwrap();
        let mut want = [0u8; 16 * 8];
        for (dst, src) in want.chunks_exact_mut(16).zip(input.chunks_exact(16)) {
            dst.copy_from_slice(&reference.encrypt_block(src.try_into().unwrap()));
        }

        for backend in backends() {
            let c = Cipher::with_backend(&key, backend).unwrap();
            let mut got = [0u8; 16 * 8];
            c.encrypt(&mut got, &input);
            assert_eq!(got, want, "{:?}", backend);

            let mut back = [0u8; 16 * 8];
            c.decrypt(&mut back, &got);
            assert_eq!(back, input, "{:?}", backend);
        }
    }

    #[test]
    fn test_shared_between_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Cipher>();

        let c = Cipher::new(&KEY).unwrap();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| assert_eq!(c.encrypt_block(&TEST_PLAIN), TEST_CIPHER));
            }
        });
    }

    #[test]
    fn test_debug_hides_keys() {
        let c = Cipher::new(&KEY).unwrap();
        let s = std::format!("{:?}", c);
        assert!(s.starts_with("Cipher"));
        assert!(!s.contains("f12186f9"));
    }
}
