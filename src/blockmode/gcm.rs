mod ghash;
mod ghash_generic;

pub use ghash::{gf128_mul, ghash, GHash, GHasherReference};
pub use ghash_generic::GHasherTable;

use alloc::vec::Vec;

use rand::CryptoRng;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::{Error, Result};
use crate::sm4;
use crate::traits::{Block, AEAD};

const BLOCK_SIZE: usize = 16;
pub const TAG_SIZE: usize = 16;
pub const NONCE_SIZE: usize = 12;

// counter blocks encrypted per call into the block cipher.
const CTR_BATCH: usize = 8;

/// Where the tag mask and the keystream sit in the 32 bit counter space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CounterLayout {
    /// Tag mask E(N || 0), keystream from N || 1.
    #[default]
    MaskAtZero,

    /// Tag mask E(N || 1), keystream from N || 2 (NIST SP 800-38D, RFC 8998).
    NistSp80038d,
}

impl CounterLayout {
    #[inline]
    fn mask_counter(self) -> u32 {
        match self {
            CounterLayout::MaskAtZero => 0,
            CounterLayout::NistSp80038d => 1,
        }
    }

    #[inline]
    fn first_counter(self) -> u32 {
        self.mask_counter() + 1
    }
}

pub type Sm4Gcm = GCM<sm4::Cipher>;

// Returns a GCM instance over SM4 with a 12 byte nonce and a 16 byte tag.
pub fn new_sm4_gcm(key: &[u8]) -> Result<Sm4Gcm> {
    GCM::new(sm4::Cipher::new(key)?)
}

/// Galois/Counter mode over a 128 bit block cipher.
///
/// H = E(0^128) is derived once at construction and kept only as the
/// GHASH product table. Nonces are 12 bytes and tags are 16 bytes. The block
/// cipher must have 16 byte blocks.
pub struct GCM<B: Block> {
    cipher: B,
    hasher: GHasherTable,
    layout: CounterLayout,
}

impl<B: Block> GCM<B> {
    pub fn new(block: B) -> Result<Self> {
        Self::with_layout(block, CounterLayout::default())
    }

    pub fn with_layout(block: B, layout: CounterLayout) -> Result<Self> {
        if block.block_size() != BLOCK_SIZE {
            tracing::debug!(block_size = block.block_size(), "rejecting gcm block cipher");
            return Err(Error::UnsupportedBlockSize(block.block_size()));
        }

        // h = CIPH_K(0^128)
        let mut h = [0u8; BLOCK_SIZE];
        block.encrypt_inplace(&mut h);

        let mut hasher = GHasherTable::default();
        hasher.init(&h);
        h.zeroize();

        Ok(GCM {
            cipher: block,
            hasher,
            layout,
        })
    }

    pub fn layout(&self) -> CounterLayout {
        self.layout
    }

    /// Encrypts `plaintext`, returning the ciphertext and its tag.
    pub fn encrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; TAG_SIZE])> {
        let nonce = check_nonce(nonce)?;
        let mut ciphertext = plaintext.to_vec();
        self.counter_crypt_inplace(nonce, &mut ciphertext);
        let tag = self.auth(nonce, &ciphertext, Some(aad));
        Ok((ciphertext, tag))
    }

    /// Checks `tag` and only then decrypts. No plaintext is produced for a
    /// forged message.
    pub fn decrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>> {
        let nonce = check_nonce(nonce)?;
        self.verify(nonce, ciphertext, Some(aad), tag)?;
        let mut plaintext = ciphertext.to_vec();
        self.counter_crypt_inplace(nonce, &mut plaintext);
        Ok(plaintext)
    }

    fn counter_block(nonce: &[u8; NONCE_SIZE], ctr: u32) -> [u8; BLOCK_SIZE] {
        let mut block = [0u8; BLOCK_SIZE];
        block[..NONCE_SIZE].copy_from_slice(nonce);
        block[NONCE_SIZE..].copy_from_slice(&ctr.to_be_bytes());
        block
    }

    fn tag_mask(&self, nonce: &[u8; NONCE_SIZE]) -> [u8; BLOCK_SIZE] {
        let mut mask = Self::counter_block(nonce, self.layout.mask_counter());
        self.cipher.encrypt_inplace(&mut mask);
        mask
    }

    fn counter_crypt_inplace(&self, nonce: &[u8; NONCE_SIZE], in_out: &mut [u8]) {
        self.xor_keystream(nonce, self.layout.first_counter(), in_out);
    }

    // xor the keystream starting at counter ctr into in_out. The counter is
    // the low 32 bits only and wraps without touching the nonce.
    fn xor_keystream(&self, nonce: &[u8; NONCE_SIZE], mut ctr: u32, in_out: &mut [u8]) {
        let mut keystream = [0u8; BLOCK_SIZE * CTR_BATCH];

        for chunk in in_out.chunks_mut(BLOCK_SIZE * CTR_BATCH) {
            let n = chunk.len().div_ceil(BLOCK_SIZE);
            let stream = &mut keystream[..n * BLOCK_SIZE];
            for block in stream.chunks_exact_mut(BLOCK_SIZE) {
                block.copy_from_slice(&Self::counter_block(nonce, ctr));
                ctr = ctr.wrapping_add(1);
            }
            self.cipher.encrypt_inplace(stream);

            chunk.iter_mut().zip(stream.iter()).for_each(|(z, k)| *z ^= *k);
        }
        keystream.zeroize();
    }

    // GHASH(aad, ciphertext, lengths) xor the tag mask.
    fn auth(
        &self,
        nonce: &[u8; NONCE_SIZE],
        ciphertext: &[u8],
        aad: Option<&[u8]>,
    ) -> [u8; TAG_SIZE] {
        let mut g = self.hasher.clone();
        g.reset();

        let aad = aad.unwrap_or_default();
        g.update(aad);
        g.update(ciphertext);
        g.update_u64x2(aad.len() as u64 * 8, ciphertext.len() as u64 * 8);

        let mut tag = [0u8; TAG_SIZE];
        g.sum(&mut tag);

        let mut mask = self.tag_mask(nonce);
        tag.iter_mut().zip(mask.iter()).for_each(|(t, m)| *t ^= *m);
        mask.zeroize();
        tag
    }

    fn verify(
        &self,
        nonce: &[u8; NONCE_SIZE],
        ciphertext: &[u8],
        aad: Option<&[u8]>,
        tag: &[u8],
    ) -> Result<()> {
        let mut expected = self.auth(nonce, ciphertext, aad);
        let ok = bool::from(expected[..].ct_eq(tag));
        expected.zeroize();
        if !ok {
            tracing::debug!(ciphertext_len = ciphertext.len(), "gcm authentication failed");
            return Err(Error::AuthenticationFailure);
        }
        Ok(())
    }
}

fn check_nonce(nonce: &[u8]) -> Result<&[u8; NONCE_SIZE]> {
    nonce.try_into().map_err(|_| {
        tracing::debug!(len = nonce.len(), "rejecting gcm nonce");
        Error::InvalidNonceLength(NONCE_SIZE, nonce.len())
    })
}

impl<B: Block> AEAD for GCM<B> {
    type Error = Error;

    fn nonce_size(&self) -> usize {
        NONCE_SIZE
    }

    fn overhead(&self) -> usize {
        TAG_SIZE
    }

    fn seal(
        &self,
        out: &mut [u8],
        nonce: &[u8],
        plaintext: &[u8],
        add: Option<&[u8]>,
    ) -> Result<()> {
        let nonce = check_nonce(nonce)?;
        let need = plaintext.len() + TAG_SIZE;
        if out.len() < need {
            return Err(Error::OutputTooSmall(need, out.len()));
        }

        let (ciphertext, rest) = out.split_at_mut(plaintext.len());
        ciphertext.copy_from_slice(plaintext);
        self.counter_crypt_inplace(nonce, ciphertext);
        rest[..TAG_SIZE].copy_from_slice(&self.auth(nonce, ciphertext, add));
        Ok(())
    }

    fn open(
        &self,
        out: &mut [u8],
        nonce: &[u8],
        ciphertext: &[u8],
        add: Option<&[u8]>,
    ) -> Result<usize> {
        let nonce = check_nonce(nonce)?;
        if ciphertext.len() < TAG_SIZE {
            return Err(Error::CiphertextTooShort(ciphertext.len(), TAG_SIZE));
        }

        let (ciphertext, tag) = ciphertext.split_at(ciphertext.len() - TAG_SIZE);
        if out.len() < ciphertext.len() {
            return Err(Error::OutputTooSmall(ciphertext.len(), out.len()));
        }

        self.verify(nonce, ciphertext, add, tag)?;

        let out = &mut out[..ciphertext.len()];
        out.copy_from_slice(ciphertext);
        self.counter_crypt_inplace(nonce, out);
        Ok(ciphertext.len())
    }

    fn seal_inplace(
        &self,
        in_out: &mut [u8],
        tag: &mut [u8],
        nonce: &[u8],
        add: Option<&[u8]>,
    ) -> Result<()> {
        let nonce = check_nonce(nonce)?;
        if tag.len() < TAG_SIZE {
            return Err(Error::OutputTooSmall(TAG_SIZE, tag.len()));
        }

        self.counter_crypt_inplace(nonce, in_out);
        tag[..TAG_SIZE].copy_from_slice(&self.auth(nonce, in_out, add));
        Ok(())
    }

    fn open_inplace(
        &self,
        in_out: &mut [u8],
        tag: &[u8],
        nonce: &[u8],
        add: Option<&[u8]>,
    ) -> Result<()> {
        let nonce = check_nonce(nonce)?;
        self.verify(nonce, in_out, add, tag)?;
        self.counter_crypt_inplace(nonce, in_out);
        Ok(())
    }
}

/// One-shot SM4-GCM encryption: expands `key`, encrypts `plaintext` and
/// authenticates it together with `aad`.
pub fn gcm_encrypt(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_SIZE])> {
    new_sm4_gcm(key)?.encrypt(nonce, aad, plaintext)
}

/// One-shot SM4-GCM decryption. Returns [`Error::AuthenticationFailure`]
/// without decrypting anything when the tag does not match.
pub fn gcm_decrypt(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>> {
    new_sm4_gcm(key)?.decrypt(nonce, aad, ciphertext, tag)
}

// A fresh nonce. Never reuse one under the same key.
pub fn random_nonce<R: CryptoRng + ?Sized>(rng: &mut R) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce);
    nonce
}
