use crate::sm4;

pub trait Block {
    fn block_size(&self) -> usize;

    // Encrypt as many blocks as possible from src to dst.
    // More precisely, encrypt min(dst.len()/BLOCK_SIZE, src.len()/BLOCK_SIZE) blocks.
    // Returns the number of bytes encrypted.
    fn encrypt(&self, dst: &mut [u8], src: &[u8]) -> usize;
    fn decrypt(&self, dst: &mut [u8], src: &[u8]) -> usize;

    fn encrypt_inplace(&self, in_out: &mut [u8]) -> usize;
    fn decrypt_inplace(&self, in_out: &mut [u8]) -> usize;
}

impl Block for sm4::Cipher {
    fn encrypt(&self, dst: &mut [u8], src: &[u8]) -> usize {
        sm4::Cipher::encrypt(self, dst, src)
    }

    fn decrypt(&self, dst: &mut [u8], src: &[u8]) -> usize {
        sm4::Cipher::decrypt(self, dst, src)
    }

    fn encrypt_inplace(&self, in_out: &mut [u8]) -> usize {
        sm4::Cipher::encrypt_inplace(self, in_out)
    }

    fn decrypt_inplace(&self, in_out: &mut [u8]) -> usize {
        sm4::Cipher::decrypt_inplace(self, in_out)
    }

    fn block_size(&self) -> usize {
        sm4::BLOCK_SIZE
    }
}

/// Authenticated encryption with associated data.
///
/// `open` and `open_inplace` verify the tag before anything is decrypted:
/// on failure `out` is left untouched and `in_out` still holds the
/// ciphertext.
pub trait AEAD {
    type Error;

    // NonceSize returns the size of the nonce that must be passed to Seal
    // and Open.
    fn nonce_size(&self) -> usize;

    // Overhead returns the maximum difference between the lengths of a
    // plaintext and its ciphertext.
    fn overhead(&self) -> usize;

    // out receives ciphertext || tag and must hold plaintext.len() + overhead() bytes.
    fn seal(
        &self,
        out: &mut [u8],
        nonce: &[u8],
        plaintext: &[u8],
        add: Option<&[u8]>,
    ) -> Result<(), Self::Error>;

    // ciphertext is ciphertext || tag. Returns the plaintext length written to out.
    fn open(
        &self,
        out: &mut [u8],
        nonce: &[u8],
        ciphertext: &[u8],
        add: Option<&[u8]>,
    ) -> Result<usize, Self::Error>;

    fn seal_inplace(
        &self,
        in_out: &mut [u8],
        tag: &mut [u8],
        nonce: &[u8],
        add: Option<&[u8]>,
    ) -> Result<(), Self::Error>;

    fn open_inplace(
        &self,
        in_out: &mut [u8],
        tag: &[u8],
        nonce: &[u8],
        add: Option<&[u8]>,
    ) -> Result<(), Self::Error>;
}
