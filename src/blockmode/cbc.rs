use zeroize::Zeroize;

use super::{check_aligned, Error, Result};
use crate::traits::Block;

const MAX_BLOCK_SIZE: usize = 32;

// Blocks of up to MAX_BLOCK_SIZE bytes.
pub struct CbcMode<B: Block> {
    block_size: usize,
    block: B,
}

impl<B: Block> CbcMode<B> {
    pub fn new(block: B) -> Result<Self> {
        let block_size = block.block_size();
        if block_size == 0 || block_size > MAX_BLOCK_SIZE {
            tracing::debug!(block_size, "rejecting cbc block cipher");
            return Err(Error::UnsupportedBlockSize(block_size));
        }
        Ok(CbcMode { block_size, block })
    }

    fn check(&self, iv: &[u8], len: usize) -> Result<()> {
        if iv.len() != self.block_size {
            return Err(Error::InvalidIvLength(self.block_size, iv.len()));
        }
        check_aligned(len, self.block_size)
    }

    // C[i] = E(P[i] ^ C[i-1]), C[-1] = iv.
    pub fn encrypt_inplace(&self, iv: &[u8], in_out: &mut [u8]) -> Result<()> {
        self.check(iv, in_out.len())?;
        let block_size = self.block_size;

        let mut buf = [0u8; MAX_BLOCK_SIZE];
        let mut prev = [0u8; MAX_BLOCK_SIZE];
        prev[..block_size].copy_from_slice(iv);

        for chunk in in_out.chunks_exact_mut(block_size) {
            for i in 0..block_size {
                buf[i] = prev[i] ^ chunk[i];
            }
            self.block.encrypt(chunk, &buf[..block_size]);
            prev[..block_size].copy_from_slice(chunk);
        }
        buf.zeroize();
        Ok(())
    }

    // P[i] = D(C[i]) ^ C[i-1], C[-1] = iv.
    pub fn decrypt_inplace(&self, iv: &[u8], in_out: &mut [u8]) -> Result<()> {
        self.check(iv, in_out.len())?;
        let block_size = self.block_size;

        let mut prev = [0u8; MAX_BLOCK_SIZE];
        let mut plain = [0u8; MAX_BLOCK_SIZE];
        prev[..block_size].copy_from_slice(iv);

        for chunk in in_out.chunks_exact_mut(block_size) {
            self.block.decrypt(&mut plain[..block_size], chunk);
            for i in 0..block_size {
                plain[i] ^= prev[i];
            }
            prev[..block_size].copy_from_slice(chunk);
            chunk.copy_from_slice(&plain[..block_size]);
        }
        plain.zeroize();
        Ok(())
    }

    pub fn encrypt(&self, iv: &[u8], dst: &mut [u8], src: &[u8]) -> Result<()> {
        self.check(iv, src.len())?;
        if dst.len() < src.len() {
            return Err(Error::OutputTooSmall(src.len(), dst.len()));
        }
        let dst = &mut dst[..src.len()];
        dst.copy_from_slice(src);
        self.encrypt_inplace(iv, dst)
    }

    pub fn decrypt(&self, iv: &[u8], dst: &mut [u8], src: &[u8]) -> Result<()> {
        self.check(iv, src.len())?;
        if dst.len() < src.len() {
            return Err(Error::OutputTooSmall(src.len(), dst.len()));
        }
        let dst = &mut dst[..src.len()];
        dst.copy_from_slice(src);
        self.decrypt_inplace(iv, dst)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::sm4::Cipher;

    const KEY: [u8; 16] = hex!("D54B4C962526A7A6F873695DF032BF21");
    const IV: [u8; 16] = hex!("C5FBC0E3B1F7324E256A827F91CC0D3E");
    const PLAIN: [u8; 48] = hex!(
        "7B5BD9FDAE2521A3F0FBDD2F4427142F"
        "785C52080B0DB22523C3BC5D8716D141"
        "CE315586EBB3EDF4480193B1B3C33524"
    );
    const CIPHER: [u8; 48] = hex!(
        "B4C72E13618BB3BBD69C7BEB8B545B49"
        "C50B279D28D89958898DF22CA79CE347"
        "8B75E6AB0151C83BAEBBFCF0B3ED91EA"
    );

    #[test]
    fn test_cbc() {
        let mut plain = PLAIN;
        let cbc = CbcMode::new(Cipher::new(&KEY).unwrap()).unwrap();
        cbc.encrypt_inplace(&IV, &mut plain).unwrap();
        assert_eq!(plain, CIPHER);

        cbc.decrypt_inplace(&IV, &mut plain).unwrap();
        assert_eq!(plain, PLAIN);

        let mut out = [0u8; 64];
        cbc.encrypt(&IV, &mut out, &PLAIN).unwrap();
        assert_eq!(out[..48], CIPHER);
        assert_eq!(out[48..], [0u8; 16]);

        let mut back = [0u8; 48];
        cbc.decrypt(&IV, &mut back, &CIPHER).unwrap();
        assert_eq!(back, PLAIN);
    }

    #[test]
    fn test_cbc_bad_input() {
        let cbc = CbcMode::new(Cipher::new(&KEY).unwrap()).unwrap();
        let mut data = [0u8; 20];
        assert_eq!(cbc.encrypt_inplace(&IV, &mut data), Err(Error::MisalignedBlockLength(20)));
        assert_eq!(cbc.decrypt_inplace(&IV, &mut data), Err(Error::MisalignedBlockLength(20)));
        assert_eq!(data, [0u8; 20]);

        let mut data = [0u8; 32];
        assert_eq!(
            cbc.encrypt_inplace(&IV[..12], &mut data),
            Err(Error::InvalidIvLength(16, 12))
        );

        let mut short = [0u8; 16];
        assert_eq!(cbc.encrypt(&IV, &mut short, &PLAIN), Err(Error::OutputTooSmall(48, 16)));
    }

    // Passes blocks through unchanged, at any block size.
    struct Identity(usize);

    impl Block for Identity {
        fn block_size(&self) -> usize {
            self.0
        }
        fn encrypt(&self, dst: &mut [u8], src: &[u8]) -> usize {
            let n = dst.len().min(src.len()) / self.0 * self.0;
            dst[..n].copy_from_slice(&src[..n]);
            n
        }
        fn decrypt(&self, dst: &mut [u8], src: &[u8]) -> usize {
            self.encrypt(dst, src)
        }
        fn encrypt_inplace(&self, in_out: &mut [u8]) -> usize {
            in_out.len() / self.0 * self.0
        }
        fn decrypt_inplace(&self, in_out: &mut [u8]) -> usize {
            in_out.len() / self.0 * self.0
        }
    }

    #[test]
    fn test_cbc_block_size() {
        assert_eq!(CbcMode::new(Identity(0)).err(), Some(Error::UnsupportedBlockSize(0)));
        assert_eq!(CbcMode::new(Identity(64)).err(), Some(Error::UnsupportedBlockSize(64)));

        // the largest block still runs the chain: C0 = IV ^ P0, C1 = C0 ^ P1.
        let cbc = CbcMode::new(Identity(32)).unwrap();
        let iv = [0x0fu8; 32];
        let mut data = [0xf0u8; 64];
        cbc.encrypt_inplace(&iv, &mut data).unwrap();
        assert_eq!(data[..32], [0xffu8; 32]);
        assert_eq!(data[32..], [0x0fu8; 32]);

        cbc.decrypt_inplace(&iv, &mut data).unwrap();
        assert_eq!(data, [0xf0u8; 64]);
    }
}
