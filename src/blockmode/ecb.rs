use super::{check_aligned, Error, Result};
use crate::traits::Block;

// Every block on its own. No padding: the input must be block aligned.
pub struct EcbMode<B: Block> {
    pub block: B,
}

impl<B: Block> EcbMode<B> {
    pub fn new(block: B) -> Self {
        EcbMode { block }
    }

    pub fn encrypt(&self, dst: &mut [u8], src: &[u8]) -> Result<()> {
        check_aligned(src.len(), self.block.block_size())?;
        if dst.len() < src.len() {
            return Err(Error::OutputTooSmall(src.len(), dst.len()));
        }
        self.block.encrypt(dst, src);
        Ok(())
    }

    pub fn decrypt(&self, dst: &mut [u8], src: &[u8]) -> Result<()> {
        check_aligned(src.len(), self.block.block_size())?;
        if dst.len() < src.len() {
            return Err(Error::OutputTooSmall(src.len(), dst.len()));
        }
        self.block.decrypt(dst, src);
        Ok(())
    }

    pub fn encrypt_inplace(&self, in_out: &mut [u8]) -> Result<()> {
        check_aligned(in_out.len(), self.block.block_size())?;
        self.block.encrypt_inplace(in_out);
        Ok(())
    }

    pub fn decrypt_inplace(&self, in_out: &mut [u8]) -> Result<()> {
        check_aligned(in_out.len(), self.block.block_size())?;
        self.block.decrypt_inplace(in_out);
        Ok(())
    }
}
