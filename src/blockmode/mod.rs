pub mod cbc;
pub mod ecb;
pub mod gcm;

pub use crate::error::{Error, Result};

// input length must be a whole number of blocks.
#[inline]
fn check_aligned(len: usize, block_size: usize) -> Result<()> {
    if len % block_size != 0 {
        tracing::debug!(len, block_size, "rejecting misaligned input");
        return Err(Error::MisalignedBlockLength(len));
    }
    Ok(())
}
