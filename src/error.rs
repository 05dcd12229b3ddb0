#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("invalid key size, want {}, got {}", .0, .1)]
    InvalidKeyLength(usize, usize),

    #[error("invalid nonce size, want {}, got {}", .0, .1)]
    InvalidNonceLength(usize, usize),

    #[error("invalid iv size, want {}, got {}", .0, .1)]
    InvalidIvLength(usize, usize),

    #[error("unsupported block size {} for this mode", .0)]
    UnsupportedBlockSize(usize),

    #[error("input length ({}) is not a multiple of the block size", .0)]
    MisalignedBlockLength(usize),

    // No payload: nothing about the mismatch is reported.
    #[error("GCM authentication failed while decrypting")]
    AuthenticationFailure,

    #[error("GCM ciphertext's length ({}) is shorter than tag size({})", .0, .1)]
    CiphertextTooShort(usize, usize),

    #[error("output too small, want: {}, got: {}", .0, .1)]
    OutputTooSmall(usize, usize),
}

pub type Result<T> = core::result::Result<T, Error>;
