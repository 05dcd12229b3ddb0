//! The SM4 block cipher (GB/T 32907-2016) and SM4-GCM authenticated
//! encryption.
//!
//! ```
//! use sm4_gcm::{gcm_decrypt, gcm_encrypt};
//!
//! let key = [0x42u8; 16];
//! let nonce = [0x24u8; 12];
//! let (ciphertext, tag) = gcm_encrypt(&key, &nonce, b"header", b"payload").unwrap();
//! let plain = gcm_decrypt(&key, &nonce, b"header", &ciphertext, &tag).unwrap();
//! assert_eq!(plain, b"payload");
//! ```

#![no_std]
#![warn(clippy::std_instead_of_alloc, clippy::std_instead_of_core)]

pub mod blockmode;
pub mod error;
pub mod sm4;
pub mod traits;

mod internal;

pub use blockmode::gcm::{gcm_decrypt, gcm_encrypt};
pub use error::{Error, Result};
pub use sm4::{decrypt_block, encrypt_block, key_expand};

#[allow(unused_imports)]
#[macro_use]
extern crate alloc;

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;
