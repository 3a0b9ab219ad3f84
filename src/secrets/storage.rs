//! In-memory holder for the webhook secret
//!
//! The secret bytes are zeroized on drop and never rendered by `Debug`.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secret string that zeros memory on drop and prevents accidental exposure
pub struct SecretString {
    data: Vec<u8>,
}

impl SecretString {
    pub fn new(data: String) -> Self {
        Self {
            data: data.into_bytes(),
        }
    }

    /// Expose the raw secret bytes (use with caution)
    pub fn expose(&self) -> &[u8] {
        &self.data
    }

    /// Get the length without exposing the data
    pub fn len(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretString([REDACTED {} bytes])", self.data.len())
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

impl ZeroizeOnDrop for SecretString {}
