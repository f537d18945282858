//! Secure random number generation.
//!
//! All randomness comes from the operating system CSPRNG.

use crate::PushError;

/// Fill a buffer with random bytes from the OS CSPRNG.
///
/// # Errors
///
/// Returns [`PushError::RandomFailed`] if the underlying OS CSPRNG fails.
pub fn fill_random(buf: &mut [u8]) -> Result<(), PushError> {
    getrandom::getrandom(buf).map_err(|_| PushError::RandomFailed)
}
