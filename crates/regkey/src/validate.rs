//! Argument validation, applied before any store interaction.
//!
//! Lengths are measured in UTF-8 bytes plus one for a terminating null, so
//! an argument is accepted when `len + 1 <= max`.

use crate::error::{RegistryError, Result};

/// Reject `arg` if its encoded length exceeds `max`.
///
/// # Examples
///
/// ```
/// use regkey::validate::check_len;
///
/// assert!(check_len("Software", 16383).is_ok());
/// assert!(check_len("abcd", 4).is_err());
/// ```
pub fn check_len(arg: &str, max: usize) -> Result<()> {
    if arg.len() + 1 > max {
        return Err(RegistryError::invalid("Arguments too long"));
    }
    Ok(())
}

/// Check every argument of a call against `max`.
pub fn check_args(args: &[&str], max: usize) -> Result<()> {
    args.iter().try_for_each(|arg| check_len(arg, max))
}
