//! Index validation flavors
//!
//! Commands carry signed indexes so `-1` can mean "append". Two flavors exist:
//!
//! - **existing**: `0 <= i < n`, the index names an element that must exist
//! - **insertion**: `-1` or `0 <= i <= n`, the index names a gap
//!
//! Moves into existing slots use [`check_slot`]: `-1` or `0 <= i < n`.

use dash_core::{DashError, Result};

/// Validate an index referencing an existing element
pub fn check_existing(index: i64, len: usize, what: &str) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| {
            DashError::InvalidInput(format!(
                "{} index {} out of range (0..{})",
                what, index, len
            ))
        })
}

/// Validate an insertion point; `-1` resolves to `len`
pub fn check_insertion(index: i64, len: usize, what: &str) -> Result<usize> {
    if index == -1 {
        return Ok(len);
    }
    usize::try_from(index)
        .ok()
        .filter(|i| *i <= len)
        .ok_or_else(|| {
            DashError::InvalidInput(format!(
                "{} insertion index {} out of range (-1 or 0..={})",
                what, index, len
            ))
        })
}

/// Validate a move target among existing slots; `-1` resolves to `len - 1`
pub fn check_slot(index: i64, len: usize, what: &str) -> Result<usize> {
    if index == -1 && len > 0 {
        return Ok(len - 1);
    }
    check_existing(index, len, what)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_flavor() {
        assert_eq!(check_existing(0, 3, "item").unwrap(), 0);
        assert_eq!(check_existing(2, 3, "item").unwrap(), 2);
        assert!(check_existing(3, 3, "item").is_err());
        assert!(check_existing(-1, 3, "item").is_err());
        assert!(check_existing(0, 0, "item").is_err());
    }

    #[test]
    fn test_insertion_flavor() {
        assert_eq!(check_insertion(-1, 3, "item").unwrap(), 3);
        assert_eq!(check_insertion(3, 3, "item").unwrap(), 3);
        assert_eq!(check_insertion(0, 0, "item").unwrap(), 0);
        assert!(check_insertion(4, 3, "item").is_err());
        assert!(check_insertion(-2, 3, "item").is_err());
    }

    #[test]
    fn test_slot_flavor() {
        assert_eq!(check_slot(-1, 3, "tab").unwrap(), 2);
        assert_eq!(check_slot(1, 3, "tab").unwrap(), 1);
        assert!(check_slot(3, 3, "tab").is_err());
        assert!(check_slot(-1, 0, "tab").is_err());
    }

    #[test]
    fn test_errors_are_user_errors() {
        let err = check_existing(9, 1, "section").unwrap_err();
        assert_eq!(err.reason(), dash_core::FailureReason::UserError);
    }
}
