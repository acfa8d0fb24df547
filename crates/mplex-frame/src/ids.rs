//! Message IDs.
//!
//! IDs 0-126 are available to applications.
//! ID 127 is reserved for the End-Of-Group frame.

use crate::header::END_OF_GROUP_ID;

/// End-Of-Group sentinel.
pub const END_OF_GROUP: u8 = END_OF_GROUP_ID;

/// Largest ID a data frame may carry.
pub const MAX_USER_ID: u8 = END_OF_GROUP - 1;

/// Returns a human-readable name for a message ID.
pub fn id_name(id: u8) -> &'static str {
    match id {
        END_OF_GROUP => "END_OF_GROUP",
        0..=MAX_USER_ID => "USER",
        _ => "INVALID",
    }
}

/// Returns true if the ID cannot be used by a data frame.
pub fn is_reserved(id: u8) -> bool {
    id > MAX_USER_ID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(id_name(0), "USER");
        assert_eq!(id_name(126), "USER");
        assert_eq!(id_name(127), "END_OF_GROUP");
        assert_eq!(id_name(200), "INVALID");
    }

    #[test]
    fn reserved_range() {
        assert!(!is_reserved(0));
        assert!(!is_reserved(MAX_USER_ID));
        assert!(is_reserved(END_OF_GROUP));
        assert!(is_reserved(u8::MAX));
    }
}
