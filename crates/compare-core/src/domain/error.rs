//! Contract errors for the reconciliation domain.

/// Raised when input handed to the core is not a well-formed failure set.
///
/// These are programmer errors on the acquisition side; they are reported
/// immediately rather than coerced into something that looks valid.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("failure set must be a JSON array of strings, got {found}")]
    NotAnArray { found: String },

    #[error("failure set entry {index} is null")]
    NullEntry { index: usize },

    #[error("failure set entry {index} is not a string: {found}")]
    NonStringEntry { index: usize, found: String },
}

/// Result type for core domain operations.
pub type Result<T> = std::result::Result<T, ContractViolation>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_entry() {
        let err = ContractViolation::NonStringEntry {
            index: 3,
            found: "42".to_string(),
        };
        assert_eq!(err.to_string(), "failure set entry 3 is not a string: 42");

        let err = ContractViolation::NullEntry { index: 0 };
        assert!(err.to_string().contains("entry 0"));
    }
}
