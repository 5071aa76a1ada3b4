//! Error types for Canopy.
//!
//! Selection operations themselves never fail: ids that are not part of the
//! tree are skipped. The errors here cover the surfaces around the engine:
//! building a record tree, loading configuration and snapshotting state.

/// Result type alias for Canopy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Canopy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A record id was inserted twice.
    #[error("Duplicate record id {0}")]
    DuplicateRecord(String),

    /// A record refers to a parent that does not exist.
    #[error("Record {child} refers to unknown parent {parent}")]
    UnknownParent { child: String, parent: String },

    /// Parent links form a cycle, so the records are not a forest.
    #[error("Record {0} is its own ancestor")]
    Cycle(String),

    /// Configuration could not be parsed.
    #[error("Failed to parse selection config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized.
    #[error("Failed to serialize selection config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// A selection snapshot could not be encoded or decoded.
    #[error("Invalid selection snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl Error {
    /// Create a duplicate-record error from any debuggable id.
    pub fn duplicate_record(id: &impl std::fmt::Debug) -> Self {
        Self::DuplicateRecord(format!("{id:?}"))
    }

    /// Create an unknown-parent error.
    pub fn unknown_parent(child: &impl std::fmt::Debug, parent: &impl std::fmt::Debug) -> Self {
        Self::UnknownParent {
            child: format!("{child:?}"),
            parent: format!("{parent:?}"),
        }
    }

    /// Create a cycle error.
    pub fn cycle(id: &impl std::fmt::Debug) -> Self {
        Self::Cycle(format!("{id:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::duplicate_record(&7).to_string(),
            "Duplicate record id 7"
        );
        assert_eq!(
            Error::unknown_parent(&"leaf", &"ghost").to_string(),
            "Record \"leaf\" refers to unknown parent \"ghost\""
        );
        assert_eq!(Error::cycle(&3u64).to_string(), "Record 3 is its own ancestor");
    }

    #[test]
    fn test_config_error_conversion() {
        let parse_err = "mode = [".parse::<toml::Value>().unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::ConfigParse(_)));
        assert!(err.to_string().starts_with("Failed to parse selection config"));
    }
}
