use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies where a series came from, e.g. `kp_def` or `f107_45day`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(name: &str, tag: &str) -> Self {
        Self(format!("{name}_{tag}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Instrument name plus tag: the key the registry dispatches on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrumentId {
    pub name: String,
    pub tag: String,
}

impl InstrumentId {
    pub fn new(name: &str, tag: &str) -> Self {
        Self {
            name: name.to_string(),
            tag: tag.to_string(),
        }
    }

    pub fn source_id(&self) -> SourceId {
        SourceId::new(&self.name, &self.tag)
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_id_from_instrument() {
        let id = InstrumentId::new("kp", "def");
        assert_eq!(id.source_id(), SourceId::from("kp_def"));
        assert_eq!(id.to_string(), "kp:def");
    }
}
