//! Store key names for the three exchange collections

/// Key names under one namespace
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreKeys {
    participants: Box<str>,
    assignments: Box<str>,
    drawn: Box<str>,
}

impl StoreKeys {
    /// Build the key set for a namespace
    pub fn new(namespace: &str) -> Self {
        Self {
            participants: format!("{}:participants", namespace).into_boxed_str(),
            assignments: format!("{}:assignments", namespace).into_boxed_str(),
            drawn: format!("{}:drawn", namespace).into_boxed_str(),
        }
    }

    /// Participant registry key
    pub fn participants(&self) -> &str {
        &self.participants
    }

    /// Draw ledger key
    pub fn assignments(&self) -> &str {
        &self.assignments
    }

    /// Draw flag key
    pub fn drawn(&self) -> &str {
        &self.drawn
    }

    /// All three keys
    pub fn all(&self) -> [&str; 3] {
        [self.participants(), self.assignments(), self.drawn()]
    }
}
