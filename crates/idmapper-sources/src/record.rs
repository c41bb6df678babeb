//! Wire record shared by the sources and the HTTP API.

use serde::{Deserialize, Serialize};

/// One `{"id": "...", "name": "..."}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdName {
    pub id: String,
    pub name: String,
}

impl IdName {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl From<IdName> for (String, String) {
    fn from(record: IdName) -> Self {
        (record.id, record.name)
    }
}
