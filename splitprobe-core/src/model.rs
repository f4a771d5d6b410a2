//! Origin identities, variant bindings and simulated actors

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A mock origin: logical name plus the port it listens on
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OriginIdentity {
    name: String,
    port: u16,
}

impl OriginIdentity {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for OriginIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (port {})", self.name, self.port)
    }
}

/// Identifies one variant of one test
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantKey {
    pub test: String,
    pub variant: String,
}

impl VariantKey {
    pub fn new(test: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            variant: variant.into(),
        }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.test, self.variant)
    }
}

/// A variant as declared by the scenario author, with the origins serving it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantBinding {
    pub test_name: String,
    pub subpath: String,
    pub variant_name: String,
    pub weight: u32,
    pub origins: Vec<OriginIdentity>,
}

impl VariantBinding {
    pub fn key(&self) -> VariantKey {
        VariantKey::new(&self.test_name, &self.variant_name)
    }

    pub fn has_origin(&self, name: &str) -> bool {
        self.origins.iter().any(|o| o.name() == name)
    }
}

/// Who issued a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ActorId {
    /// A request with no carried session state
    Anonymous,
    /// A persistent user owning a cookie jar
    User(Uuid),
}

impl ActorId {
    pub fn new_user() -> Self {
        ActorId::User(Uuid::new_v4())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorId::Anonymous => f.write_str("anonymous"),
            ActorId::User(id) => write!(f, "user-{}", &id.simple().to_string()[..8]),
        }
    }
}
