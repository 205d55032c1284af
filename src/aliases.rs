//! Contributor identity aliases.
//!
//! People commit under several emails and go by different handles on chat and
//! code-hosting platforms. The alias map lists each person once:
//!
//! ```yaml
//! - name: Jane Doe
//!   email: jane@example.org
//!   emails: [jdoe@old-employer.example]
//!   platforms:
//!     github: janedoe
//!     slack: "@jane"
//! ```
//!
//! Templates reach it through the `alias` filter.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Resolves a commit identity to a canonical identity or platform handle.
pub trait AliasResolver: Send + Sync {
    /// Canonical `Name <email>` identity for the person, if known.
    fn resolve(&self, name: &str, email: &str) -> Option<String>;

    /// The person's handle on `platform`, if known.
    fn alias(&self, name: &str, email: &str, platform: &str) -> Option<String>;
}

/// One person in the alias map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: String,
    /// Other emails this person has committed under
    #[serde(default)]
    pub emails: Vec<String>,
    /// Platform name to handle
    #[serde(default)]
    pub platforms: BTreeMap<String, String>,
}

impl Person {
    fn has_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
            || self.emails.iter().any(|known| known.eq_ignore_ascii_case(email))
    }

    /// `Name <email>` with the canonical email.
    pub fn identity(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}

/// YAML-backed alias map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasMap {
    people: Vec<Person>,
}

impl AliasMap {
    pub fn new(people: Vec<Person>) -> Self {
        Self {
            people,
        }
    }

    /// Load an alias map from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read alias map: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse alias map: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Find a person by email (case-insensitive), falling back to exact name.
    pub fn find(&self, name: &str, email: &str) -> Option<&Person> {
        self.people
            .iter()
            .find(|person| person.has_email(email))
            .or_else(|| self.people.iter().find(|person| person.name == name))
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }
}

impl AliasResolver for AliasMap {
    fn resolve(&self, name: &str, email: &str) -> Option<String> {
        self.find(name, email).map(Person::identity)
    }

    fn alias(&self, name: &str, email: &str, platform: &str) -> Option<String> {
        self.find(name, email)?.platforms.get(platform).cloned()
    }
}
