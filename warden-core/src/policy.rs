//! Password strength rules
//!
//! A [`PasswordPolicy`] is plain data. Deployments that need a different
//! denylist or length build their own value and hand it to the services; nothing
//! here is global or mutable.

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{Error, error::ValidationError};

pub const DEFAULT_MIN_LENGTH: usize = 12;
pub const DEFAULT_MIN_CHARACTER_CLASSES: usize = 3;

const DEFAULT_DENYLIST: &[&str] = &[
    "password",
    "password1",
    "password12",
    "password123",
    "password1234",
    "passw0rd",
    "123456",
    "12345678",
    "123456789",
    "1234567890",
    "123456789012",
    "qwerty",
    "qwerty123",
    "qwertyuiop",
    "qwertyuiop12",
    "letmein",
    "letmein12345",
    "welcome",
    "welcome12345",
    "admin",
    "administrator",
    "changeme",
    "changeme1234",
    "iloveyou",
    "monkey",
    "dragon",
    "football",
    "baseball",
    "sunshine",
    "princess",
    "trustno1",
    "abc123",
    "111111",
    "000000",
    "p@ssw0rd",
    "p@ssw0rd1234",
    "passwordpassword",
    "correcthorsebatterystaple",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    TooShort {
        min_length: usize,
        actual_length: usize,
    },
    InsufficientCharacterClasses {
        required: usize,
        found: usize,
    },
    Denylisted,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyViolation::TooShort { min_length, .. } => {
                write!(f, "must be at least {min_length} characters long")
            }
            PolicyViolation::InsufficientCharacterClasses { required, found } => write!(
                f,
                "must mix at least {required} of lowercase, uppercase, digits and symbols (found {found})"
            ),
            PolicyViolation::Denylisted => f.write_str("is too common"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub min_character_classes: usize,
    /// Stored lowercased; matched case-insensitively.
    pub denylist: HashSet<String>,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            min_character_classes: DEFAULT_MIN_CHARACTER_CLASSES,
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PasswordPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn with_min_character_classes(mut self, classes: usize) -> Self {
        self.min_character_classes = classes.min(4);
        self
    }

    /// Replace the denylist entirely.
    pub fn with_denylist<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.denylist = entries
            .into_iter()
            .map(|s| s.as_ref().to_lowercase())
            .collect();
        self
    }

    /// Add entries to the current denylist.
    pub fn deny<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.denylist
            .extend(entries.into_iter().map(|s| s.as_ref().to_lowercase()));
        self
    }

    /// Every rule the candidate breaks, in rule order. Empty means it passes.
    pub fn violations(&self, candidate: &str) -> Vec<PolicyViolation> {
        let mut violations = Vec::new();

        let length = candidate.chars().count();
        if length < self.min_length {
            violations.push(PolicyViolation::TooShort {
                min_length: self.min_length,
                actual_length: length,
            });
        }

        let found = character_classes(candidate);
        if found < self.min_character_classes {
            violations.push(PolicyViolation::InsufficientCharacterClasses {
                required: self.min_character_classes,
                found,
            });
        }

        if self.denylist.contains(&candidate.to_lowercase()) {
            violations.push(PolicyViolation::Denylisted);
        }

        violations
    }

    pub fn validate(&self, candidate: &str) -> Result<(), Error> {
        let violations = self.violations(candidate);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::WeakPassword(violations).into())
        }
    }
}

fn character_classes(candidate: &str) -> usize {
    let lower = candidate.chars().any(char::is_lowercase);
    let upper = candidate.chars().any(char::is_uppercase);
    let digit = candidate.chars().any(|c| c.is_ascii_digit());
    let symbol = candidate.chars().any(|c| !c.is_alphanumeric());

    [lower, upper, digit, symbol].into_iter().filter(|&b| b).count()
}
