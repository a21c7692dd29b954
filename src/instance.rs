//! Application instance names as understood by the context daemon.
//!
//! An instance name is either a bare application name (`myapp`) or an
//! application name with an instance key (`myapp_default`). Invalid names
//! cannot be constructed, so the fetcher never has to re-check its input.

use std::fmt;

/// Shortest accepted application name.
pub const MIN_NAME_LEN: usize = 2;
/// Longest accepted application name.
pub const MAX_NAME_LEN: usize = 40;
/// Longest accepted instance key.
pub const MAX_KEY_LEN: usize = 10;

/// Reasons an instance name is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstanceNameError {
    /// The name is the empty string.
    #[error("instance name must not be empty")]
    Empty,
    /// The application part is shorter or longer than allowed.
    #[error(
        "application name {name:?} must be between {min} and {max} characters",
        min = MIN_NAME_LEN,
        max = MAX_NAME_LEN
    )]
    NameLength {
        /// The offending application name.
        name: String,
    },
    /// The application part contains something other than `[a-z0-9-]`.
    #[error("application name {name:?} contains invalid character {character:?}")]
    NameCharacter {
        /// The offending application name.
        name: String,
        /// First invalid character found.
        character: char,
    },
    /// The application part is only digits and hyphens.
    #[error("application name {name:?} must contain at least one letter")]
    NameWithoutLetter {
        /// The offending application name.
        name: String,
    },
    /// Leading, trailing, or doubled hyphen in the application part.
    #[error("application name {name:?} has a misplaced hyphen")]
    NameHyphen {
        /// The offending application name.
        name: String,
    },
    /// The instance key is empty, too long, or not `[a-z0-9]`.
    #[error(
        "instance key {key:?} must be 1 to {max} characters of [a-z0-9]",
        max = MAX_KEY_LEN
    )]
    InvalidKey {
        /// The offending instance key.
        key: String,
    },
}

/// A validated application instance name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceName(String);

impl InstanceName {
    /// Validate `raw` against the daemon's naming scheme.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceNameError`] describing the first rule `raw` breaks.
    pub fn parse(raw: &str) -> Result<Self, InstanceNameError> {
        if raw.is_empty() {
            return Err(InstanceNameError::Empty);
        }

        let (name, key) = match raw.split_once('_') {
            Some((name, key)) => (name, Some(key)),
            None => (raw, None),
        };

        validate_name(name)?;
        if let Some(key) = key {
            validate_key(key)?;
        }

        Ok(Self(raw.to_owned()))
    }

    /// Full instance name, including the key if present.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Application part of the name, without the instance key.
    pub fn app_name(&self) -> &str {
        self.0.split_once('_').map_or(self.0.as_str(), |(name, _)| name)
    }

    /// Instance key, if the name carries one.
    pub fn instance_key(&self) -> Option<&str> {
        self.0.split_once('_').map(|(_, key)| key)
    }
}

impl fmt::Display for InstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for InstanceName {
    type Err = InstanceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn validate_name(name: &str) -> Result<(), InstanceNameError> {
    let len = name.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(InstanceNameError::NameLength {
            name: name.to_owned(),
        });
    }

    if let Some(character) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(InstanceNameError::NameCharacter {
            name: name.to_owned(),
            character,
        });
    }

    if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
        return Err(InstanceNameError::NameHyphen {
            name: name.to_owned(),
        });
    }

    if !name.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(InstanceNameError::NameWithoutLetter {
            name: name.to_owned(),
        });
    }

    Ok(())
}

fn validate_key(key: &str) -> Result<(), InstanceNameError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(InstanceNameError::InvalidKey {
            key: key.to_owned(),
        })
    }
}
