//! Package references: `name/version[@user/channel][#revision]`.

use std::fmt;
use std::str::FromStr;

use graft_util::errors::GraftError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The identity of a package recipe.
///
/// Equality and hashing include the revision. Use [`PackageRef::version_eq`]
/// to compare while ignoring it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageRef {
    pub name: String,
    pub version: String,
    pub user: Option<String>,
    pub channel: Option<String>,
    pub revision: Option<String>,
}

impl PackageRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            user: None,
            channel: None,
            revision: None,
        }
    }

    pub fn with_user_channel(mut self, user: impl Into<String>, channel: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.channel = Some(channel.into());
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// Parse the text form of a reference.
    pub fn parse(text: &str) -> Result<Self, GraftError> {
        let invalid = |message: &str| GraftError::Reference {
            reference: text.to_string(),
            message: message.to_string(),
        };

        let text = text.trim();
        let (body, revision) = match text.split_once('#') {
            Some((_, "")) => return Err(invalid("empty revision after '#'")),
            Some((body, rev)) => (body, Some(rev.to_string())),
            None => (text, None),
        };

        let (name_version, user_channel) = match body.split_once('@') {
            Some((nv, uc)) => (nv, Some(uc)),
            None => (body, None),
        };

        let (name, version) = name_version
            .split_once('/')
            .ok_or_else(|| invalid("expected 'name/version'"))?;
        let name = name.trim();
        let version = version.trim();
        if name.is_empty() {
            return Err(invalid("package name is empty"));
        }
        if version.is_empty() {
            return Err(invalid("package version is empty"));
        }
        if name.contains(char::is_whitespace) {
            return Err(invalid("package name contains whitespace"));
        }

        let (user, channel) = match user_channel {
            Some(uc) => {
                let (user, channel) = uc
                    .split_once('/')
                    .ok_or_else(|| invalid("expected '@user/channel'"))?;
                if user.is_empty() || channel.is_empty() {
                    return Err(invalid("user and channel must both be set"));
                }
                (Some(user.to_string()), Some(channel.to_string()))
            }
            None => (None, None),
        };

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            user,
            channel,
            revision,
        })
    }

    /// A copy of this reference with the revision cleared.
    pub fn without_revision(&self) -> Self {
        Self {
            revision: None,
            ..self.clone()
        }
    }

    /// True when both references name the same recipe version, ignoring revisions.
    pub fn version_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.user == other.user
            && self.channel == other.channel
    }

    /// The version range expression when the version is written `[expr]`.
    pub fn range_expr(&self) -> Option<&str> {
        self.version
            .strip_prefix('[')
            .and_then(|v| v.strip_suffix(']'))
            .map(str::trim)
    }

    pub fn is_range(&self) -> bool {
        self.range_expr().is_some()
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)?;
        if let (Some(user), Some(channel)) = (&self.user, &self.channel) {
            write!(f, "@{user}/{channel}")?;
        }
        if let Some(rev) = &self.revision {
            write!(f, "#{rev}")?;
        }
        Ok(())
    }
}

impl FromStr for PackageRef {
    type Err = GraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PackageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
