//! Sink configuration: table location, credentials and write mode.
//!
//! All configuration is explicit and passed per call - there are no implicit
//! environment lookups inside the materializer, no global mutable state, and
//! fabricated credentials work fine for testing. [`Credentials::from_env`] is
//! a convenience for hosts that inject secrets through the process
//! environment, the way the upstream secret provider does.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::error::ConfigError;

/// A table's storage location as a URI-style string.
///
/// Examples: `s3://bucket/deltas/customer_order`, `/tmp/tables/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLocation {
    uri: String,
}

impl TableLocation {
    pub fn new(uri: impl Into<String>) -> Result<Self, ConfigError> {
        let uri = uri.into();
        if uri.trim().is_empty() {
            return Err(ConfigError::InvalidLocation {
                uri,
                reason: "location is empty".to_string(),
            });
        }
        Ok(Self { uri })
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// URI scheme, if the location has one (`s3`, `file`, ...)
    pub fn scheme(&self) -> Option<&str> {
        self.uri.split_once("://").map(|(scheme, _)| scheme)
    }

    /// Whether the location addresses an S3-compatible object store
    pub fn is_s3(&self) -> bool {
        matches!(self.scheme(), Some("s3") | Some("s3a"))
    }
}

impl fmt::Display for TableLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}

/// Access credentials for the backing object store.
///
/// Secret values are treated as opaque strings: the `Debug` implementation
/// redacts them and nothing in this crate logs them.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    region: String,
    /// Store-specific relaxation for object stores without atomic rename
    /// (plain S3 without a locking provider). Configurable per deployment.
    allow_unsafe_rename: bool,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
            allow_unsafe_rename: true,
        }
    }

    /// Credentials carrying no secrets at all, for local filesystem tables
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_allow_unsafe_rename(mut self, allow: bool) -> Self {
        self.allow_unsafe_rename = allow;
        self
    }

    /// Resolve credentials from the standard AWS environment variables.
    ///
    /// Requires `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
    /// `AWS_REGION`; `AWS_S3_ALLOW_UNSAFE_RENAME` is optional and defaults
    /// to `true`, matching the deployment this stage was built for.
    pub fn from_env() -> Result<Self, ConfigError> {
        let required = |name: &str| -> Result<String, ConfigError> {
            match std::env::var(name) {
                Ok(value) if !value.is_empty() => Ok(value),
                _ => Err(ConfigError::MissingEnv {
                    name: name.to_string(),
                }),
            }
        };

        let allow_unsafe_rename = std::env::var("AWS_S3_ALLOW_UNSAFE_RENAME")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);

        Ok(Self {
            access_key_id: required("AWS_ACCESS_KEY_ID")?,
            secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
            region: required("AWS_REGION")?,
            allow_unsafe_rename,
        })
    }

    /// Storage options in the form the delta store expects.
    ///
    /// Empty fields are omitted so local filesystem tables see no AWS
    /// configuration at all.
    pub fn storage_options(&self) -> HashMap<String, String> {
        let mut options = HashMap::new();
        if !self.access_key_id.is_empty() {
            options.insert("AWS_ACCESS_KEY_ID".to_string(), self.access_key_id.clone());
        }
        if !self.secret_access_key.is_empty() {
            options.insert(
                "AWS_SECRET_ACCESS_KEY".to_string(),
                self.secret_access_key.clone(),
            );
        }
        if !self.region.is_empty() {
            options.insert("AWS_REGION".to_string(), self.region.clone());
        }
        if self.allow_unsafe_rename {
            options.insert(
                "AWS_S3_ALLOW_UNSAFE_RENAME".to_string(),
                "true".to_string(),
            );
        }
        options
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &redact(&self.access_key_id))
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("region", &self.region)
            .field("allow_unsafe_rename", &self.allow_unsafe_rename)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

/// Write semantics for an already-existing table.
///
/// `Create` against an existing table cleanly upgrades to an append, which
/// is what makes retried create-writes idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Establish the table's initial existence and schema
    Create,
    /// Add rows after existing table content
    Append,
    /// Replace table content (whole-table replace; the datasets this stage
    /// serves have no natural primary key to upsert against)
    Update,
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(WriteMode::Create),
            "append" => Ok(WriteMode::Append),
            "update" => Ok(WriteMode::Update),
            other => Err(format!(
                "unknown write mode '{}', expected one of: create, append, update",
                other
            )),
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Create => write!(f, "create"),
            WriteMode::Append => write!(f, "append"),
            WriteMode::Update => write!(f, "update"),
        }
    }
}
