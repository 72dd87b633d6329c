//! Blob address parsing
//!
//! Handles parsing of blob URLs in the format:
//! `blob://[identity:secret@]provider/container/key[/more][?id=instance]`
//!
//! The provider may also be given as the first path segment when the URL
//! has no host (`blob:provider/container/key` or `blob:///provider/container/key`).

use url::Url;

use crate::error::{Error, Result};

/// Syntax hint included in every parse error
pub const SYNTAX: &str = "blob://provider/container/blob?id=instance";

/// Inline credentials carried in the URL user-info
#[derive(Clone, PartialEq, Eq)]
pub struct InlineCredentials {
    pub identity: String,
    pub secret: String,
}

impl std::fmt::Debug for InlineCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineCredentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// User-info section of a blob URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInfo {
    /// `identity:secret`
    Credentials(InlineCredentials),
    /// Any other shape; only rejected when a backend has to be constructed from it
    Unusable,
}

/// A parsed blob URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobAddress {
    /// Provider or API identifier
    pub selector: String,
    /// Container (bucket) name
    pub container: String,
    /// Blob key, may contain `/`
    pub key: String,
    /// Specific registered instance to use
    pub instance_id: Option<String>,
    /// Inline credentials, if any
    pub user_info: Option<UserInfo>,
}

impl BlobAddress {
    /// Create an address without instance id or credentials
    pub fn new(
        selector: impl Into<String>,
        container: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            selector: selector.into(),
            container: container.into(),
            key: key.into(),
            instance_id: None,
            user_info: None,
        }
    }

    /// Inline credentials, when the user-info had the `identity:secret` shape
    pub fn credentials(&self) -> Option<&InlineCredentials> {
        match &self.user_info {
            Some(UserInfo::Credentials(creds)) => Some(creds),
            _ => None,
        }
    }

    /// `container/key`, as used in not-found and commit messages
    pub fn object_path(&self) -> String {
        format!("{}/{}", self.container, self.key)
    }
}

impl std::fmt::Display for BlobAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.selector, self.container, self.key)?;
        if let Some(id) = &self.instance_id {
            write!(f, "?id={id}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for BlobAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_address(s)
    }
}

/// Parse a blob URL into a [`BlobAddress`]
///
/// Fails with [`Error::MalformedAddress`] before any backend is contacted.
pub fn parse_address(raw: &str) -> Result<BlobAddress> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);

    let url = Url::parse(trimmed).map_err(|e| malformed(format!("{e}")))?;

    let path = url.path();
    if path.trim().is_empty() || path.trim() == "/" {
        return Err(malformed("container / blob cannot be empty"));
    }
    // Hierarchical URLs always start the path with '/', opaque ones never do.
    // Only that one separator is dropped so an empty container stays detectable.
    let path = path.strip_prefix('/').unwrap_or(path);

    let host = url.host_str().filter(|h| !h.trim().is_empty());
    let (selector, rest) = match host {
        Some(host) => (host.to_string(), path),
        None => match path.split_once('/') {
            Some((first, rest)) if !first.trim().is_empty() => (first.to_string(), rest),
            Some(_) => return Err(malformed("provider cannot be empty")),
            None => return Err(malformed("provider cannot be determined")),
        },
    };

    let (container, key) = rest
        .split_once('/')
        .ok_or_else(|| malformed("container / blob cannot be null or empty"))?;

    if container.is_empty() {
        return Err(malformed("container name cannot be empty"));
    }
    if key.is_empty() {
        return Err(malformed("blob key cannot be empty"));
    }

    let instance_id = url.query().and_then(instance_param);

    Ok(BlobAddress {
        selector,
        container: decode(container)?,
        key: decode(key)?,
        instance_id,
        user_info: parse_user_info(&url),
    })
}

/// `id` query parameter, taken exactly as written
fn instance_param(query: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| *name == "id")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn parse_user_info(url: &Url) -> Option<UserInfo> {
    let username = url.username();
    let password = url.password();
    if username.is_empty() && password.is_none() {
        return None;
    }

    let Some(password) = password else {
        return Some(UserInfo::Unusable);
    };

    match (urlencoding::decode(username), urlencoding::decode(password)) {
        (Ok(identity), Ok(secret))
            if !identity.is_empty() && !secret.is_empty() && !secret.contains(':') =>
        {
            Some(UserInfo::Credentials(InlineCredentials {
                identity: identity.into_owned(),
                secret: secret.into_owned(),
            }))
        }
        _ => Some(UserInfo::Unusable),
    }
}

fn decode(segment: &str) -> Result<String> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|e| malformed(format!("invalid percent-encoding in '{segment}': {e}")))
}

fn malformed(reason: impl std::fmt::Display) -> Error {
    Error::MalformedAddress(format!("{reason}. Syntax: {SYNTAX}"))
}
