//! Canonical lookup keys for mounted contexts
//!
//! A [`PathKey`] is the path component of a URI with the scheme, authority,
//! query and fragment stripped, always starting and ending with `/`.
//! The trailing slash makes plain string prefixes line up with path
//! segments: `/a/` is a prefix of `/a/b/` but not of `/ab/`.

use std::borrow::Borrow;
use std::fmt;

use url::Url;

/// Normalized, slash-delimited key for a mount root or a requested path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathKey(String);

/// A relative path was requested against a context key that does not
///  prefix the target key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("context key {context} is not a prefix of {target}")]
pub struct PathMismatch {
    pub context: PathKey,
    pub target: PathKey,
}

impl PathKey {
    /// The key of the namespace root, `/`
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Normalize any URI-like string into a key
    ///
    /// Strings that parse as absolute URLs contribute their path; anything
    /// else is resolved as a path below `file:///`. Both forms go through
    /// the same URL parser, so `/a b` and `file:///a b` share the key
    /// `/a%20b/`, dot segments collapse and `?query`/`#fragment` drop out.
    /// Total and idempotent: the output always starts with `/`, which never
    /// parses as an absolute URL.
    pub fn normalize(uri: &str) -> Self {
        if let Ok(url) = Url::parse(uri) {
            return Self::from_url(&url);
        }

        // a leading "." keeps `//x` from reading as an authority
        let relative = if uri.starts_with('/') {
            format!(".{uri}")
        } else {
            format!("./{uri}")
        };
        match Url::parse("file:///").and_then(|base| base.join(&relative)) {
            Ok(url) => Self::from_url(&url),
            Err(_) => {
                let path = uri.split(['?', '#']).next().unwrap_or_default();
                Self::from_path(path)
            }
        }
    }

    /// Build the key for an already parsed URL
    pub fn from_url(url: &Url) -> Self {
        Self::from_path(url.path())
    }

    fn from_path(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }

        let mut key = String::with_capacity(path.len() + 2);
        if !path.starts_with('/') {
            key.push('/');
        }
        key.push_str(path);
        if !key.ends_with('/') {
            key.push('/');
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Whether this key names `other` or one of its ancestors
    pub fn is_prefix_of(&self, other: &PathKey) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Number of path segments, zero for the root
    pub fn depth(&self) -> usize {
        self.0.matches('/').count() - 1
    }

    /// This key followed by every shorter ancestor key, ending with `/`
    ///
    /// Longest first, which is the order a longest-prefix lookup wants.
    pub fn ancestors(&self) -> impl Iterator<Item = &str> {
        self.0.rmatch_indices('/').map(move |(idx, _)| &self.0[..=idx])
    }
}

/// Strip `context_key` from the front of `uri_key`
///
/// The caller is expected to have matched `context_key` against `uri_key`
/// already; a key that is not a prefix is reported, never truncated.
pub fn relative_path<'a>(
    context_key: &PathKey,
    uri_key: &'a PathKey,
) -> Result<&'a str, PathMismatch> {
    uri_key
        .0
        .strip_prefix(context_key.as_str())
        .ok_or_else(|| PathMismatch {
            context: context_key.clone(),
            target: uri_key.clone(),
        })
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PathKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PathKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&Url> for PathKey {
    fn from(url: &Url) -> Self {
        Self::from_url(url)
    }
}
