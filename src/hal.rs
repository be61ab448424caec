//! Hypermedia (HAL) envelope parsing.
//!
//! # Overview
//!
//! The dupfind service wraps every response in a HAL-style envelope: plain
//! attributes at the top level, related resources under `_embedded`, and
//! navigation links under `_links`. This module turns such envelopes into
//! typed [`Resource`] values:
//! - `attributes` holds every envelope field except the two reserved keys
//! - `embedded` maps a relation name to one resource or an ordered sequence
//! - `links` maps a relation name to its literal `href`
//!
//! Parsing is all-or-nothing: a malformed envelope yields a [`ParseError`]
//! and the caller never sees a partially built resource.
//!
//! # Link Resolution
//!
//! Hrefs are stored exactly as served. RFC 6570 template expansion is not
//! supported: resolving a templated href (one containing `{` or `}`) fails
//! with [`ParseError::TemplatedLink`] instead of substituting blindly.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//!
//! let envelope = json!({
//!     "hash": "abc123",
//!     "_embedded": {"files": [{"fullname": "a.jpg"}]},
//!     "_links": {"self": {"href": "/clusters/1"}},
//! });
//!
//! let resource = dupweb::hal::parse(&envelope).unwrap();
//! assert_eq!(resource.attr_str("hash"), Some("abc123"));
//! assert_eq!(resource.embedded_seq("files").len(), 1);
//! assert_eq!(resource.link_href("self").unwrap(), "/clusters/1");
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::transport::{Transport, TransportError};

/// Reserved envelope key for embedded resources.
const EMBEDDED_KEY: &str = "_embedded";
/// Reserved envelope key for navigation links.
const LINKS_KEY: &str = "_links";
/// Relation name that binds a resource to its own URL.
pub const SELF_REL: &str = "self";

/// Error type for envelope parsing and link resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The envelope itself is not a JSON object.
    #[error("hypermedia envelope is not a JSON object")]
    NotAnObject,

    /// The `_embedded` value is present but not a JSON object.
    #[error("'_embedded' is not a JSON object")]
    MalformedEmbedded,

    /// The `_links` value is present but not a JSON object.
    #[error("'_links' is not a JSON object")]
    MalformedLinks,

    /// A link entry carries no usable string `href`.
    #[error("link '{rel}' has no usable href")]
    MalformedLink { rel: String },

    /// A link was requested that the resource does not carry.
    #[error("resource has no '{rel}' link")]
    MissingLink { rel: String },

    /// A templated href was used where a literal target is required.
    #[error("link '{rel}' is templated ('{href}') and cannot be resolved literally")]
    TemplatedLink { rel: String, href: String },
}

/// A named navigation link with its literal target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    rel: String,
    href: String,
}

impl Link {
    /// Relation name this link was stored under.
    #[must_use]
    pub fn rel(&self) -> &str {
        &self.rel
    }

    /// The raw href exactly as served, templates included.
    #[must_use]
    pub fn href(&self) -> &str {
        &self.href
    }

    /// Check whether the href contains an RFC 6570 template expression.
    #[must_use]
    pub fn is_templated(&self) -> bool {
        self.href.contains(['{', '}'])
    }

    /// Resolve the link to a request target.
    ///
    /// # Errors
    ///
    /// Returns `TemplatedLink` for templated hrefs; template expansion is
    /// an unsupported, documented limitation.
    pub fn resolve(&self) -> Result<&str, ParseError> {
        if self.is_templated() {
            return Err(ParseError::TemplatedLink {
                rel: self.rel.clone(),
                href: self.href.clone(),
            });
        }
        Ok(&self.href)
    }
}

/// Resources stored under one `_embedded` relation.
///
/// The envelope distinguishes a single embedded object from a collection;
/// both forms are preserved so callers can tell them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedded {
    /// The relation held a single JSON object.
    One(Resource),
    /// The relation held a JSON array, parsed in order.
    Many(Vec<Resource>),
}

impl Embedded {
    /// View the embedded resources as an ordered slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Resource] {
        match self {
            Self::One(resource) => std::slice::from_ref(resource),
            Self::Many(resources) => resources,
        }
    }

    /// Number of embedded resources under this relation.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(resources) => resources.len(),
        }
    }

    /// Check whether the relation holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the relation, yielding its resources in order.
    #[must_use]
    pub fn into_resources(self) -> Vec<Resource> {
        match self {
            Self::One(resource) => vec![resource],
            Self::Many(resources) => resources,
        }
    }
}

/// A parsed hypermedia resource.
///
/// Invariant: `attributes` never contains the `_embedded` or `_links`
/// keys; both are stripped during parsing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resource {
    attributes: Map<String, Value>,
    embedded: Vec<(String, Embedded)>,
    links: Vec<(String, Link)>,
}

impl Resource {
    /// All plain attributes of the resource.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Look up a single attribute.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Look up an attribute as a string.
    #[must_use]
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attr(key).and_then(Value::as_str)
    }

    /// Look up an attribute as an unsigned integer.
    #[must_use]
    pub fn attr_u64(&self, key: &str) -> Option<u64> {
        self.attr(key).and_then(Value::as_u64)
    }

    /// Embedded resources under a relation, if present.
    #[must_use]
    pub fn embedded(&self, rel: &str) -> Option<&Embedded> {
        self.embedded
            .iter()
            .find(|(name, _)| name == rel)
            .map(|(_, embedded)| embedded)
    }

    /// Embedded resources under a relation as a slice, empty when absent.
    #[must_use]
    pub fn embedded_seq(&self, rel: &str) -> &[Resource] {
        self.embedded(rel).map_or(&[], Embedded::as_slice)
    }

    /// Remove and return the embedded resources under a relation.
    pub fn take_embedded(&mut self, rel: &str) -> Option<Embedded> {
        let index = self.embedded.iter().position(|(name, _)| name == rel)?;
        Some(self.embedded.remove(index).1)
    }

    /// Look up a navigation link by relation name.
    #[must_use]
    pub fn link(&self, rel: &str) -> Option<&Link> {
        self.links
            .iter()
            .find(|(name, _)| name == rel)
            .map(|(_, link)| link)
    }

    /// Check whether a relation is present in `_links`.
    #[must_use]
    pub fn has_link(&self, rel: &str) -> bool {
        self.link(rel).is_some()
    }

    /// Resolve a link to its literal target.
    ///
    /// # Errors
    ///
    /// Returns `MissingLink` when the relation is absent and
    /// `TemplatedLink` when the href carries a template expression.
    pub fn link_href(&self, rel: &str) -> Result<&str, ParseError> {
        let link = self.link(rel).ok_or_else(|| ParseError::MissingLink {
            rel: rel.to_string(),
        })?;
        link.resolve()
    }

    /// The resource's `self` link, if served.
    #[must_use]
    pub fn self_link(&self) -> Option<&Link> {
        self.link(SELF_REL)
    }

    /// Bind the remote actions to this resource's `self` link.
    ///
    /// Resources served without a `self` link simply have no actions;
    /// that is not an error.
    #[must_use]
    pub fn actions(&self, transport: &Arc<dyn Transport>) -> Option<RemoteActions> {
        self.self_link().map(|link| RemoteActions {
            link: link.clone(),
            transport: Arc::clone(transport),
        })
    }
}

/// Parse a raw JSON envelope into a [`Resource`].
///
/// Recursion through `_embedded` is unbounded: clusters embed files, and
/// files could in principle embed further resources.
///
/// # Errors
///
/// Returns a [`ParseError`] when the envelope, `_embedded`, `_links`, or
/// any link entry is malformed. No partially constructed resource escapes.
pub fn parse(envelope: &Value) -> Result<Resource, ParseError> {
    let object = envelope.as_object().ok_or(ParseError::NotAnObject)?;

    let mut attributes = Map::new();
    for (key, value) in object {
        if key != EMBEDDED_KEY && key != LINKS_KEY {
            attributes.insert(key.clone(), value.clone());
        }
    }

    let mut embedded = Vec::new();
    if let Some(raw) = object.get(EMBEDDED_KEY) {
        let entries = raw.as_object().ok_or(ParseError::MalformedEmbedded)?;
        for (rel, value) in entries {
            let parsed = match value {
                Value::Array(items) => {
                    let mut resources = Vec::with_capacity(items.len());
                    for item in items {
                        resources.push(parse(item)?);
                    }
                    Embedded::Many(resources)
                }
                single => Embedded::One(parse(single)?),
            };
            embedded.push((rel.clone(), parsed));
        }
    }

    let mut links = Vec::new();
    if let Some(raw) = object.get(LINKS_KEY) {
        let entries = raw.as_object().ok_or(ParseError::MalformedLinks)?;
        for (rel, value) in entries {
            let href = value
                .get("href")
                .and_then(Value::as_str)
                .ok_or_else(|| ParseError::MalformedLink { rel: rel.clone() })?;
            links.push((
                rel.clone(),
                Link {
                    rel: rel.clone(),
                    href: href.to_string(),
                },
            ));
        }
    }

    Ok(Resource {
        attributes,
        embedded,
        links,
    })
}

/// Error type for remote actions bound to a resource.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The action target could not be resolved from the `self` link.
    #[error("cannot resolve action target: {0}")]
    Link(#[from] ParseError),

    /// The transport reported a failure for the issued request.
    #[error("remote action failed: {0}")]
    Transport(#[from] TransportError),
}

/// The four remote actions a `self`-linked resource exposes.
///
/// Actions are thin forwarders to the [`Transport`] collaborator. The
/// `self` href is resolved when an action is attempted, so a templated
/// link fails loudly at the call site rather than at bind time.
#[derive(Clone)]
pub struct RemoteActions {
    link: Link,
    transport: Arc<dyn Transport>,
}

impl RemoteActions {
    /// The bound link, for diagnostics.
    #[must_use]
    pub fn link(&self) -> &Link {
        &self.link
    }

    /// Fetch the resource's current representation.
    ///
    /// # Errors
    ///
    /// Returns an error when the link is templated or the request fails.
    pub async fn get(&self) -> Result<Value, ActionError> {
        let href = self.link.resolve()?;
        Ok(self.transport.get(href, &[]).await?)
    }

    /// Fetch the resource with query parameters.
    ///
    /// # Errors
    ///
    /// Returns an error when the link is templated or the request fails.
    pub async fn query(&self, query: &[(&str, String)]) -> Result<Value, ActionError> {
        let href = self.link.resolve()?;
        Ok(self.transport.get(href, query).await?)
    }

    /// Store an updated representation of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error when the link is templated or the request fails.
    pub async fn save(&self, body: &Value) -> Result<Value, ActionError> {
        let href = self.link.resolve()?;
        Ok(self.transport.put(href, body).await?)
    }

    /// Delete the resource on the server.
    ///
    /// # Errors
    ///
    /// Returns an error when the link is templated or the request fails.
    pub async fn delete(&self) -> Result<Value, ActionError> {
        let href = self.link.resolve()?;
        Ok(self.transport.delete(href).await?)
    }
}

impl std::fmt::Debug for RemoteActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteActions")
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}
