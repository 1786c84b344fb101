//! Sub-resource request filtering
//!
//! Listing pages are parsed from their DOM only, so images, stylesheets and
//! fonts are never needed. The filter is a synchronous classifier consulted
//! by the navigation layer for every paused request.

use std::collections::HashSet;

/// Kind of an outgoing sub-resource request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    Xhr,
    Fetch,
    Other,
}

impl ResourceKind {
    /// Classify a DevTools protocol resource type name
    ///
    /// Unknown names map to [`ResourceKind::Other`].
    pub fn from_cdp(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "document" => Self::Document,
            "stylesheet" => Self::Stylesheet,
            "image" => Self::Image,
            "media" => Self::Media,
            "font" => Self::Font,
            "script" => Self::Script,
            "xhr" => Self::Xhr,
            "fetch" => Self::Fetch,
            _ => Self::Other,
        }
    }
}

/// Decision for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Allow,
    Block,
}

/// Per-context request policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFilter {
    blocked: HashSet<ResourceKind>,
}

impl Default for ResourceFilter {
    fn default() -> Self {
        Self::blocking([
            ResourceKind::Image,
            ResourceKind::Stylesheet,
            ResourceKind::Font,
        ])
    }
}

impl ResourceFilter {
    /// Block exactly the given kinds
    pub fn blocking(kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        Self {
            blocked: kinds.into_iter().collect(),
        }
    }

    /// Allow everything
    pub fn allow_all() -> Self {
        Self {
            blocked: HashSet::new(),
        }
    }

    /// Decide for a request; unclassified requests are allowed
    pub fn classify(&self, kind: Option<ResourceKind>) -> FilterDecision {
        match kind {
            Some(kind) if self.blocked.contains(&kind) => FilterDecision::Block,
            _ => FilterDecision::Allow,
        }
    }

    /// Decide for a request given its protocol resource type name
    pub fn classify_cdp(&self, name: &str) -> FilterDecision {
        self.classify(Some(ResourceKind::from_cdp(name)))
    }
}
