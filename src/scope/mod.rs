//! Scope resolution
//!
//! Turns conversation and namespace hints into the ordered scope keys used
//! for storage reads and writes. Transport bindings extract the raw hints;
//! everything here works on plain strings.


pub(crate) mod registry;

use itertools::Itertools;

/// Namespace used when no namespace hint is supplied
pub const DEFAULT_NAMESPACE: &str = "guest";

/// Prefix of conversation scope keys
pub const CONVERSATION_PREFIX: &str = "conv::";

/// Header carrying the namespace hint
pub const NAMESPACE_HEADER: &str = "X-Doc-NS";

/// Candidate values for one hint, in precedence order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HintSources<'a> {
    /// Explicit structured field (request body parameter)
    pub field: Option<&'a str>,
    /// Query parameter
    pub query: Option<&'a str>,
    /// Request header
    pub header: Option<&'a str>,
}

impl<'a> HintSources<'a> {
    /// Pick the first non-blank candidate: field, then query, then header
    #[inline]
    pub fn pick(&self) -> Option<&'a str> {
        [self.field, self.query, self.header]
            .into_iter()
            .flatten()
            .find(|value| !value.trim().is_empty())
    }
}

/// Resolved scope hints for a single call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeResolver {
    conversation: Option<String>,
    namespace: String,
}

impl ScopeResolver {
    #[inline]
    pub fn new(conversation: Option<&str>, namespace: Option<&str>) -> Self {
        let conversation = conversation
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Self {
            conversation,
            namespace: normalize_namespace(namespace),
        }
    }

    /// Build a resolver from hint candidates, honoring field > query > header
    #[inline]
    pub fn from_hints(conversation: HintSources<'_>, namespace: HintSources<'_>) -> Self {
        Self::new(conversation.pick(), namespace.pick())
    }

    /// The `conv::<id>` key, when a conversation id was supplied
    #[inline]
    pub fn conversation_scope(&self) -> Option<String> {
        self.conversation
            .as_deref()
            .map(|id| format!("{}{}", CONVERSATION_PREFIX, id))
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Scopes a write must target. Never empty.
    #[inline]
    pub fn resolve_write(&self) -> Vec<String> {
        let scopes = self.compose();
        if scopes.is_empty() {
            vec![DEFAULT_NAMESPACE.to_string()]
        } else {
            scopes
        }
    }

    /// Scopes a read consults, conversation scope first
    #[inline]
    pub fn resolve_read(&self) -> Vec<String> {
        self.compose()
    }

    fn compose(&self) -> Vec<String> {
        self.conversation_scope()
            .into_iter()
            .chain(std::iter::once(self.namespace.clone()))
            .filter(|scope| !scope.is_empty())
            .unique()
            .collect()
    }
}

impl Default for ScopeResolver {
    #[inline]
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Trim and lower-case a namespace, falling back to [`DEFAULT_NAMESPACE`]
#[inline]
pub fn normalize_namespace(namespace: Option<&str>) -> String {
    let normalized = namespace.map(|ns| ns.trim().to_lowercase()).unwrap_or_default();
    if normalized.is_empty() {
        DEFAULT_NAMESPACE.to_string()
    } else {
        normalized
    }
}
