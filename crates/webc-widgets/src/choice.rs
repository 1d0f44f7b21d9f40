#![forbid(unsafe_code)]

//! Allow-listed enum properties.
//!
//! String-typed attributes such as `size="large"` are parsed against a fixed
//! list of values. Unknown input never fails: the property falls back to its
//! documented default and a warning names the offending value.

use tracing::warn;

/// An enum property with a fixed set of string values and a default.
pub trait Choice: Copy + Default + PartialEq + 'static {
    /// Property name used in warnings.
    const PROPERTY: &'static str;
    /// Every accepted value.
    const VALUES: &'static [Self];

    /// The attribute spelling of this value.
    fn as_str(self) -> &'static str;

    /// Exact-match parse against [`Self::VALUES`].
    fn parse(raw: &str) -> Option<Self> {
        Self::VALUES.iter().copied().find(|v| v.as_str() == raw)
    }

    /// Parse, substituting the default (with a warning) for unknown input.
    fn from_attr(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|| {
            let fallback = Self::default();
            warn!(
                property = Self::PROPERTY,
                value = raw,
                allowed = ?Self::allowed(),
                fallback = fallback.as_str(),
                "invalid property value, using default"
            );
            fallback
        })
    }

    /// The accepted spellings.
    fn allowed() -> Vec<&'static str> {
        Self::VALUES.iter().map(|v| v.as_str()).collect()
    }
}
