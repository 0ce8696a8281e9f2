//! Error taxonomy for the kernel.
//!
//! Every failure is fatal at the construction site; nothing is
//! recovered internally. Each variant carries the offending address or
//! value in string form so callers can surface it directly.

/// Errors produced by graph construction, chain emission, and the
/// portable record form.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CredGraphError {
    /// Bad caller-supplied parameters: negative or over-unit
    /// teleportation shares, or an unknown portable record type or
    /// version.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Bad graph input: a node under the reserved core prefix, or a
    /// non-finite or negative weight.
    #[error("invalid input: {0}")]
    Input(String),

    /// A construction invariant was violated: duplicate node or edge
    /// address, probability outside `[0, 1]`, out-transition mass
    /// outside tolerance, or zero total mint.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// An edge referenced an address with no corresponding node during
    /// chain emission.
    #[error("unknown address during emission: {0}")]
    Lookup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_detail() {
        let err = CredGraphError::Invariant("duplicate node address: a/b".to_string());
        assert!(err.to_string().contains("duplicate node address: a/b"));
        assert!(err.to_string().contains("invariant"));
    }
}
