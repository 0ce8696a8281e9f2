//! Address algebra for the kernel.
//!
//! Nodes and edges are identified by opaque, ordered sequences of
//! string parts. The two families are distinct types, so a node
//! address and an edge address with identical parts never compare
//! equal or mix in a collection.
//!
//! Two string forms exist:
//!
//! - **raw**: parts joined by the NUL separator sentinel; reversible,
//!   used as map keys in the portable record form
//! - **display**: parts joined by `/`; diagnostics only
//!
//! Parts must be non-empty and NUL-free, which makes
//! parts → address → parts round-trips identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CredGraphError;

/// Separator sentinel of the raw string form.
const RAW_SEPARATOR: char = '\u{0}';

fn validate_parts(parts: &[String]) -> Result<(), CredGraphError> {
    for part in parts {
        if part.is_empty() {
            return Err(CredGraphError::Input(
                "address part is empty".to_string(),
            ));
        }
        if part.contains(RAW_SEPARATOR) {
            return Err(CredGraphError::Input(format!(
                "address part contains the separator sentinel: {:?}",
                part
            )));
        }
    }
    Ok(())
}

fn parts_from_raw(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(RAW_SEPARATOR).map(str::to_string).collect()
    }
}

/// Address of a node in the contribution graph or the Markov process
/// graph.
///
/// Ordered part-wise; the derived order is the canonical node order
/// used by the chain emitter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeAddress(Vec<String>);

/// Address of an edge in the contribution graph.
///
/// Disjoint from [`NodeAddress`]: the namespaces never mix even when
/// the underlying parts coincide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeAddress(Vec<String>);

macro_rules! address_impl {
    ($name:ident) => {
        impl $name {
            /// Compose an address from a sequence of parts.
            ///
            /// Parts must be non-empty and must not contain the
            /// separator sentinel.
            pub fn new<I, S>(parts: I) -> Result<Self, CredGraphError>
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
                validate_parts(&parts)?;
                Ok(Self(parts))
            }

            /// Compose from parts known to satisfy the part rules.
            pub(crate) fn new_unchecked(parts: Vec<String>) -> Self {
                debug_assert!(validate_parts(&parts).is_ok());
                Self(parts)
            }

            /// Append parts, yielding a longer address.
            pub fn append<I, S>(&self, parts: I) -> Result<Self, CredGraphError>
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                let mut combined = self.0.clone();
                combined.extend(parts.into_iter().map(Into::into));
                validate_parts(&combined)?;
                Ok(Self(combined))
            }

            /// Decompose into the underlying parts.
            pub fn parts(&self) -> &[String] {
                &self.0
            }

            /// Whether `prefix` is a (non-strict) prefix of this
            /// address. The empty address is a prefix of everything.
            pub fn has_prefix(&self, prefix: &Self) -> bool {
                self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
            }

            /// Reversible raw string form (NUL-separated parts).
            pub fn to_raw(&self) -> String {
                self.0.join("\u{0}")
            }

            /// Inverse of [`Self::to_raw`]. The payload is trusted;
            /// no part validation is performed.
            pub fn from_raw(raw: &str) -> Self {
                Self(parts_from_raw(raw))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.join("/"))
            }
        }
    };
}

address_impl!(NodeAddress);
address_impl!(EdgeAddress);

/// Direction tag distinguishing the two halves of a bidirectional
/// input edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Source to destination as the input edge is written (`F`).
    Forward,
    /// Destination back to source (`B`).
    Backward,
}

impl Direction {
    /// One-letter tag used in markov edge addresses.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Forward => "F",
            Self::Backward => "B",
        }
    }

    /// Parse a direction tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "F" => Some(Self::Forward),
            "B" => Some(Self::Backward),
            _ => None,
        }
    }

    /// The `reversed` flag carried by a markov edge in this direction.
    pub fn reversed(&self) -> bool {
        matches!(self, Self::Backward)
    }

    /// Direction from a markov edge's `reversed` flag.
    pub fn from_reversed(reversed: bool) -> Self {
        if reversed {
            Self::Backward
        } else {
            Self::Forward
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Primary key of an edge in the Markov process graph: a direction
/// tag prepended to the parts of the underlying edge address.
///
/// Parallel halves of one bidirectional input edge share the
/// underlying address and differ only in the tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkovEdgeAddress {
    direction: Direction,
    base: EdgeAddress,
}

impl MarkovEdgeAddress {
    /// Build a markov edge address from its direction and underlying
    /// edge address.
    pub fn new(direction: Direction, base: EdgeAddress) -> Self {
        Self { direction, base }
    }

    /// The direction tag.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The underlying edge address.
    pub fn base(&self) -> &EdgeAddress {
        &self.base
    }

    /// The full part sequence: tag first, then the underlying parts.
    pub fn parts(&self) -> Vec<String> {
        let mut parts = Vec::with_capacity(1 + self.base.parts().len());
        parts.push(self.direction.tag().to_string());
        parts.extend(self.base.parts().iter().cloned());
        parts
    }

    /// Reversible raw string form.
    pub fn to_raw(&self) -> String {
        if self.base.parts().is_empty() {
            self.direction.tag().to_string()
        } else {
            format!("{}\u{0}{}", self.direction.tag(), self.base.to_raw())
        }
    }

    /// Inverse of [`Self::to_raw`].
    pub fn from_raw(raw: &str) -> Result<Self, CredGraphError> {
        let (tag, rest) = match raw.split_once(RAW_SEPARATOR) {
            Some((tag, rest)) => (tag, rest),
            None => (raw, ""),
        };
        let direction = Direction::from_tag(tag).ok_or_else(|| {
            CredGraphError::Configuration(format!(
                "unknown direction tag in edge key: {:?}",
                tag
            ))
        })?;
        Ok(Self {
            direction,
            base: EdgeAddress::from_raw(rest),
        })
    }
}

impl fmt::Display for MarkovEdgeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.direction, self.base)
    }
}

// ─── Reserved prefixes ───────────────────────────────────────────────

/// Reserved prefix of all kernel-synthesized node addresses. Input
/// graph nodes under this prefix are rejected.
pub fn core_node_prefix() -> NodeAddress {
    NodeAddress::new_unchecked(vec!["sourcecred".to_string(), "core".to_string()])
}

/// Address of the unique seed node.
pub fn seed_address() -> NodeAddress {
    NodeAddress::new_unchecked(vec![
        "sourcecred".to_string(),
        "core".to_string(),
        "SEED".to_string(),
    ])
}

/// Prefix of every epoch node address.
pub fn epoch_node_prefix() -> NodeAddress {
    NodeAddress::new_unchecked(vec![
        "sourcecred".to_string(),
        "core".to_string(),
        "EPOCH".to_string(),
    ])
}

/// Prefix of payout edge addresses (epoch → owner).
pub fn epoch_payout_prefix() -> EdgeAddress {
    EdgeAddress::new_unchecked(vec![
        "sourcecred".to_string(),
        "core".to_string(),
        "fibration".to_string(),
        "EPOCH_PAYOUT".to_string(),
    ])
}

/// Prefix of webbing edge addresses (epoch ↔ adjacent epoch).
pub fn epoch_webbing_prefix() -> EdgeAddress {
    EdgeAddress::new_unchecked(vec![
        "sourcecred".to_string(),
        "core".to_string(),
        "fibration".to_string(),
        "EPOCH_WEBBING".to_string(),
    ])
}

/// Prefix of radiation edge addresses leaving epoch nodes.
pub fn epoch_radiation_prefix() -> EdgeAddress {
    EdgeAddress::new_unchecked(vec![
        "sourcecred".to_string(),
        "core".to_string(),
        "fibration".to_string(),
        "EPOCH_RADIATION".to_string(),
    ])
}

/// Prefix of radiation edge addresses leaving contribution nodes.
pub fn contribution_radiation_prefix() -> EdgeAddress {
    EdgeAddress::new_unchecked(vec![
        "sourcecred".to_string(),
        "core".to_string(),
        "CONTRIBUTION_RADIATION".to_string(),
    ])
}

/// Prefix of minting edge addresses (seed → node).
pub fn seed_mint_prefix() -> EdgeAddress {
    EdgeAddress::new_unchecked(vec![
        "sourcecred".to_string(),
        "core".to_string(),
        "SEED_MINT".to_string(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_round_trip() {
        let addr = NodeAddress::new(["plugin", "github", "user", "alice"]).unwrap();
        assert_eq!(
            addr.parts(),
            &["plugin", "github", "user", "alice"].map(String::from)
        );
        assert_eq!(NodeAddress::from_raw(&addr.to_raw()), addr);
    }

    #[test]
    fn test_empty_address_round_trip() {
        let addr = NodeAddress::new(Vec::<String>::new()).unwrap();
        assert!(addr.parts().is_empty());
        assert_eq!(NodeAddress::from_raw(&addr.to_raw()), addr);
    }

    #[test]
    fn test_part_validation() {
        assert!(NodeAddress::new(["ok", ""]).is_err());
        assert!(NodeAddress::new(["bad\u{0}part"]).is_err());
        assert!(EdgeAddress::new(["also\u{0}bad"]).is_err());
    }

    #[test]
    fn test_append() {
        let base = NodeAddress::new(["plugin", "github"]).unwrap();
        let full = base.append(["user", "alice"]).unwrap();
        assert_eq!(full.parts().len(), 4);
        assert!(full.has_prefix(&base));
        assert!(base.append(["nul\u{0}"]).is_err());
    }

    #[test]
    fn test_prefix_matching() {
        let prefix = NodeAddress::new(["plugin", "github"]).unwrap();
        let addr = NodeAddress::new(["plugin", "github", "user", "alice"]).unwrap();
        let other = NodeAddress::new(["plugin", "discourse", "user"]).unwrap();
        let empty = NodeAddress::new(Vec::<String>::new()).unwrap();

        assert!(addr.has_prefix(&prefix));
        assert!(addr.has_prefix(&addr));
        assert!(!other.has_prefix(&prefix));
        assert!(addr.has_prefix(&empty));
        assert!(!prefix.has_prefix(&addr));
    }

    #[test]
    fn test_node_and_edge_kinds_are_disjoint_types() {
        // Same parts, different families: only an identical family
        // compares at all. This is a compile-time property; the test
        // pins the runtime forms apart via raw strings.
        let node = NodeAddress::new(["a", "b"]).unwrap();
        let edge = EdgeAddress::new(["a", "b"]).unwrap();
        assert_eq!(node.to_raw(), edge.to_raw());
        assert_eq!(node.parts(), edge.parts());
    }

    #[test]
    fn test_address_ordering_is_part_wise() {
        let a = NodeAddress::new(["a"]).unwrap();
        let ab = NodeAddress::new(["a", "b"]).unwrap();
        let b = NodeAddress::new(["b"]).unwrap();
        assert!(a < ab);
        assert!(ab < b);
    }

    #[test]
    fn test_direction_tags() {
        assert_eq!(Direction::Forward.tag(), "F");
        assert_eq!(Direction::Backward.tag(), "B");
        assert_eq!(Direction::from_tag("F"), Some(Direction::Forward));
        assert_eq!(Direction::from_tag("B"), Some(Direction::Backward));
        assert_eq!(Direction::from_tag("X"), None);
        assert!(!Direction::Forward.reversed());
        assert!(Direction::Backward.reversed());
        assert_eq!(Direction::from_reversed(true), Direction::Backward);
    }

    #[test]
    fn test_markov_edge_address_round_trip() {
        let base = EdgeAddress::new(["plugin", "github", "authors", "1"]).unwrap();
        let forward = MarkovEdgeAddress::new(Direction::Forward, base.clone());
        let backward = MarkovEdgeAddress::new(Direction::Backward, base);

        assert_ne!(forward, backward);
        assert_eq!(forward.parts()[0], "F");
        assert_eq!(
            MarkovEdgeAddress::from_raw(&forward.to_raw()).unwrap(),
            forward
        );
        assert_eq!(
            MarkovEdgeAddress::from_raw(&backward.to_raw()).unwrap(),
            backward
        );
    }

    #[test]
    fn test_markov_edge_address_rejects_unknown_tag() {
        assert!(MarkovEdgeAddress::from_raw("Q\u{0}plugin").is_err());
    }

    #[test]
    fn test_reserved_prefixes() {
        assert!(seed_address().has_prefix(&core_node_prefix()));
        assert!(epoch_node_prefix().has_prefix(&core_node_prefix()));
        assert_eq!(
            epoch_payout_prefix().parts(),
            &["sourcecred", "core", "fibration", "EPOCH_PAYOUT"].map(String::from)
        );
        assert_eq!(
            contribution_radiation_prefix().parts(),
            &["sourcecred", "core", "CONTRIBUTION_RADIATION"].map(String::from)
        );
        assert_eq!(
            seed_mint_prefix().parts(),
            &["sourcecred", "core", "SEED_MINT"].map(String::from)
        );
    }
}
