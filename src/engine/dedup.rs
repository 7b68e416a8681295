//! Undirected edge keys.
//!
//! Mentions are directed ("warfarin mentions aspirin"), the graph is not.
//! `EdgeKey` collapses `{A, B}` and `{B, A}` into one hashable, ordered value
//! so both directions accumulate into the same edge.
//!
//! ## What counts as "the same edge"
//!
//! Two endpoints compared with `ResolvedEntity`'s `Ord`: drugs before
//! substances, then by id/token. The smaller endpoint is always `low`.
//! Nothing else (severity, effect text, author) participates in the key.

use super::resolve::ResolvedEntity;
use serde::Serialize;
use std::fmt;

/// Order-independent pair of endpoints.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EdgeKey {
    low: ResolvedEntity,
    high: ResolvedEntity,
}

impl EdgeKey {
    pub fn new(a: ResolvedEntity, b: ResolvedEntity) -> Self {
        if a <= b { EdgeKey { low: a, high: b } } else { EdgeKey { low: b, high: a } }
    }

    /// Key for two catalog drugs.
    pub fn drugs(a: &str, b: &str) -> Self {
        EdgeKey::new(ResolvedEntity::drug(a), ResolvedEntity::drug(b))
    }

    pub fn endpoints(&self) -> (&ResolvedEntity, &ResolvedEntity) {
        (&self.low, &self.high)
    }

    pub fn contains(&self, entity: &ResolvedEntity) -> bool {
        self.low == *entity || self.high == *entity
    }

    /// The endpoint opposite `entity`, or `None` when `entity` is not on the
    /// edge.
    pub fn other(&self, entity: &ResolvedEntity) -> Option<&ResolvedEntity> {
        if self.low == *entity {
            Some(&self.high)
        } else if self.high == *entity {
            Some(&self.low)
        } else {
            None
        }
    }

    pub fn is_loop(&self) -> bool {
        self.low == self.high
    }

    /// Both endpoints are catalog drugs.
    pub fn is_drug_pair(&self) -> bool {
        self.low.is_drug() && self.high.is_drug()
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_order_independent() {
        let ab = EdgeKey::drugs("warfarin", "aspirin");
        let ba = EdgeKey::drugs("aspirin", "warfarin");
        assert_eq!(ab, ba);
        assert_eq!(ab.endpoints().0, &ResolvedEntity::drug("aspirin"));
        assert_eq!(ab.to_string(), "drug:aspirin -- drug:warfarin");
    }

    #[test]
    fn other_endpoint() {
        let key = EdgeKey::new(ResolvedEntity::substance("Alcohol"), ResolvedEntity::drug("tramadol"));
        let tramadol = ResolvedEntity::drug("tramadol");

        assert_eq!(key.endpoints().0, &tramadol);
        assert_eq!(key.other(&tramadol), Some(&ResolvedEntity::substance("alcohol")));
        assert_eq!(key.other(&ResolvedEntity::drug("aspirin")), None);
        assert!(key.contains(&tramadol));
        assert!(!key.is_drug_pair());
        assert!(!key.is_loop());
        assert!(EdgeKey::drugs("x", "x").is_loop());
    }
}
