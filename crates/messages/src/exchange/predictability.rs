//! Delivery predictability vector.

use crate::ExchangeMessage;
use ferry_types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A peer's delivery predictabilities, aged to the moment of capture.
///
/// Read-only on the receiving side: the receiver folds these values into its
/// own table through the transitive update and never writes them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictabilityVector {
    /// Node whose table this is.
    pub owner: NodeId,
    /// destination -> predictability
    pub entries: BTreeMap<NodeId, f64>,
}

impl PredictabilityVector {
    /// Create an empty vector for `owner`.
    pub fn new(owner: NodeId) -> Self {
        Self {
            owner,
            entries: BTreeMap::new(),
        }
    }

    /// Predictability of the owner reaching `node`, or 0 if unknown.
    pub fn get(&self, node: NodeId) -> f64 {
        self.entries.get(&node).copied().unwrap_or(0.0)
    }

    /// Iterate over (destination, predictability) pairs in node order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.entries.iter().map(|(node, p)| (*node, *p))
    }

    /// Number of known destinations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the vector is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(NodeId, f64)> for PredictabilityVector {
    /// Collect entries into a vector with owner `NodeId(0)`; set `owner` after.
    fn from_iter<I: IntoIterator<Item = (NodeId, f64)>>(iter: I) -> Self {
        Self {
            owner: NodeId(0),
            entries: iter.into_iter().collect(),
        }
    }
}

impl ExchangeMessage for PredictabilityVector {
    fn message_type_id() -> &'static str {
        "predictability.vector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_destination_is_zero() {
        let mut v = PredictabilityVector::new(NodeId(1));
        v.entries.insert(NodeId(2), 0.5);
        assert_eq!(v.get(NodeId(2)), 0.5);
        assert_eq!(v.get(NodeId(9)), 0.0);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn test_iteration_is_ordered() {
        let v: PredictabilityVector = [(NodeId(5), 0.1), (NodeId(2), 0.2), (NodeId(9), 0.3)]
            .into_iter()
            .collect();
        let nodes: Vec<_> = v.iter().map(|(n, _)| n).collect();
        assert_eq!(nodes, vec![NodeId(2), NodeId(5), NodeId(9)]);
    }
}
