use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of a record deletion on a single topic: one outcome per
/// partition. Partial failure stays per-partition, never globalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRecordsOutcome {
    pub topic: String,
    pub partitions: BTreeMap<u32, PartitionOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum PartitionOutcome {
    /// Records dropped; the partition's new earliest retained offset.
    #[serde(rename_all = "camelCase")]
    Deleted { low_water_mark: i64 },
    #[serde(rename_all = "camelCase")]
    Failed { error: String },
}

impl DeleteRecordsOutcome {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            partitions: BTreeMap::new(),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.partitions
            .values()
            .all(|outcome| matches!(outcome, PartitionOutcome::Deleted { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_stays_per_partition() {
        let mut outcome = DeleteRecordsOutcome::new("fin.orders");
        outcome.partitions.insert(0, PartitionOutcome::Deleted { low_water_mark: 42 });
        outcome.partitions.insert(1, PartitionOutcome::Failed {
            error: "leader not available".to_string(),
        });

        assert!(!outcome.all_succeeded());
        assert!(matches!(
            outcome.partitions[&0],
            PartitionOutcome::Deleted { low_water_mark: 42 }
        ));
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(PartitionOutcome::Deleted { low_water_mark: 7 }).unwrap();
        assert_eq!(json["result"], "Deleted");
        assert_eq!(json["lowWaterMark"], 7);
    }
}
