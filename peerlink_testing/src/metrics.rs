//! Counter readings taken from a [`DebuggingRecorder`].
//!
//! [`DebuggingRecorder`]: metrics_util::debugging::DebuggingRecorder

use metrics_util::debugging::{DebugValue, Snapshotter};

#[derive(Debug)]
struct Reading {
    name: String,
    labels: Vec<(String, String)>,
    count: u64,
}

/// Every counter recorded at the moment the snapshot was taken.
#[derive(Debug)]
pub struct CounterSnapshot {
    readings: Vec<Reading>,
}

impl CounterSnapshot {
    /// Read all counters from `snapshotter`.
    #[must_use]
    pub fn take(snapshotter: &Snapshotter) -> Self {
        let readings = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter_map(|(key, _, _, value)| match value {
                DebugValue::Counter(count) => Some(Reading {
                    name: key.key().name().to_owned(),
                    labels: key
                        .key()
                        .labels()
                        .map(|label| (label.key().to_owned(), label.value().to_owned()))
                        .collect(),
                    count,
                }),
                _ => None,
            })
            .collect();
        Self { readings }
    }

    /// Sum of every counter named `name`, across all label sets.
    #[must_use]
    pub fn total(&self, name: &str) -> u64 {
        self.readings
            .iter()
            .filter(|reading| reading.name == name)
            .map(|reading| reading.count)
            .sum()
    }

    /// Value of the counter named `name` carrying `label = value`.
    #[must_use]
    pub fn labelled(&self, name: &str, label: &str, value: &str) -> u64 {
        self.readings
            .iter()
            .filter(|reading| {
                reading.name == name
                    && reading
                        .labels
                        .iter()
                        .any(|(k, v)| k == label && v == value)
            })
            .map(|reading| reading.count)
            .sum()
    }
}
