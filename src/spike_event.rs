use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

// equal times are ordered by lowest neuron id
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeEvent {
    pub time: f64,
    pub id: usize,
}

impl SpikeEvent {
    pub fn new(time: f64, id: usize) -> Self {
        Self { time, id }
    }
}

impl Eq for SpikeEvent {}

impl PartialOrd for SpikeEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SpikeEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.id.cmp(&other.id))
    }
}

pub fn pop_earliest(spike_events: &mut Vec<SpikeEvent>) -> Option<SpikeEvent> {
    let pos = spike_events
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(pos, _)| pos)?;
    Some(spike_events.swap_remove(pos))
}
