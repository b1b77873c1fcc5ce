use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub t: f64,
    pub neuron_states: Vec<NeuronState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronState {
    pub state: Vec<f64>,
    pub time_in_refractory: f64,
}

impl StateSnapshot {
    pub fn voltages(&self) -> impl Iterator<Item = f64> + '_ {
        self.neuron_states.iter().map(|neuron_state| neuron_state.state[0])
    }
}
