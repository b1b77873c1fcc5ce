use simple_error::SimpleResult;

use crate::{
    network::Network, neuron::NeuronModel, poisson::PoissonTimeSeq, spike_event::SpikeEvent,
};

#[derive(Debug, Clone, PartialEq)]
pub struct DymState {
    dym_vals: Vec<f64>,
    time_in_refractory: Vec<f64>,
    num_vars: usize,
}

impl DymState {
    pub fn new(num_neurons: usize, default_state: &[f64]) -> Self {
        Self {
            dym_vals: default_state.repeat(num_neurons),
            time_in_refractory: vec![0.0; num_neurons],
            num_vars: default_state.len(),
        }
    }

    pub fn from_states(states: &[Vec<f64>], num_vars: usize) -> Self {
        Self {
            dym_vals: states.concat(),
            time_in_refractory: vec![0.0; states.len()],
            num_vars,
        }
    }

    pub fn num_neurons(&self) -> usize {
        self.time_in_refractory.len()
    }

    pub fn state(&self, nid: usize) -> &[f64] {
        &self.dym_vals[nid * self.num_vars..(nid + 1) * self.num_vars]
    }

    pub fn time_in_refractory(&self, nid: usize) -> f64 {
        self.time_in_refractory[nid]
    }

    pub fn neuron_mut(&mut self, nid: usize) -> (&mut [f64], &mut f64) {
        (
            &mut self.dym_vals[nid * self.num_vars..(nid + 1) * self.num_vars],
            &mut self.time_in_refractory[nid],
        )
    }

    pub fn copy_neuron_from(&mut self, other: &DymState, nid: usize) {
        let range = nid * self.num_vars..(nid + 1) * self.num_vars;
        self.dym_vals[range.clone()].copy_from_slice(&other.dym_vals[range]);
        self.time_in_refractory[nid] = other.time_in_refractory[nid];
    }

    pub fn copy_neurons_from(&mut self, other: &DymState, nids: &[usize]) {
        for &nid in nids {
            self.copy_neuron_from(other, nid);
        }
    }
}

#[derive(Debug)]
pub struct NeuronPopulation {
    model: Box<dyn NeuronModel>,
    network: Network,
    state: DymState,
}

impl NeuronPopulation {
    pub fn new(model: Box<dyn NeuronModel>, network: Network, state: DymState) -> Self {
        Self {
            model,
            network,
            state,
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn num_neurons(&self) -> usize {
        self.state.num_neurons()
    }

    pub fn dym_state(&self) -> &DymState {
        &self.state
    }

    pub fn dym_state_mut(&mut self) -> &mut DymState {
        &mut self.state
    }

    pub fn step_quiet(&mut self, nid: usize, t: f64, dt: f64) -> SimpleResult<Option<f64>> {
        let (y, t_in_refractory) = self.state.neuron_mut(nid);
        let spike = self.model.step_quiet(y, t_in_refractory, t, dt)?;
        Ok(spike.map(|t_local| t + t_local))
    }

    pub fn evolve_quiet(
        &mut self,
        nid: usize,
        input: &mut PoissonTimeSeq,
        t_start: f64,
        t_end: f64,
        spike_events: &mut Vec<SpikeEvent>,
    ) -> SimpleResult<()> {
        let mut t = t_start;

        while input.front().time < t_end {
            let event = input.front();

            if let Some(t_spike) = self.step_quiet(nid, t, event.time - t)? {
                spike_events.push(SpikeEvent::new(t_spike, nid));
            }

            self.inject_input(nid, event.strength);
            input.pop_and_fill();
            t = event.time;
        }

        if let Some(t_spike) = self.step_quiet(nid, t, t_end - t)? {
            spike_events.push(SpikeEvent::new(t_spike, nid));
        }

        Ok(())
    }

    pub fn inject_input(&mut self, nid: usize, strength: f64) {
        let (y, _) = self.state.neuron_mut(nid);

        if strength >= 0.0 {
            y[self.model.id_ge_inject()] += strength;
        } else {
            y[self.model.id_gi_inject()] -= strength;
        }
    }

    pub fn deliver(&mut self, source: usize, target: usize, strength: f64) {
        let id = if self.network.is_excitatory(source) {
            self.model.id_ge_inject()
        } else {
            self.model.id_gi_inject()
        };
        let (y, _) = self.state.neuron_mut(target);
        y[id] += strength;
    }

    pub fn synaptic_interaction(&mut self, source: usize) {
        let id = if self.network.is_excitatory(source) {
            self.model.id_ge_inject()
        } else {
            self.model.id_gi_inject()
        };

        for edge in self.network.out_edges(source) {
            let (y, _) = self.state.neuron_mut(edge.target);
            y[id] += edge.strength;
        }
    }

    pub fn force_reset(&mut self, nid: usize) {
        let (y, t_in_refractory) = self.state.neuron_mut(nid);
        self.model.force_reset(y, t_in_refractory);
    }
}
