use log::info;
use simple_error::{try_with, SimpleError, SimpleResult};

use crate::{
    network, neuron,
    params::{self, InstanceParams},
    poisson::PoissonTimeVec,
    population::{DymState, NeuronPopulation},
    simulator::{self, Simulator},
    spike_event::SpikeEvent,
    state_snapshot::{NeuronState, StateSnapshot},
};

pub fn create_instance(params: InstanceParams) -> Result<Instance, SimpleError> {
    try_with!(
        params::validate_instance_params(&params),
        "invalid instance parameters"
    );

    let model = neuron::create(&params.neuron_model);
    let num_neurons = params.population.num_neurons();

    let state = match &params.initial_state {
        Some(initial_state) => DymState::from_states(initial_state, model.num_vars()),
        None => DymState::new(num_neurons, &model.default_state()),
    };

    let network = network::create_network(&params)?;
    let population = NeuronPopulation::new(model, network, state);

    let poisson = PoissonTimeVec::generate(
        &params.input,
        num_neurons,
        params.simulation.seed,
        params.simulation.t0,
    );

    let simulator = simulator::create(&params.simulation, poisson, &population)?;

    info!(
        "instance created: {} neurons, {} edges, simulator {:?}, dt = {}",
        num_neurons,
        population.network().num_edges(),
        params.simulation.simulator,
        params.simulation.dt
    );

    Ok(Instance {
        population,
        simulator,
        spike_counts: vec![0; num_neurons],
    })
}

#[derive(Debug)]
pub struct StepResult {
    pub t: f64,
    pub spike_events: Vec<SpikeEvent>,
}

#[derive(Debug)]
pub struct Instance {
    population: NeuronPopulation,
    simulator: Box<dyn Simulator>,
    spike_counts: Vec<usize>,
}

impl Instance {
    pub fn num_neurons(&self) -> usize {
        self.population.num_neurons()
    }

    pub fn t(&self) -> f64 {
        self.simulator.t()
    }

    pub fn dt(&self) -> f64 {
        self.simulator.dt()
    }

    pub fn spike_counts(&self) -> &[usize] {
        &self.spike_counts
    }

    pub fn next_dt(&mut self) -> SimpleResult<StepResult> {
        let mut spike_events = Vec::new();
        self.simulator
            .next_dt(&mut self.population, &mut spike_events)?;

        for spike_event in &spike_events {
            self.spike_counts[spike_event.id] += 1;
        }

        Ok(StepResult {
            t: self.simulator.t(),
            spike_events,
        })
    }

    pub fn run_until(&mut self, t: f64) -> SimpleResult<Vec<SpikeEvent>> {
        let mut spike_events = Vec::new();

        // half a step of slack against rounding of the accumulated time
        while self.t() + 0.5 * self.dt() < t {
            spike_events.append(&mut self.next_dt()?.spike_events);
        }

        Ok(spike_events)
    }

    pub fn extract_state_snapshot(&self) -> StateSnapshot {
        let dym_state = self.population.dym_state();

        StateSnapshot {
            t: self.t(),
            neuron_states: (0..dym_state.num_neurons())
                .map(|nid| NeuronState {
                    state: dym_state.state(nid).to_vec(),
                    time_in_refractory: dym_state.time_in_refractory(nid),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        params::{InputEventParams, NetworkParams, SimulatorKind},
        util::test_util,
    };
    use itertools::assert_equal;

    #[test]
    fn invalid_params() {
        let mut params = test_util::get_template_instance_params();
        params.simulation.dt = -1.0;

        let result = create_instance(params);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().as_str(),
            "invalid instance parameters, dt must be strictly positive"
        );
    }

    #[test]
    fn step_time() {
        let mut instance = create_instance(test_util::get_template_instance_params()).unwrap();
        assert_eq!(instance.t(), 0.0);
        assert_eq!(instance.num_neurons(), 4);

        let step_result = instance.next_dt().unwrap();
        assert_eq!(step_result.t, 0.5);

        instance.run_until(10.0).unwrap();
        assert_eq!(instance.t(), 10.0);
    }

    #[test]
    fn initial_state() {
        let mut params = test_util::get_template_instance_params();
        params.initial_state = Some(vec![
            vec![0.5, 0.0, 0.0],
            vec![0.25, 0.0, 0.0],
            vec![0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0],
        ]);

        let instance = create_instance(params).unwrap();
        let snapshot = instance.extract_state_snapshot();

        assert_eq!(snapshot.t, 0.0);
        assert_equal(snapshot.voltages(), [0.5, 0.25, 0.0, 0.0]);
        assert!(snapshot
            .neuron_states
            .iter()
            .all(|neuron_state| neuron_state.time_in_refractory == 0.0));
    }

    #[test]
    fn spike_counts() {
        let mut params = test_util::get_template_instance_params();
        params.network = NetworkParams::Empty;
        params.input.poisson.strength_excitatory = 3.0;
        params.input.poisson.rate_excitatory = 0.0;
        params.input.fixed_events = Some(vec![
            InputEventParams {
                neuron_id: 2,
                time: 1.1,
            },
            InputEventParams {
                neuron_id: 2,
                time: 4.2,
            },
        ]);
        params.simulation.simulator = SimulatorKind::Simple;

        let mut instance = create_instance(params).unwrap();
        let spike_events = instance.run_until(8.0).unwrap();

        assert!(!spike_events.is_empty());
        assert!(spike_events.iter().all(|e| e.id == 2 && e.time > 1.1));
        assert_eq!(instance.spike_counts(), [0, 0, spike_events.len(), 0]);
    }
}
