use std::time::Instant;

use pulsenet::{instance, params::SimulatorKind};

#[path = "../scenario_params.rs"]
mod scenario_params;

fn main() {
    env_logger::init();

    let t_stop = 1000.0;

    for simulator in [
        SimulatorKind::Simple,
        SimulatorKind::ExactOrder,
        SimulatorKind::SparseExactOrder,
        SimulatorKind::SparseExactOrderTargetsOnly,
        SimulatorKind::Delayed,
    ] {
        let mut params = scenario_params::get_scenario_params();
        params.simulation.simulator = simulator;

        if simulator == SimulatorKind::Delayed {
            params.simulation.synaptic_delay = Some(1.0);
        }

        let mut instance = instance::create_instance(params).unwrap();

        let wall_start = Instant::now();
        let spike_events = instance.run_until(t_stop).unwrap();
        let wall_time = wall_start.elapsed();

        let checksum: f64 = spike_events
            .iter()
            .map(|spike_event| spike_event.time * spike_event.id as f64)
            .sum();

        eprintln!("{:?}:", simulator);
        eprintln!("...wall time: {:.3} s", wall_time.as_secs_f64());
        eprintln!(
            "...spikes per neuron and unit time: {:.4}",
            spike_events.len() as f64 / (instance.num_neurons() as f64 * t_stop)
        );
        eprintln!("...checksum: {}", checksum);
    }
}
