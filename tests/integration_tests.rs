use float_cmp::assert_approx_eq;
use itertools::assert_equal;
use pulsenet::{
    instance::{create_instance, Instance},
    params::{
        EdgeParams, HhParams, InputEventParams, InstanceParams, LifParams, NetworkParams,
        NeuronModelParams, PopulationParams, SimulatorKind, SynapticCoefficients,
    },
    spike_event::SpikeEvent,
};

const EXACT_SIMULATORS: [SimulatorKind; 3] = [
    SimulatorKind::ExactOrder,
    SimulatorKind::SparseExactOrder,
    SimulatorKind::SparseExactOrderTargetsOnly,
];

fn lif_params_mut(params: &mut InstanceParams) -> &mut LifParams {
    match &mut params.neuron_model {
        NeuronModelParams::Lif(lif_params) => lif_params,
        NeuronModelParams::Hh(_) => panic!("expected a LIF model"),
    }
}

fn make_recurrent_params(simulator: SimulatorKind) -> InstanceParams {
    let mut params = InstanceParams::default();
    params.population = PopulationParams {
        num_excitatory: 8,
        num_inhibitory: 2,
    };
    params.synaptic_coefficients = SynapticCoefficients {
        scee: 0.02,
        scie: 0.02,
        scei: 0.03,
        scii: 0.03,
    };
    params.network = NetworkParams::AllToAll { weight: 1.0 };
    params.input.poisson.rate_excitatory = 2.0;
    params.input.poisson.strength_excitatory = 0.05;
    params.simulation.simulator = simulator;
    params.simulation.seed = 7;
    params
}

// neuron 0 is kicked at t = 5 and drives neuron 1 with scee = 0.1
fn make_pair_params(simulator: SimulatorKind) -> InstanceParams {
    let mut params = InstanceParams::default();
    params.population = PopulationParams {
        num_excitatory: 2,
        num_inhibitory: 0,
    };
    params.synaptic_coefficients.scee = 0.1;
    params.network = NetworkParams::Explicit(vec![EdgeParams {
        from: 0,
        to: 1,
        weight: 1.0,
        delay: None,
    }]);
    params.input.poisson.rate_excitatory = 0.0;
    params.input.poisson.strength_excitatory = 3.0;
    params.input.fixed_events = Some(vec![InputEventParams {
        neuron_id: 0,
        time: 5.0,
    }]);
    params.simulation.dt = 0.125;
    params.simulation.simulator = simulator;
    params
}

fn run(instance: &mut Instance, t: f64) -> Vec<SpikeEvent> {
    instance.run_until(t).unwrap()
}

#[test]
fn empty_instance() {
    let mut instance = create_instance(InstanceParams::default()).unwrap();
    assert_eq!(instance.num_neurons(), 1);
    let step_result = instance.next_dt().unwrap();
    assert!(step_result.spike_events.is_empty());
    assert_eq!(step_result.t, 0.5);
}

#[test]
fn quiet_run_matches_independent_integration() {
    let mut params = make_recurrent_params(SimulatorKind::Simple);
    params.input.poisson.strength_excitatory = 0.001;

    let mut reference = create_instance(params.clone()).unwrap();
    assert!(run(&mut reference, 100.0).is_empty());

    for simulator in EXACT_SIMULATORS {
        params.simulation.simulator = simulator;
        let mut instance = create_instance(params.clone()).unwrap();
        assert!(run(&mut instance, 100.0).is_empty());
        assert_eq!(
            instance.extract_state_snapshot(),
            reference.extract_state_snapshot()
        );
    }
}

#[test]
fn dense_and_sparse_identical_on_all_to_all() {
    let mut dense = create_instance(make_recurrent_params(SimulatorKind::ExactOrder)).unwrap();
    let mut sparse =
        create_instance(make_recurrent_params(SimulatorKind::SparseExactOrder)).unwrap();

    let dense_spikes = run(&mut dense, 200.0);
    let sparse_spikes = run(&mut sparse, 200.0);

    assert!(dense_spikes.len() > 20);
    assert_eq!(dense_spikes, sparse_spikes);
    assert_eq!(
        dense.extract_state_snapshot(),
        sparse.extract_state_snapshot()
    );
    assert_eq!(dense.spike_counts(), sparse.spike_counts());
}

#[test]
fn dense_and_sparse_agree_on_partial_networks() {
    for network in [
        NetworkParams::Chain { weight: 1.0 },
        NetworkParams::Random {
            connect_density: 0.1,
            weight: 1.0,
        },
    ] {
        let mut params = make_recurrent_params(SimulatorKind::ExactOrder);
        params.population = PopulationParams {
            num_excitatory: 40,
            num_inhibitory: 10,
        };
        params.network = network;

        let mut dense = create_instance(params.clone()).unwrap();
        params.simulation.simulator = SimulatorKind::SparseExactOrder;
        let mut sparse = create_instance(params).unwrap();

        let dense_spikes = run(&mut dense, 20.0);
        let sparse_spikes = run(&mut sparse, 20.0);

        assert!(!dense_spikes.is_empty());
        assert_eq!(dense_spikes.len(), sparse_spikes.len());
        for (a, b) in dense_spikes.iter().zip(&sparse_spikes) {
            assert_eq!(a.id, b.id);
            assert_approx_eq!(f64, a.time, b.time, epsilon = 1e-6);
        }
    }
}

#[test]
fn targets_only_agrees_with_dense() {
    let mut dense = create_instance(make_recurrent_params(SimulatorKind::ExactOrder)).unwrap();
    let mut sparse = create_instance(make_recurrent_params(
        SimulatorKind::SparseExactOrderTargetsOnly,
    ))
    .unwrap();

    let dense_spikes = run(&mut dense, 200.0);
    let sparse_spikes = run(&mut sparse, 200.0);

    assert_eq!(dense_spikes.len(), sparse_spikes.len());
    for (a, b) in dense_spikes.iter().zip(&sparse_spikes) {
        assert_eq!(a.id, b.id);
        assert_approx_eq!(f64, a.time, b.time, epsilon = 1e-6);
    }
}

#[test]
fn spikes_reported_in_time_order() {
    for simulator in EXACT_SIMULATORS {
        let mut instance = create_instance(make_recurrent_params(simulator)).unwrap();
        let spike_events = run(&mut instance, 100.0);
        assert!(!spike_events.is_empty());
        assert!(spike_events.windows(2).all(|w| w[0].time <= w[1].time));
    }
}

#[test]
fn conductance_jump_at_spike_time() {
    for simulator in EXACT_SIMULATORS {
        let mut instance = create_instance(make_pair_params(simulator)).unwrap();
        let mut spike_time = None;

        while instance.t() < 6.0 {
            let step_result = instance.next_dt().unwrap();
            let ge_1 = instance.extract_state_snapshot().neuron_states[1].state[1];

            match step_result.spike_events.first() {
                Some(spike_event) => {
                    assert_eq!(spike_event.id, 0);
                    assert!(spike_event.time > 5.0 && spike_event.time < 5.125);
                    assert_approx_eq!(
                        f64,
                        ge_1,
                        0.1 * (-(step_result.t - spike_event.time) / 2.0).exp(),
                        epsilon = 1e-12
                    );
                    spike_time = Some(spike_event.time);
                }
                None if spike_time.is_none() => assert_eq!(ge_1, 0.0),
                None => assert!(ge_1 > 0.0),
            }
        }

        assert!(spike_time.is_some());
        assert_eq!(instance.spike_counts(), [1, 0]);
    }
}

#[test]
fn isolated_neuron_leaks_towards_rest() {
    let mut params = InstanceParams::default();
    params.input.poisson.rate_excitatory = 0.0;
    params.initial_state = Some(vec![vec![0.9, 0.0, 0.0]]);

    let mut instance = create_instance(params).unwrap();
    let mut v_prev = 0.9;

    for _ in 0..200 {
        let step_result = instance.next_dt().unwrap();
        assert!(step_result.spike_events.is_empty());

        let v = instance.extract_state_snapshot().neuron_states[0].state[0];
        assert!(v < v_prev && v > 0.0);
        v_prev = v;
    }

    assert_approx_eq!(f64, v_prev, 0.9 * (-5.0f64).exp(), epsilon = 1e-6);
}

#[test]
fn refractory_shorter_than_dt_resumes_in_same_step() {
    for simulator in [SimulatorKind::Simple, SimulatorKind::ExactOrder] {
        let mut params = InstanceParams::default();
        params.input.poisson.rate_excitatory = 0.0;
        params.initial_state = Some(vec![vec![0.95, 0.2, 0.0]]);
        params.simulation.simulator = simulator;
        lif_params_mut(&mut params).time_refractory = 0.1;

        let mut instance = create_instance(params).unwrap();
        let step_result = instance.next_dt().unwrap();

        assert_eq!(step_result.spike_events.len(), 1);
        assert!(step_result.spike_events[0].time < 0.4);

        let snapshot = instance.extract_state_snapshot();
        assert_eq!(snapshot.neuron_states[0].time_in_refractory, 0.0);
        assert!(snapshot.neuron_states[0].state[0] > 0.0);
    }
}

#[test]
fn delayed_interaction() {
    let mut params = make_pair_params(SimulatorKind::Delayed);
    params.simulation.synaptic_delay = Some(1.3);

    let mut instance = create_instance(params).unwrap();
    let spike_events = run(&mut instance, 5.125);
    assert_eq!(spike_events.len(), 1);
    let arrival = spike_events[0].time + 1.3;

    while instance.t() < 7.0 {
        let step_start = instance.t();
        instance.next_dt().unwrap();
        let ge_1 = instance.extract_state_snapshot().neuron_states[1].state[1];

        if instance.t() <= arrival {
            assert_eq!(ge_1, 0.0);
        } else if step_start < arrival {
            assert_approx_eq!(
                f64,
                ge_1,
                0.1 * (-(instance.t() - arrival) / 2.0).exp(),
                epsilon = 1e-12
            );
        }
    }
}

#[test]
fn per_edge_delays() {
    let mut params = make_pair_params(SimulatorKind::Delayed);
    params.population.num_excitatory = 3;
    params.synaptic_coefficients.scee = 0.02;
    // 1.25 is a whole multiple of dt
    params.simulation.synaptic_delay = Some(1.25);
    params.network = NetworkParams::Explicit(
        [(1, Some(0.5)), (1, None), (1, Some(1.3)), (2, Some(0.75))]
            .into_iter()
            .map(|(to, delay)| EdgeParams {
                from: 0,
                to,
                weight: 1.0,
                delay,
            })
            .collect(),
    );

    let mut instance = create_instance(params).unwrap();
    let mut spike_time = None;

    // the kicked neuron stays refractory until after t = 7
    while instance.t() < 7.0 {
        let step_result = instance.next_dt().unwrap();

        if let Some(spike_event) = step_result.spike_events.first() {
            spike_time = Some(spike_event.time);
        }

        let ge_1 = instance.extract_state_snapshot().neuron_states[1].state[1];
        match spike_time {
            Some(t_spike) if instance.t() > t_spike + 0.5 => assert!(ge_1 > 0.0),
            _ => assert_eq!(ge_1, 0.0),
        }
    }

    let t_spike = spike_time.unwrap();
    let snapshot = instance.extract_state_snapshot();
    let ge_at_end = |delay: f64| 0.02 * (-(7.0 - t_spike - delay) / 2.0).exp();

    assert_eq!(instance.spike_counts(), [1, 0, 0]);
    assert_approx_eq!(
        f64,
        snapshot.neuron_states[1].state[1],
        ge_at_end(0.5) + ge_at_end(1.25) + ge_at_end(1.3),
        epsilon = 1e-12
    );
    assert_approx_eq!(
        f64,
        snapshot.neuron_states[2].state[1],
        ge_at_end(0.75),
        epsilon = 1e-12
    );
}

#[test]
fn infinite_delay() {
    let mut params = make_recurrent_params(SimulatorKind::Delayed);
    params.simulation.synaptic_delay = Some(f64::INFINITY);

    let result = create_instance(params);
    assert_eq!(
        result.unwrap_err().as_str(),
        "invalid instance parameters, synaptic_delay must be finite and not negative"
    );
}

#[test]
fn delay_not_exceeding_dt() {
    let mut params = make_pair_params(SimulatorKind::Delayed);
    params.simulation.synaptic_delay = Some(0.1);

    let result = create_instance(params);
    assert!(result.is_err());
    assert_eq!(
        result.unwrap_err().as_str(),
        "invalid instance parameters, synaptic delay must be greater than dt"
    );
}

#[test]
fn deterministic_for_seed() {
    let mut a = create_instance(make_recurrent_params(SimulatorKind::ExactOrder)).unwrap();
    let mut b = create_instance(make_recurrent_params(SimulatorKind::ExactOrder)).unwrap();
    assert_eq!(run(&mut a, 100.0), run(&mut b, 100.0));

    let mut params = make_recurrent_params(SimulatorKind::ExactOrder);
    params.simulation.seed = 8;
    let mut c = create_instance(params).unwrap();
    let mut d = create_instance(make_recurrent_params(SimulatorKind::ExactOrder)).unwrap();
    assert_ne!(run(&mut c, 100.0), run(&mut d, 100.0));
}

#[test]
fn input_event_out_of_range() {
    let mut params = make_pair_params(SimulatorKind::ExactOrder);
    params.input.fixed_events = Some(vec![InputEventParams {
        neuron_id: 5,
        time: 1.0,
    }]);

    let result = create_instance(params);
    assert_eq!(
        result.unwrap_err().as_str(),
        "invalid instance parameters, input event neuron id out of range: 5"
    );
}

#[test]
fn second_spike_in_one_call_is_fatal() {
    for simulator in [SimulatorKind::Simple, SimulatorKind::ExactOrder] {
        let mut params = InstanceParams::default();
        params.input.poisson.rate_excitatory = 0.0;
        params.initial_state = Some(vec![vec![0.0, 10.0, 0.0]]);
        params.simulation.dt = 0.2;
        params.simulation.simulator = simulator;
        lif_params_mut(&mut params).time_refractory = 0.05;

        let mut instance = create_instance(params).unwrap();
        let result = instance.next_dt();

        assert!(result
            .unwrap_err()
            .as_str()
            .starts_with("multiple spikes in one step"));
    }
}

#[test]
fn hodgkin_huxley_network() {
    let mut params = make_recurrent_params(SimulatorKind::ExactOrder);
    params.neuron_model = NeuronModelParams::Hh(HhParams::hh_gh());
    params.input.poisson.strength_excitatory = 0.5;
    params.simulation.dt = 1.0 / 32.0;

    let mut dense = create_instance(params.clone()).unwrap();
    params.simulation.simulator = SimulatorKind::SparseExactOrder;
    let mut sparse = create_instance(params).unwrap();

    let dense_spikes = run(&mut dense, 50.0);
    let sparse_spikes = run(&mut sparse, 50.0);

    assert_eq!(dense_spikes, sparse_spikes);
    assert!(dense
        .extract_state_snapshot()
        .neuron_states
        .iter()
        .all(|neuron_state| neuron_state.state.iter().all(|x| x.is_finite())));
}

#[test]
fn params_from_yaml() {
    let yaml = r#"
population:
  num_excitatory: 3
  num_inhibitory: 1
neuron_model: !Lif
  v_threshold: 1.0
  v_reset: 0.0
  v_leakage: 0.0
  v_excitatory: 4.666666666666667
  v_inhibitory: -0.6666666666666666
  g_leak: 0.05
  time_refractory: 2.0
  dendritic_alpha: 0.0
  conductance: !Smoothed
    tau_ge: 2.0
    tau_ge_s: 0.5
    tau_gi: 5.0
    tau_gi_s: 0.8
  near_miss: null
synaptic_coefficients:
  scee: 0.005
  scie: 0.005
  scei: 0.005
  scii: 0.005
network: !Chain
  weight: 1.0
input:
  poisson:
    rate_excitatory: 1.0
    strength_excitatory: 0.012
    rate_inhibitory: 0.5
    strength_inhibitory: 0.012
  per_neuron_poisson: null
  fixed_events: null
simulation:
  dt: 0.5
  t0: 0.0
  simulator: SparseExactOrder
  seed: 3
  synaptic_delay: null
initial_state: null
"#;

    let params: InstanceParams = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(params.simulation.simulator, SimulatorKind::SparseExactOrder);

    let mut instance = create_instance(params).unwrap();
    run(&mut instance, 20.0);
    let snapshot = instance.extract_state_snapshot();
    assert_eq!(snapshot.neuron_states.len(), 4);
    assert_equal(
        snapshot.neuron_states.iter().map(|s| s.state.len()),
        [5, 5, 5, 5],
    );
    assert_eq!(snapshot.t, 20.0);
}
