use pulsenet::params::InstanceParams;

pub fn get_scenario_params() -> InstanceParams {
    let params_yaml_str = r#"
population:
  num_excitatory: 800
  num_inhibitory: 200
neuron_model: !Lif
  v_threshold: 1.0
  v_reset: 0.0
  v_leakage: 0.0
  v_excitatory: 4.666666666666667
  v_inhibitory: -0.6666666666666666
  g_leak: 0.05
  time_refractory: 2.0
  dendritic_alpha: 0.0
  conductance: !Jump
    tau_ge: 2.0
    tau_gi: 5.0
  near_miss:
    v_min: 0.996
synaptic_coefficients:
  scee: 0.02
  scie: 0.02
  scei: 0.04
  scii: 0.04
network: !Random
  connect_density: 0.05
  weight: 1.0
input:
  poisson:
    rate_excitatory: 1.0
    strength_excitatory: 0.012
    rate_inhibitory: 0.0
    strength_inhibitory: 0.012
  per_neuron_poisson: null
  fixed_events: null
simulation:
  dt: 0.5
  t0: 0.0
  simulator: ExactOrder
  seed: 0
  synaptic_delay: null
initial_state: null
"#;

    serde_yaml::from_str(params_yaml_str).unwrap()
}
