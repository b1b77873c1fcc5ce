use serde::{Deserialize, Serialize};
use simple_error::SimpleError;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct InstanceParams {
    pub population: PopulationParams,
    pub neuron_model: NeuronModelParams,
    pub synaptic_coefficients: SynapticCoefficients,
    pub network: NetworkParams,
    pub input: InputParams,
    pub simulation: SimulationParams,
    pub initial_state: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationParams {
    pub num_excitatory: usize,
    pub num_inhibitory: usize,
}

impl PopulationParams {
    pub fn num_neurons(&self) -> usize {
        self.num_excitatory + self.num_inhibitory
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NeuronModelParams {
    Lif(LifParams),
    Hh(HhParams),
}

impl NeuronModelParams {
    pub fn num_vars(&self) -> usize {
        match self {
            NeuronModelParams::Lif(lif_params) => 1 + lif_params.conductance.num_vars(),
            NeuronModelParams::Hh(hh_params) => 4 + hh_params.conductance.num_vars(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConductanceParams {
    Jump {
        tau_ge: f64,
        tau_gi: f64,
    },
    Smoothed {
        tau_ge: f64,
        tau_ge_s: f64,
        tau_gi: f64,
        tau_gi_s: f64,
    },
}

impl ConductanceParams {
    pub fn num_vars(&self) -> usize {
        match self {
            ConductanceParams::Jump { .. } => 2,
            ConductanceParams::Smoothed { .. } => 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifParams {
    pub v_threshold: f64,
    pub v_reset: f64,
    pub v_leakage: f64,
    pub v_excitatory: f64,
    pub v_inhibitory: f64,
    pub g_leak: f64,
    pub time_refractory: f64,
    pub dendritic_alpha: f64,
    pub conductance: ConductanceParams,
    pub near_miss: Option<NearMissParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearMissParams {
    pub v_min: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HhParams {
    pub v_na: f64,
    pub v_k: f64,
    pub v_l: f64,
    pub g_na: f64,
    pub g_k: f64,
    pub g_l: f64,
    pub v_ge: f64,
    pub v_gi: f64,
    pub v_threshold: f64,
    pub conductance: ConductanceParams,
    pub spike_crossing: SpikeCrossing,
    pub current: CurrentParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpikeCrossing {
    Rising,
    Falling,
    Peak,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CurrentParams {
    Zero,
    Constant {
        amplitude: f64,
    },
    Sine {
        amplitude: f64,
        angular_frequency: f64,
        phase: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynapticCoefficients {
    pub scee: f64,
    pub scie: f64,
    pub scei: f64,
    pub scii: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NetworkParams {
    Empty,
    AllToAll { weight: f64 },
    Chain { weight: f64 },
    Random { connect_density: f64, weight: f64 },
    Explicit(Vec<EdgeParams>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeParams {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
    pub delay: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputParams {
    pub poisson: PoissonParams,
    pub per_neuron_poisson: Option<Vec<PoissonParams>>,
    pub fixed_events: Option<Vec<InputEventParams>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoissonParams {
    pub rate_excitatory: f64,
    pub strength_excitatory: f64,
    pub rate_inhibitory: f64,
    pub strength_inhibitory: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputEventParams {
    pub neuron_id: usize,
    pub time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulatorKind {
    Simple,
    ExactOrder,
    SparseExactOrder,
    SparseExactOrderTargetsOnly,
    Delayed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParams {
    pub dt: f64,
    pub t0: f64,
    pub simulator: SimulatorKind,
    pub seed: u64,
    pub synaptic_delay: Option<f64>,
}

impl LifParams {
    pub fn lif_g() -> Self {
        Self {
            v_threshold: 1.0,
            v_reset: 0.0,
            v_leakage: 0.0,
            v_excitatory: 14.0 / 3.0,
            v_inhibitory: -2.0 / 3.0,
            g_leak: 0.05,
            time_refractory: 2.0,
            dendritic_alpha: 0.0,
            conductance: ConductanceParams::Jump {
                tau_ge: 2.0,
                tau_gi: 5.0,
            },
            near_miss: Some(NearMissParams::default()),
        }
    }

    pub fn lif_gh() -> Self {
        Self {
            conductance: ConductanceParams::Smoothed {
                tau_ge: 2.0,
                tau_ge_s: 0.5,
                tau_gi: 5.0,
                tau_gi_s: 0.8,
            },
            ..Self::lif_g()
        }
    }

    pub fn dif_single_gh() -> Self {
        Self {
            dendritic_alpha: -0.01,
            ..Self::lif_gh()
        }
    }
}

impl HhParams {
    pub fn hh_gh() -> Self {
        Self {
            v_na: 115.0,
            v_k: -12.0,
            v_l: 10.6,
            g_na: 120.0,
            g_k: 36.0,
            g_l: 0.3,
            v_ge: 65.0,
            v_gi: -15.0,
            v_threshold: 65.0,
            conductance: ConductanceParams::Smoothed {
                tau_ge: 0.5,
                tau_ge_s: 3.0,
                tau_gi: 0.5,
                tau_gi_s: 7.0,
            },
            spike_crossing: SpikeCrossing::Rising,
            current: CurrentParams::Zero,
        }
    }

    pub fn hh_g() -> Self {
        Self {
            conductance: ConductanceParams::Jump {
                tau_ge: 3.0,
                tau_gi: 7.0,
            },
            ..Self::hh_gh()
        }
    }
}

impl Default for PopulationParams {
    fn default() -> Self {
        Self {
            num_excitatory: 1,
            num_inhibitory: 0,
        }
    }
}

impl Default for NeuronModelParams {
    fn default() -> Self {
        NeuronModelParams::Lif(LifParams::default())
    }
}

impl Default for LifParams {
    fn default() -> Self {
        Self::lif_g()
    }
}

impl Default for HhParams {
    fn default() -> Self {
        Self::hh_gh()
    }
}

impl Default for NearMissParams {
    fn default() -> Self {
        Self { v_min: 0.996 }
    }
}

impl Default for SynapticCoefficients {
    fn default() -> Self {
        Self {
            scee: 0.005,
            scie: 0.005,
            scei: 0.005,
            scii: 0.005,
        }
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        NetworkParams::Empty
    }
}

impl Default for InputParams {
    fn default() -> Self {
        Self {
            poisson: PoissonParams::default(),
            per_neuron_poisson: None,
            fixed_events: None,
        }
    }
}

impl Default for PoissonParams {
    fn default() -> Self {
        Self {
            rate_excitatory: 1.0,
            strength_excitatory: 0.012,
            rate_inhibitory: 0.0,
            strength_inhibitory: 0.012,
        }
    }
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            dt: 0.5,
            t0: 0.0,
            simulator: SimulatorKind::ExactOrder,
            seed: 0,
            synaptic_delay: None,
        }
    }
}

pub fn validate_instance_params(instance_params: &InstanceParams) -> Result<(), SimpleError> {
    let num_neurons = instance_params.population.num_neurons();

    validate_neuron_model_params(&instance_params.neuron_model)?;
    validate_synaptic_coefficients(&instance_params.synaptic_coefficients)?;
    validate_network_params(&instance_params.network, num_neurons)?;
    validate_input_params(&instance_params.input, num_neurons)?;
    validate_simulation_params(&instance_params.simulation)?;

    if instance_params.simulation.simulator == SimulatorKind::Delayed {
        validate_delays(instance_params)?;
    }

    if let Some(initial_state) = &instance_params.initial_state {
        validate_initial_state(
            initial_state,
            num_neurons,
            instance_params.neuron_model.num_vars(),
        )?;
    }

    Ok(())
}

fn validate_neuron_model_params(model_params: &NeuronModelParams) -> Result<(), SimpleError> {
    match model_params {
        NeuronModelParams::Lif(lif_params) => validate_lif_params(lif_params),
        NeuronModelParams::Hh(hh_params) => validate_hh_params(hh_params),
    }
}

fn validate_lif_params(lif_params: &LifParams) -> Result<(), SimpleError> {
    if lif_params.v_reset >= lif_params.v_threshold {
        return Err(SimpleError::new("v_reset must be less than v_threshold"));
    }

    if lif_params.g_leak < 0.0 {
        return Err(SimpleError::new("g_leak must not be negative"));
    }

    if lif_params.time_refractory < 0.0 {
        return Err(SimpleError::new("time_refractory must not be negative"));
    }

    if let Some(near_miss) = &lif_params.near_miss {
        if near_miss.v_min >= lif_params.v_threshold {
            return Err(SimpleError::new(
                "near_miss: v_min must be less than v_threshold",
            ));
        }
    }

    validate_conductance_params(&lif_params.conductance)
}

fn validate_hh_params(hh_params: &HhParams) -> Result<(), SimpleError> {
    if hh_params.g_na < 0.0 || hh_params.g_k < 0.0 || hh_params.g_l < 0.0 {
        return Err(SimpleError::new(
            "maximal conductances must not be negative",
        ));
    }

    let current_is_finite = match hh_params.current {
        CurrentParams::Zero => true,
        CurrentParams::Constant { amplitude } => amplitude.is_finite(),
        CurrentParams::Sine {
            amplitude,
            angular_frequency,
            phase,
        } => amplitude.is_finite() && angular_frequency.is_finite() && phase.is_finite(),
    };

    if !current_is_finite {
        return Err(SimpleError::new("current parameters must be finite"));
    }

    validate_conductance_params(&hh_params.conductance)
}

fn validate_conductance_params(conductance_params: &ConductanceParams) -> Result<(), SimpleError> {
    match *conductance_params {
        ConductanceParams::Jump { tau_ge, tau_gi } => {
            validate_tau(tau_ge, "tau_ge")?;
            validate_tau(tau_gi, "tau_gi")
        }
        ConductanceParams::Smoothed {
            tau_ge,
            tau_ge_s,
            tau_gi,
            tau_gi_s,
        } => {
            validate_tau(tau_ge, "tau_ge")?;
            validate_tau(tau_ge_s, "tau_ge_s")?;
            validate_tau(tau_gi, "tau_gi")?;
            validate_tau(tau_gi_s, "tau_gi_s")?;

            if tau_ge == tau_ge_s {
                return Err(SimpleError::new("tau_ge and tau_ge_s must differ"));
            }

            if tau_gi == tau_gi_s {
                return Err(SimpleError::new("tau_gi and tau_gi_s must differ"));
            }

            Ok(())
        }
    }
}

fn validate_tau(tau: f64, name: &str) -> Result<(), SimpleError> {
    if tau > 0.0 {
        Ok(())
    } else {
        Err(SimpleError::new(format!("{} must be strictly positive", name)))
    }
}

fn validate_synaptic_coefficients(
    coefficients: &SynapticCoefficients,
) -> Result<(), SimpleError> {
    let all_finite = [
        coefficients.scee,
        coefficients.scie,
        coefficients.scei,
        coefficients.scii,
    ]
    .iter()
    .all(|coef| coef.is_finite());

    if !all_finite {
        return Err(SimpleError::new("synaptic coefficients must be finite"));
    }

    Ok(())
}

fn validate_network_params(
    network_params: &NetworkParams,
    num_neurons: usize,
) -> Result<(), SimpleError> {
    match network_params {
        NetworkParams::Empty => Ok(()),
        NetworkParams::AllToAll { weight } | NetworkParams::Chain { weight } => {
            validate_weight(*weight)
        }
        NetworkParams::Random {
            connect_density,
            weight,
        } => {
            if !(0.0..=1.0).contains(connect_density) {
                return Err(SimpleError::new("connect_density must be in [0, 1]"));
            }
            validate_weight(*weight)
        }
        NetworkParams::Explicit(edges) => {
            for edge in edges {
                for nid in [edge.from, edge.to] {
                    if nid >= num_neurons {
                        return Err(SimpleError::new(format!(
                            "invalid edge: neuron id {} out of range",
                            nid
                        )));
                    }
                }

                validate_weight(edge.weight)?;

                if let Some(delay) = edge.delay {
                    if !(delay >= 0.0 && delay.is_finite()) {
                        return Err(SimpleError::new(
                            "edge delays must be finite and not negative",
                        ));
                    }
                }
            }
            Ok(())
        }
    }
}

fn validate_weight(weight: f64) -> Result<(), SimpleError> {
    if weight.is_finite() {
        Ok(())
    } else {
        Err(SimpleError::new("edge weights must be finite"))
    }
}

fn validate_input_params(input_params: &InputParams, num_neurons: usize) -> Result<(), SimpleError> {
    validate_poisson_params(&input_params.poisson)?;

    if let Some(per_neuron_poisson) = &input_params.per_neuron_poisson {
        if per_neuron_poisson.len() != num_neurons {
            return Err(SimpleError::new(
                "per_neuron_poisson must have one entry per neuron",
            ));
        }

        for poisson_params in per_neuron_poisson {
            validate_poisson_params(poisson_params)?;
        }
    }

    if let Some(fixed_events) = &input_params.fixed_events {
        for event in fixed_events {
            if event.neuron_id >= num_neurons {
                return Err(SimpleError::new(format!(
                    "input event neuron id out of range: {}",
                    event.neuron_id
                )));
            }

            if !event.time.is_finite() {
                return Err(SimpleError::new("input event times must be finite"));
            }
        }
    }

    Ok(())
}

fn validate_poisson_params(poisson_params: &PoissonParams) -> Result<(), SimpleError> {
    if !(poisson_params.rate_excitatory >= 0.0 && poisson_params.rate_inhibitory >= 0.0)
        || !(poisson_params.rate_excitatory + poisson_params.rate_inhibitory).is_finite()
    {
        return Err(SimpleError::new("input rates must not be negative"));
    }

    if !(poisson_params.strength_excitatory >= 0.0 && poisson_params.strength_inhibitory >= 0.0)
    {
        return Err(SimpleError::new("input strengths must not be negative"));
    }

    Ok(())
}

fn validate_simulation_params(simulation_params: &SimulationParams) -> Result<(), SimpleError> {
    if !(simulation_params.dt > 0.0 && simulation_params.dt.is_finite()) {
        return Err(SimpleError::new("dt must be strictly positive"));
    }

    if !simulation_params.t0.is_finite() {
        return Err(SimpleError::new("t0 must be finite"));
    }

    if let Some(synaptic_delay) = simulation_params.synaptic_delay {
        if !(synaptic_delay >= 0.0 && synaptic_delay.is_finite()) {
            return Err(SimpleError::new(
                "synaptic_delay must be finite and not negative",
            ));
        }
    }

    Ok(())
}

fn validate_delays(instance_params: &InstanceParams) -> Result<(), SimpleError> {
    let dt = instance_params.simulation.dt;
    let default_delay = instance_params.simulation.synaptic_delay.unwrap_or(0.0);

    let min_delay = match &instance_params.network {
        NetworkParams::Empty => None,
        NetworkParams::Explicit(edges) => edges
            .iter()
            .filter(|edge| edge.from != edge.to)
            .map(|edge| edge.delay.unwrap_or(default_delay))
            .min_by(f64::total_cmp),
        _ => Some(default_delay),
    };

    match min_delay {
        Some(min_delay) if min_delay <= dt => {
            Err(SimpleError::new("synaptic delay must be greater than dt"))
        }
        _ => Ok(()),
    }
}

fn validate_initial_state(
    initial_state: &[Vec<f64>],
    num_neurons: usize,
    num_vars: usize,
) -> Result<(), SimpleError> {
    if initial_state.len() != num_neurons {
        return Err(SimpleError::new(
            "initial_state must have one entry per neuron",
        ));
    }

    if initial_state.iter().any(|state| state.len() != num_vars) {
        return Err(SimpleError::new(format!(
            "initial_state entries must have {} values",
            num_vars
        )));
    }

    Ok(())
}
