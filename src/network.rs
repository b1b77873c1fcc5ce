use log::debug;
use rand::{distributions::Bernoulli, prelude::Distribution, rngs::StdRng, SeedableRng};
use simple_error::{SimpleError, SimpleResult};

use crate::{
    params::{EdgeParams, InstanceParams, NetworkParams, SynapticCoefficients},
    types::HashMap,
    util::calculate_hash,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub target: usize,
    pub strength: f64,
    pub delay: f64,
}

#[derive(Debug, Clone)]
pub struct Network {
    num_excitatory: usize,
    out_edges: Vec<Vec<Edge>>,
}

impl Network {
    pub fn from_edges(
        num_excitatory: usize,
        num_neurons: usize,
        coefficients: &SynapticCoefficients,
        edges: impl IntoIterator<Item = EdgeParams>,
        default_delay: f64,
    ) -> Self {
        let coefficient = |from: usize, to: usize| {
            match (from < num_excitatory, to < num_excitatory) {
                (true, true) => coefficients.scee,
                (true, false) => coefficients.scie,
                (false, true) => coefficients.scei,
                (false, false) => coefficients.scii,
            }
        };

        // parallel edges with equal delay are merged
        let mut merged: HashMap<(usize, usize, u64), f64> = HashMap::default();
        let mut num_self_loops = 0;

        for edge in edges {
            if edge.from == edge.to {
                num_self_loops += 1;
                continue;
            }

            let delay = edge.delay.unwrap_or(default_delay);
            *merged
                .entry((edge.from, edge.to, delay.to_bits()))
                .or_insert(0.0) += edge.weight;
        }

        if num_self_loops > 0 {
            debug!("{} self-loops dropped from network", num_self_loops);
        }

        let mut out_edges = vec![Vec::new(); num_neurons];

        for ((from, to, delay_bits), weight) in merged {
            out_edges[from].push(Edge {
                target: to,
                strength: weight * coefficient(from, to),
                delay: f64::from_bits(delay_bits),
            });
        }

        for edges in &mut out_edges {
            edges.sort_by(|a, b| a.target.cmp(&b.target).then(a.delay.total_cmp(&b.delay)));
        }

        Self {
            num_excitatory,
            out_edges,
        }
    }

    pub fn num_edges(&self) -> usize {
        self.out_edges.iter().map(Vec::len).sum()
    }

    pub fn is_excitatory(&self, nid: usize) -> bool {
        nid < self.num_excitatory
    }

    pub fn out_edges(&self, nid: usize) -> &[Edge] {
        &self.out_edges[nid]
    }

    pub fn min_delay(&self) -> Option<f64> {
        self.out_edges
            .iter()
            .flatten()
            .map(|edge| edge.delay)
            .min_by(f64::total_cmp)
    }

    pub fn max_delay(&self) -> Option<f64> {
        self.out_edges
            .iter()
            .flatten()
            .map(|edge| edge.delay)
            .max_by(f64::total_cmp)
    }
}

pub fn create_network(params: &InstanceParams) -> SimpleResult<Network> {
    let num_neurons = params.population.num_neurons();
    let seed = params.simulation.seed;

    let edges: Vec<EdgeParams> = match &params.network {
        NetworkParams::Empty => Vec::new(),
        NetworkParams::AllToAll { weight } => (0..num_neurons)
            .flat_map(|from| (0..num_neurons).map(move |to| edge(from, to, *weight)))
            .collect(),
        NetworkParams::Chain { weight } => (1..num_neurons)
            .map(|from| edge(from, from - 1, *weight))
            .collect(),
        NetworkParams::Random {
            connect_density,
            weight,
        } => {
            let dist = Bernoulli::new(*connect_density)
                .map_err(|err| SimpleError::new(format!("invalid connect_density: {}", err)))?;
            let mut edges = Vec::new();

            for from in 0..num_neurons {
                for to in (0..num_neurons).filter(|to| *to != from) {
                    // seeded per pair so the graph does not depend on iteration order
                    let mut rng = StdRng::seed_from_u64(calculate_hash(&(seed, from, to)));
                    if dist.sample(&mut rng) {
                        edges.push(edge(from, to, *weight));
                    }
                }
            }

            edges
        }
        NetworkParams::Explicit(edges) => edges.clone(),
    };

    Ok(Network::from_edges(
        params.population.num_excitatory,
        num_neurons,
        &params.synaptic_coefficients,
        edges,
        params.simulation.synaptic_delay.unwrap_or(0.0),
    ))
}

fn edge(from: usize, to: usize, weight: f64) -> EdgeParams {
    EdgeParams {
        from,
        to,
        weight,
        delay: None,
    }
}
