use log::{debug, warn};
use simple_error::SimpleResult;

use crate::{
    network::Network,
    params::SimulationParams,
    poisson::PoissonTimeVec,
    population::{DymState, NeuronPopulation},
    simulator::Simulator,
    spike_event::{pop_earliest, SpikeEvent},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffectedPolicy {
    IncludeFiring,
    TargetsOnly,
}

#[derive(Debug)]
pub struct SparseExactOrderSimulator {
    t: f64,
    dt: f64,
    policy: AffectedPolicy,
    poisson: PoissonTimeVec,
    backup: DymState,
    backup_time: Vec<f64>,
    fired_since_backup: Vec<usize>,
    queue: Vec<SpikeEvent>,
    affected: Vec<usize>,
    is_affected: Vec<bool>,
    replay_spikes: Vec<SpikeEvent>,
}

impl SparseExactOrderSimulator {
    pub fn new(
        params: &SimulationParams,
        poisson: PoissonTimeVec,
        population: &NeuronPopulation,
        policy: AffectedPolicy,
    ) -> Self {
        let num_neurons = population.num_neurons();

        Self {
            t: params.t0,
            dt: params.dt,
            policy,
            poisson,
            backup: population.dym_state().clone(),
            backup_time: vec![params.t0; num_neurons],
            fired_since_backup: vec![0; num_neurons],
            queue: Vec::new(),
            affected: Vec::new(),
            is_affected: vec![false; num_neurons],
            replay_spikes: Vec::new(),
        }
    }

    fn collect_affected(&mut self, network: &Network, firing_nid: usize) {
        for &nid in &self.affected {
            self.is_affected[nid] = false;
        }
        self.affected.clear();

        let firing = match self.policy {
            AffectedPolicy::IncludeFiring => Some(firing_nid),
            AffectedPolicy::TargetsOnly => None,
        };

        let targets = network.out_edges(firing_nid).iter().map(|edge| edge.target);

        for nid in firing.into_iter().chain(targets) {
            if !self.is_affected[nid] {
                self.is_affected[nid] = true;
                self.affected.push(nid);
            }
        }
    }

    fn apply_heading(
        &mut self,
        population: &mut NeuronPopulation,
        heading: SpikeEvent,
        t_end: f64,
        spike_events: &mut Vec<SpikeEvent>,
    ) -> SimpleResult<()> {
        // a requeued spike was already integrated up to its own time
        let already_integrated = self.backup_time[heading.id] == heading.time;

        self.collect_affected(population.network(), heading.id);

        let backup_time = &self.backup_time;
        let is_affected = &self.is_affected;
        self.queue
            .retain(|e| !is_affected[e.id] || backup_time[e.id] == e.time);

        debug!(
            "rollback of {} neurons, replay to heading spike of neuron {} at {}",
            self.affected.len(),
            heading.id,
            heading.time
        );

        population
            .dym_state_mut()
            .copy_neurons_from(&self.backup, &self.affected);
        self.poisson.restore_idx_for(&self.affected);

        let mut heading_fired = false;

        for &nid in &self.affected {
            self.replay_spikes.clear();
            population.evolve_quiet(
                nid,
                self.poisson.seq_mut(nid),
                self.backup_time[nid],
                heading.time,
                &mut self.replay_spikes,
            )?;

            // spikes already recorded since the checkpoint are reproduced, not new
            for spike_event in self.replay_spikes.iter().skip(self.fired_since_backup[nid]) {
                if nid == heading.id {
                    heading_fired = true;
                } else {
                    warn!(
                        "unexpected spike of neuron {} at {} while replaying to {}, requeued",
                        nid, spike_event.time, heading.time
                    );
                    self.queue.push(SpikeEvent::new(heading.time, nid));
                }
            }
        }

        if self.policy == AffectedPolicy::IncludeFiring && !heading_fired && !already_integrated {
            population.force_reset(heading.id);
        }

        population.synaptic_interaction(heading.id);
        spike_events.push(heading);

        if !already_integrated {
            self.fired_since_backup[heading.id] += 1;
        }

        for &nid in &self.affected {
            self.backup_time[nid] = heading.time;
            self.fired_since_backup[nid] = 0;
            self.backup.copy_neuron_from(population.dym_state(), nid);
        }
        self.poisson.save_idx_and_clean_for(&self.affected);

        for &nid in &self.affected {
            population.evolve_quiet(
                nid,
                self.poisson.seq_mut(nid),
                heading.time,
                t_end,
                &mut self.queue,
            )?;
        }

        Ok(())
    }
}

impl Simulator for SparseExactOrderSimulator {
    fn t(&self) -> f64 {
        self.t
    }

    fn dt(&self) -> f64 {
        self.dt
    }

    fn next_dt(
        &mut self,
        population: &mut NeuronPopulation,
        spike_events: &mut Vec<SpikeEvent>,
    ) -> SimpleResult<()> {
        let t_end = self.t + self.dt;

        self.backup.clone_from(population.dym_state());
        self.backup_time.fill(self.t);
        self.fired_since_backup.fill(0);
        self.poisson.save_idx_and_clean();
        self.queue.clear();

        for nid in 0..population.num_neurons() {
            population.evolve_quiet(
                nid,
                self.poisson.seq_mut(nid),
                self.t,
                t_end,
                &mut self.queue,
            )?;
        }

        while let Some(heading) = pop_earliest(&mut self.queue) {
            self.apply_heading(population, heading, t_end, spike_events)?;
        }

        self.t = t_end;
        Ok(())
    }
}
