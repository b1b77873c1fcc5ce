use std::fmt::Debug;

use log::{debug, warn};
use simple_error::SimpleResult;

use crate::{
    delay::DelayedSimulator,
    params::{SimulationParams, SimulatorKind},
    poisson::PoissonTimeVec,
    population::{DymState, NeuronPopulation},
    sparse::{AffectedPolicy, SparseExactOrderSimulator},
    spike_event::SpikeEvent,
};

pub trait Simulator: Debug + Send {
    fn t(&self) -> f64;
    fn dt(&self) -> f64;

    fn next_dt(
        &mut self,
        population: &mut NeuronPopulation,
        spike_events: &mut Vec<SpikeEvent>,
    ) -> SimpleResult<()>;
}

pub fn create(
    params: &SimulationParams,
    mut poisson: PoissonTimeVec,
    population: &NeuronPopulation,
) -> SimpleResult<Box<dyn Simulator>> {
    let simulator: Box<dyn Simulator> = match params.simulator {
        SimulatorKind::Simple => {
            poisson.set_auto_shrink(true);
            Box::new(SimpleSimulator::new(params, poisson))
        }
        SimulatorKind::ExactOrder => {
            Box::new(ExactOrderSimulator::new(params, poisson, population))
        }
        SimulatorKind::SparseExactOrder => Box::new(SparseExactOrderSimulator::new(
            params,
            poisson,
            population,
            AffectedPolicy::IncludeFiring,
        )),
        SimulatorKind::SparseExactOrderTargetsOnly => Box::new(SparseExactOrderSimulator::new(
            params,
            poisson,
            population,
            AffectedPolicy::TargetsOnly,
        )),
        SimulatorKind::Delayed => {
            poisson.set_auto_shrink(true);
            Box::new(DelayedSimulator::new(params, poisson, population)?)
        }
    };

    Ok(simulator)
}

#[derive(Debug)]
pub struct SimpleSimulator {
    t: f64,
    dt: f64,
    poisson: PoissonTimeVec,
    new_spikes: Vec<SpikeEvent>,
}

impl SimpleSimulator {
    pub fn new(params: &SimulationParams, poisson: PoissonTimeVec) -> Self {
        Self {
            t: params.t0,
            dt: params.dt,
            poisson,
            new_spikes: Vec::new(),
        }
    }
}

impl Simulator for SimpleSimulator {
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
        self.new_spikes.clear();

        for nid in 0..population.num_neurons() {
            population.evolve_quiet(
                nid,
                self.poisson.seq_mut(nid),
                self.t,
                t_end,
                &mut self.new_spikes,
            )?;
        }

        self.new_spikes.sort();

        for spike_event in &self.new_spikes {
            population.synaptic_interaction(spike_event.id);
        }

        spike_events.extend_from_slice(&self.new_spikes);
        self.t = t_end;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ExactOrderSimulator {
    t: f64,
    dt: f64,
    poisson: PoissonTimeVec,
    backup: DymState,
    candidates: Vec<SpikeEvent>,
    replay_spikes: Vec<SpikeEvent>,
}

impl ExactOrderSimulator {
    pub fn new(
        params: &SimulationParams,
        poisson: PoissonTimeVec,
        population: &NeuronPopulation,
    ) -> Self {
        Self {
            t: params.t0,
            dt: params.dt,
            poisson,
            backup: population.dym_state().clone(),
            candidates: Vec::new(),
            replay_spikes: Vec::new(),
        }
    }

    fn evolve_all(
        &mut self,
        population: &mut NeuronPopulation,
        t_start: f64,
        t_end: f64,
        replay: bool,
    ) -> SimpleResult<()> {
        let spike_events = if replay {
            &mut self.replay_spikes
        } else {
            &mut self.candidates
        };
        spike_events.clear();

        for nid in 0..population.num_neurons() {
            population.evolve_quiet(nid, self.poisson.seq_mut(nid), t_start, t_end, spike_events)?;
        }

        Ok(())
    }
}

impl Simulator for ExactOrderSimulator {
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
        let mut t_cur = self.t;
        self.poisson.save_idx_and_clean();

        loop {
            self.backup.clone_from(population.dym_state());
            self.evolve_all(population, t_cur, t_end, false)?;

            let heading = match self.candidates.iter().min() {
                Some(heading) => *heading,
                None => break,
            };

            debug!(
                "rollback to t = {}, replay to heading spike of neuron {} at {}",
                t_cur, heading.id, heading.time
            );

            self.poisson.restore_idx();
            population.dym_state_mut().clone_from(&self.backup);
            self.evolve_all(population, t_cur, heading.time, true)?;

            let heading_fired = apply_replay_spikes(
                population,
                &mut self.replay_spikes,
                heading,
                spike_events,
            );

            if !heading_fired {
                population.force_reset(heading.id);
                population.synaptic_interaction(heading.id);
                spike_events.push(heading);
            }

            t_cur = heading.time;
            self.poisson.save_idx_and_clean();
        }

        self.t = t_end;
        Ok(())
    }
}

// Records every spike found while replaying up to the heading spike at the
// heading time. Returns whether the heading neuron was among them.
fn apply_replay_spikes(
    population: &mut NeuronPopulation,
    replay_spikes: &mut Vec<SpikeEvent>,
    heading: SpikeEvent,
    spike_events: &mut Vec<SpikeEvent>,
) -> bool {
    replay_spikes.sort();
    let mut heading_fired = false;

    for spike_event in replay_spikes.drain(..) {
        if spike_event.id == heading.id {
            heading_fired = true;
        } else {
            warn!(
                "unexpected spike of neuron {} at {} while replaying to {}",
                spike_event.id,
                spike_event.time,
                heading.time
            );
        }

        population.synaptic_interaction(spike_event.id);
        spike_events.push(SpikeEvent::new(heading.time, spike_event.id));
    }

    heading_fired
}
