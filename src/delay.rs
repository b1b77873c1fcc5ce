use log::debug;
use simple_error::{SimpleError, SimpleResult};

use crate::{
    params::SimulationParams,
    poisson::PoissonTimeVec,
    population::NeuronPopulation,
    simulator::Simulator,
    spike_event::SpikeEvent,
};

const MAX_RING_BUCKETS: usize = 1 << 24;

#[derive(Debug)]
struct StepRing<T> {
    buckets: Vec<Vec<T>>,
    current: usize,
}

impl<T: Clone> StepRing<T> {
    fn new(num_buckets: usize) -> Self {
        Self {
            buckets: vec![Vec::new(); num_buckets],
            current: 0,
        }
    }

    fn horizon(&self) -> usize {
        self.buckets.len()
    }

    // offset 0 is the bucket taken by the next call to take_current
    fn push(&mut self, offset: usize, value: T) {
        debug_assert!(offset < self.horizon());

        let mut pos = self.current + offset;
        if pos >= self.buckets.len() {
            pos -= self.buckets.len();
        }
        self.buckets[pos].push(value);
    }

    fn take_current(&mut self, out: &mut Vec<T>) {
        out.append(&mut self.buckets[self.current]);
        self.current += 1;
        if self.current == self.buckets.len() {
            self.current = 0;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Delivery {
    time: f64,
    source: usize,
    target: usize,
    strength: f64,
}

#[derive(Debug)]
pub struct DelayedSimulator {
    t: f64,
    dt: f64,
    poisson: PoissonTimeVec,
    pending: StepRing<Delivery>,
    new_spikes: Vec<SpikeEvent>,
}

impl DelayedSimulator {
    pub fn new(
        params: &SimulationParams,
        poisson: PoissonTimeVec,
        population: &NeuronPopulation,
    ) -> SimpleResult<Self> {
        let network = population.network();
        check_delay(network.min_delay(), params.dt)?;

        let num_buckets = ring_size(network.max_delay().unwrap_or(0.0), params.dt)?;
        debug!("delay ring buffer with {} buckets", num_buckets);

        Ok(Self {
            t: params.t0,
            dt: params.dt,
            poisson,
            pending: StepRing::new(num_buckets),
            new_spikes: Vec::new(),
        })
    }

    // integrates one neuron through its external events and due deliveries, in time order
    fn evolve_neuron(
        &mut self,
        population: &mut NeuronPopulation,
        nid: usize,
        deliveries: &[Delivery],
        t_end: f64,
    ) -> SimpleResult<()> {
        let seq = self.poisson.seq_mut(nid);
        let mut t = self.t;
        let mut deliveries = deliveries.iter().peekable();

        loop {
            let input_time = seq.front().time;
            let delivery_time = deliveries.peek().map_or(f64::INFINITY, |d| d.time);
            let t_next = input_time.min(delivery_time);

            if !(t_next < t_end) {
                break;
            }

            if let Some(t_spike) = population.step_quiet(nid, t, t_next - t)? {
                self.new_spikes.push(SpikeEvent::new(t_spike, nid));
            }

            if delivery_time <= input_time {
                if let Some(delivery) = deliveries.next() {
                    population.deliver(delivery.source, nid, delivery.strength);
                }
            } else {
                population.inject_input(nid, seq.front().strength);
                seq.pop_and_fill();
            }

            t = t_next;
        }

        if let Some(t_spike) = population.step_quiet(nid, t, t_end - t)? {
            self.new_spikes.push(SpikeEvent::new(t_spike, nid));
        }

        Ok(())
    }
}

fn ring_size(max_delay: f64, dt: f64) -> SimpleResult<usize> {
    let num_steps = (max_delay / dt).ceil();

    if num_steps.is_finite() && num_steps < MAX_RING_BUCKETS as f64 {
        Ok(num_steps as usize + 2)
    } else {
        Err(SimpleError::new("synaptic delay too long for dt"))
    }
}

fn ring_offset(delivery_time: f64, t_end: f64, dt: f64, horizon: usize) -> usize {
    let offset = ((delivery_time - t_end) / dt).floor().max(0.0) as usize;
    offset.min(horizon - 1)
}

fn check_delay(min_delay: Option<f64>, dt: f64) -> SimpleResult<()> {
    match min_delay {
        Some(min_delay) if min_delay <= dt => Err(SimpleError::new(
            "synaptic delay must be greater than dt",
        )),
        _ => Ok(()),
    }
}

impl Simulator for DelayedSimulator {
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
        check_delay(population.network().min_delay(), self.dt)?;

        let t_end = self.t + self.dt;
        let mut current = Vec::new();
        self.pending.take_current(&mut current);

        // rounding may put a delivery at the step boundary; it then belongs to the next step
        let (late, mut due): (Vec<_>, Vec<_>) =
            current.into_iter().partition(|d| d.time >= t_end);
        for delivery in late {
            self.pending.push(0, delivery);
        }
        for delivery in &mut due {
            delivery.time = delivery.time.max(self.t);
        }

        due.sort_by(|a, b| a.target.cmp(&b.target).then(a.time.total_cmp(&b.time)));
        self.new_spikes.clear();

        let mut start = 0;
        for nid in 0..population.num_neurons() {
            let end = start + due[start..].iter().take_while(|d| d.target == nid).count();
            self.evolve_neuron(population, nid, &due[start..end], t_end)?;
            start = end;
        }

        self.new_spikes.sort();

        for spike_event in &self.new_spikes {
            for edge in population.network().out_edges(spike_event.id) {
                let delivery_time = spike_event.time + edge.delay;

                self.pending.push(
                    ring_offset(delivery_time, t_end, self.dt, self.pending.horizon()),
                    Delivery {
                        time: delivery_time,
                        source: spike_event.id,
                        target: edge.target,
                        strength: edge.strength,
                    },
                );
            }
        }

        spike_events.extend_from_slice(&self.new_spikes);
        self.t = t_end;
        Ok(())
    }
}
