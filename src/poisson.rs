use log::debug;
use rand::{distributions::Distribution, rngs::StdRng, Rng};
use statrs::distribution::Exp;

use crate::{
    params::{InputParams, PoissonParams},
    util,
};

// generated horizon beyond the last consumed event, in mean inter-arrival times
const HORIZON_MARGIN: f64 = 12.0;

// compact when fewer than one seventh of the consumed events remain undelivered
const SHRINK_RATIO: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    pub time: f64,
    pub strength: f64,
}

impl InputEvent {
    fn sentinel() -> Self {
        Self {
            time: f64::INFINITY,
            strength: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct PoissonSource {
    total_rate: f64,
    fraction_excitatory: f64,
    strength_excitatory: f64,
    strength_inhibitory: f64,
    gap: Exp,
    rng: StdRng,
}

impl PoissonSource {
    fn draw_after(&mut self, t: f64) -> InputEvent {
        let time = t + self.gap.sample(&mut self.rng);
        let is_excitatory =
            self.fraction_excitatory >= 1.0 || self.rng.gen_bool(self.fraction_excitatory);

        let strength = if is_excitatory {
            self.strength_excitatory
        } else {
            -self.strength_inhibitory
        };

        InputEvent { time, strength }
    }
}

#[derive(Debug, Clone)]
pub struct PoissonTimeSeq {
    events: Vec<InputEvent>,
    id_seq: usize,
    source: Option<PoissonSource>,
    auto_shrink: bool,
}

impl PoissonTimeSeq {
    pub fn new(params: &PoissonParams, rng: StdRng, t0: f64) -> Self {
        let total_rate = params.rate_excitatory + params.rate_inhibitory;

        let source = Exp::new(total_rate).ok().map(|gap| PoissonSource {
            total_rate,
            fraction_excitatory: params.rate_excitatory / total_rate,
            strength_excitatory: params.strength_excitatory,
            strength_inhibitory: params.strength_inhibitory,
            gap,
            rng,
        });

        let mut seq = Self {
            events: Vec::new(),
            id_seq: 0,
            source,
            auto_shrink: false,
        };
        seq.init(t0);
        seq
    }

    pub fn from_events(mut events: Vec<InputEvent>) -> Self {
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        events.push(InputEvent::sentinel());

        Self {
            events,
            id_seq: 0,
            source: None,
            auto_shrink: false,
        }
    }

    pub fn init(&mut self, t0: f64) {
        self.events.clear();
        self.id_seq = 0;

        let first = match &mut self.source {
            Some(source) => source.draw_after(t0),
            None => InputEvent::sentinel(),
        };
        self.events.push(first);
    }

    pub fn add_events_until_time(&mut self, t_until: f64) {
        if let Some(source) = &mut self.source {
            let mut last = self.events[self.events.len() - 1];
            while last.time < t_until {
                last = source.draw_after(last.time);
                self.events.push(last);
            }
        }
    }

    pub fn front(&self) -> InputEvent {
        self.events[self.id_seq]
    }

    pub fn pop_and_fill(&mut self) {
        self.id_seq += 1;

        if self.id_seq < self.events.len() {
            return;
        }

        let back = self.events[self.events.len() - 1].time;

        match &self.source {
            Some(source) if back.is_finite() => {
                let horizon = back + HORIZON_MARGIN / source.total_rate;
                if self.auto_shrink {
                    self.init(back);
                }
                self.add_events_until_time(horizon);
            }
            _ => {
                // hold at the sentinel
                self.id_seq -= 1;
            }
        }
    }

    pub fn shrink(&mut self) {
        self.events.drain(..self.id_seq);
        self.id_seq = 0;
    }

    pub fn id_seq(&self) -> usize {
        self.id_seq
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    fn set_id_seq(&mut self, id_seq: usize) {
        self.id_seq = id_seq;
    }
}

#[derive(Debug, Clone)]
pub struct PoissonTimeVec {
    seqs: Vec<PoissonTimeSeq>,
    saved_id_seq: Vec<usize>,
}

impl PoissonTimeVec {
    pub fn new(seqs: Vec<PoissonTimeSeq>) -> Self {
        let saved_id_seq = seqs.iter().map(|seq| seq.id_seq()).collect();
        Self { seqs, saved_id_seq }
    }

    pub fn generate(input_params: &InputParams, num_neurons: usize, seed: u64, t0: f64) -> Self {
        let poisson_params_for = |nid: usize| match &input_params.per_neuron_poisson {
            Some(per_neuron_poisson) => &per_neuron_poisson[nid],
            None => &input_params.poisson,
        };

        let seqs = match &input_params.fixed_events {
            Some(fixed_events) => {
                let mut per_neuron_events = vec![Vec::new(); num_neurons];

                for event in fixed_events.iter().filter(|event| event.time >= t0) {
                    per_neuron_events[event.neuron_id].push(InputEvent {
                        time: event.time,
                        strength: poisson_params_for(event.neuron_id).strength_excitatory,
                    });
                }

                per_neuron_events
                    .into_iter()
                    .map(PoissonTimeSeq::from_events)
                    .collect()
            }
            None => (0..num_neurons)
                .map(|nid| {
                    PoissonTimeSeq::new(
                        poisson_params_for(nid),
                        util::neuron_rng(seed, nid, "poisson"),
                        t0,
                    )
                })
                .collect(),
        };

        Self::new(seqs)
    }

    // only valid for simulators that never restore a saved cursor
    pub fn set_auto_shrink(&mut self, auto_shrink: bool) {
        for seq in &mut self.seqs {
            seq.auto_shrink = auto_shrink;
        }
    }

    #[cfg(test)]
    pub fn seq(&self, nid: usize) -> &PoissonTimeSeq {
        &self.seqs[nid]
    }

    pub fn seq_mut(&mut self, nid: usize) -> &mut PoissonTimeSeq {
        &mut self.seqs[nid]
    }

    pub fn save_idx_and_clean(&mut self) {
        for nid in 0..self.seqs.len() {
            self.save_idx_and_clean_single(nid);
        }
    }

    pub fn save_idx_and_clean_for(&mut self, nids: &[usize]) {
        for &nid in nids {
            self.save_idx_and_clean_single(nid);
        }
    }

    pub fn restore_idx(&mut self) {
        for (seq, &id_seq) in self.seqs.iter_mut().zip(&self.saved_id_seq) {
            seq.set_id_seq(id_seq);
        }
    }

    pub fn restore_idx_for(&mut self, nids: &[usize]) {
        for &nid in nids {
            self.seqs[nid].set_id_seq(self.saved_id_seq[nid]);
        }
    }

    fn save_idx_and_clean_single(&mut self, nid: usize) {
        let seq = &mut self.seqs[nid];

        if seq.len() - seq.id_seq() < seq.id_seq() / SHRINK_RATIO {
            debug!(
                "input sequence of neuron {} shrunk, {} delivered events dropped",
                nid,
                seq.id_seq()
            );
            seq.shrink();
        }

        self.saved_id_seq[nid] = seq.id_seq();
    }
}
