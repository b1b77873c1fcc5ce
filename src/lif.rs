use log::debug;
use simple_error::{SimpleError, SimpleResult};

use crate::{
    conductance::Conductance, neuron::NeuronModel, params::LifParams,
    root_finder::cubic_hermit_real_root,
};

const ID_V: usize = 0;

#[derive(Debug, Clone)]
pub struct Lif {
    params: LifParams,
    conductance: Conductance,
}

impl Lif {
    pub fn new(params: &LifParams) -> Self {
        Self {
            params: params.clone(),
            conductance: Conductance::new(&params.conductance, ID_V + 1),
        }
    }

    fn dv(&self, y: &[f64]) -> f64 {
        let p = &self.params;
        let v = y[ID_V];
        let ge = y[self.conductance.id_ge()];
        let gi = y[self.conductance.id_gi()];

        -p.g_leak * (v - p.v_leakage)
            - ge * (v - p.v_excitatory)
            - gi * (v - p.v_inhibitory)
            - p.dendritic_alpha * ge * gi * (v - p.v_excitatory)
    }

    fn rk4(&self, y: &mut [f64], dt: f64) -> f64 {
        let half_step = self.conductance.propagator(0.5 * dt);
        let offset = self.conductance.id_ge();
        let v_n = y[ID_V];

        let k1 = self.dv(y);
        half_step.apply(y, offset);
        y[ID_V] = v_n + 0.5 * dt * k1;
        let k2 = self.dv(y);
        y[ID_V] = v_n + 0.5 * dt * k2;
        let k3 = self.dv(y);
        half_step.apply(y, offset);
        y[ID_V] = v_n + dt * k3;
        let k4 = self.dv(y);
        y[ID_V] = v_n + dt / 6.0 * (k1 + 2.0 * (k2 + k3) + k4);

        k1
    }

    fn step_continuous(&self, y: &mut [f64], dt: f64) -> Option<f64> {
        let v0 = y[ID_V];
        let k1 = self.rk4(y, dt);

        if !(dt > 0.0) {
            return None;
        }

        let v1 = y[ID_V];
        let threshold = self.params.v_threshold;

        if v0 <= threshold && v1 > threshold {
            let t_spike = cubic_hermit_real_root(dt, v0, v1, k1, self.dv(y), threshold)
                .unwrap_or_else(|| dt * (threshold - v0) / (v1 - v0));
            return Some(t_spike);
        }

        self.near_miss(y, v0, v1, k1, dt)
    }

    fn near_miss(&self, y: &[f64], v0: f64, v1: f64, k1: f64, dt: f64) -> Option<f64> {
        let near_miss = self.params.near_miss.as_ref()?;
        let threshold = self.params.v_threshold;

        if !(v0 > near_miss.v_min && k1 > 0.0) {
            return None;
        }

        // quadratic through v0, v1 with slope k1 at the start
        let a = (v1 - v0 - k1 * dt) / (dt * dt);
        let t_max_guess = -k1 / (2.0 * a);

        if t_max_guess > 0.0 && t_max_guess < dt && k1 * k1 / (-4.0 * a) + v0 >= threshold {
            debug!("near-miss excursion captured, guess time: {}", t_max_guess);
            cubic_hermit_real_root(dt, v0, v1, k1, self.dv(y), threshold)
        } else {
            None
        }
    }
}

impl NeuronModel for Lif {
    fn threshold(&self) -> f64 {
        self.params.v_threshold
    }

    fn id_v(&self) -> usize {
        ID_V
    }

    fn id_ge(&self) -> usize {
        self.conductance.id_ge()
    }

    fn id_gi(&self) -> usize {
        self.conductance.id_gi()
    }

    fn id_ge_inject(&self) -> usize {
        self.conductance.id_ge_inject()
    }

    fn id_gi_inject(&self) -> usize {
        self.conductance.id_gi_inject()
    }

    fn num_vars(&self) -> usize {
        1 + self.conductance.num_vars()
    }

    fn default_state(&self) -> Vec<f64> {
        vec![0.0; self.num_vars()]
    }

    fn force_reset(&self, y: &mut [f64], t_in_refractory: &mut f64) {
        y[ID_V] = self.params.v_reset;
        *t_in_refractory = f64::MIN_POSITIVE;
    }

    fn step_quiet(
        &self,
        y: &mut [f64],
        t_in_refractory: &mut f64,
        t: f64,
        dt: f64,
    ) -> SimpleResult<Option<f64>> {
        let time_refractory = self.params.time_refractory;

        if *t_in_refractory == 0.0 {
            let spike = self.step_continuous(y, dt);

            if let Some(t_spike) = spike {
                *t_in_refractory = dt - t_spike + f64::MIN_POSITIVE;
                y[ID_V] = self.params.v_reset;

                if *t_in_refractory >= time_refractory {
                    // refractory period ends inside this step
                    let dt_remain = *t_in_refractory - time_refractory;
                    *t_in_refractory = 0.0;
                    self.conductance.advance(y, -dt_remain);

                    if let Some(t_second) = self.step_continuous(y, dt_remain) {
                        return Err(SimpleError::new(format!(
                            "multiple spikes in one step: t = {}, dt = {}, first spike at {}, second spike at {}",
                            t,
                            dt,
                            t_spike,
                            dt - dt_remain + t_second
                        )));
                    }
                }
            }

            Ok(spike)
        } else {
            let remaining_refractory = time_refractory - *t_in_refractory;

            if remaining_refractory < dt {
                self.conductance.advance(y, remaining_refractory);
                *t_in_refractory = 0.0;
                let spike = self.step_quiet(
                    y,
                    t_in_refractory,
                    t + remaining_refractory,
                    dt - remaining_refractory,
                )?;
                Ok(spike.map(|t_spike| t_spike + remaining_refractory))
            } else {
                self.conductance.advance(y, dt);
                *t_in_refractory += dt;
                Ok(None)
            }
        }
    }
}
