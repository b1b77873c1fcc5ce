use std::fmt::Debug;

use simple_error::SimpleResult;

use crate::{
    conductance::Conductance,
    neuron::NeuronModel,
    params::{HhParams, SpikeCrossing},
    root_finder::{cubic_hermit_real_peak, cubic_hermit_real_root},
};

const ID_V: usize = 0;
const ID_H: usize = 1;
const ID_M: usize = 2;
const ID_N: usize = 3;
const NUM_SOMA_VARS: usize = 4;

// resting point of the soma variables with zero input
const DEFAULT_SOMA_STATE: [f64; NUM_SOMA_VARS] = [
    2.7756626542950876e-04,
    5.9611104634682788e-01,
    5.2934217620863984e-02,
    3.1768116757978115e-01,
];

pub trait ExternalCurrent: Debug + Send + Sync {
    fn at(&self, t: f64) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct ZeroCurrent;

#[derive(Debug, Clone, Copy)]
pub struct ConstantCurrent {
    pub amplitude: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SineCurrent {
    pub amplitude: f64,
    pub angular_frequency: f64,
    pub phase: f64,
}

impl ExternalCurrent for ZeroCurrent {
    fn at(&self, _t: f64) -> f64 {
        0.0
    }
}

impl ExternalCurrent for ConstantCurrent {
    fn at(&self, _t: f64) -> f64 {
        self.amplitude
    }
}

impl ExternalCurrent for SineCurrent {
    fn at(&self, t: f64) -> f64 {
        self.amplitude * (self.angular_frequency * t + self.phase).sin()
    }
}

#[derive(Debug, Clone)]
pub struct Hh<I: ExternalCurrent> {
    params: HhParams,
    conductance: Conductance,
    current: I,
}

// x / (exp(x) - 1), continuous at zero
fn x_over_expm1(x: f64) -> f64 {
    if x.abs() < 1e-9 {
        1.0 - 0.5 * x
    } else {
        x / x.exp_m1()
    }
}

impl<I: ExternalCurrent> Hh<I> {
    pub fn new(params: &HhParams, current: I) -> Self {
        Self {
            params: params.clone(),
            conductance: Conductance::new(&params.conductance, NUM_SOMA_VARS),
            current,
        }
    }

    fn soma_derivative(&self, y: &[f64], t: f64) -> [f64; NUM_SOMA_VARS] {
        let p = &self.params;
        let v = y[ID_V];
        let h = y[ID_H];
        let m = y[ID_M];
        let n = y[ID_N];
        let ge = y[self.conductance.id_ge()];
        let gi = y[self.conductance.id_gi()];

        let dv = -(v - p.v_na) * p.g_na * h * m * m * m
            - (v - p.v_k) * p.g_k * n * n * n * n
            - (v - p.v_l) * p.g_l
            - (v - p.v_ge) * ge
            - (v - p.v_gi) * gi
            + self.current.at(t);

        let alpha_h = 0.07 * (-v / 20.0).exp();
        let beta_h = 1.0 / ((3.0 - 0.1 * v).exp() + 1.0);
        let alpha_m = x_over_expm1(2.5 - 0.1 * v);
        let beta_m = 4.0 * (-v / 18.0).exp();
        let alpha_n = 0.1 * x_over_expm1(1.0 - 0.1 * v);
        let beta_n = 0.125 * (-v / 80.0).exp();

        [
            dv,
            alpha_h * (1.0 - h) - beta_h * h,
            alpha_m * (1.0 - m) - beta_m * m,
            alpha_n * (1.0 - n) - beta_n * n,
        ]
    }

    fn dv(&self, y: &[f64], t: f64) -> f64 {
        self.soma_derivative(y, t)[ID_V]
    }

    fn rk4(&self, y: &mut [f64], t: f64, dt: f64) -> f64 {
        let half_step = self.conductance.propagator(0.5 * dt);
        let offset = self.conductance.id_ge();
        let mut y_n = [0.0; NUM_SOMA_VARS];
        y_n.copy_from_slice(&y[..NUM_SOMA_VARS]);

        let k1 = self.soma_derivative(y, t);
        half_step.apply(y, offset);
        for i in 0..NUM_SOMA_VARS {
            y[i] = y_n[i] + 0.5 * dt * k1[i];
        }
        let k2 = self.soma_derivative(y, t + 0.5 * dt);
        for i in 0..NUM_SOMA_VARS {
            y[i] = y_n[i] + 0.5 * dt * k2[i];
        }
        let k3 = self.soma_derivative(y, t + 0.5 * dt);
        half_step.apply(y, offset);
        for i in 0..NUM_SOMA_VARS {
            y[i] = y_n[i] + dt * k3[i];
        }
        let k4 = self.soma_derivative(y, t + dt);
        for i in 0..NUM_SOMA_VARS {
            y[i] = y_n[i] + dt / 6.0 * (k1[i] + 2.0 * (k2[i] + k3[i]) + k4[i]);
        }

        k1[ID_V]
    }

    fn detect_spike(&self, y: &[f64], v0: f64, v1: f64, k0: f64, t: f64, dt: f64) -> Option<f64> {
        let threshold = self.params.v_threshold;

        match self.params.spike_crossing {
            SpikeCrossing::Rising if v0 < threshold && v1 >= threshold => {
                let k1 = self.dv(y, t + dt);
                Some(
                    cubic_hermit_real_root(dt, v0, v1, k0, k1, threshold)
                        .unwrap_or_else(|| dt * (threshold - v0) / (v1 - v0)),
                )
            }
            SpikeCrossing::Falling if v0 > threshold && v1 <= threshold => {
                let k1 = self.dv(y, t + dt);
                Some(
                    cubic_hermit_real_root(dt, v0, v1, k0, k1, threshold)
                        .unwrap_or_else(|| dt * (threshold - v0) / (v1 - v0)),
                )
            }
            SpikeCrossing::Peak if v0 >= threshold && k0 >= 0.0 => {
                let k1 = self.dv(y, t + dt);
                if k1 < 0.0 {
                    Some(
                        cubic_hermit_real_peak(dt, v0, v1, k0, k1)
                            .unwrap_or_else(|| dt * k0 / (k0 - k1)),
                    )
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl<I: ExternalCurrent> NeuronModel for Hh<I> {
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
        NUM_SOMA_VARS + self.conductance.num_vars()
    }

    fn default_state(&self) -> Vec<f64> {
        let mut state = DEFAULT_SOMA_STATE.to_vec();
        state.resize(self.num_vars(), 0.0);
        state
    }

    // no hand reset; the timer only masks detection at the start of the next fragment
    fn force_reset(&self, _y: &mut [f64], t_in_refractory: &mut f64) {
        *t_in_refractory = f64::MIN_POSITIVE;
    }

    fn step_quiet(
        &self,
        y: &mut [f64],
        t_in_refractory: &mut f64,
        t: f64,
        dt: f64,
    ) -> SimpleResult<Option<f64>> {
        let v0 = y[ID_V];
        let k0 = self.rk4(y, t, dt);
        let v1 = y[ID_V];

        let spike = if *t_in_refractory == 0.0 && dt > 0.0 {
            self.detect_spike(y, v0, v1, k0, t, dt)
        } else {
            None
        };

        if dt > 0.0 {
            *t_in_refractory = 0.0;
        }

        Ok(spike)
    }
}
