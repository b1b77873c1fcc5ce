use crate::params::ConductanceParams;

// layout from `offset`: gE, gI for jump kinetics, gE, gI, gE_s, gI_s for smoothed kinetics
#[derive(Debug, Clone)]
pub struct Conductance {
    params: ConductanceParams,
    offset: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Propagator {
    exp_e: f64,
    exp_i: f64,
    smoothing: Option<Smoothing>,
}

#[derive(Debug, Clone, Copy)]
struct Smoothing {
    exp_e_s: f64,
    exp_i_s: f64,
    coef_e: f64,
    coef_i: f64,
}

impl Conductance {
    pub fn new(params: &ConductanceParams, offset: usize) -> Self {
        Self {
            params: params.clone(),
            offset,
        }
    }

    pub fn num_vars(&self) -> usize {
        self.params.num_vars()
    }

    pub fn id_ge(&self) -> usize {
        self.offset
    }

    pub fn id_gi(&self) -> usize {
        self.offset + 1
    }

    pub fn id_ge_inject(&self) -> usize {
        match self.params {
            ConductanceParams::Jump { .. } => self.id_ge(),
            ConductanceParams::Smoothed { .. } => self.offset + 2,
        }
    }

    pub fn id_gi_inject(&self) -> usize {
        match self.params {
            ConductanceParams::Jump { .. } => self.id_gi(),
            ConductanceParams::Smoothed { .. } => self.offset + 3,
        }
    }

    pub fn propagator(&self, dt: f64) -> Propagator {
        match self.params {
            ConductanceParams::Jump { tau_ge, tau_gi } => Propagator {
                exp_e: (-dt / tau_ge).exp(),
                exp_i: (-dt / tau_gi).exp(),
                smoothing: None,
            },
            ConductanceParams::Smoothed {
                tau_ge,
                tau_ge_s,
                tau_gi,
                tau_gi_s,
            } => {
                let exp_e = (-dt / tau_ge).exp();
                let exp_i = (-dt / tau_gi).exp();
                let exp_e_s = (-dt / tau_ge_s).exp();
                let exp_i_s = (-dt / tau_gi_s).exp();
                Propagator {
                    exp_e,
                    exp_i,
                    smoothing: Some(Smoothing {
                        exp_e_s,
                        exp_i_s,
                        coef_e: (exp_e - exp_e_s) * tau_ge * tau_ge_s / (tau_ge - tau_ge_s),
                        coef_i: (exp_i - exp_i_s) * tau_gi * tau_gi_s / (tau_gi - tau_gi_s),
                    }),
                }
            }
        }
    }

    pub fn advance(&self, y: &mut [f64], dt: f64) {
        self.propagator(dt).apply(y, self.offset);
    }
}

impl Propagator {
    pub fn apply(&self, y: &mut [f64], offset: usize) {
        match self.smoothing {
            None => {
                y[offset] *= self.exp_e;
                y[offset + 1] *= self.exp_i;
            }
            Some(s) => {
                y[offset] = self.exp_e * y[offset] + s.coef_e * y[offset + 2];
                y[offset + 1] = self.exp_i * y[offset + 1] + s.coef_i * y[offset + 3];
                y[offset + 2] *= s.exp_e_s;
                y[offset + 3] *= s.exp_i_s;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_util::assert_approx_eq_slice_eps;
    use float_cmp::assert_approx_eq;

    fn smoothed() -> Conductance {
        Conductance::new(
            &ConductanceParams::Smoothed {
                tau_ge: 2.0,
                tau_ge_s: 0.5,
                tau_gi: 5.0,
                tau_gi_s: 0.8,
            },
            1,
        )
    }

    #[test]
    fn jump_decay() {
        let sut = Conductance::new(
            &ConductanceParams::Jump {
                tau_ge: 2.0,
                tau_gi: 5.0,
            },
            1,
        );
        let mut y = [0.3, 1.0, 2.0];
        sut.advance(&mut y, 1.5);
        assert_eq!(y[0], 0.3);
        assert_approx_eq!(f64, y[1], (-0.75f64).exp());
        assert_approx_eq!(f64, y[2], 2.0 * (-0.3f64).exp());
        assert_eq!(sut.id_ge_inject(), 1);
        assert_eq!(sut.id_gi_inject(), 2);
    }

    #[test]
    fn smoothed_layout() {
        let sut = smoothed();
        assert_eq!(sut.num_vars(), 4);
        assert_eq!(sut.id_ge(), 1);
        assert_eq!(sut.id_gi(), 2);
        assert_eq!(sut.id_ge_inject(), 3);
        assert_eq!(sut.id_gi_inject(), 4);
    }

    #[test]
    fn smoothed_rise_then_decay() {
        let sut = smoothed();
        let mut y = [0.0, 0.0, 0.0, 1.0, 0.0];
        sut.advance(&mut y, 0.5);
        let early = y[1];
        assert!(early > 0.0);
        sut.advance(&mut y, 10.0);
        assert!(y[1] < early);
        assert_eq!(y[2], 0.0);
    }

    #[test]
    fn split_propagation_matches_single() {
        let sut = smoothed();
        let mut split = [0.0, 0.4, 0.2, 1.0, 0.7];
        let mut single = split;
        sut.advance(&mut split, 0.3);
        sut.advance(&mut split, 0.45);
        sut.advance(&mut single, 0.75);
        assert_approx_eq_slice_eps(&split, &single, 1e-12);
    }

    #[test]
    fn backward_propagation_inverts_forward() {
        let sut = smoothed();
        let initial = [0.0, 0.4, 0.2, 1.0, 0.7];
        let mut y = initial;
        sut.advance(&mut y, 0.6);
        sut.advance(&mut y, -0.6);
        assert_approx_eq_slice_eps(&y, &initial, 1e-12);
    }
}
