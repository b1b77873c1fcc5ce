use std::fmt::Debug;

use simple_error::SimpleResult;

use crate::{
    hh::{ConstantCurrent, Hh, SineCurrent, ZeroCurrent},
    lif::Lif,
    params::{CurrentParams, NeuronModelParams},
};

pub trait NeuronModel: Debug + Send + Sync {
    fn threshold(&self) -> f64;
    fn id_v(&self) -> usize;
    fn id_ge(&self) -> usize;
    fn id_gi(&self) -> usize;
    fn id_ge_inject(&self) -> usize;
    fn id_gi_inject(&self) -> usize;
    fn num_vars(&self) -> usize;
    fn default_state(&self) -> Vec<f64>;

    fn force_reset(&self, y: &mut [f64], t_in_refractory: &mut f64);

    // spike time is relative to `t`
    fn step_quiet(
        &self,
        y: &mut [f64],
        t_in_refractory: &mut f64,
        t: f64,
        dt: f64,
    ) -> SimpleResult<Option<f64>>;
}

pub fn create(model_params: &NeuronModelParams) -> Box<dyn NeuronModel> {
    match model_params {
        NeuronModelParams::Lif(lif_params) => Box::new(Lif::new(lif_params)),
        NeuronModelParams::Hh(hh_params) => match hh_params.current {
            CurrentParams::Zero => Box::new(Hh::new(hh_params, ZeroCurrent)),
            CurrentParams::Constant { amplitude } => {
                Box::new(Hh::new(hh_params, ConstantCurrent { amplitude }))
            }
            CurrentParams::Sine {
                amplitude,
                angular_frequency,
                phase,
            } => Box::new(Hh::new(
                hh_params,
                SineCurrent {
                    amplitude,
                    angular_frequency,
                    phase,
                },
            )),
        },
    }
}
