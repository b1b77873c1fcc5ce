pub mod instance;
pub mod io;
pub mod neuron;
pub mod params;
pub mod root_finder;
pub mod spike_event;
pub mod state_snapshot;

mod conductance;
mod delay;
mod hh;
mod lif;
mod network;
mod poisson;
mod population;
mod simulator;
mod sparse;
mod types;
mod util;
