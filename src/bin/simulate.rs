use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    process::ExitCode,
};

use log::{error, info};
use pulsenet::{
    instance::create_instance,
    io,
    neuron,
    params::{InstanceParams, NetworkParams},
};
use serde::{Deserialize, Serialize};
use simple_error::{try_with, SimpleResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunConfig {
    instance: InstanceParams,
    t_stop: f64,
    #[serde(default)]
    network_path: Option<String>,
    #[serde(default)]
    edges_path: Option<String>,
    #[serde(default)]
    input_events_path: Option<String>,
    #[serde(default)]
    initial_state_path: Option<String>,
    #[serde(default)]
    raster_path: Option<String>,
    #[serde(default)]
    voltage_path: Option<String>,
    #[serde(default)]
    isi_path: Option<String>,
    #[serde(default)]
    snapshot_path: Option<String>,
}

fn open(path: &str) -> SimpleResult<BufReader<File>> {
    Ok(BufReader::new(try_with!(File::open(path), "cannot open {}", path)))
}

fn create(path: &str) -> SimpleResult<BufWriter<File>> {
    Ok(BufWriter::new(try_with!(
        File::create(path),
        "cannot create {}",
        path
    )))
}

fn load_config(path: &str) -> SimpleResult<RunConfig> {
    let mut config: RunConfig = try_with!(
        serde_yaml::from_reader(open(path)?),
        "cannot parse run config {}",
        path
    );

    let params = &mut config.instance;
    let num_neurons = params.population.num_neurons();

    if let Some(network_path) = &config.network_path {
        let edges = io::read_network_dense(open(network_path)?, num_neurons)?;
        params.network = NetworkParams::Explicit(edges);
    }

    if let Some(edges_path) = &config.edges_path {
        let edges = io::read_network_edges(open(edges_path)?, num_neurons)?;
        params.network = NetworkParams::Explicit(edges);
    }

    if let Some(input_events_path) = &config.input_events_path {
        let events = io::read_input_events(open(input_events_path)?, num_neurons)?;
        params.input.fixed_events = Some(events);
    }

    if let Some(initial_state_path) = &config.initial_state_path {
        let default_state = neuron::create(&params.neuron_model).default_state();
        let states =
            io::read_initial_state(open(initial_state_path)?, num_neurons, &default_state)?;
        params.initial_state = Some(states);
    }

    Ok(config)
}

fn run(config_path: &str) -> SimpleResult<()> {
    let config = load_config(config_path)?;
    let mut instance = create_instance(config.instance)?;

    let spike_events = match config.voltage_path.as_deref() {
        Some(voltage_path) => {
            let mut writer = create(voltage_path)?;
            let spike_events =
                io::run_with_voltage_trace(&mut instance, config.t_stop, &mut writer)?;
            try_with!(writer.flush(), "cannot write {}", voltage_path);
            spike_events
        }
        None => instance.run_until(config.t_stop)?,
    };

    info!(
        "simulation finished at t = {}, {} spikes",
        instance.t(),
        spike_events.len()
    );

    if let Some(raster_path) = &config.raster_path {
        let mut writer = create(raster_path)?;
        io::write_raster(&mut writer, &spike_events)?;
        try_with!(writer.flush(), "cannot write {}", raster_path);
    }

    if let Some(isi_path) = &config.isi_path {
        let mut writer = create(isi_path)?;
        io::write_isi(&mut writer, instance.t(), instance.spike_counts())?;
        try_with!(writer.flush(), "cannot write {}", isi_path);
    }

    if let Some(snapshot_path) = &config.snapshot_path {
        try_with!(
            serde_json::to_writer_pretty(create(snapshot_path)?, &instance.extract_state_snapshot()),
            "cannot write {}",
            snapshot_path
        );
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() != 2 {
        eprintln!("usage: {} <run_config.yaml>", args[0]);
        return ExitCode::from(2);
    }

    match run(&args[1]) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
