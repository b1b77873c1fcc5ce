use std::io::{BufRead, Write};
use std::str::FromStr;

use log::warn;
use simple_error::{SimpleError, SimpleResult};

use crate::{
    instance::Instance,
    params::{EdgeParams, InputEventParams},
    spike_event::SpikeEvent,
};

fn parse<T: FromStr>(token: &str, line_no: usize) -> SimpleResult<T> {
    token.parse().map_err(|_| {
        SimpleError::new(format!("line {}: cannot parse '{}'", line_no + 1, token))
    })
}

fn parse_line<T: FromStr>(line: &str, line_no: usize) -> SimpleResult<Vec<T>> {
    line.split_whitespace()
        .map(|token| parse(token, line_no))
        .collect()
}

fn io_error(err: std::io::Error) -> SimpleError {
    SimpleError::from(err)
}

// row i, column j is the effect of neuron j on neuron i
pub fn read_network_dense<R: BufRead>(reader: R, num_neurons: usize) -> SimpleResult<Vec<EdgeParams>> {
    let mut values: Vec<f64> = Vec::with_capacity(num_neurons * num_neurons);

    for (line_no, line) in reader.lines().enumerate() {
        values.extend(parse_line::<f64>(&line.map_err(io_error)?, line_no)?);
    }

    if values.len() < num_neurons * num_neurons {
        return Err(SimpleError::new(format!(
            "dense network needs {} entries, found {}",
            num_neurons * num_neurons,
            values.len()
        )));
    }

    let mut edges = Vec::new();

    for to in 0..num_neurons {
        for from in 0..num_neurons {
            let weight = values[to * num_neurons + from];

            if weight > 0.0 && weight.is_finite() && from != to {
                edges.push(EdgeParams {
                    from,
                    to,
                    weight,
                    delay: None,
                });
            }
        }
    }

    Ok(edges)
}

pub fn read_network_edges<R: BufRead>(reader: R, num_neurons: usize) -> SimpleResult<Vec<EdgeParams>> {
    let mut edges = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(io_error)?;
        let tokens: Vec<&str> = line.split_whitespace().collect();

        if tokens.is_empty() {
            continue;
        }

        if !(3..=4).contains(&tokens.len()) {
            return Err(SimpleError::new(format!(
                "line {}: expected 'from to weight [delay]'",
                line_no + 1
            )));
        }

        let from: usize = parse(tokens[0], line_no)?;
        let to: usize = parse(tokens[1], line_no)?;

        if from >= num_neurons || to >= num_neurons {
            return Err(SimpleError::new(format!(
                "line {}: neuron id out of range",
                line_no + 1
            )));
        }

        edges.push(EdgeParams {
            from,
            to,
            weight: parse(tokens[2], line_no)?,
            delay: tokens.get(3).map(|token| parse(token, line_no)).transpose()?,
        });
    }

    Ok(edges)
}

pub fn read_input_events<R: BufRead>(
    reader: R,
    num_neurons: usize,
) -> SimpleResult<Vec<InputEventParams>> {
    let mut tokens = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(io_error)?;
        tokens.extend(
            line.split_whitespace()
                .map(|token| (token.to_string(), line_no)),
        );
    }

    if tokens.len() % 2 != 0 {
        warn!("trailing token in input event file ignored");
    }

    tokens
        .chunks_exact(2)
        .map(|pair| {
            let neuron_id: usize = parse(&pair[0].0, pair[0].1)?;

            if neuron_id >= num_neurons {
                return Err(SimpleError::new(format!(
                    "input event neuron id out of range: {}",
                    neuron_id
                )));
            }

            Ok(InputEventParams {
                neuron_id,
                time: parse(&pair[1].0, pair[1].1)?,
            })
        })
        .collect()
}

pub fn read_initial_state<R: BufRead>(
    reader: R,
    num_neurons: usize,
    default_state: &[f64],
) -> SimpleResult<Vec<Vec<f64>>> {
    let mut states = vec![default_state.to_vec(); num_neurons];
    let mut num_read = 0;

    for (line_no, line) in reader.lines().enumerate() {
        let values = parse_line::<f64>(&line.map_err(io_error)?, line_no)?;

        if values.is_empty() {
            continue;
        }

        if num_read == num_neurons {
            warn!("initial state has more lines than neurons, rest ignored");
            break;
        }

        if values.len() != default_state.len() {
            return Err(SimpleError::new(format!(
                "line {}: expected {} values, found {}",
                line_no + 1,
                default_state.len(),
                values.len()
            )));
        }

        states[num_read] = values;
        num_read += 1;
    }

    Ok(states)
}

pub fn write_raster<W: Write>(writer: &mut W, spike_events: &[SpikeEvent]) -> SimpleResult<()> {
    for spike_event in spike_events {
        writeln!(writer, "{}\t{}", spike_event.id + 1, spike_event.time).map_err(io_error)?;
    }
    Ok(())
}

pub fn write_voltages<W: Write>(
    writer: &mut W,
    voltages: impl Iterator<Item = f64>,
) -> SimpleResult<()> {
    for v in voltages {
        writer.write_all(&v.to_ne_bytes()).map_err(io_error)?;
    }
    Ok(())
}

// one frame per completed step, none for the initial state
pub fn run_with_voltage_trace<W: Write>(
    instance: &mut Instance,
    t_stop: f64,
    writer: &mut W,
) -> SimpleResult<Vec<SpikeEvent>> {
    let mut spike_events = Vec::new();

    while instance.t() + 0.5 * instance.dt() < t_stop {
        spike_events.append(&mut instance.next_dt()?.spike_events);
        write_voltages(writer, instance.extract_state_snapshot().voltages())?;
    }

    Ok(spike_events)
}

pub fn mean_isi(t: f64, spike_counts: &[usize]) -> Vec<f64> {
    spike_counts
        .iter()
        .map(|&count| t / count as f64)
        .collect()
}

pub fn write_isi<W: Write>(writer: &mut W, t: f64, spike_counts: &[usize]) -> SimpleResult<()> {
    let line = mean_isi(t, spike_counts)
        .iter()
        .map(|isi| isi.to_string())
        .collect::<Vec<_>>()
        .join("\t");
    writeln!(writer, "{}", line).map_err(io_error)
}
