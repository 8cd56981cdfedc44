use std::{cell::RefCell, rc::Rc};

use itertools::Itertools;
use pe_grid::{
    accelerator::{
        component::Component,
        event::{EventLog, PeEvent},
    },
    settings::Settings,
    sim_result::PeGridResult,
    System,
};

#[test]
fn test_system() -> Result<(), Box<dyn std::error::Error>> {
    simple_logger::init_with_level(log::Level::Info).unwrap_or(());

    let mut results = PeGridResult::new();
    let settings = Settings::new(vec!["configs/default.toml".into()])?;
    results.settings = Some(settings.clone());

    let mut system = System::from_settings(&settings)?;
    let stat = system.run()?;
    assert!(stat.completed);
    let stream_len = settings.stimulus.activations[0].len();
    assert_eq!(stat.results.len(), settings.grid_settings.rows);
    for row in &stat.results {
        assert_eq!(row.len(), stream_len);
    }
    for pe in stat.pe_stats.iter().flatten() {
        assert_eq!(pe.accepted_inputs, stream_len as u64);
        assert_eq!(pe.produced_results, stream_len as u64);
        assert_eq!(pe.delivered_results, stream_len as u64);
    }
    // the second column accumulates the forwarded activations with its own weight:
    // row 0 weighs 1, 2, 3, 4 by 2 and row 1 weighs -1, -2, 5, 6 by -1
    assert_eq!(stat.results, vec![vec![2, 6, 12, 20], vec![1, 3, -2, -8]]);

    results.stats = Some(stat);
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

#[test]
fn test_system_output_stationary() -> Result<(), Box<dyn std::error::Error>> {
    simple_logger::init_with_level(log::Level::Info).unwrap_or(());

    let settings = Settings::new(vec![
        "configs/default.toml".into(),
        "configs/optional_configs/output_stationary.toml".into(),
    ])?;
    let mut system = System::from_settings(&settings)?;
    let stat = system.run()?;
    assert!(stat.completed);
    assert_eq!(stat.results, vec![vec![10, 30, 60]]);
    Ok(())
}

#[test]
fn test_system_sigmoid() -> Result<(), Box<dyn std::error::Error>> {
    simple_logger::init_with_level(log::Level::Info).unwrap_or(());

    let settings = Settings::new(vec![
        "configs/default.toml".into(),
        "configs/optional_configs/sigmoid.toml".into(),
    ])?;
    let mut system = System::from_settings(&settings)?;
    let stat = system.run()?;
    assert!(stat.completed);
    // every result is a table entry, read back through an 8-bit register
    let table = pe_grid::accelerator::sigmoid::SIGMOID_LUT
        .iter()
        .map(|&v| pe_grid::accelerator::fixed_point::wrap(v, 8))
        .collect_vec();
    for value in stat.results.iter().flatten() {
        assert!(table.contains(value), "{} is not a sigmoid entry", value);
    }
    Ok(())
}

/// the first row of the default grid: weight 4 on the first PE, forwarding on.
/// the first PE sees 1, 2, 3, 4 and accumulates 4, 12, 24, 40; what it forwards
/// reaches the second PE with the latency of the pipeline and is queued there
/// one cycle later.
#[test]
fn test_event_trace() -> Result<(), Box<dyn std::error::Error>> {
    simple_logger::init_with_level(log::Level::Info).unwrap_or(());

    let settings = Settings::new(vec!["configs/default.toml".into()])?;
    let mut system = System::from_settings(&settings)?;
    let sink = Rc::new(RefCell::new(EventLog::new()));
    system.grid_mut().subscribe(Box::new(sink.clone()));
    while !system.finished() {
        system.cycle()?;
    }

    let sink = sink.borrow();
    let macs = sink
        .for_pe(0, 0)
        .filter_map(|r| r.event.as_mac_updated().copied())
        .collect_vec();
    assert_eq!(macs, vec![4, 12, 24, 40]);

    let dequeued = sink
        .for_pe(0, 0)
        .filter_map(|r| r.event.as_input_dequeued().map(|(a, _)| (r.cycle, *a)))
        .collect_vec();
    let forwarded = sink
        .for_pe(0, 0)
        .filter_map(|r| r.event.as_activation_forwarded().map(|a| (r.cycle, *a)))
        .collect_vec();
    assert_eq!(dequeued.len(), 4);
    assert_eq!(forwarded.len(), 4);
    for ((in_cycle, a), (out_cycle, f)) in dequeued.iter().zip(forwarded.iter()) {
        assert_eq!(a, f);
        assert_eq!(out_cycle - in_cycle, 3);
    }

    let accepted = sink
        .for_pe(0, 1)
        .filter_map(|r| r.event.as_input_accepted().map(|a| (r.cycle, *a)))
        .collect_vec();
    assert_eq!(
        accepted.iter().map(|(_, a)| *a).collect_vec(),
        forwarded.iter().map(|(_, f)| *f).collect_vec()
    );
    assert_eq!(accepted.iter().map(|(_, a)| *a).collect_vec(), vec![1, 2, 3, 4]);
    for ((fwd_cycle, _), (acc_cycle, _)) in forwarded.iter().zip(accepted.iter()) {
        assert_eq!(acc_cycle - fwd_cycle, 1);
    }
    let macs = sink
        .for_pe(0, 1)
        .filter_map(|r| r.event.as_mac_updated().copied())
        .collect_vec();
    assert_eq!(macs, vec![2, 6, 12, 20]);

    // the consumer is always ready, so the first column never holds a result back
    assert!(sink
        .records()
        .iter()
        .filter(|r| r.col == 0)
        .all(|r| r.event != PeEvent::OutputStall));
    Ok(())
}
