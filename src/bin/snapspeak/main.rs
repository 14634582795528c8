//! SnapSpeak entrypoint: wire the pipeline to the simulated hardware bench.
//!
//! Real deployments swap the sim driver, classifier, and speech sink for the
//! board's own backends; everything else — the state machine, the worker,
//! the announcement policy — is identical. Captures are triggered from
//! stdin in place of the hardware button.

mod event_loop;

use anyhow::Result;
use snapspeak::camera::CameraDriver;
use snapspeak::classify::read_labels;
use snapspeak::config::AppConfig;
use snapspeak::sim::{SimCameraDriver, SimClassifier, SimSpeechSink, sim_labels};
use snapspeak::{
    init_logging, init_tracing, log_debug, log_panic, start_pipeline, PipelineEvent, SpeechOutput,
};
use std::panic;
use std::thread;

use crate::event_loop::run_event_loop;

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_logging(&config);
    init_tracing(&config);
    panic::set_hook(Box::new(|info| log_panic(info)));

    if config.list_cameras {
        let driver = SimCameraDriver::new();
        let ids = driver.camera_ids();
        if ids.is_empty() {
            println!("No cameras detected.");
        } else {
            println!("Detected cameras:");
            for id in ids {
                println!("  {id}");
            }
        }
        return Ok(());
    }

    // Label loading failure is fatal: scores without an aligned label table
    // cannot be announced truthfully.
    let labels = match &config.labels {
        Some(path) => read_labels(path)?,
        None => sim_labels(),
    };
    log_debug(&format!("startup: {} labels loaded", labels.len()));

    let driver = Box::new(SimCameraDriver::new());
    let classifier = Box::new(SimClassifier::new(labels.len()));
    let speech = if config.quiet {
        None
    } else {
        let (sink, events) = SimSpeechSink::new();
        Some(SpeechOutput {
            sink: Box::new(sink),
            events,
        })
    };

    let (observer_tx, observer_rx) = crossbeam_channel::unbounded::<PipelineEvent>();
    let json_events = config.json_events;
    let printer = thread::spawn(move || {
        for event in observer_rx {
            if json_events {
                if let Ok(line) = serde_json::to_string(&event) {
                    println!("{line}");
                }
            } else if let PipelineEvent::Results { results } = &event {
                for recognition in results {
                    println!("{recognition}");
                }
            }
        }
    });

    let handle = start_pipeline(
        driver,
        classifier,
        labels,
        speech,
        None,
        Some(observer_tx),
        config.pipeline_config(),
    )?;

    run_event_loop(&handle)?;

    handle.shutdown();
    let _ = printer.join();
    Ok(())
}
