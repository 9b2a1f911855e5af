use clap::Parser;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use media_monitor::{
    cli::{Cli, OutputFormat},
    config::MonitorConfig,
    DomainEvent, Envelope, EventBus, FileMonitor, Listener,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.setup_logging();

    let config = cli.build_config()?;
    if let Err(err) = config.validate() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    run(&cli, &config)
}

fn run(cli: &Cli, config: &MonitorConfig) -> Result<()> {
    let bus = Arc::new(EventBus::new());
    let filter = Arc::new(config.extensions.filter());
    tracing::info!(
        "Supported extensions: {}",
        filter.extensions().collect::<Vec<_>>().join(", ")
    );

    let mut monitor = FileMonitor::new()?;

    if let Some(ref path) = config.organize.path {
        let listener = Listener::organize(config.organize.channel.as_str(), filter.clone(), bus.clone());
        monitor.add_listener(path, listener)?;
    }

    for path in &config.store.paths {
        let listener = Listener::store_watch(config.store.channel.as_str(), filter.clone(), bus.clone());
        monitor.add_listener(path, listener)?;
    }

    let mut channels = vec![config.organize.channel.as_str(), config.store.channel.as_str()];
    channels.dedup();
    let subscriptions: Vec<Receiver<Envelope>> = channels
        .into_iter()
        .map(|channel| bus.subscribe(channel))
        .collect();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    if cli.output == OutputFormat::Text {
        for path in monitor.watched_paths() {
            println!("Watching: {}", path.display());
        }
        println!("Press Ctrl+C to quit");
        println!("---");
    }

    while running.load(Ordering::SeqCst) {
        monitor.pump(Duration::from_millis(100))?;

        for rx in &subscriptions {
            while let Ok(envelope) = rx.try_recv() {
                print_envelope(&envelope, cli)?;
            }
        }
    }

    tracing::info!("Shutting down");
    Ok(())
}

fn print_envelope(envelope: &Envelope, cli: &Cli) -> Result<()> {
    match cli.output {
        OutputFormat::Json => println!("{}", serde_json::to_string(envelope)?),
        OutputFormat::Text => print_text_event(envelope, cli.no_color),
        OutputFormat::Compact => print_compact_event(&envelope.event),
    }
    Ok(())
}

fn print_text_event(envelope: &Envelope, no_color: bool) {
    let time_str = chrono::Local::now().format("%H:%M:%S");
    let event = &envelope.event;

    if no_color {
        println!("[{}] {} {} ({})", time_str, event.name(), event.path().display(), envelope.channel);
    } else {
        let color = match event {
            DomainEvent::NewFile { .. } => "\x1b[32m",      // Green
            DomainEvent::DeleteFile { .. } => "\x1b[31m",   // Red
            DomainEvent::OrganizeFile { .. } => "\x1b[34m", // Blue
        };
        println!(
            "[{}] {}{}\x1b[0m {} ({})",
            time_str,
            color,
            event.name(),
            event.path().display(),
            envelope.channel
        );
    }
}

fn print_compact_event(event: &DomainEvent) {
    let event_type = match event {
        DomainEvent::NewFile { .. } => "N",
        DomainEvent::DeleteFile { .. } => "D",
        DomainEvent::OrganizeFile { .. } => "O",
    };

    println!("{} {}", event_type, event.path().display());
}
