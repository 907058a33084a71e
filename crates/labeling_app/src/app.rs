use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use engine_logging::{engine_error, engine_info, engine_warn};
use labeling_engine::{
    EngineError, EngineHandle, HttpClassificationSink, RapidApiImageSource, ViewSubscription,
};
use tokio::sync::mpsc;

use crate::config::{self, AppConfig};
use crate::console::{self, ConsoleCommand};

pub fn run_app() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE));

    let loaded = config::load_config(&config_path);
    let config = loaded.as_ref().cloned().unwrap_or_default();
    engine_logging::initialize(
        config.log.destination.into(),
        config.log_level(),
        &config.log.file,
    );
    match &loaded {
        Ok(_) => engine_info!("Loaded config from {:?}", config_path),
        Err(err) => engine_warn!("Using default config: {:#}", err),
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(run_session(config))
}

async fn run_session(config: AppConfig) -> anyhow::Result<()> {
    let source = RapidApiImageSource::new(config.source_settings())
        .context("failed to build image search client")?;
    let sink = HttpClassificationSink::new(config.sink_settings())
        .context("failed to build classification client")?;
    let class = config.image_class();
    engine_info!("Labeling session for class {} ({})", class.name, class.id);

    let handle = EngineHandle::spawn(
        class.clone(),
        Arc::new(source),
        Arc::new(sink),
        config.engine_config(),
    );
    println!("{}", console::HELP);
    let renderer = tokio::spawn(print_views(handle.subscribe()));

    let mut lines = spawn_stdin_reader();
    while let Some(line) = lines.recv().await {
        let Some(command) = console::parse_command(&line) else {
            continue;
        };
        let result = match command {
            ConsoleCommand::Search(term) => handle.start_search(term).await,
            ConsoleCommand::Next => handle.advance().await,
            ConsoleCommand::Discard => handle.discard().await,
            ConsoleCommand::Confirm => handle.confirm(class.clone()).await,
            ConsoleCommand::Show => {
                println!("{}", console::render_view(&handle.view()));
                continue;
            }
            ConsoleCommand::Help => {
                println!("{}", console::HELP);
                continue;
            }
            ConsoleCommand::Unknown(word) => {
                println!("unknown command {word:?}, type `help`");
                continue;
            }
            ConsoleCommand::Quit => break,
        };
        match result {
            Ok(_) => {}
            Err(EngineError::Busy) => println!("{}", console::BUSY),
            Err(err) => {
                engine_error!("Session ended unexpectedly: {}", err);
                break;
            }
        }
    }

    handle.shutdown();
    let _ = renderer.await;
    engine_info!("Labeling session finished");
    Ok(())
}

async fn print_views(mut views: ViewSubscription) {
    while let Some(view) = views.next().await {
        println!("{}", console::render_view(&view));
    }
}

fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (line_tx, line_rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });
    line_rx
}
