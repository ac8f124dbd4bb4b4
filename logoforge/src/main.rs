#![warn(clippy::pedantic)]

use std::sync::Arc;

pub mod actions;
pub mod app;
pub mod gateways;
pub mod global;
pub mod loader;
pub mod recognizer;
pub mod surface;
pub mod text;
pub mod worker;

use logoforge_core::gateway::{InMemoryGateway, PersistenceGateway};
use logoforge_core::session::Session;
use logoforge_core::tasks::{AssetPurpose, TaskFailure, TaskOutcome};

use anyhow::Result as AnyResult;
use global::settings::{GatewayChoice, Settings};
use recognizer::TextRecognizer;

#[cfg(feature = "dhat_heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

#[cfg(all(
    feature = "jemallocator",
    not(feature = "dhat_heap"),
    not(target_env = "msvc")
))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// How long to wait for saves and the like to land after input ends.
const EXIT_GRACE: std::time::Duration = std::time::Duration::from_secs(30);

fn gateway(settings: &Settings, session: &Session) -> AnyResult<Arc<dyn PersistenceGateway>> {
    let memory = || -> Arc<dyn PersistenceGateway> {
        let gateway = InMemoryGateway::new();
        // The only account there is, so whoever is signed in can use it.
        if let (Ok(owner), Ok(credential)) = (session.owner(), session.credential()) {
            gateway.add_account(credential.secret(), owner.clone());
        }
        Arc::new(gateway)
    };
    let gateway: Arc<dyn PersistenceGateway> = match &settings.gateway {
        GatewayChoice::Memory => memory(),
        GatewayChoice::Directory { path } => {
            let root = path.clone().or_else(gateways::default_logo_dir);
            match (root, session.owner()) {
                (Some(root), Ok(owner)) => {
                    log::info!("Keeping logos in {root:?}");
                    Arc::new(gateways::DirectoryGateway::new(root, owner.clone()))
                }
                (None, _) => {
                    log::warn!("No data directory for saved logos, keeping them in memory.");
                    memory()
                }
                (_, Err(e)) => {
                    log::warn!("Saved logo directory needs an owner ({e}), keeping them in memory.");
                    memory()
                }
            }
        }
        GatewayChoice::Http { base_url } => Arc::new(gateways::HttpGateway::new(base_url)?),
    };
    Ok(gateway)
}

fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Debug);
    }
    #[cfg(feature = "dhat_heap")]
    let _profiler = {
        log::trace!("Installed dhat");
        dhat::Profiler::new_heap()
    };

    let settings = Settings::load();
    if settings.did_fail_to_load() {
        log::warn!("Using default settings.");
    }
    // Writes out any newly added fields, with their defaults.
    if let Err(e) = settings.save() {
        log::warn!("Failed to save settings:\n{e:?}");
    }
    let session = settings.session();

    let startup_images = {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
        // Args are a list of images to place at startup.
        let paths: Vec<std::path::PathBuf> = std::env::args_os().skip(1).map(Into::into).collect();
        // Did we have at least one success? No paths is a success.
        let had_success: std::sync::atomic::AtomicBool = paths.is_empty().into();
        let outcomes: Vec<TaskOutcome> = paths
            .into_par_iter()
            .map(|path| {
                let result = loader::load_path(&path);
                match &result {
                    Err(e) => log::error!("failed to open image {path:?}: {e}"),
                    Ok(_) => had_success.store(true, std::sync::atomic::Ordering::Relaxed),
                }
                TaskOutcome::AssetLoaded {
                    purpose: AssetPurpose::Image,
                    label: path.display().to_string(),
                    result: result.map_err(TaskFailure::new),
                }
            })
            .collect();
        if !had_success.into_inner() {
            log::warn!("Failed to load any provided image.");
        }
        outcomes
    };

    let recognizer: Arc<dyn TextRecognizer> = match settings
        .ocr_command
        .clone()
        .and_then(recognizer::CommandRecognizer::new)
    {
        Some(command) => Arc::new(command),
        None => Arc::new(recognizer::NoRecognizer),
    };
    // Outlives the worker, see `Worker::spawn`.
    let gateway = gateway(&settings, &session)?;
    let (results_send, results) = crossbeam::channel::unbounded();
    let worker = worker::Worker::spawn(recognizer.clone(), gateway.clone(), results_send)?;

    let faces = global::faces();
    log::debug!("{} font faces available", faces.face_count());
    let mut app = app::App::new(
        settings,
        session,
        surface::SoftwareSurface::new(faces),
        worker,
        recognizer.is_active(),
    );
    for outcome in startup_images {
        app.apply_outcome(outcome);
    }

    let (line_send, lines) = crossbeam::channel::unbounded::<String>();
    std::thread::Builder::new()
        .name("Input reader".to_owned())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::error!("Failed to read input: {e}");
                        break;
                    }
                };
                if line_send.send(line).is_err() {
                    break;
                }
            }
        })?;

    if has_term {
        println!("{} - type `help` for commands.", env!("CARGO_PKG_NAME"));
    }
    loop {
        crossbeam::channel::select! {
            recv(lines) -> line => {
                let Ok(line) = line else {
                    // Input closed.
                    break;
                };
                if app.handle_line(&line) == app::Flow::Quit {
                    break;
                }
            }
            recv(results) -> message => {
                let Ok(message) = message else {
                    log::error!("Task worker stopped unexpectedly.");
                    break;
                };
                app.apply(message);
            }
        }
    }
    app.drain(&results, EXIT_GRACE);

    let settings = app.shutdown();
    drop(gateway);
    if let Err(e) = settings.save() {
        log::warn!("Failed to save settings:\n{e:?}");
    }
    Ok(())
}
