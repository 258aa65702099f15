//! ringwm - dynamic tiling window manager
//!
//! Connects to the X server, takes over window management and runs the
//! event loop until a quit binding or a termination signal.

use anyhow::{Context, Result};
use std::process::ExitCode;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ringwm::config::Config;
use ringwm::wm::WindowManager;
use ringwm::wm::display::X11Backend;
use ringwm::wm::keyboard::KeyBindings;
use ringwm::wm::spawn::reap_children;
use ringwm::x11_async::X11EventStream;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => {}
        [flag] if flag == "-v" => {
            println!("ringwm-{}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        _ => {
            eprintln!("usage: ringwm [-v]");
            return ExitCode::FAILURE;
        }
    }

    // Standard output carries the status line, logs go to stderr.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ringwm=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting ringwm {}", env!("CARGO_PKG_VERSION"));

    match run().await {
        Ok(code) => {
            info!("Exiting with status {}", code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Set everything up and dispatch events until asked to stop. Returns the
/// process exit status.
async fn run() -> Result<i32> {
    let config = Config::load().context("Failed to load configuration")?;

    let mut backend = X11Backend::connect()?;
    backend.become_wm()?;
    let palette = backend.alloc_palette(&config.border)?;
    backend.set_focus_button(config.focus.focus_button);
    backend.grab_keys(&KeyBindings::new(config.key_bindings()?))?;
    let (width, height) = backend.screen_size();

    let stream = X11EventStream::new(backend.connection())
        .context("Failed to initialize X11 event stream")?;
    let mut sigchld = signal(SignalKind::child()).context("Failed to install SIGCHLD handler")?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let existing = backend.existing_windows()?;
    let mut wm = WindowManager::new(backend, std::io::stdout(), config, width, height, palette)?;
    wm.start()?;
    for event in existing {
        wm.handle_event(event)?;
    }

    info!("Starting main event loop");
    while wm.is_running() {
        reap_children();

        // Replies can leave events queued in the connection, so drain before
        // waiting on the socket.
        while let Some(event) = stream.poll_next_event()? {
            if let Some(event) = wm.adapter_mut().translate(event)? {
                wm.handle_event(event)?;
            }
            if !wm.is_running() {
                break;
            }
        }
        stream.flush()?;
        if !wm.is_running() {
            break;
        }

        tokio::select! {
            () = stream.wait_readable() => {}
            _ = sigchld.recv() => {
                reap_children();
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
        }
    }

    wm.adapter_mut().cleanup()?;
    Ok(wm.exit_code())
}
