//! snapgrab command-line entry point.
//!
//! Composition root: builds one capture engine and one hotkey interceptor,
//! wires them together, and plays the output layer by writing PNGs. The
//! interactive selection overlay belongs to an embedding application; the
//! CLI only drives the capture and hotkey machinery.

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, UNIX_EPOCH};

use clap::{Parser, Subcommand, ValueEnum};

use snapgrab::capture::{CaptureEngine, CaptureMode, CaptureResult};
use snapgrab::config::Config;
use snapgrab::display::XcapScreenSource;
use snapgrab::geometry::Rect;
use snapgrab::hotkeys::{parse_shortcut, HotkeyInterceptor, RdevProbe};
use snapgrab::permissions;

/// Interactive multi-monitor screen capture with global shortcuts
#[derive(Parser, Debug)]
#[command(name = "snapgrab")]
#[command(version, about = "Multi-monitor screen capture", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List active displays
    Displays,
    /// List capturable windows
    Windows,
    /// Check required OS permissions
    Permissions,
    /// Take a single capture
    Capture {
        /// Capture mode
        #[arg(long, default_value = "full-screen")]
        mode: ModeArg,
        /// Target display id (full-screen mode; default: under the pointer)
        #[arg(long)]
        display: Option<u32>,
        /// Target window id (window mode)
        #[arg(long)]
        window: Option<u32>,
        /// Capture-space rectangle as x,y,w,h (area / custom-region modes)
        #[arg(long, value_parser = parse_rect)]
        rect: Option<Rect>,
        /// Output PNG path
        #[arg(long, short, default_value = "capture.png")]
        output: PathBuf,
    },
    /// Register global shortcuts and capture on each press (Ctrl-C to quit)
    Listen,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    FullScreen,
    Area,
    Window,
    CustomRegion,
}

impl From<ModeArg> for CaptureMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::FullScreen => CaptureMode::FullScreen,
            ModeArg::Area => CaptureMode::Area,
            ModeArg::Window => CaptureMode::Window,
            ModeArg::CustomRegion => CaptureMode::CustomRegion,
        }
    }
}

/// Parse a capture-space rectangle from `x,y,w,h`.
fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 4 {
        return Err(format!("Invalid rect '{}'. Use x,y,w,h (e.g. 100,50,640,480)", s));
    }
    let mut values = [0.0f64; 4];
    for (i, part) in parts.iter().enumerate() {
        values[i] = part
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a valid number in rect", part))?;
    }
    let rect = Rect::new(values[0], values[1], values[2], values[3]);
    if rect.is_empty() {
        return Err("Rect width and height must be greater than 0".to_string());
    }
    Ok(rect)
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let engine = CaptureEngine::new(Box::new(XcapScreenSource::new()))
        .with_window_shadow(config.capture.include_window_shadow)
        .with_hover_preservation(config.capture.preserve_hover_state);

    let result = match args.command {
        Command::Displays => cmd_displays(&engine),
        Command::Windows => cmd_windows(&engine),
        Command::Permissions => cmd_permissions(&engine),
        Command::Capture {
            mode,
            display,
            window,
            rect,
            output,
        } => cmd_capture(&engine, mode.into(), display, window, rect, &output),
        Command::Listen => cmd_listen(engine, &config),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn cmd_displays(engine: &CaptureEngine) -> Result<(), Box<dyn std::error::Error>> {
    for d in engine.get_displays()? {
        println!(
            "[{}] {}x{} at ({}, {}) density {:.1}{}",
            d.id,
            d.bounds.width,
            d.bounds.height,
            d.bounds.x,
            d.bounds.y,
            d.pixel_density,
            if d.is_primary { " (primary)" } else { "" }
        );
    }
    Ok(())
}

fn cmd_windows(engine: &CaptureEngine) -> Result<(), Box<dyn std::error::Error>> {
    for w in engine.get_windows()? {
        println!(
            "[{}] {} {}x{} at ({}, {})",
            w.id,
            w.display_title(),
            w.bounds.width,
            w.bounds.height,
            w.bounds.x,
            w.bounds.y
        );
    }
    Ok(())
}

fn cmd_permissions(engine: &CaptureEngine) -> Result<(), Box<dyn std::error::Error>> {
    let probe = RdevProbe::new();
    let capture_ok = engine.probe_capture();
    let intercept_ok = permissions::check_intercept_input(&probe);
    println!(
        "Screen Recording:  {}",
        if capture_ok { "granted" } else { "denied" }
    );
    println!(
        "Accessibility:     {}",
        if intercept_ok { "granted" } else { "denied" }
    );
    if !capture_ok {
        permissions::request_capture();
    }
    if !intercept_ok {
        permissions::request_intercept_input();
    }
    Ok(())
}

fn cmd_capture(
    engine: &CaptureEngine,
    mode: CaptureMode,
    display: Option<u32>,
    window: Option<u32>,
    rect: Option<Rect>,
    output: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = match mode {
        CaptureMode::FullScreen => engine.capture_full_display(display)?,
        CaptureMode::Window => {
            let id = window.ok_or("window mode requires --window <id> (see `snapgrab windows`)")?;
            engine.capture_window(id)?
        }
        CaptureMode::Area => {
            let rect = rect.ok_or("area mode requires --rect x,y,w,h")?;
            engine.capture_rect(rect)?
        }
        CaptureMode::CustomRegion => {
            let rect = rect.ok_or("custom-region mode requires --rect x,y,w,h")?;
            engine.capture_custom_region(rect)?
        }
    };
    save_result(&result, output)
}

fn cmd_listen(engine: CaptureEngine, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let probe = RdevProbe::new();
    let missing = permissions::verify_permissions(
        &XcapScreenSource::new(),
        &probe,
        true,
        true,
    );
    if !missing.is_empty() {
        permissions::print_permission_errors(&missing);
        return Err("missing permissions".into());
    }

    let engine = Arc::new(engine);
    let mut interceptor = HotkeyInterceptor::new(engine.clone());

    let mut bindings = Vec::new();
    for mode in [
        CaptureMode::FullScreen,
        CaptureMode::Area,
        CaptureMode::Window,
        CaptureMode::CustomRegion,
    ] {
        let spec = config.shortcuts.for_mode(mode);
        let binding = parse_shortcut(spec, mode)
            .map_err(|e| format!("shortcut for {} mode ('{}'): {}", mode.label(), spec, e))?;
        println!("{:16} {}", mode.label(), spec);
        bindings.push(binding);
    }
    interceptor.register_bindings(bindings);

    // Handlers hop back to this thread; capture work stays off the tap.
    let (fired_tx, fired_rx) = mpsc::channel::<CaptureMode>();
    for mode in [
        CaptureMode::FullScreen,
        CaptureMode::Area,
        CaptureMode::Window,
        CaptureMode::CustomRegion,
    ] {
        let tx = fired_tx.clone();
        interceptor.set_handler(mode, move || {
            let _ = tx.send(mode);
        });
    }

    interceptor.start()?;
    println!("Listening for shortcuts. Ctrl-C to quit.");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst))?;

    while running.load(Ordering::SeqCst) {
        let mode = match fired_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(mode) => mode,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };
        let result = match mode {
            CaptureMode::FullScreen => engine.capture_full_display(None),
            CaptureMode::Window => match engine.get_windows()?.first() {
                Some(front) => engine.capture_window(front.id),
                None => {
                    log::warn!("No capturable windows");
                    continue;
                }
            },
            // Area and custom-region selection need an overlay, which an
            // embedding app provides; standalone we take the full display.
            CaptureMode::Area | CaptureMode::CustomRegion => {
                log::warn!("{} mode has no overlay here; capturing full display", mode.label());
                engine.capture_full_display(None)
            }
        };
        match result {
            Ok(capture) => {
                let path = timestamped_path(&capture);
                if let Err(e) = save_result(&capture, &path) {
                    eprintln!("{}", e);
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }

    interceptor.teardown();
    Ok(())
}

fn timestamped_path(result: &CaptureResult) -> PathBuf {
    let secs = result
        .timestamp
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    PathBuf::from(format!("snapgrab-{}-{}.png", result.mode.label(), secs))
}

fn save_result(
    result: &CaptureResult,
    output: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    result.image.save(output)?;
    println!(
        "Saved {} capture ({}x{}) to {}",
        result.mode.label(),
        result.image.width(),
        result.image.height(),
        output.display()
    );
    Ok(())
}
