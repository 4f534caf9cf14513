//! pose-stream - Pose receiver daemon
//!
//! Binds a SUB socket, subscribes to the root topics plus every bone, and
//! logs each decoded update until Ctrl-C. With `receiver.retarget` enabled
//! (the default) updates are shown in Blender's axes with Mixamo bone names.
//!
//! Publishers connect to this process, so start it first.

use pose_stream::config::AppConfig;
use pose_stream::error::{Error, Result};
use pose_stream::streaming::{PoseReceiver, PoseUpdate, retarget};
use pose_stream::transport::zmtp::is_timeout;
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Parse config path from command line arguments.
///
/// Supports:
/// - `pose-stream <path>` (positional)
/// - `pose-stream --config <path>` (flag-based)
/// - `pose-stream -c <path>` (short flag)
///
/// Without one, built-in defaults are used.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    // No path: caller uses built-in defaults
    None
}

fn report(update: &PoseUpdate, retargeted: bool) {
    match update {
        PoseUpdate::RootRotation(q) => log::info!(
            "root rotation (w, x, y, z) = ({:.4}, {:.4}, {:.4}, {:.4})",
            q.w,
            q.i,
            q.j,
            q.k
        ),
        PoseUpdate::RootPosition(v) => {
            log::info!("root position = ({:.4}, {:.4}, {:.4})", v.x, v.y, v.z)
        }
        PoseUpdate::Bone(bone, q) => {
            let name = if retargeted {
                retarget::mixamo_name(*bone).unwrap_or_else(|| bone.to_string())
            } else {
                bone.to_string()
            };
            log::debug!(
                "{} (w, x, y, z) = ({:.4}, {:.4}, {:.4}, {:.4})",
                name,
                q.w,
                q.i,
                q.j,
                q.k
            );
        }
    }
}

fn main() -> Result<()> {
    // Load configuration before the logger so its level applies
    let config = match parse_config_path() {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::default(),
    };

    // Initialize logger; RUST_LOG still wins
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("pose-stream v{} starting...", env!("CARGO_PKG_VERSION"));

    // Bind and subscribe
    let mut receiver = PoseReceiver::from_config(&config)?;
    let retargeted = config.receiver.retarget;

    // Setup signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| {
        Error::Io(std::io::Error::other(format!(
            "Error setting Ctrl-C handler: {}",
            e
        )))
    })?;

    log::info!(
        "Waiting for a publisher on {} (topics {:?} / {:?}). Press Ctrl-C to stop.",
        config.receiver.endpoint(),
        config.topics.root_rotation,
        config.topics.root_position
    );

    let mut received: u64 = 0;
    let mut last_report = Instant::now();

    while running.load(Ordering::Relaxed) {
        // Accept a publisher if none connected (non-blocking)
        if !receiver.is_connected() {
            match receiver.try_accept() {
                Ok(Some(_)) => {}
                Ok(None) => {
                    thread::sleep(Duration::from_millis(10));
                    continue;
                }
                Err(e) => {
                    log::warn!("Publisher handshake failed: {}", e);
                    continue;
                }
            }
        }

        // Read timeout keeps the shutdown flag responsive
        match receiver.recv() {
            Ok(Some(update)) => {
                received += 1;
                if retargeted {
                    report(&update.retargeted(), true);
                } else {
                    report(&update, false);
                }
            }
            Ok(None) => {}
            Err(e) if is_timeout(&e) => {}
            Err(e) => {
                // Drop the peer and go back to accepting
                log::warn!("Receive failed: {}", e);
                receiver.disconnect();
            }
        }

        if last_report.elapsed() >= Duration::from_secs(5) {
            log::info!("{} updates received", received);
            last_report = Instant::now();
        }
    }

    log::info!("pose-stream stopped after {} updates", received);
    Ok(())
}
