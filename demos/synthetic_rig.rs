//! Publish a procedurally animated rig.
//!
//! Start a receiver first (`cargo run` or the Blender script), then:
//!
//! ```text
//! cargo run --example synthetic_rig -- [--config <path>] [--fps <n>]
//! ```
//!
//! The root walks a slow circle while the limbs swing, so every tick sends
//! a full frame.

use nalgebra::{UnitQuaternion, Vector3};
use pose_stream::{AppConfig, HumanBone, Publisher, Result, StaticRig, TickOutcome};
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

struct Args {
    config: Option<String>,
    fps: u32,
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        config: None,
        fps: 30,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" if i + 1 < args.len() => {
                parsed.config = Some(args[i + 1].clone());
                i += 1;
            }
            "--fps" if i + 1 < args.len() => {
                parsed.fps = args[i + 1].parse().unwrap_or(parsed.fps).max(1);
                i += 1;
            }
            other => eprintln!("Ignoring argument {:?}", other),
        }
        i += 1;
    }
    parsed
}

/// Walk cycle: legs and arms swing in opposition, spine twists a little
fn animate(rig: &StaticRig, t: f32) {
    let phase = t * std::f32::consts::TAU;
    let swing = 0.5 * phase.sin();

    rig.set_root_rotation(UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.2 * t));
    rig.set_root_position(Vector3::new((0.2 * t).sin(), 0.0, (0.2 * t).cos()));

    let about_x = |angle: f32| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angle);
    rig.set_local_rotation(HumanBone::LeftUpperLeg, about_x(swing));
    rig.set_local_rotation(HumanBone::RightUpperLeg, about_x(-swing));
    rig.set_local_rotation(HumanBone::LeftLowerLeg, about_x(0.4 * (1.0 + phase.cos())));
    rig.set_local_rotation(HumanBone::RightLowerLeg, about_x(0.4 * (1.0 - phase.cos())));
    rig.set_local_rotation(HumanBone::LeftUpperArm, about_x(-0.6 * swing));
    rig.set_local_rotation(HumanBone::RightUpperArm, about_x(0.6 * swing));
    rig.set_local_rotation(
        HumanBone::Spine,
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.1 * swing),
    );
}

fn main() -> Result<()> {
    let args = parse_args();
    let config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| std::io::Error::other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let rig = StaticRig::full_skeleton();
    let mut publisher = Publisher::new(&config).with_rig(rig.clone());
    publisher.initialize()?;

    let period = Duration::from_secs_f32(1.0 / args.fps as f32);
    let start = Instant::now();
    let mut frames: u64 = 0;

    log::info!(
        "Publishing to {} at {} fps. Press Ctrl-C to stop.",
        publisher.endpoint(),
        args.fps
    );

    while running.load(Ordering::Relaxed) {
        let frame_start = Instant::now();
        animate(&rig, start.elapsed().as_secs_f32());

        match publisher.tick() {
            Ok(TickOutcome::Sent { .. }) => frames += 1,
            Ok(_) => {}
            Err(e) => {
                log::error!("Publish failed: {}", e);
                break;
            }
        }

        if let Some(rest) = period.checked_sub(frame_start.elapsed()) {
            thread::sleep(rest);
        }
    }

    publisher.teardown();
    log::info!("Published {} frames", frames);
    Ok(())
}
