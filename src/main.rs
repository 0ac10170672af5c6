//! `quad-gait`: gait controller for the 8-joint quadruped.
//!
//! Start-up ritual, fixed-rate control loop and shutdown ritual on the embassy std executor.
//! Gestures come from the keyboard and, optionally, a TCP client; commands go to the
//! `motor_server` helper or, without one, to a dry-run logger.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use embassy_executor::Spawner;
use log::{error, info, LevelFilter};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use quad_gait::kinematics::conversion::LegKinematics;
use quad_gait::kinematics::gait_engine::GaitEngine;
use quad_gait::robot::actuator::TorqueGuard;
use quad_gait::robot::config::ControllerConfig;
use quad_gait::robot::state::StopHandle;
use quad_gait::tasks::motion_task::{MotionScheduler, SystemClock};
use quad_gait::tasks::net_task::{
    spawn_stdin_intake, spawn_tcp_intake, GestureMailbox, MailboxSource,
};
use quad_gait::tasks::servo_task::{AnyActuator, DryRunSink, MotorServerSink};
use quad_gait::JOINT_COUNT;

#[derive(Parser, Debug)]
#[command(name = "quad-gait")]
#[command(about = "Trot and jump controller for an 8-joint quadruped")]
struct Cli {
    /// TOML file layered over the built-in configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Gait loaded at start-up.
    #[arg(long)]
    gait: Option<String>,

    /// Control loop frequency in Hz.
    #[arg(long)]
    hz: Option<u32>,

    /// Accept gesture tokens from TCP clients on this address, e.g. 0.0.0.0:5005.
    #[arg(long)]
    listen: Option<String>,

    /// Path to the motor_server binary. Without it the controller runs dry.
    #[arg(long)]
    motor_server: Option<PathBuf>,

    /// Do not read gesture tokens from stdin.
    #[arg(long)]
    no_stdin: bool,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let cli = Cli::parse();
    let log_config = ConfigBuilder::new().set_target_level(LevelFilter::Off).build();
    if let Err(e) = TermLogger::init(
        cli.log_level,
        log_config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("logger already installed: {e}");
    }

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ControllerConfig::load(cli.config.as_deref())
        .context("failed to load the configuration")?;
    if let Some(hz) = cli.hz {
        config.scheduler.hz = hz;
    }
    if let Some(gait) = &cli.gait {
        config
            .set_initial_gait(gait)
            .with_context(|| format!("cannot start with gait {gait}"))?;
    }
    config.validate().context("invalid configuration")?;

    let geometry = config.geometry;
    info!(
        "Starting quadruped: links {}/{} mm, hip offset {} mm, {} Hz",
        geometry.link1_length, geometry.link2_length, geometry.center_distance, config.scheduler.hz
    );

    let engine = GaitEngine::new(
        LegKinematics::new(geometry),
        config.gaits.clone(),
        &config.initial_gait,
    )
    .context("failed to load the initial gait")?;

    let stop = StopHandle::new();
    let on_signal = stop.clone();
    ctrlc::set_handler(move || on_signal.request_shutdown())
        .context("failed to install the signal handler")?;

    let mailbox = Arc::new(GestureMailbox::new());
    if let Some(addr) = &cli.listen {
        spawn_tcp_intake(addr, mailbox.clone(), stop.clone())
            .with_context(|| format!("cannot listen on {addr}"))?;
    }
    if !cli.no_stdin {
        spawn_stdin_intake(mailbox.clone(), stop.clone())
            .context("failed to start keyboard intake")?;
    }

    let sink = match &cli.motor_server {
        Some(path) => AnyActuator::MotorServer(
            MotorServerSink::spawn(path)
                .with_context(|| format!("cannot start {}", path.display()))?,
        ),
        None => {
            info!("No motor server given, running dry");
            AnyActuator::DryRun(DryRunSink::new())
        }
    };
    let mut sink = TorqueGuard::new(sink, [config.scheduler.neutral_center; JOINT_COUNT]);

    let mut scheduler =
        MotionScheduler::new(engine, &mut sink, SystemClock, config.scheduler, stop);
    scheduler
        .move_to_neutral(config.scheduler.neutral_hold)
        .await
        .context("start-up neutral hold failed")?;

    let mut source = MailboxSource::new(mailbox);
    scheduler.loop_forever(&mut source).await;
    scheduler.shutdown().await.context("failed to release torque")?;

    info!("Quadruped parked, bye");
    Ok(())
}
