use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use robot_controller::{
    AnimationPlayer, BluetoothTransport, ConfigFile, ConfigStore, LinkSettings, MotionEngine, SerialTransport,
    Transport,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Drive a servo board from pose and animation definitions")]
struct Cli {
    /// Configuration file with limbs (and optionally poses, animations, link)
    #[arg(long, default_value = "TinyTitanConfig.json")]
    config: PathBuf,

    /// Standalone pose file; requires --animations
    #[arg(long, requires = "animations")]
    poses: Option<PathBuf>,

    /// Standalone animation file; requires --poses
    #[arg(long, requires = "poses")]
    animations: Option<PathBuf>,

    /// Serial port, overrides the configured one
    #[arg(long)]
    port: Option<String>,

    /// Connect over Bluetooth instead of USB serial
    #[arg(long)]
    bluetooth: bool,

    /// Bluetooth hardware address, overrides the configured one
    #[arg(long)]
    address: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List boards that can be opened
    Devices,
    /// Print loaded limbs, poses and animations
    Show,
    /// Check that the board answers
    Heartbeat,
    /// Move one limb
    Limb { name: String, angle: i32 },
    /// Apply a named pose
    Pose { name: String },
    /// Apply the neutral pose
    Neutral,
    /// Play a named animation; Ctrl-C stops before the next step
    Play {
        name: String,
        #[arg(long, default_value_t = 1)]
        repeat: u32,
    },
    /// Run an action group stored on the board (1-16)
    ActionGroup { id: i32 },
    /// Emergency stop
    Stop,
    /// Recover from emergency stop
    Recover,
}

fn load(cli: &Cli) -> anyhow::Result<(ConfigStore, LinkSettings)> {
    let (store, mut link) = match (&cli.poses, &cli.animations) {
        (Some(poses), Some(animations)) => ConfigStore::from_split_paths(&cli.config, poses, animations),
        _ => ConfigFile::from_path(&cli.config).and_then(ConfigFile::into_parts),
    }
    .with_context(|| format!("loading {}", cli.config.display()))?;

    if let Some(port) = &cli.port {
        link.port = Some(port.clone());
    }
    if let Some(address) = &cli.address {
        link.bluetooth.address = Some(address.clone());
    }
    Ok((store, link))
}

async fn run<T: Transport>(
    mut transport: T,
    store: ConfigStore,
    link: &LinkSettings,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Devices => {
            for device in transport.list_devices().await? {
                println!("{}", device);
            }
            return Ok(());
        }
        Command::Show => {
            for limb in store.limbs() {
                println!("limb {}: pin {} speed {}", limb.name, limb.motor_pin, limb.default_speed);
            }
            for pose in store.poses() {
                println!("pose {}: {:?}", pose.name, pose.targets);
            }
            for animation in store.animations() {
                let steps: Vec<_> = animation.steps.iter().map(|s| (&s.pose, s.hold.as_millis())).collect();
                println!("animation {}: {:?}", animation.name, steps);
            }
            return Ok(());
        }
        _ => {}
    }

    transport.open().await.context("opening transport")?;
    let engine = MotionEngine::new(transport, store).with_heartbeat_timeout(link.heartbeat_timeout());
    let mut player = AnimationPlayer::new(engine);

    let result = execute(&mut player, command).await;
    player.engine_mut().transport_mut().close().await;
    result
}

async fn execute<T: Transport>(player: &mut AnimationPlayer<T>, command: Command) -> anyhow::Result<()> {
    let engine = player.engine_mut();
    match command {
        Command::Heartbeat => {
            engine.heartbeat().await?;
            println!("Board is alive");
        }
        Command::Limb { name, angle } => engine.move_limb(&name, angle).await?,
        Command::Pose { name } => engine.apply_pose(&name).await?,
        Command::Neutral => engine.neutralize().await?,
        Command::ActionGroup { id } => engine.execute_action_group(id).await?,
        Command::Stop => engine.emergency_stop().await?,
        Command::Recover => engine.emergency_recovery().await?,
        Command::Play { name, repeat } => {
            let stop = player.stop_signal();
            let watcher = stop.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, stopping after current step");
                    watcher.stop();
                }
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted again, exiting");
                    std::process::exit(130);
                }
            });
            for round in 1..=repeat {
                if stop.is_stopped() {
                    warn!(round, repeat, "Stopped, skipping remaining rounds");
                    break;
                }
                info!(round, repeat, "Playing {}", name);
                player.play(&name).await?;
            }
        }
        Command::Devices | Command::Show => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let (store, link) = load(&cli)?;

    if cli.bluetooth {
        let transport = BluetoothTransport::new(link.bluetooth.clone());
        run(transport, store, &link, cli.command).await
    } else {
        if !SerialTransport::is_connected() && link.port.is_none() {
            warn!("No servo board detected on USB");
        }
        let transport = SerialTransport::new(link.clone());
        run(transport, store, &link, cli.command).await
    }
}
