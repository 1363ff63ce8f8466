mod network;
mod remote;
mod simulation;
mod trail;

use clap::Parser;
use log::{info, warn};
use network::ConnectionState;
use rand::Rng;
use simulation::{Simulation, Steering};
use std::time::{Duration, Instant};
use trail::Arena;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Player display name (max 15 characters)
    #[arg(short = 'n', long, default_value = "pilot")]
    name: String,

    /// Arena side length
    #[arg(short = 'a', long, default_value_t = shared::ARENA_SIZE)]
    arena: f32,

    /// Simulation tick interval in milliseconds
    #[arg(short = 't', long, default_value = "16")]
    tick_ms: u64,

    /// Steer randomly instead of holding course (useful for soak runs)
    #[arg(short = 'w', long)]
    wander: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    if args.arena <= 0.0 {
        return Err("arena size must be positive".into());
    }

    info!("Starting arena client...");
    info!("Connecting to: {}", args.server);

    let mut client = network::NetworkClient::new(&args.server);
    client.connect(&args.name).await?;

    let mut rng = rand::thread_rng();
    let spawn_extent = args.arena / 4.0;
    let spawn = shared::Vec3::new(
        rng.gen_range(-spawn_extent..spawn_extent),
        shared::SPAWN_HEIGHT,
        rng.gen_range(-spawn_extent..spawn_extent),
    );
    let rotation = rng.gen_range(0.0..std::f32::consts::TAU);

    let mut sim = Simulation::new(client, Arena::new(args.arena), spawn, rotation);
    info!(
        "Spawned as {} at ({:.1}, {:.1})",
        sim.player_id(),
        spawn.x,
        spawn.z
    );

    let mut interval = tokio::time::interval(Duration::from_millis(args.tick_ms));
    let mut last_tick = Instant::now();
    let mut steering = Steering::default();
    let mut was_alive = true;
    let mut rejoin_allowed = true;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let delta = last_tick.elapsed().as_secs_f32();
                last_tick = Instant::now();

                if args.wander && sim.is_alive() && rng.gen_bool(0.02) {
                    steering = match rng.gen_range(0..3) {
                        0 => Steering { left: true, right: false },
                        1 => Steering { left: false, right: true },
                        _ => Steering::default(),
                    };
                }

                sim.tick(delta, steering);

                if was_alive && !sim.is_alive() {
                    was_alive = false;
                    info!(
                        "Run over: {} trail points laid, {} players remain",
                        sim.trail().len(),
                        sim.remotes().player_count()
                    );
                }

                if rejoin_allowed && sim.network().state() == ConnectionState::Disconnected {
                    info!("Connection lost; attempting to rejoin");
                    if let Err(e) = sim.reconnect(&args.name).await {
                        warn!("Could not rejoin ({}); continuing offline", e);
                        rejoin_allowed = false;
                    }
                    last_tick = Instant::now();
                }
            },

            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            },
        }
    }

    sim.shutdown();
    Ok(())
}
