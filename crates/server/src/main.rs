mod udp;

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use glam::DVec2;

use vanguard::{DirectPathOracle, GameConfig, GameServer};

use udp::UdpTransport;

#[derive(Parser)]
#[command(name = "vanguard-server")]
#[command(about = "Authoritative RTS match server")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = 27500)]
    port: u16,

    #[arg(short, long, default_value_t = 30)]
    tick_rate: u32,

    #[arg(long, default_value_t = 35_000.0)]
    layout_width: f64,

    #[arg(long, default_value_t = 13_000.0)]
    layout_height: f64,

    #[arg(short, long, default_value_t = 12)]
    units_per_player: usize,

    #[arg(long, default_value_t = 2)]
    max_players: usize,

    #[arg(long, help = "Include movement debug state in wire records")]
    debug_state: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let bind_addr = format!("{}:{}", args.bind, args.port);
    let transport = UdpTransport::bind(&bind_addr, args.max_players)
        .with_context(|| format!("binding {bind_addr}"))?;
    log::info!("listening on {}", transport.local_addr());

    let config = GameConfig {
        tick_rate: args.tick_rate,
        layout_size: DVec2::new(args.layout_width, args.layout_height),
        units_per_player: args.units_per_player,
        debug_state_enabled: args.debug_state,
        ..GameConfig::default()
    };

    let mut server = GameServer::new(
        config,
        transport,
        Box::new(DirectPathOracle::new()),
        Instant::now(),
    )
    .context("constructing match")?;

    log::info!(
        "match started: {} units on a {}x{} layout at {} Hz",
        server.units().len(),
        args.layout_width,
        args.layout_height,
        args.tick_rate
    );

    while server.is_running() {
        server.tick(Instant::now());
        let delay = server.next_tick_delay(Instant::now());
        tokio::time::sleep(delay).await;
    }

    log::info!(
        "match ended after {} ticks ({:.1}s game time)",
        server.ticks(),
        server.game_time()
    );
    Ok(())
}
