//! Headless run: build a world, tick it, print a territory summary.
//!
//! Usage:
//!
//! ```text
//! cargo run -p tessera-engine --example headless -- [TICKS] [CONFIG.json]
//! RUST_LOG=tessera_engine=debug cargo run -p tessera-engine --example headless
//! ```

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use tessera_engine::prelude::*;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let ticks: u64 = match args.next() {
        Some(raw) => raw.parse().with_context(|| format!("invalid tick count {raw:?}"))?,
        None => 200,
    };
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            WorldConfig::from_json_str(&json)?
        }
        None => WorldConfig::default(),
    };

    let mut sim = Simulation::new(config, TickConfig::default())?;

    let transfers = std::rc::Rc::new(std::cell::Cell::new(0u64));
    let counter = std::rc::Rc::clone(&transfers);
    sim.subscribe(GameEventKind::RegionOwnershipChanged, move |_, _| {
        counter.set(counter.get() + 1);
        Ok(())
    });

    sim.initialize()?;
    for _ in 0..ticks {
        sim.tick()?;
    }

    println!(
        "ran {} ticks ({:.1}s simulated), {} ownership changes",
        sim.tick_count(),
        sim.sim_time(),
        transfers.get()
    );
    for faction in sim.factions() {
        let Some(data) = sim.world().get::<FactionData>(faction) else {
            continue;
        };
        let goal = sim
            .world()
            .get::<CurrentGoal>(faction)
            .map_or("-", |g| g.name);
        println!(
            "  {:<16} {:>3} regions  strength {:>4}  resources {:>5}  goal {}",
            data.name,
            data.regions().len(),
            data.strength,
            data.resources,
            goal
        );
    }
    println!(
        "  unclaimed regions: {}  path cache: {}/{}",
        sim.regions().unclaimed().count(),
        sim.grid().path_cache().len(),
        sim.grid().path_cache().capacity()
    );
    println!("state hash: {}", sim.state_hash());
    Ok(())
}
