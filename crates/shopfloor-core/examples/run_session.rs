//! Run a small seeded shop for an hour of simulated time and print what
//! it made. Set `RUST_LOG=debug` to watch individual transactions.

use shopfloor_core::batch::MaterialState;
use shopfloor_core::test_utils::*;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (mut orchestrator, logs) = shop_orchestrator(2025, 3, 12);
    // 720 ticks of 5 s = one simulated hour.
    orchestrator.run_ticks(720);
    orchestrator.end_session();

    for (i, log) in logs.iter().enumerate() {
        let log = log.borrow();
        let jams = log
            .iter()
            .filter(|(_, d)| matches!(d, Decision::Jammed { .. }))
            .count();
        let done = log
            .iter()
            .filter(|(_, d)| matches!(d, Decision::Completed(_)))
            .count();
        println!("M{}: {} orders completed, {} jams", i + 1, done, jams);
    }

    if let Some(inventory) = orchestrator.context().inventory() {
        let good = inventory.quantity_in_state("Gear", FG_STORE, MaterialState::FinishedGoods);
        let scrap = inventory.quantity_in_state("Gear_Scrap", SCRAP_BIN, MaterialState::Scrap);
        println!("made {good} gears, scrapped {scrap}");
        print!("{}", inventory.inventory_summary(RAW_SKU));
        println!("state hash {:016x}", inventory.state_hash());
    }
}
