use std::str::FromStr;
use std::sync::Arc;

use tracing::info;
use ulid::Ulid;

use covers::config::Config;
use covers::engine::{Engine, EngineError, ReservationStore, SlotQuery};
use covers::notify::NotifyHub;
use covers::store::InMemoryStore;

const USAGE: &str = "usage:
  covers restaurants
  covers restaurant <restaurant>
  covers slots    <restaurant> <date> <party> [duration]
  covers tables   <restaurant> <date> <time> [party] [duration]
  covers schedule <restaurant> <date>";

fn arg<T: FromStr>(args: &[&str], i: usize, name: &str) -> Result<Option<T>, String> {
    match args.get(i) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| format!("invalid {name}: {raw:?}")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cfg = Config::from_env();
    covers::observability::init(cfg.metrics_port)?;
    std::fs::create_dir_all(&cfg.data_dir)?;

    let store = Arc::new(InMemoryStore::open(&cfg.log_path())?);
    if store.log_records().await >= cfg.compact_threshold {
        store.compact().await?;
    }
    let engine = Engine::new(store.clone(), Arc::new(NotifyHub::new()))
        .with_default_duration(cfg.default_duration_hours)
        .with_alternatives(cfg.alternatives)
        .with_slot_granularity(cfg.slot_granularity);
    info!("covers ready");
    info!("  data_dir: {}", cfg.data_dir.display());
    info!("  log_records: {}", store.log_records().await);
    info!("  metrics: {}", cfg.metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = raw.iter().map(String::as_str).collect();

    let output = match args.as_slice() {
        ["restaurants"] => serde_json::to_value(store.list_restaurants())?,
        ["restaurant", restaurant] => {
            let restaurant_id = Ulid::from_str(restaurant)?;
            let restaurant = engine
                .store()
                .get_restaurant(restaurant_id)
                .await?
                .ok_or(EngineError::NotFound { kind: "restaurant", id: restaurant_id })?;
            serde_json::json!({
                "restaurant": restaurant,
                "tables": store.list_tables(restaurant_id),
            })
        }
        ["slots", restaurant, date, party, ..] => {
            let restaurant_id = Ulid::from_str(restaurant)?;
            let party: u32 = party.parse().map_err(|_| format!("invalid party: {party:?}"))?;
            let duration = arg(&args, 4, "duration")?.unwrap_or(cfg.default_duration_hours);
            let restaurant = engine
                .store()
                .get_restaurant(restaurant_id)
                .await?
                .ok_or(EngineError::NotFound { kind: "restaurant", id: restaurant_id })?;
            let query = SlotQuery::for_restaurant(&restaurant, date, party, duration)?
                .with_granularity(cfg.slot_granularity);
            serde_json::to_value(engine.time_slots(&query).await?)?
        }
        ["tables", restaurant, date, time, ..] => {
            let restaurant_id = Ulid::from_str(restaurant)?;
            let party = arg(&args, 4, "party")?;
            let duration = arg(&args, 5, "duration")?;
            let result = engine
                .check_availability(restaurant_id, date, time, duration, party)
                .await?;
            serde_json::to_value(result)?
        }
        ["schedule", restaurant, date] => {
            let restaurant_id = Ulid::from_str(restaurant)?;
            serde_json::to_value(engine.daily_schedule(restaurant_id, date).await?)?
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
