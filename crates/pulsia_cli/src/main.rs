//! CLI smoke entry point.
//!
//! # Responsibility
//! - Drive one registry against a seeded in-memory store end to end.
//! - Print the candidate queue before and after live changes.
//!
//! Usage: `pulsia_cli [config.json]`

use log::info;
use pulsia_core::seed::demo_candidates;
use pulsia_core::{
    init_logging_from, resolve_selection, Candidate, CandidateRecord, CandidateStatus, Clock,
    CoreConfig, LocalCandidateStore, Registry, SystemClock,
};
use std::error::Error;
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("pulsia_core ping={}", pulsia_core::ping());
    println!("pulsia_core version={}", pulsia_core::core_version());

    let config = match std::env::args().nth(1) {
        Some(path) => CoreConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => CoreConfig::default(),
    };
    init_logging_from(&config.logging)?;

    let clock = SystemClock;
    let store = Arc::new(LocalCandidateStore::open_in_memory()?);
    store.seed(&demo_candidates(clock.now()))?;

    let mut registry = Registry::new(Arc::clone(&store), config.registry.clone());
    let loaded = registry.activate().await?;
    info!("event=cli_activate module=cli status=ok candidates={loaded}");
    print_queue("initial", registry.candidates());

    let mut arrival = CandidateRecord::new(
        "cli-arrival",
        "Noor Haddad",
        CandidateStatus::New,
        clock.now(),
    );
    arrival.role = "Saturation Diver".to_string();
    store.insert_candidate(&arrival)?;
    if let Some(oldest) = registry.candidates().last() {
        store.delete_candidate(&oldest.id)?;
    }
    let applied = registry.apply_pending();
    println!("applied {applied} live change(s)");
    print_queue("live", registry.candidates());

    if let Some(selected) = resolve_selection(registry.candidates(), None) {
        println!("selected={} score={}", selected.name, selected.diagnostic_score);
    }

    registry.deactivate().await;
    Ok(())
}

fn print_queue(label: &str, candidates: &[Candidate]) {
    println!("-- {label} ({} candidates)", candidates.len());
    for candidate in candidates {
        println!(
            "{:>3} {:<18} {:>8} [{}]",
            candidate.avatar,
            candidate.name,
            candidate.last_message_label,
            candidate.status.badge_class()
        );
    }
}
