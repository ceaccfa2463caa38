use std::collections::HashMap;

use vortex::config::VortexConfig;
use vortex::store::local::LocalLauncher;
use vortex::store::storage::LocalStorage;
use vortex::sync::postgrest::PostgrestTable;
use vortex::sync::RemoteTable;

#[tokio::main]
async fn main() {
    match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => {
            if let Err(e) = journal
                .with_syslog_identifier("vortex-migrate-check".to_string())
                .install()
            {
                eprintln!("Failed to install logger: {}", e);
            }
        }
        Err(e) => eprintln!("Journal logging unavailable: {}", e),
    }
    log::set_max_level(log::LevelFilter::Info);

    let config = VortexConfig::load_or_default(&VortexConfig::default_path());

    println!("=== Local store vs remote table ===\n");

    let local = match LocalLauncher::open(LocalStorage::new(&config.data_directory)) {
        Ok(l) => l,
        Err(e) => {
            println!("Local store error: {}", e);
            return;
        }
    };
    println!("Local: {} apps ({})", local.apps().len(), config.data_directory.display());

    let api_key = match config.remote.resolve_api_key().await {
        Ok(k) => k,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };
    let table = match PostgrestTable::from_config(&config.remote, &api_key) {
        Ok(t) => t,
        Err(e) => {
            println!("Client error: {}", e);
            return;
        }
    };
    println!("--- Remote: {} ---", table.endpoint());

    let remote = match table.fetch_all().await {
        Ok(r) => r,
        Err(e) => {
            println!("Error fetching remote table: {}", e);
            return;
        }
    };
    println!("Remote: {} apps\n", remote.len());

    // Entries are matched on (name, url); neither side has a shared id.
    let remote_by_key: HashMap<(&str, &str), _> = remote
        .iter()
        .map(|r| ((r.name.as_str(), r.url.as_str()), r))
        .collect();
    let local_by_key: HashMap<(&str, &str), _> = local
        .apps()
        .iter()
        .map(|d| ((d.name.as_str(), d.url.as_str()), d))
        .collect();

    let mut matched = 0;
    let mut differing = Vec::new();
    let mut local_only = Vec::new();
    for draft in local.apps() {
        match remote_by_key.get(&(draft.name.as_str(), draft.url.as_str())) {
            Some(record) => {
                matched += 1;
                if record.category != draft.category || record.description != draft.description {
                    differing.push((draft.name.as_str(), draft.category, record.category));
                }
            }
            None => local_only.push(draft),
        }
    }
    let remote_only: Vec<_> = remote
        .iter()
        .filter(|r| !local_by_key.contains_key(&(r.name.as_str(), r.url.as_str())))
        .collect();

    println!("Matched: {}", matched);

    if !differing.is_empty() {
        println!("\nDIFFERING DETAILS:");
        for (name, local_c, remote_c) in &differing {
            println!("  {}: local {}, remote {}", name, local_c, remote_c);
        }
    }

    if !local_only.is_empty() {
        println!("\nLOCAL ONLY ({}):", local_only.len());
        for d in &local_only {
            println!("  [{}] {} ({})", d.category, d.name, d.url);
        }
    }

    if !remote_only.is_empty() {
        println!("\nREMOTE ONLY ({}):", remote_only.len());
        for r in &remote_only {
            println!("  [{}] {} ({}) sort {}", r.category, r.name, r.url, r.sort_order);
        }
    }

    if differing.is_empty() && local_only.is_empty() && remote_only.is_empty() {
        println!("All in sync!");
    }

    println!("\n=== Done ===");
}
