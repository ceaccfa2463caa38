use std::sync::Arc;

use vortex::config::VortexConfig;
use vortex::core::app::{AppDraft, AppId, AppRecord};
use vortex::message::{FormField, Message};
use vortex::runtime::Runtime;
use vortex::store::local::LocalLauncher;
use vortex::store::storage::LocalStorage;
use vortex::sync::postgrest::PostgrestTable;
use vortex::sync::reconciler::Reconciler;
use vortex::sync::SyncStatus;

use super::{confirm, index_of, CliError, CmdResult, ViewArgs};
use crate::pages::grid;
use crate::Commands;

pub async fn connect(config: &VortexConfig) -> Result<Arc<Reconciler<PostgrestTable>>, Box<dyn std::error::Error>> {
    let api_key = config.remote.resolve_api_key().await?;
    let table = PostgrestTable::from_config(&config.remote, &api_key)?;
    log::info!("Using remote table {}", table.endpoint());
    Ok(Arc::new(Reconciler::new(Arc::new(table))))
}

fn start(config: &VortexConfig, reconciler: Arc<Reconciler<PostgrestTable>>) -> Runtime<PostgrestTable> {
    Runtime::start(
        reconciler,
        LocalStorage::new(&config.data_directory),
        &config.browser_command,
    )
}

/// Surface the outcome of the last settled batch of effects.
fn check(runtime: &Runtime<PostgrestTable>) -> Result<(), CliError> {
    let launcher = runtime.launcher();
    if let Some((op, e)) = launcher.last_write_error() {
        return Err(CliError::Remote(format!("{} failed: {}", op, e)));
    }
    if let SyncStatus::Error(e) = launcher.sync_status() {
        return Err(CliError::Remote(e.clone()));
    }
    Ok(())
}

fn at(runtime: &Runtime<PostgrestTable>, position: usize) -> Result<AppRecord, CliError> {
    let visible = runtime.launcher().visible();
    let index = index_of(position, visible.len())?;
    Ok(visible[index].clone())
}

/// Fill in and submit the add or edit form.
async fn submit(runtime: &mut Runtime<PostgrestTable>, editing: Option<AppId>, draft: AppDraft) -> CmdResult {
    runtime.dispatch(match editing {
        Some(id) => Message::OpenEditForm(id),
        None => Message::OpenAddForm,
    });
    runtime.dispatch(Message::FormInput(FormField::Name, draft.name));
    runtime.dispatch(Message::FormInput(FormField::Url, draft.url));
    runtime.dispatch(Message::FormInput(FormField::Icon, draft.icon));
    runtime.dispatch(Message::FormInput(FormField::Description, draft.description));
    runtime.dispatch(Message::FormCategory(draft.category));
    runtime.dispatch(Message::SubmitForm);

    // An invalid form stays open with its error.
    if let Some(error) = runtime.launcher().form().and_then(|f| f.error.clone()) {
        return Err(error.into());
    }
    runtime.settle().await;
    check(runtime)?;
    Ok(())
}

pub async fn run(config: &VortexConfig, args: &ViewArgs, command: Commands) -> CmdResult {
    let mut runtime = start(config, connect(config).await?);
    runtime.settle().await;
    check(&runtime)?;
    runtime.dispatch(Message::SelectCategory(args.filter));
    runtime.dispatch(Message::SearchChanged(args.search.clone()));

    match command {
        Commands::List => {
            print!("{}", grid::snapshot(&runtime.launcher().snapshot()));
        }
        Commands::Categories => {
            for (filter, count) in runtime.launcher().counts() {
                println!("{:<14} {}", filter.label(), count);
            }
        }
        Commands::Add(fields) => {
            let draft = fields.into_new_draft()?;
            let name = draft.name.clone();
            submit(&mut runtime, None, draft).await?;
            println!("Added {}", name.trim());
        }
        Commands::Edit { position, fields } => {
            let record = at(&runtime, position)?;
            let draft = fields.merged_into(record.draft());
            submit(&mut runtime, Some(record.id), draft).await?;
            println!("Updated {}", record.name);
        }
        Commands::Delete { position, yes } => {
            let record = at(&runtime, position)?;
            runtime.dispatch(Message::RequestDelete(record.id));
            let prompt = match runtime.launcher().pending_delete() {
                Some((_, name)) => format!("Are you sure you want to delete {}?", name),
                None => return Err(CliError::Remote(format!("{} disappeared", record.name)).into()),
            };
            if !confirm(prompt, yes)? {
                runtime.dispatch(Message::CancelDelete);
                return Ok(());
            }
            runtime.dispatch(Message::ConfirmDelete);
            runtime.settle().await;
            check(&runtime)?;
            println!("Deleted {}", record.name);
        }
        Commands::Move { from, to } => {
            let dragged = at(&runtime, from)?;
            let target = at(&runtime, to)?;
            runtime.dispatch(Message::DragStart(dragged.id));
            runtime.dispatch(Message::Drop(target.id));
            runtime.dispatch(Message::DragEnd);
            runtime.settle().await;
            check(&runtime)?;
            println!("Swapped {} and {}", dragged.name, target.name);
        }
        Commands::Open { position } => {
            let record = at(&runtime, position)?;
            runtime.dispatch(Message::OpenApp(record.id));
        }
        other => return Err(CliError::Unsupported(format!("{:?}", other)).into()),
    }
    Ok(())
}

/// Live grid: redraws on every published snapshot until Ctrl-C.
pub async fn watch(config: &VortexConfig, args: &ViewArgs) -> CmdResult {
    let runtime = start(config, connect(config).await?);
    let tx = runtime.sender();
    tx.send(Message::SelectCategory(args.filter))?;
    tx.send(Message::SearchChanged(args.search.clone()))?;

    let mut frames = runtime.watch();
    let printer = tokio::spawn(async move {
        while frames.changed().await.is_ok() {
            let frame = grid::snapshot(&frames.borrow_and_update());
            print!("\x1b[2J\x1b[H{}", frame);
        }
    });

    runtime
        .run(config.remote.poll_policy(), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await;
    printer.abort();
    Ok(())
}

/// Copy local-store entries that the remote table lacks, keeping their order.
pub async fn import(config: &VortexConfig, yes: bool) -> CmdResult {
    let local = LocalLauncher::open(LocalStorage::new(&config.data_directory))?;
    let reconciler = connect(config).await?;
    let existing = reconciler.fetch_all().await?;

    let missing: Vec<&AppDraft> = local
        .apps()
        .iter()
        .filter(|draft| {
            !existing
                .iter()
                .any(|r| r.name == draft.name && r.url == draft.url)
        })
        .collect();
    if missing.is_empty() {
        println!("Nothing to import ({} local, {} remote)", local.apps().len(), existing.len());
        return Ok(());
    }
    if !confirm(format!("Copy {} apps to the remote table?", missing.len()), yes)? {
        return Ok(());
    }

    for draft in missing {
        reconciler.create(draft).await?;
        // Next sort order comes from the cache.
        reconciler.fetch_all().await?;
        println!("Imported {}", draft.name);
    }
    Ok(())
}
