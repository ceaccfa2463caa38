use vortex::config::VortexConfig;
use vortex::core::category::CategoryFilter;
use vortex::runtime::open_url;
use vortex::store::local::LocalLauncher;
use vortex::store::storage::LocalStorage;
use vortex::view;

use super::{confirm, index_of, CliError, CmdResult, ViewArgs};
use crate::pages::grid::{self, Card};
use crate::Commands;

pub fn run(config: &VortexConfig, args: &ViewArgs, command: Commands) -> CmdResult {
    let storage = LocalStorage::new(&config.data_directory);
    let mut launcher = LocalLauncher::open(storage)?;
    // Storage index of each visible entry, in display order.
    let visible: Vec<usize> = launcher
        .visible(args.filter, &args.search)
        .into_iter()
        .map(|(i, _)| i)
        .collect();
    let index_at = |position: usize| index_of(position, visible.len()).map(|i| visible[i]);

    match command {
        Commands::List => {
            let theme = launcher.storage().load_theme();
            let counts = view::category_counts(launcher.apps());
            let total = launcher.apps().len();
            let strip: Vec<_> = CategoryFilter::strip()
                .into_iter()
                .map(|f| (f, view::count_for(&counts, total, f)))
                .collect();
            let cards: Vec<Card<'_>> = visible
                .iter()
                .enumerate()
                .map(|(n, &i)| Card::from_draft(n + 1, &launcher.apps()[i]))
                .collect();
            println!("{}", grid::header(theme, None, None));
            println!("{}\n", grid::strip(&strip, args.filter));
            print!(
                "{}",
                grid::body(&cards, view::empty_state(cards.len(), &args.search))
            );
        }
        Commands::Categories => {
            let counts = view::category_counts(launcher.apps());
            let total = launcher.apps().len();
            for filter in CategoryFilter::strip() {
                println!("{:<14} {}", filter.label(), view::count_for(&counts, total, filter));
            }
        }
        Commands::Add(fields) => {
            let draft = fields.into_new_draft()?;
            let index = launcher.add(draft)?;
            println!("Added {}", launcher.apps()[index].name);
        }
        Commands::Edit { position, fields } => {
            let index = index_at(position)?;
            let draft = fields.merged_into(launcher.apps()[index].clone());
            launcher.edit(index, draft)?;
            println!("Updated {}", launcher.apps()[index].name);
        }
        Commands::Delete { position, yes } => {
            let index = index_at(position)?;
            let name = launcher.apps()[index].name.clone();
            if confirm(format!("Are you sure you want to delete {}?", name), yes)? {
                launcher.delete(index)?;
                println!("Deleted {}", name);
            }
        }
        Commands::Move { from, to } => {
            let (from, to) = (index_at(from)?, index_at(to)?);
            launcher.move_app(from, to)?;
            println!("Moved {}", launcher.apps()[to].name);
        }
        Commands::Open { position } => {
            let index = index_at(position)?;
            open_url(&config.browser_command, &launcher.apps()[index].url)?;
        }
        other => return Err(CliError::Unsupported(format!("{:?}", other)).into()),
    }
    Ok(())
}
