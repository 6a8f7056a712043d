use std::{collections::BTreeMap, path::Path, sync::Arc};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use scriptura::{
    Aggregator,
    DataDir,
    SearchHistory,
    SearchOptions,
    VersionManager,
    cli::{Cli, Command, SourceAction},
    error::{Error, Result},
    fetch::{DEFAULT_BASE_URL, HttpSource},
    search,
    stores::{
        EmptyNotesStore,
        EmptySermonStore,
        FileNotesStore,
        FileSermonStore,
        NotesStore,
        SermonStore,
    },
};

fn init_tracing(verbose: u8) {
    let filter = if let Ok(env) = std::env::var("SCRIPTURA_LOG") {
        EnvFilter::new(env)
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            _ => EnvFilter::new("debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let base_url = cli
        .base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let manager = Arc::new(VersionManager::new(Arc::new(HttpSource::new()), base_url));
    for (name, url) in read_sources(&data_dir.sources_file()) {
        manager.seed_custom_source(&name, &url);
    }

    match cli.command {
        Command::Search(args) => {
            let options = SearchOptions {
                limit: args.count,
                threshold: args.threshold,
            };
            let hits =
                search::execute_search(&manager, &args.query, &args.version, &options)
                    .await?;

            if !args.no_history {
                SearchHistory::new(data_dir.history_file()).save(&args.query);
            }

            if args.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                search::format_human(&hits);
            }
        }
        Command::Suggest(args) => {
            let sermons: Arc<dyn SermonStore> = match &args.sermons {
                Some(path) => Arc::new(FileSermonStore::new(path)),
                None => Arc::new(EmptySermonStore),
            };
            let notes: Arc<dyn NotesStore> = match &args.notes {
                Some(path) => Arc::new(FileNotesStore::new(path)),
                None => Arc::new(EmptyNotesStore),
            };

            let aggregator = Aggregator::new(manager, sermons, notes);
            let response = aggregator
                .search(&args.term, args.user.as_deref(), &args.version)
                .await;

            SearchHistory::new(data_dir.history_file()).save(&args.term);

            if args.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_suggestions(&response);
            }
        }
        Command::Source { action } => match action {
            SourceAction::Add { name, url } => {
                let index = manager.register_custom_source(&name, &url).await?;
                update_sources(&data_dir.sources_file(), |sources| {
                    sources.insert(name.clone(), url.clone());
                })?;
                println!("Registered '{}' ({} verses indexed)", name, index.len());
            }
            SourceAction::Remove { name } => {
                manager.remove_custom_source(&name);
                let mut removed = false;
                update_sources(&data_dir.sources_file(), |sources| {
                    removed = sources.remove(&name).is_some();
                })?;
                if removed {
                    println!("Removed '{name}'");
                } else {
                    return Err(Error::Config(format!(
                        "no custom source named '{name}'"
                    )));
                }
            }
            SourceAction::List { json } => {
                let sources = read_sources(&data_dir.sources_file());
                if json {
                    println!("{}", serde_json::to_string_pretty(&sources)?);
                } else if sources.is_empty() {
                    println!("No custom sources registered.");
                } else {
                    for (name, url) in &sources {
                        println!("{name}\t{url}");
                    }
                }
            }
        },
        Command::History(args) => {
            let entries = SearchHistory::new(data_dir.history_file()).entries();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No recent searches.");
            } else {
                for entry in &entries {
                    println!("{entry}");
                }
            }
        }
        Command::Completions(args) => args.generate(),
    }

    Ok(())
}

fn print_suggestions(response: &scriptura::SearchResponse) {
    let sections = [
        ("Bible", &response.bible),
        ("Sermons", &response.sermons),
        ("Notes", &response.notes),
    ];

    for (heading, results) in sections {
        println!("{heading}:");
        if results.is_empty() {
            println!("  (no results)");
        } else {
            for result in results {
                match &result.description {
                    Some(description) => {
                        println!("  {}  {}", result.title, description)
                    }
                    None => println!("  {}", result.title),
                }
            }
        }
        println!();
    }
}

fn read_sources(path: &Path) -> BTreeMap<String, String> {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return BTreeMap::new();
    };
    serde_json::from_str(&raw).unwrap_or_default()
}

fn update_sources(
    path: &Path,
    apply: impl FnOnce(&mut BTreeMap<String, String>),
) -> Result<()> {
    let mut sources = read_sources(path);
    apply(&mut sources);
    std::fs::write(path, serde_json::to_string_pretty(&sources)?)?;
    Ok(())
}
