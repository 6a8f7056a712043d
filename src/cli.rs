use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "scriptura",
    about = "Scripture reference and full-text search over Bible translations"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the base URL for built-in translation downloads
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search a translation by reference or keywords
    Search(SearchArgs),
    /// Combined bible/sermon/notes suggestions for one query
    Suggest(SuggestArgs),
    /// Manage custom translation sources
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },
    /// Show recent search history
    History(HistoryArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Reference ("John 3:16-18") or free-text query
    pub query: String,

    /// Translation to search
    #[arg(short = 'V', long, default_value = "kjv")]
    pub version: String,

    /// Number of results to return
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,

    /// Minimum relevance score for free-text matches
    #[arg(long, default_value = "0.0")]
    pub threshold: f32,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not record this query in the search history
    #[arg(long)]
    pub no_history: bool,
}

// -- Suggest --

#[derive(Debug, Parser)]
pub struct SuggestArgs {
    /// The search term
    pub term: String,

    /// Translation to search
    #[arg(short = 'V', long, default_value = "kjv")]
    pub version: String,

    /// User whose notes should be searched (omit for anonymous)
    #[arg(long)]
    pub user: Option<String>,

    /// JSON file holding an array of sermon records
    #[arg(long)]
    pub sermons: Option<PathBuf>,

    /// JSON file mapping user ids to arrays of note records
    #[arg(long)]
    pub notes: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Source subcommands --

#[derive(Debug, Subcommand)]
pub enum SourceAction {
    /// Register (or replace) a custom translation source and build it
    Add {
        /// Version name to register the source under
        name: String,
        /// URL of the translation JSON document
        url: String,
    },
    /// Remove a custom translation source
    Remove {
        /// Name of the source to remove
        name: String,
    },
    /// List registered custom sources
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

// -- History --

#[derive(Debug, Parser)]
pub struct HistoryArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "scriptura",
            &mut std::io::stdout(),
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_search_defaults() {
        let cli = Cli::parse_from(["scriptura", "search", "John 3:16"]);
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.query, "John 3:16");
                assert_eq!(args.version, "kjv");
                assert_eq!(args.count, 10);
                assert_eq!(args.threshold, 0.0);
                assert!(!args.json);
                assert!(!args.no_history);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn parse_suggest_with_user() {
        let cli = Cli::parse_from([
            "scriptura", "suggest", "love", "--user", "alice", "-V", "web",
        ]);
        match cli.command {
            Command::Suggest(args) => {
                assert_eq!(args.term, "love");
                assert_eq!(args.user.as_deref(), Some("alice"));
                assert_eq!(args.version, "web");
            }
            _ => panic!("expected suggest command"),
        }
    }

    #[test]
    fn parse_source_add() {
        let cli = Cli::parse_from([
            "scriptura",
            "source",
            "add",
            "mytranslation",
            "https://example.com/bible.json",
        ]);
        match cli.command {
            Command::Source {
                action: SourceAction::Add { name, url },
            } => {
                assert_eq!(name, "mytranslation");
                assert_eq!(url, "https://example.com/bible.json");
            }
            _ => panic!("expected source add command"),
        }
    }
}
