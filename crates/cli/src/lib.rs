pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::commands::recommend::RecommendQuery;

#[derive(Debug, Parser)]
#[command(
    name = "autorec",
    about = "Autorec operator CLI",
    long_about = "Inspect configuration, check artifact readiness, and run recommendation queries against the configured model and inventory.",
    after_help = "Examples:\n  autorec doctor --json\n  autorec config\n  autorec recommend --item-id 2020_toyota_camry_le --k 5\n  autorec recommend --attributes '{\"YearOfMaking\":2020,\"Make\":\"Toyota\",\"Model\":\"Camry\",\"Trim\":\"SE\"}'"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and check that the artifact and inventory load")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run one recommendation query and print a JSON outcome")]
    Recommend {
        #[arg(
            long,
            conflicts_with = "attributes",
            required_unless_present = "attributes",
            help = "Known item id for collaborative recommendations"
        )]
        item_id: Option<String>,
        #[arg(long, help = "JSON object describing an unseen vehicle")]
        attributes: Option<String>,
        #[arg(long, help = "Number of recommendations (defaults to recommender.default_k)")]
        k: Option<usize>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Recommend { item_id, attributes, k } => {
            let query = match (item_id, attributes) {
                (Some(item_id), _) => RecommendQuery::Item(item_id),
                (None, Some(attributes)) => RecommendQuery::Attributes(attributes),
                (None, None) => RecommendQuery::Item(String::new()),
            };
            commands::recommend::run(query, k)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
