use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "copydesk")]
#[command(about = "Run remote writing tasks and reconcile fact-checked claims", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (RON); defaults to ./copydesk.ron when present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the API base url from the configuration
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Research keywords for an industry and audience
    Research {
        #[command(flatten)]
        brief: Brief,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Draft an outline, optionally seeded with research notes
    Outline {
        #[command(flatten)]
        brief: Brief,
        /// File holding a research summary
        #[arg(long)]
        research: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Generate a full article
    Generate {
        #[arg(long)]
        title: String,
        #[command(flatten)]
        brief: Brief,
        /// File holding an outline to follow
        #[arg(long)]
        outline: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Rewrite a document following instructions
    Rewrite {
        input: PathBuf,
        #[arg(long)]
        instructions: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Fact-check a markdown document and preview citation fixes
    #[command(name = "fact-check")]
    FactCheck {
        input: PathBuf,
        /// Apply every fix that has a matching sentence and a source
        #[arg(long)]
        apply: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, Args)]
pub struct Brief {
    /// Keyword to cover; repeat for several
    #[arg(long = "keyword", short = 'k', required = true)]
    pub keywords: Vec<String>,
    #[arg(long)]
    pub industry: String,
    #[arg(long)]
    pub audience: String,
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Write the result here instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_keywords() {
        let cli = Cli::try_parse_from([
            "copydesk",
            "research",
            "-k",
            "espresso",
            "--keyword",
            "grinders",
            "--industry",
            "Coffee",
            "--audience",
            "Home baristas",
        ])
        .unwrap();
        match cli.command {
            Command::Research { brief, output } => {
                assert_eq!(brief.keywords, vec!["espresso", "grinders"]);
                assert!(output.output.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn fact_check_takes_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "copydesk",
            "fact-check",
            "draft.md",
            "--apply",
            "--api-url",
            "http://localhost:9999",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://localhost:9999"));
        assert!(matches!(cli.command, Command::FactCheck { apply: true, .. }));
    }
}
