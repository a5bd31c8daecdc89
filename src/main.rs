use clap::{Parser, Subcommand};
use ragchat::commands::{ask, chat, init, list_tools, show_status};
use ragchat::config::{run_interactive_config, show_config};
use ragchat::Result;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(about = "A retrieval-augmented chat assistant over your own documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure API keys, embeddings, and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest a document into the vector store
    Init {
        /// Path to the document to ingest (PDF or plain text)
        #[arg(long)]
        document: Option<PathBuf>,
        /// Drop and rebuild the collection even if it already holds data
        #[arg(long)]
        force_rebuild: bool,
        /// Skip the confirmation prompt before a destructive rebuild
        #[arg(long)]
        yes: bool,
        /// Pick the first discovered PDF without prompting
        #[arg(long)]
        auto: bool,
    },
    /// Start an interactive chat session
    Chat,
    /// Send a single prompt and print the reply
    Ask {
        /// The prompt to send
        prompt: String,
    },
    /// List the available tool commands
    Tools,
    /// Show connectivity and data status for every component
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Init {
            document,
            force_rebuild,
            yes,
            auto,
        } => {
            init(document, force_rebuild, yes, auto).await?;
        }
        Commands::Chat => {
            chat().await?;
        }
        Commands::Ask { prompt } => {
            ask(prompt).await?;
        }
        Commands::Tools => {
            list_tools()?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["ragchat", "chat"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Chat);
        }
    }

    #[test]
    fn init_with_document() {
        let cli = Cli::try_parse_from(["ragchat", "init", "--document", "manual.pdf"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Init {
                document,
                force_rebuild,
                ..
            } = parsed.command
            {
                assert_eq!(document, Some(PathBuf::from("manual.pdf")));
                assert!(!force_rebuild);
            }
        }
    }

    #[test]
    fn init_force_rebuild_flags() {
        let cli = Cli::try_parse_from(["ragchat", "init", "--force-rebuild", "--yes"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Init {
                force_rebuild, yes, ..
            } = parsed.command
            {
                assert!(force_rebuild);
                assert!(yes);
            }
        }
    }

    #[test]
    fn ask_requires_prompt() {
        let cli = Cli::try_parse_from(["ragchat", "ask"]);
        assert!(cli.is_err());

        let cli = Cli::try_parse_from(["ragchat", "ask", "what is rust?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { prompt } = parsed.command {
                assert_eq!(prompt, "what is rust?");
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["ragchat", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["ragchat", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["ragchat", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
