use clap::{Parser, Subcommand};
use docqa::Result;
use docqa::commands::{AskOptions, ask, init_config, resolve_config_dir, serve};
use docqa::config::show_config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Multi-tenant in-memory document retrieval with grounded answers")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to the platform config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write or show configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Start the action server on stdio
    Serve,
    /// Answer a question over local text files
    Ask {
        /// Question to answer
        question: String,
        /// Text files to ingest before answering
        #[arg(long = "file", short = 'f')]
        files: Vec<PathBuf>,
        /// Conversation id
        #[arg(long)]
        conv: Option<String>,
        /// Namespace
        #[arg(long)]
        ns: Option<String>,
        /// Number of passages to retrieve
        #[arg(short)]
        k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = resolve_config_dir(cli.config_dir)?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                init_config(&config_dir)?;
            }
        }
        Commands::Serve => {
            serve(&config_dir).await?;
        }
        Commands::Ask {
            question,
            files,
            conv,
            ns,
            k,
        } => {
            let options = AskOptions {
                question,
                files,
                conversation: conv,
                namespace: ns,
                k,
            };
            tokio::task::spawn_blocking(move || ask(&config_dir, &options))
                .await
                .map_err(anyhow::Error::from)??;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn serve_command() {
        let cli = Cli::try_parse_from(["docqa", "serve"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Serve));
            assert!(parsed.config_dir.is_none());
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["docqa", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn config_dir_is_global() {
        let cli = Cli::try_parse_from(["docqa", "serve", "--config-dir", "/tmp/docqa"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/docqa")));
        }
    }

    #[test]
    fn ask_command_with_options() {
        let cli = Cli::try_parse_from([
            "docqa",
            "ask",
            "When is rent due?",
            "-f",
            "lease.txt",
            "--file",
            "memo.txt",
            "--ns",
            "Acme",
            "-k",
            "3",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask {
                question,
                files,
                conv,
                ns,
                k,
            } = parsed.command
            {
                assert_eq!(question, "When is rent due?");
                assert_eq!(
                    files,
                    vec![PathBuf::from("lease.txt"), PathBuf::from("memo.txt")]
                );
                assert_eq!(conv, None);
                assert_eq!(ns.as_deref(), Some("Acme"));
                assert_eq!(k, Some(3));
            }
        }
    }

    #[test]
    fn ask_requires_question() {
        let cli = Cli::try_parse_from(["docqa", "ask"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["docqa", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["docqa", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
