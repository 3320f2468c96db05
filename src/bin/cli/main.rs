mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "davlink", about = "Sync note attachments with a WebDAV server", version)]
struct Cli {
    /// Vault directory (default: current directory)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// Settings file (default: davlink/settings.json in the config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Folder for downloaded attachments, relative to the vault root
    #[arg(long, global = true)]
    attachment_folder: Option<String>,

    /// Generate markdown links instead of wikilinks
    #[arg(long, global = true)]
    markdown_links: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Show or change settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Check that the server answers with the configured credentials
    Test,

    /// Upload local attachments and relink them (whole vault by default)
    Upload {
        /// Only links in this note
        #[arg(long, conflicts_with_all = ["folder", "attachments"])]
        note: Option<String>,
        /// Only notes below this folder
        #[arg(long, conflicts_with = "attachments")]
        folder: Option<String>,
        /// Attachments directly inside this folder, in every note that uses them
        #[arg(long)]
        attachments: Option<String>,
    },

    /// Download remote attachments into the vault (whole vault by default)
    Download {
        /// Only links in this note
        #[arg(long, conflicts_with = "folder")]
        note: Option<String>,
        /// Only notes below this folder
        #[arg(long)]
        folder: Option<String>,
    },

    /// Act on the link at a position in a note
    #[command(subcommand)]
    Link(LinkCommand),

    /// Upload a file as if it was pasted and append its link to a note
    Paste {
        /// Note to append the link to
        note: String,
        /// File to upload
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print current settings
    Show,

    /// Change one setting and save
    Set {
        /// Option name, e.g. url, includeExtensions, uploaded-file-operation
        key: String,
        value: String,
    },
}

/// Link position: 1-based line and column, as editors show them
#[derive(clap::Args)]
struct Position {
    /// Note path, relative to the vault
    note: String,
    line: usize,
    column: usize,
}

#[derive(Subcommand)]
enum LinkCommand {
    /// Upload the linked local file
    Upload(Position),
    /// Download the linked remote file
    Download(Position),
    /// Delete the linked remote file and drop the link
    Delete(Position),
    /// Move the linked remote file
    Rename {
        #[command(flatten)]
        position: Position,
        /// New remote path, e.g. /2024/photo.png
        new_path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut app = app::App::new(app::Options {
        vault: cli.vault,
        settings: cli.settings,
        attachment_folder: cli.attachment_folder,
        markdown_links: cli.markdown_links,
    })?;

    match cli.command {
        Command::Config(ConfigCommand::Show) => {
            commands::config::run_show(&app, &cli.format)?;
        }
        Command::Config(ConfigCommand::Set { key, value }) => {
            commands::config::run_set(&mut app, &key, &value, &cli.format)?;
        }
        Command::Test => {
            commands::test::run(&app, &cli.format).await?;
        }
        Command::Upload { note, folder, attachments } => {
            let scope = match (note, folder, attachments) {
                (Some(note), _, _) => commands::upload::Scope::Note(note),
                (_, Some(folder), _) => commands::upload::Scope::Folder(folder),
                (_, _, Some(folder)) => commands::upload::Scope::Attachments(folder),
                _ => commands::upload::Scope::Vault,
            };
            commands::upload::run(&app, scope, &cli.format).await?;
        }
        Command::Download { note, folder } => {
            let scope = match (note, folder) {
                (Some(note), _) => commands::download::Scope::Note(note),
                (_, Some(folder)) => commands::download::Scope::Folder(folder),
                _ => commands::download::Scope::Vault,
            };
            commands::download::run(&app, scope, &cli.format).await?;
        }
        Command::Link(subcmd) => {
            use davlink_lib::sync::actions::LinkAction;

            let (position, action) = match subcmd {
                LinkCommand::Upload(position) => (position, LinkAction::Upload),
                LinkCommand::Download(position) => (position, LinkAction::Download),
                LinkCommand::Delete(position) => (position, LinkAction::Delete),
                LinkCommand::Rename { position, new_path } => (position, LinkAction::Rename(new_path)),
            };
            commands::link::run(
                &app,
                &position.note,
                position.line,
                position.column,
                &action,
                &cli.format,
            )
            .await?;
        }
        Command::Paste { note, file } => {
            commands::paste::run(&app, &note, &file, &cli.format).await?;
        }
    }

    Ok(())
}
