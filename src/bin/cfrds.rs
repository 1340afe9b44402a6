use clap::{Parser, Subcommand};
use std::{
    error::Error,
    io::{self, Write},
    path::PathBuf,
};

use cfrds::cli::{self, RdsUri};
use chrono::Local;
use log::info;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a server directory
    #[command(visible_alias = "dir")]
    Ls { uri: RdsUri },
    /// Print a server file to stdout
    Cat { uri: RdsUri },
    /// Download a server file
    #[command(visible_alias = "download")]
    Get { uri: RdsUri, local: PathBuf },
    /// Upload a local file to the server
    #[command(visible_alias = "upload")]
    Put { local: PathBuf, uri: RdsUri },
    /// Delete a server file
    #[command(visible_alias = "delete")]
    Rm { uri: RdsUri },
    /// Create a server directory
    Mkdir { uri: RdsUri },
    /// Delete a server directory
    Rmdir { uri: RdsUri },
    /// Print the ColdFusion installation directory
    Cfroot { uri: RdsUri },
    /// Check whether a server path exists
    Exists { uri: RdsUri },
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize env_logger; For logging to STDOUT/STDERR
    env_logger::init();

    let args = Cli::parse();
    let mut stdout = io::stdout().lock();

    match args.command {
        Command::Ls { uri } => {
            let path = if uri.path.is_empty() { "/" } else { uri.path.as_str() };
            for entry in uri.connect()?.browse_dir(path)? {
                writeln!(stdout, "{}", cli::format_entry(&entry, &Local))?;
            }
        }
        Command::Cat { uri } => {
            let content = uri.connect()?.read_file(&uri.path)?;
            stdout.write_all(&content.data)?;
        }
        Command::Get { uri, local } => {
            let written = cli::download(&mut uri.connect()?, &uri.path, &local)?;
            info!("wrote {written} bytes to {}", local.display());
        }
        Command::Put { local, uri } => {
            let sent = cli::upload(&mut uri.connect()?, &local, &uri.path)?;
            info!("sent {sent} bytes to {}", uri.path);
        }
        Command::Rm { uri } => uri.connect()?.remove_file(&uri.path)?,
        Command::Mkdir { uri } => uri.connect()?.create_dir(&uri.path)?,
        Command::Rmdir { uri } => uri.connect()?.remove_dir(&uri.path)?,
        Command::Cfroot { uri } => {
            writeln!(stdout, "{}", uri.connect()?.root_dir()?)?;
        }
        Command::Exists { uri } => {
            writeln!(stdout, "{}", uri.connect()?.exists(&uri.path)?)?;
        }
    }

    stdout.flush()?;
    Ok(())
}
