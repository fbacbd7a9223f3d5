use std::io;
use std::process::{Command, ExitStatus};

use tracing::{info, warn};
use url::Url;

use crate::entry::Entry;
use crate::{Error, Result};

const TELNET_PORT: u16 = 23;
const SSH_PORT: u16 = 22;

#[cfg(target_os = "macos")]
const DOCUMENT_OPENER: &str = "open";
#[cfg(target_os = "windows")]
const DOCUMENT_OPENER: &str = "explorer";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const DOCUMENT_OPENER: &str = "xdg-open";

/// An external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ClientCommand {
    fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
        }
    }

    /// Works out which client handles `address`.
    pub fn for_address(address: &str) -> Result<Self> {
        let url = Url::parse(address).map_err(|e| Error::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "telnet" => {
                let host = host_of(&url, address)?;
                let port = url.port().unwrap_or(TELNET_PORT).to_string();
                let mut args = Vec::new();
                if !url.username().is_empty() {
                    args.push("-l".to_string());
                    args.push(url.username().to_string());
                }
                args.push(host);
                args.push(port);
                Ok(Self::new("telnet", args))
            }
            "ssh" => {
                let host = host_of(&url, address)?;
                let port = url.port().unwrap_or(SSH_PORT).to_string();
                let target = if url.username().is_empty() {
                    host
                } else {
                    format!("{}@{host}", url.username())
                };
                Ok(Self::new("ssh", vec!["-p".to_string(), port, target]))
            }
            "https" => Ok(Self::new(DOCUMENT_OPENER, vec![address.to_string()])),
            other => Err(Error::UnsupportedScheme(other.to_string())),
        }
    }
}

fn host_of(url: &Url, address: &str) -> Result<String> {
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string()),
        _ => Err(Error::InvalidAddress {
            address: address.to_string(),
            reason: "missing host".to_string(),
        }),
    }
}

/// Runs a client to completion.
pub trait Spawner {
    fn run(&mut self, command: &ClientCommand) -> io::Result<ExitStatus>;
}

/// Spawns real child processes that inherit the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessSpawner;

impl Spawner for ProcessSpawner {
    fn run(&mut self, command: &ClientCommand) -> io::Result<ExitStatus> {
        Command::new(&command.program)
            .args(&command.args)
            .spawn()?
            .wait()
    }
}

/// Connects to the entry's address with the matching client.
///
/// Every error returned here is recoverable: nothing is spawned for an
/// unsupported or unparseable address, and a failing client is only reported.
pub fn launch(entry: &Entry, spawner: &mut impl Spawner) -> Result<()> {
    let command = ClientCommand::for_address(&entry.address)?;
    info!(name = %entry.name, program = %command.program, args = ?command.args, "launching");

    let status = spawner.run(&command).map_err(|source| Error::Spawn {
        program: command.program.clone(),
        source,
    })?;

    if !status.success() {
        warn!(program = %command.program, %status, "client exited unsuccessfully");
        return Err(Error::SubprocessFailure {
            program: command.program,
            status,
        });
    }
    Ok(())
}
