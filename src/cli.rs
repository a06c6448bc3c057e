//! `emukrnl` command line: file operations through the kernel facade on
//! emulated DOS paths.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use ek_core::config::KernelConfig;
use ek_core::file::{FileAttributes, FileInfo, FileTime};
use serde::Serialize;

use crate::bootstrap::{load_config, wire_kernel_on, KernelRuntime};
use crate::kernel::{Kernel, HFILE_ERROR};
use ek_platform::SelectionDisplay;

const READ_CHUNK: usize = 4096;

#[derive(Parser)]
#[command(name = "emukrnl")]
#[command(about = "Kernel file service on emulated DOS paths", long_about = None)]
pub struct Cli {
    /// Configuration file (default: <config dir>/emukrnl/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Native directory used as drive C:
    #[arg(long, global = true)]
    pub drive_c: Option<PathBuf>,

    /// Emulated current directory, e.g. C:\WINDOWS
    #[arg(long, global = true)]
    pub cwd: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show file information
    Stat {
        path: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print a file's contents
    Cat { path: String },
    /// Copy a file
    Copy {
        source: String,
        dest: String,
        /// Fail if the destination exists
        #[arg(long)]
        no_clobber: bool,
    },
    /// Rename a file
    Move { source: String, dest: String },
    /// Delete a file
    Delete { path: String },
    /// Create a temporary file name
    TempName {
        /// Directory (default: configured temp directory)
        #[arg(short, long)]
        dir: Option<String>,
        #[arg(short, long, default_value = "tmp")]
        prefix: String,
        /// Use this number instead of searching for a free name
        #[arg(short, long, default_value_t = 0)]
        unique: u32,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Serialize)]
struct StatReport<'a> {
    path: &'a str,
    attributes: Vec<&'static str>,
    size: u64,
    links: u64,
    last_write: Option<DateTime<Utc>>,
    last_access: Option<DateTime<Utc>>,
    file_index: u64,
}

impl<'a> StatReport<'a> {
    fn new(path: &'a str, info: &FileInfo) -> Self {
        Self {
            path,
            attributes: attribute_names(info.attributes),
            size: info.size,
            links: info.links,
            last_write: utc(info.last_write),
            last_access: utc(info.last_access),
            file_index: (u64::from(info.index_high) << 32) | u64::from(info.index_low),
        }
    }
}

fn utc(time: FileTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.to_unix_secs(), 0)
}

fn attribute_names(attributes: FileAttributes) -> Vec<&'static str> {
    attributes
        .iter_names()
        .map(|(name, _)| name)
        .collect()
}

/// Turn the last recorded kernel error into a command error.
fn kernel_failure(kernel: &Kernel, what: &str) -> anyhow::Error {
    match kernel.last_error().get() {
        Some(err) => anyhow!("{what}: {err} (DOS error {:#04x})", err.code()),
        None => anyhow!("{what}: failed"),
    }
}

/// Load configuration, wire a kernel and run `cli.command`, writing the
/// command's output to `out`.
pub fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.drive_c.clone())?;
    if let Commands::Config = cli.command {
        return print_config(&config, out);
    }

    let mut runtime = wire_kernel_on(&config, SelectionDisplay::new(), cli.cwd.as_deref())
        .context("Failed to set up the kernel")?;
    let result = run_command(&mut runtime, cli.command, out);
    runtime.kernel.shutdown();
    result
}

fn run_command(runtime: &mut KernelRuntime, command: Commands, out: &mut dyn Write) -> Result<()> {
    let kernel = &mut runtime.kernel;
    match command {
        Commands::Stat { path, json } => run_stat(kernel, &path, json, out),
        Commands::Cat { path } => run_cat(kernel, &path, out),
        Commands::Copy {
            source,
            dest,
            no_clobber,
        } => {
            if !kernel.copy_file(&source, &dest, no_clobber) {
                return Err(kernel_failure(kernel, &format!("copy {source} -> {dest}")));
            }
            Ok(())
        }
        Commands::Move { source, dest } => {
            if !kernel.move_file(&source, &dest) {
                return Err(kernel_failure(kernel, &format!("move {source} -> {dest}")));
            }
            Ok(())
        }
        Commands::Delete { path } => {
            if !kernel.delete_file(&path) {
                return Err(kernel_failure(kernel, &format!("delete {path}")));
            }
            Ok(())
        }
        Commands::TempName {
            dir,
            prefix,
            unique,
        } => {
            let mut name = String::new();
            let number = kernel.get_temp_file_name(dir.as_deref(), &prefix, unique, &mut name);
            if number == 0 {
                return Err(kernel_failure(kernel, "temp-name"));
            }
            writeln!(out, "{name}")?;
            Ok(())
        }
        Commands::Config => Ok(()),
    }
}

fn run_stat(kernel: &mut Kernel, path: &str, json: bool, out: &mut dyn Write) -> Result<()> {
    let Some(info) = kernel.stat(path) else {
        return Err(kernel_failure(kernel, &format!("stat {path}")));
    };
    let report = StatReport::new(path, &info);
    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "path:        {}", report.path)?;
    writeln!(out, "attributes:  {}", report.attributes.join(" "))?;
    writeln!(out, "size:        {}", report.size)?;
    writeln!(out, "links:       {}", report.links)?;
    if let Some(last_write) = report.last_write {
        writeln!(out, "last write:  {}", last_write.to_rfc3339())?;
    }
    if let Some(last_access) = report.last_access {
        writeln!(out, "last access: {}", last_access.to_rfc3339())?;
    }
    Ok(())
}

fn run_cat(kernel: &mut Kernel, path: &str, out: &mut dyn Write) -> Result<()> {
    let hfile = kernel.lopen(path, 0);
    if hfile == HFILE_ERROR {
        return Err(kernel_failure(kernel, &format!("open {path}")));
    }

    let mut buf = vec![0u8; READ_CHUNK];
    let result = loop {
        let count = kernel.lread(hfile, &mut buf);
        if count == HFILE_ERROR {
            break Err(kernel_failure(kernel, &format!("read {path}")));
        }
        if count == 0 {
            break Ok(());
        }
        let count = usize::try_from(count).unwrap_or(0);
        if let Err(err) = out.write_all(&buf[..count]) {
            break Err(err.into());
        }
    };
    kernel.lclose(hfile);
    result
}

fn print_config(config: &KernelConfig, out: &mut dyn Write) -> Result<()> {
    let text = toml::to_string_pretty(config).context("Failed to render configuration")?;
    out.write_all(text.as_bytes())?;
    Ok(())
}
