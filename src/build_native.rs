use owo_colors::OwoColorize;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, ExitStatus};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Toolchain {
    pub llc: String,
    pub cc: String,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{0} command not found. You need to install it or pass its path.")]
    NotFound(String),
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },
    #[error("{tool} exited with {status}")]
    Failed { tool: String, status: ExitStatus },
    #[error("failed to create a temporary directory: {0}")]
    TempDir(#[source] std::io::Error),
}

/// Assembles `ir` with llc and links it against the C `runtime` into `exe`.
pub fn build(ir: &Path, runtime: &Path, exe: &Path, tools: &Toolchain) -> Result<(), BuildError> {
    let dir = tempfile::tempdir().map_err(BuildError::TempDir)?;
    let asm = dir.path().join("program.s");
    let obj = dir.path().join("program.o");
    let runtime_obj = dir.path().join("runtime.o");
    run(
        Command::new(&tools.llc).arg(ir).arg("-o").arg(&asm),
        &tools.llc,
    )?;
    run(
        Command::new(&tools.cc).arg("-c").arg(&asm).arg("-o").arg(&obj),
        &tools.cc,
    )?;
    run(
        Command::new(&tools.cc)
            .arg("-c")
            .arg(runtime)
            .arg("-o")
            .arg(&runtime_obj),
        &tools.cc,
    )?;
    run(
        Command::new(&tools.cc)
            .arg(&obj)
            .arg(&runtime_obj)
            .arg("-o")
            .arg(exe),
        &tools.cc,
    )?;
    log::info!("    {} {}", "Finished".green().bold(), exe.display());
    Ok(())
}

fn run(command: &mut Command, tool: &str) -> Result<(), BuildError> {
    log::info!("     {} {command:?}", "Running".green().bold());
    match command.status() {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(BuildError::Failed {
            tool: tool.to_string(),
            status,
        }),
        Err(e) => match e.kind() {
            ErrorKind::NotFound => Err(BuildError::NotFound(tool.to_string())),
            _ => Err(BuildError::Spawn {
                tool: tool.to_string(),
                source: e,
            }),
        },
    }
}
