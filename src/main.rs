mod build_native;

use build_native::{BuildError, Toolchain};
use clap::Parser;
use compiler::{CompileOptions, OptimizeOptions};
use owo_colors::OwoColorize;
use serde::Deserialize;
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
use std::fs;
use std::io::{stdout, Write};
use std::path::{Path, PathBuf};
use std::process::exit;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// AST file (JSON) produced by the LogoTec frontend
    file: PathBuf,
    #[clap(flatten)]
    options: Config,
    #[arg(long, value_name = "FILE")]
    /// Read defaults for the options below from a TOML file
    config: Option<PathBuf>,
    #[arg(long)]
    /// Print the input tree and stop
    emit_ast: bool,
    #[arg(long)]
    /// Print the tree as JSON after the optimizer (if enabled) and stop
    emit_optimized_ast: bool,
    #[arg(short, long, conflicts_with = "quiet")]
    /// Log each optimizer pass and build step
    verbose: bool,
    #[arg(short, long)]
    /// Only report errors
    quiet: bool,
}

#[derive(clap::Args, Deserialize, Debug, Default)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
struct Config {
    #[arg(short, long, value_name = "FILE")]
    /// Output LLVM IR file; `-` writes to stdout [default: input with `.ll` extension]
    output: Option<PathBuf>,
    #[arg(long)]
    /// Skip the AST optimizer
    no_opt: bool,
    #[arg(long, value_name = "N")]
    /// Maximum optimizer passes [default: 64]
    max_passes: Option<usize>,
    #[arg(long, value_name = "EXE")]
    /// Also assemble and link a native executable
    build: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    /// Turtle runtime C source linked into the executable
    runtime: Option<PathBuf>,
    #[arg(long, value_name = "CMD")]
    /// C compiler used for linking [default: clang]
    cc: Option<String>,
    #[arg(long, value_name = "CMD")]
    /// LLVM static compiler [default: llc]
    llc: Option<String>,
}

impl Config {
    fn merge(self, other: Self) -> Self {
        Self {
            output: self.output.or(other.output),
            no_opt: self.no_opt || other.no_opt,
            max_passes: self.max_passes.or(other.max_passes),
            build: self.build.or(other.build),
            runtime: self.runtime.or(other.runtime),
            cc: self.cc.or(other.cc),
            llc: self.llc.or(other.llc),
        }
    }
}

#[derive(Debug, Error)]
enum DriverError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Compile(#[from] compiler::Error),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("--build needs a runtime C file (--runtime)")]
    MissingRuntime,
}

fn read(path: &Path) -> Result<String, DriverError> {
    fs::read_to_string(path).map_err(|source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, contents: &str) -> Result<(), DriverError> {
    fs::write(path, contents).map_err(|source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn print(contents: &str) -> Result<(), DriverError> {
    stdout()
        .write_all(contents.as_bytes())
        .map_err(|source| DriverError::Io {
            path: PathBuf::from("<stdout>"),
            source,
        })
}

fn main() {
    let args = Args::parse();
    let level = if args.quiet {
        LevelFilter::Error
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
    if let Err(e) = run(args) {
        eprintln!("{}: {e}", "error".red().bold());
        exit(1);
    }
}

fn run(args: Args) -> Result<(), DriverError> {
    let config = match &args.config {
        Some(path) => toml::from_str(&read(path)?)?,
        None => Config::default(),
    };
    let config = args.options.merge(config);
    let tree = syntax::from_json(&read(&args.file)?).map_err(compiler::Error::from)?;
    if args.emit_ast {
        return print(&tree.pretty());
    }
    let options = CompileOptions {
        optimize: !config.no_opt,
        optimizer: OptimizeOptions {
            max_passes: config
                .max_passes
                .unwrap_or(OptimizeOptions::default().max_passes),
        },
        module_name: args
            .file
            .file_name()
            .map_or_else(|| "logotec".to_string(), |n| n.to_string_lossy().into_owned()),
    };
    if args.emit_optimized_ast {
        let tree = if options.optimize {
            compiler::optimize_with(tree, &options.optimizer).tree
        } else {
            tree
        };
        let json = syntax::to_json(&tree).map_err(compiler::Error::from)?;
        return print(&(json + "\n"));
    }
    let compiled = compiler::compile(&tree, &options)?;
    let ir = compiled.module.to_string();
    let output = config
        .output
        .unwrap_or_else(|| args.file.with_extension("ll"));
    if output == Path::new("-") {
        print(&ir)?;
    } else {
        write(&output, &ir)?;
        log::info!("       {} {}", "Wrote".green().bold(), output.display());
    }
    if let Some(exe) = config.build {
        let runtime = config.runtime.ok_or(DriverError::MissingRuntime)?;
        let tools = Toolchain {
            llc: config.llc.unwrap_or_else(|| "llc".to_string()),
            cc: config.cc.unwrap_or_else(|| "clang".to_string()),
        };
        let ir_path = if output == Path::new("-") {
            let path = exe.with_extension("ll");
            write(&path, &ir)?;
            path
        } else {
            output
        };
        build_native::build(&ir_path, &runtime, &exe, &tools)?;
    }
    Ok(())
}
