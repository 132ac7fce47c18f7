//! Command line arguments.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use csrgen_core::{Backend, ConstOp, GenParams};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "csrgen", version, about = "Generates RISC-V CSR accessors from a register schema")]
pub struct Cli {
    /// Print more log messages, can be repeated
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }

        match self.verbose {
            0 if cfg!(feature = "logging") => log::LevelFilter::Trace,
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render the accessor library for every register of a schema
    Generate {
        #[command(flatten)]
        target: Target,

        /// File to write the library to, stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the call for one constant operation with its instruction form already chosen
    Specialize {
        #[command(flatten)]
        target: Target,

        /// Name of the register
        #[arg(short, long)]
        register: String,

        /// Operation to perform
        #[arg(long, value_enum)]
        op: OpArg,

        /// The constant operand, decimal or `0x` prefixed hex
        #[arg(long, value_parser = parse_int)]
        value: u128,
    },
}

#[derive(Debug, Args)]
pub struct Target {
    /// Path to the JSON register schema
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Machine word size in bits
    #[arg(short, long, default_value_t = 64)]
    pub xlen: u32,

    /// Kind of library to generate
    #[arg(short, long, value_enum, default_value_t = BackendArg::Flat)]
    pub backend: BackendArg,
}

impl Target {
    pub fn params(&self) -> csrgen_core::Result<GenParams> {
        GenParams::new(self.xlen, self.backend.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// C header with inline functions and macros
    Flat,
    /// C++ header with capability checked classes
    Typed,
    /// Rust crate body with exported macros
    Rust,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Flat => Backend::Flat,
            BackendArg::Typed => Backend::Typed,
            BackendArg::Rust => Backend::Rust,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OpArg {
    Write,
    Set,
    Clr,
    #[value(name = "read_write")]
    ReadWrite,
    #[value(name = "read_set_bits")]
    ReadSetBits,
    #[value(name = "read_clr_bits")]
    ReadClrBits,
}

impl From<OpArg> for ConstOp {
    fn from(arg: OpArg) -> Self {
        match arg {
            OpArg::Write => ConstOp::Write,
            OpArg::Set => ConstOp::Set,
            OpArg::Clr => ConstOp::Clr,
            OpArg::ReadWrite => ConstOp::ReadWrite,
            OpArg::ReadSetBits => ConstOp::ReadSetBits,
            OpArg::ReadClrBits => ConstOp::ReadClrBits,
        }
    }
}

fn parse_int(s: &str) -> Result<u128, String> {
    let s = s.trim().replace('_', "");
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u128::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|err| format!("invalid integer `{}`: {}", s, err))
}
