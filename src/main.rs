#![deny(rust_2018_idioms)]

mod config;
mod print;

use clap::Parser;
use config::{Cli, Command, Target};
use csrgen_core::{Annotated, RegisterFile, Schema};
use displaydoc_lite::displaydoc;
use owo_colors::OwoColorize;
use std::{
    fs::{self, File},
    io::{self, BufReader, Write},
    path::Path,
};

fn main() {
    let cli = Cli::parse();
    print::init_logging(cli.level());

    if let Err(err) = run(&cli) {
        log::error!("{}", err.red());
        log::error!("{} error happened while generating, exiting...", "Fatal".red());
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), FatalError> {
    match &cli.command {
        Command::Generate { target, output } => {
            let schema = load_schema(&target.schema)?;
            let params = target.params()?;
            let text = csrgen_core::generate(&schema, &params)?;

            match output {
                Some(path) => {
                    fs::write(path, &text).map_err(|source| FatalError::io(path, source))?;
                    log::info!("{} {}", "Wrote".green(), path.display());
                }
                None => io::stdout()
                    .lock()
                    .write_all(text.as_bytes())
                    .map_err(|source| FatalError::io(Path::new("<stdout>"), source))?,
            }
        }
        Command::Specialize {
            target,
            register,
            op,
            value,
        } => {
            let spec = specialize(target, register, (*op).into(), *value)?;
            log::info!("using the {:?} form", spec.form);
            println!("{}", spec.call);
        }
    }

    Ok(())
}

fn specialize(
    target: &Target,
    register: &str,
    op: csrgen_core::ConstOp,
    value: u128,
) -> Result<csrgen_core::Specialization, FatalError> {
    let schema = load_schema(&target.schema)?;
    let params = target.params()?;

    let file = RegisterFile::build(&schema, params.xlen).map_err(csrgen_core::Error::from)?;
    let model = Annotated::new(&file);
    Ok(csrgen_core::specialize(
        &model,
        params.backend,
        register,
        op,
        value,
    )?)
}

fn load_schema(path: &Path) -> Result<Schema, FatalError> {
    log::debug!("loading schema from {}", path.display());
    let file = File::open(path).map_err(|source| FatalError::io(path, source))?;
    Ok(Schema::from_reader(BufReader::new(file))?)
}

displaydoc! {
    /// Any error that will cause the generator to exit.
    #[derive(Debug)]
    pub enum FatalError {
        /// failed to access `{path}`: {source}
        Io { path: String, source: io::Error },
        /// {_0}
        Generate(csrgen_core::Error),
    }
}

impl FatalError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl From<csrgen_core::Error> for FatalError {
    fn from(err: csrgen_core::Error) -> Self {
        Self::Generate(err)
    }
}
