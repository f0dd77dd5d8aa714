use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use goodweb::component::{Component, ComponentRegistry};
use goodweb::discovery::discover;
use goodweb::error::CompileError;
use goodweb::finalize::finalize;
use goodweb::resolve::resolve;

/// Build a static site from component and page templates.
#[derive(Debug, Parser)]
#[command(name = "goodweb", version, about)]
struct Cli {
    /// Site root containing `components/` and `pages/`.
    #[arg(default_value = ".")]
    site: PathBuf,

    /// Output directory, relative to the site root unless absolute.
    #[arg(short, long, default_value = "build")]
    out: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(count) => {
            info!("wrote {} files", count);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", ErrorChain(&e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<usize, CompileError> {
    let components = load(&cli.site.join("components"))?;
    info!("registered {} components", components.len());
    let registry = ComponentRegistry::build(components);

    let pages = load(&cli.site.join("pages"))?;
    info!("building {} pages", pages.len());

    let result = resolve(&pages, &registry)?;
    let files = finalize(&result, &registry);

    let out_dir = if cli.out.is_absolute() {
        cli.out.clone()
    } else {
        cli.site.join(&cli.out)
    };
    if out_dir.exists() {
        fs::remove_dir_all(&out_dir).map_err(|e| CompileError::io(&out_dir, e))?;
    }
    fs::create_dir_all(&out_dir).map_err(|e| CompileError::io(&out_dir, e))?;

    for file in &files {
        let path = out_dir.join(&file.filename);
        fs::write(&path, &file.content).map_err(|e| CompileError::io(&path, e))?;
    }

    Ok(files.len())
}

fn load(dir: &Path) -> Result<Vec<Component>, CompileError> {
    discover(dir)?
        .into_iter()
        .map(Component::from_source)
        .collect()
}

/// Renders an error with its source chain on one line.
struct ErrorChain<'a>(&'a CompileError);

impl std::fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = std::error::Error::source(self.0);
        while let Some(cause) = source {
            write!(f, ": {}", cause)?;
            source = cause.source();
        }
        Ok(())
    }
}
