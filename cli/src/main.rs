#[macro_use]
extern crate log;

mod config;
mod history;
mod predict;
mod serve;

use clap::{ArgAction, Parser, Subcommand};
use config::ServeConfig;
use paddy_core::internal::*;
use std::path::PathBuf;

/// Paddy image classifier.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Sets the level of verbosity.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve a model over HTTP.
    Serve(ServeArgs),
    /// Classify image files.
    Predict {
        /// Model artifact (tar, tar.gz or directory)
        model: PathBuf,
        /// Images to classify
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Also print the full score vector
        #[arg(long)]
        scores: bool,
    },
    /// Describe a model artifact.
    Inspect {
        /// Model artifact (tar, tar.gz or directory)
        model: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// TOML configuration file (defaults to $PADDY_CONFIG, then ./paddy.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Model artifact, overrides the configuration
    #[arg(short, long)]
    model: Option<PathBuf>,
    #[arg(long)]
    host: Option<String>,
    #[arg(short, long)]
    port: Option<u16>,
    #[arg(long)]
    workers: Option<usize>,
    #[arg(long)]
    max_upload_bytes: Option<usize>,
    #[arg(long)]
    allow_origin: Option<String>,
}

impl ServeArgs {
    fn config(&self) -> PaddyResult<ServeConfig> {
        let mut config = ServeConfig::load(self.config.as_deref())?;
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(max) = self.max_upload_bytes {
            config.max_upload_bytes = max;
        }
        if let Some(origin) = &self.allow_origin {
            config.allow_origin = origin.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

fn handle(cli: Cli) -> PaddyResult<()> {
    match cli.command {
        Command::Serve(args) => {
            let config = args.config()?;
            debug!("{config:?}");
            let path = config.model.clone().context("No model configured")?;
            let model = paddy_archive::load(path)?;
            serve::serve(config, model)
        }
        Command::Predict { model, images, scores } => {
            let model = paddy_archive::load(model)?;
            predict::predict(model, &images, scores, &mut std::io::stdout().lock())
        }
        Command::Inspect { model } => {
            let model = paddy_archive::load(model)?;
            predict::inspect(&model, &mut std::io::stdout().lock())
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info,actix_server=warn",
        1 => "debug,actix_server=info",
        _ => "trace",
    };
    let env = env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, level);
    env_logger::Builder::from_env(env).format_timestamp_millis().init();

    if let Err(e) = handle(cli) {
        error!("{e:?}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_file() -> PaddyResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("paddy.toml");
        std::fs::write(&path, "port = 8000\nmodel = \"a.tgz\"\nworkers = 2\n")?;
        let cli = Cli::try_parse_from([
            "paddy",
            "serve",
            "--config",
            path.to_str().unwrap(),
            "--model",
            "b.tgz",
            "-p",
            "9000",
        ])?;
        let Command::Serve(args) = cli.command else { panic!() };
        let config = args.config()?;
        assert_eq!(config.port, 9000);
        assert_eq!(config.model, Some(PathBuf::from("b.tgz")));
        assert_eq!(config.workers, 2);
        Ok(())
    }

    #[test]
    fn predict_needs_images() {
        assert!(Cli::try_parse_from(["paddy", "predict", "model.tgz"]).is_err());
        let cli = Cli::try_parse_from(["paddy", "-vv", "predict", "m.tgz", "a.jpg", "b.jpg"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Predict { ref images, .. } if images.len() == 2));
    }
}
