//! livery-qa - runs the logo verification sequence against the demo vehicle.
//!
//! Usage: `livery-qa [--config <file>] [--store <file>]`
//!
//! Without `--store` preferences live in memory for the run only. The report
//! is printed as JSON; the exit code is non-zero when any slot fails.

use clap::Parser;
use livery::config::load_config_from_file;
use livery::qa::DEFAULT_TOLERANCE;
use livery::scene::demo::vehicle_demo;
use livery::{FileStore, FitOptions, KeyValueStore, LiveryConfig, LiveryEngine, MemoryStore, RawTexture};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "livery-qa")]
#[command(about = "Run the logo slot verification sequence on the demo vehicle", long_about = None)]
struct Args {
    /// JSON configuration file (defaults apply to missing fields)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON file holding rotation preferences across runs
    #[arg(long)]
    store: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match load_config_from_file(path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("Failed to load config {:?}: {}", path, err);
                return ExitCode::from(2);
            }
        },
        None => LiveryConfig::default(),
    };

    let backend: Box<dyn KeyValueStore> = match &args.store {
        Some(path) => match FileStore::open(path) {
            Ok(store) => Box::new(store),
            Err(err) => {
                log::warn!("Store {:?} unusable, keeping preferences in memory: {}", path, err);
                Box::new(MemoryStore::new())
            }
        },
        None => Box::new(MemoryStore::new()),
    };

    let mut root = vehicle_demo();
    let mut engine = LiveryEngine::new(config, backend);
    log::info!(
        "Model '{}' has {} logo slot(s)",
        root.name,
        engine.logo_instances(&root).len()
    );

    let image = RawTexture::solid("qa-logo.png", 64, 32, [230, 30, 30, 255]);
    for index in 0..engine.logo_instances(&root).len() {
        if let Err(err) = engine.fit_image_to_instance(&mut root, index, &image, FitOptions::default()) {
            log::warn!("Slot {} left without image: {}", index, err);
        }
    }

    let prefs = BTreeMap::from([(0, 1), (1, 2), (2, 0), (3, 3)]);
    let mut qa = engine.qa(&mut root);
    let mapping = qa.map();
    let prefs_ok = qa.set_prefs_by_idx(&prefs);
    let reapply_ok = qa.reapply();
    let report = qa.verify(DEFAULT_TOLERANCE);

    let summary = serde_json::json!({
        "map": mapping,
        "setPrefsByIdx": prefs_ok,
        "reapply": reapply_ok,
        "verify": report,
    });
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{}", json),
        Err(err) => log::error!("Failed to encode report: {}", err),
    }

    if report.all_passed() && reapply_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::error::ErrorKind;
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;

    #[test]
    fn command_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_take_paths() {
        let args =
            Args::try_parse_from(["livery-qa", "--config", "c.json", "--store", "s.json"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("c.json")));
        assert_eq!(args.store, Some(PathBuf::from("s.json")));
        let bare = Args::try_parse_from(["livery-qa"]).unwrap();
        assert!(bare.config.is_none() && bare.store.is_none());
    }

    #[test]
    fn flag_without_value_is_rejected() {
        let err = Args::try_parse_from(["livery-qa", "--config"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn help_and_unknown_flags() {
        let help = Args::try_parse_from(["livery-qa", "--help"]).unwrap_err();
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);
        let unknown = Args::try_parse_from(["livery-qa", "--verbose"]).unwrap_err();
        assert_eq!(unknown.kind(), ErrorKind::UnknownArgument);
    }
}
