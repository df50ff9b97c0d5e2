use std::path::PathBuf;

use assetpipe::cli::CliArgs;
use clap::Parser;

#[test]
fn defaults() {
    let args = CliArgs::try_parse_from(["assetpipe"]).unwrap();
    assert_eq!(args.config, "Assetpipe.toml");
    assert!(!args.watch);
    assert_eq!(args.poll, None);
    assert!(!args.strict);
    assert!(!args.dry_run);
}

#[test]
fn poll_flag_with_and_without_interval() {
    let args = CliArgs::try_parse_from(["assetpipe", "--poll", "--watch"]).unwrap();
    assert_eq!(args.poll, Some(None));
    assert!(args.watch);

    let args = CliArgs::try_parse_from(["assetpipe", "--watch", "--poll", "750"]).unwrap();
    assert_eq!(args.poll, Some(Some(750)));
}

#[test]
fn entry_and_config_overrides() {
    let args = CliArgs::try_parse_from([
        "assetpipe",
        "--config",
        "conf/Assetpipe.toml",
        "--entry",
        "assets/img",
        "--strict",
        "--log-level",
        "debug",
    ])
    .unwrap();
    assert_eq!(args.config, "conf/Assetpipe.toml");
    assert_eq!(args.entry, Some(PathBuf::from("assets/img")));
    assert!(args.strict);
    assert!(args.log_level.is_some());
}
