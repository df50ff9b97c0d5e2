use assetpipe::cli::LogLevel;
use assetpipe::logging::resolve_level;
use tracing::Level;

#[test]
fn cli_flag_beats_environment() {
    assert_eq!(resolve_level(Some(LogLevel::Trace), Some("error")), Level::TRACE);
}

#[test]
fn environment_is_used_when_no_flag() {
    assert_eq!(resolve_level(None, Some(" Warning ")), Level::WARN);
    assert_eq!(resolve_level(None, Some("debug")), Level::DEBUG);
}

#[test]
fn falls_back_to_info() {
    assert_eq!(resolve_level(None, None), Level::INFO);
    assert_eq!(resolve_level(None, Some("loud")), Level::INFO);
}
