//! Own test binary: it mutates the process environment.

use clap::Parser;
use knowledge_cli::{resolve_config, Cli};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn environment_sits_between_file_and_flags() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("extractor.toml");
    std::fs::write(&path, "chunk_size = 2000\noverlap_size = 200\nmax_retries = 5\n").unwrap();

    std::env::set_var("CHUNK_SIZE", "2500");
    std::env::set_var("OVERLAP_SIZE", "250");
    std::env::set_var("GROQ_API_KEY", "gsk_from_env");
    std::env::set_var("FORCE_CLONE", "true");

    let cli = Cli::try_parse_from([
        "knowledge-extractor",
        "--config",
        path.to_str().unwrap(),
        "--overlap-size",
        "150",
    ])
    .unwrap();
    let config = resolve_config(&cli).unwrap();

    assert_eq!(config.chunker.chunk_size, 2500);
    assert_eq!(config.chunker.overlap_size, 150);
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.api_key.as_ref().unwrap().expose(), "gsk_from_env");
    assert!(config.force_clone);
}
