//! Command-line binary behavior

use super::test_images::*;
use std::path::Path;
use std::process::{Command, Output};

fn pixelsqueeze(args: &[&Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pixelsqueeze"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn test_stdout_is_only_the_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("original.png");
    let compressed = dir.path().join("compressed.png");
    let png = png_bytes(&textured(32, 32));
    std::fs::write(&original, &png).unwrap();
    std::fs::write(&compressed, &png).unwrap();

    let output = pixelsqueeze(&[Path::new("assess"), &original, &compressed]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    // Startup logs go to stderr, the report alone to stdout
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["quality_score"], 100);
    assert_eq!(report["quality_grade"], "excellent");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Configuration loaded"));
}

#[test]
fn test_raw_command_rejects_raster_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.png");
    let dest = dir.path().join("photo.jpg");
    std::fs::write(&input, png_bytes(&textured(16, 16))).unwrap();

    let output = pixelsqueeze(&[Path::new("raw"), &input, Path::new("-o"), &dest]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not a camera RAW file"));
    assert!(!dest.exists());
}
