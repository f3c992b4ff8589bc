use assert_cmd::Command;
use image::{Rgba, RgbaImage};
use predicates::prelude::*;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn png_bytes(pixel: [u8; 4]) -> Vec<u8> {
    let mut img = RgbaImage::new(1, 1);
    img.put_pixel(0, 0, Rgba(pixel));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn write_archive(path: &Path, files: &[(&str, Vec<u8>)]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, data) in files {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

fn grayzip() -> Command {
    let mut cmd = Command::cargo_bin("grayzip").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn converts_default_archive_in_working_directory() {
    let temp_dir = TempDir::new().unwrap();
    write_archive(
        &temp_dir.path().join("myfile.zip"),
        &[
            ("a.png", png_bytes([30, 60, 90, 255])),
            ("notes.txt", b"not an image".to_vec()),
        ],
    );

    grayzip()
        .current_dir(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Grayscale transformation complete for all images.",
        ));

    assert!(temp_dir.path().join("unzipped/notes.txt").is_file());
    assert!(!temp_dir.path().join("grayscaled/notes.txt").exists());

    let gray = image::open(temp_dir.path().join("grayscaled/a.png"))
        .unwrap()
        .to_rgba8();
    assert_eq!(gray.get_pixel(0, 0), &Rgba([60, 60, 60, 255]));
}

#[test]
fn missing_archive_reports_extraction_failure() {
    let temp_dir = TempDir::new().unwrap();

    grayzip()
        .current_dir(temp_dir.path())
        .args(["--output-format", "plain"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Extraction failed"));

    assert!(!temp_dir.path().join("grayscaled").exists());
}

#[test]
fn fan_out_reports_failure_and_keeps_good_outputs() {
    let temp_dir = TempDir::new().unwrap();
    write_archive(
        &temp_dir.path().join("batch.zip"),
        &[
            ("good.png", png_bytes([9, 9, 12, 1])),
            ("bad.png", b"garbage".to_vec()),
        ],
    );

    grayzip()
        .current_dir(temp_dir.path())
        .args(["batch.zip", "--mode", "fan-out", "--jobs", "2", "-q"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("1 of 2"));

    assert!(temp_dir.path().join("grayscaled/good.png").is_file());
    assert!(!temp_dir.path().join("grayscaled/bad.png").exists());
}

#[test]
fn json_report_lists_converted_images() {
    let temp_dir = TempDir::new().unwrap();
    write_archive(
        &temp_dir.path().join("myfile.zip"),
        &[("only.png", png_bytes([1, 2, 3, 4]))],
    );

    grayzip()
        .current_dir(temp_dir.path())
        .args(["--output-format", "json", "-x", "in", "-o", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"converted\""))
        .stdout(predicate::str::contains("only.png"));

    assert!(temp_dir.path().join("out/only.png").is_file());
}

#[test]
fn collision_error_policy_keeps_existing_output() {
    let temp_dir = TempDir::new().unwrap();
    write_archive(
        &temp_dir.path().join("myfile.zip"),
        &[("a.png", png_bytes([1, 2, 3, 4]))],
    );
    fs::create_dir(temp_dir.path().join("grayscaled")).unwrap();
    fs::write(temp_dir.path().join("grayscaled/a.png"), "existing").unwrap();

    grayzip()
        .current_dir(temp_dir.path())
        .args(["--on-collision", "error"])
        .assert()
        .code(5);

    assert_eq!(
        fs::read_to_string(temp_dir.path().join("grayscaled/a.png")).unwrap(),
        "existing"
    );
}

#[test]
fn generate_config_writes_sample() {
    let temp_dir = TempDir::new().unwrap();

    grayzip()
        .current_dir(temp_dir.path())
        .arg("--generate-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("grayzip.toml"));

    let content = fs::read_to_string(temp_dir.path().join("grayzip.toml")).unwrap();
    assert!(content.contains("[archive]"));
}

#[test]
fn invalid_jobs_is_a_configuration_error() {
    let temp_dir = TempDir::new().unwrap();

    grayzip()
        .current_dir(temp_dir.path())
        .args(["--jobs", "0"])
        .assert()
        .code(2);
}
