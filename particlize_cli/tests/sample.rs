#![allow(missing_docs)]

use assert_cmd::Command;
use assert_fs::fixture::{FileWriteStr, PathChild};
use predicates::str;

const CONFIG: &str = "operation: 2
df_mode: 2
dimension: 2
y_cut: 2.0
oversample: 0
sampler_seed: 42
";

// tau x y eta | dsigma | u | E T P | pi | bulkPi
const SURFACE: &str =
    "1.0 0.0 0.0 0.0  50.0 0.0 0.0 0.0  0.0 0.0 0.0  0.4 0.15 0.08  0.0 0.0 0.0 0.0 0.0  0.0\n";

const INFLOWING_SURFACE: &str =
    "1.0 0.0 0.0 0.0  -1.0 0.0 0.0 0.0  0.0 0.0 0.0  0.4 0.15 0.08  0.0 0.0 0.0 0.0 0.0  0.0\n";

const SPECIES: &str = "# mcid mass degeneracy baryon sign neq bulk diff
111 0.14 3.0 0.0 -1.0 0.05 0.0 0.0
";

fn write_inputs(dir: &assert_fs::TempDir, surface: &str) {
    dir.child("parameters.yaml").write_str(CONFIG).unwrap();
    dir.child("surface.dat").write_str(surface).unwrap();
    dir.child("species.dat").write_str(SPECIES).unwrap();
}

#[test]
fn help() {
    Command::cargo_bin("particlize")
        .unwrap()
        .args(["sample", "--help"])
        .assert()
        .success()
        .stdout(str::contains("freezeout surface table"));
}

#[test]
fn fixed_seed_runs_write_identical_files() {
    let dir = assert_fs::TempDir::new().unwrap();
    write_inputs(&dir, SURFACE);

    for out in ["first", "second"] {
        Command::cargo_bin("particlize")
            .unwrap()
            .current_dir(dir.path())
            .args([
                "--quiet",
                "sample",
                "parameters.yaml",
                "surface.dat",
                "species.dat",
                "--output",
                out,
            ])
            .assert()
            .success();
    }

    let first =
        std::fs::read(dir.child("first/particle_list_osc_1.dat").path()).unwrap();
    let second =
        std::fs::read(dir.child("second/particle_list_osc_1.dat").path()).unwrap();

    assert!(!first.is_empty());
    assert_eq!(first, second);

    let text = String::from_utf8(first).unwrap();
    assert!(text.starts_with("n pid px py pz E m x y z t\n"));
    // a thermal pion surface of this size yields a handful of hadrons
    assert!(text.lines().count() > 1);
}

#[test]
fn inflowing_cell_produces_empty_event() {
    let dir = assert_fs::TempDir::new().unwrap();
    write_inputs(&dir, INFLOWING_SURFACE);

    Command::cargo_bin("particlize")
        .unwrap()
        .current_dir(dir.path())
        .args([
            "--quiet",
            "sample",
            "parameters.yaml",
            "surface.dat",
            "species.dat",
            "--output",
            "out",
        ])
        .assert()
        .success();

    let text =
        std::fs::read_to_string(dir.child("out/particle_list_osc_1.dat").path()).unwrap();

    assert_eq!(text, "n pid px py pz E m x y z t\n");
}

#[test]
fn estimate_reports_total_yield() {
    let dir = assert_fs::TempDir::new().unwrap();
    write_inputs(&dir, SURFACE);

    Command::cargo_bin("particlize")
        .unwrap()
        .current_dir(dir.path())
        .args(["estimate", "parameters.yaml", "surface.dat", "species.dat"])
        .assert()
        .success()
        .stdout(str::contains("total mean yield = 10.0000"))
        .stdout(str::contains("events to sample = 1000"));
}

#[test]
fn unknown_df_mode_is_a_fatal_error() {
    let dir = assert_fs::TempDir::new().unwrap();
    write_inputs(&dir, SURFACE);
    dir.child("parameters.yaml")
        .write_str("operation: 2\ndf_mode: 9\n")
        .unwrap();

    Command::cargo_bin("particlize")
        .unwrap()
        .current_dir(dir.path())
        .args([
            "--quiet",
            "sample",
            "parameters.yaml",
            "surface.dat",
            "species.dat",
        ])
        .assert()
        .failure()
        .stderr(str::contains("df_mode"));
}
