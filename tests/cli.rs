use assert_cmd::Command;
use predicates::prelude::*;

fn mandelpart() -> Command {
    Command::cargo_bin("mandelpart").unwrap()
}

#[test]
fn writes_false_colour_png() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mandel.png");
    mandelpart()
        .args(&["--participants", "3", "--output"])
        .arg(&out)
        .assert()
        .success();
    let img = image::open(&out).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (150, 100));
}

#[test]
fn writes_greymap() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mandel.pgm");
    mandelpart()
        .args(&["-p", "2", "-s", "40x30", "-i", "60", "-o"])
        .arg(&out)
        .assert()
        .success();
    let bytes = std::fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"P5"));
}

#[test]
fn runs_without_a_display() {
    mandelpart()
        .args(&["--participants", "4", "--size", "30x20"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn prints_a_preview() {
    mandelpart()
        .args(&["--participants", "2", "--preview"])
        .assert()
        .success()
        .stdout(predicate::str::contains("@"));
}

#[test]
fn refuses_an_empty_grid() {
    mandelpart()
        .args(&["--size", "0x10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid grid"));
}

#[test]
fn refuses_an_inverted_viewport() {
    mandelpart()
        .args(&["--leftlower", "1,1", "--rightupper", "-2,-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid viewport"));
}

#[test]
fn refuses_a_bad_participant_count() {
    mandelpart()
        .args(&["--participants", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Participant count"));
}

#[cfg(not(feature = "mpi"))]
#[test]
fn mpi_backend_needs_the_feature() {
    mandelpart()
        .args(&["--backend", "mpi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("MPI is unavailable"));
}
