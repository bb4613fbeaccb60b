use std::io::Write;
use std::process::{Command, Output};

fn plyview(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_plyview"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn ply_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".ply").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

const TRIANGLE: &str = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 1 0
3 0 1 2
";

#[test]
fn no_arguments_prints_usage() {
    let out = plyview(&[]);
    assert_eq!(out.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Usage:"), "stdout was {stdout:?}");
    assert!(stdout.contains("plyview"), "stdout was {stdout:?}");
    assert!(stdout.contains("<filename.ply>"), "stdout was {stdout:?}");
}

#[test]
fn missing_file_fails_before_opening_a_window() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.ply");

    let out = plyview(&[path.to_str().unwrap()]);
    assert!(!out.status.success());

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("failed to load mesh"), "stderr was {stderr:?}");
}

#[test]
fn malformed_file_is_rejected() {
    let file = ply_file("this is not a ply file\n");
    let out = plyview(&[file.path().to_str().unwrap()]);
    assert!(!out.status.success());
}

#[test]
fn highlight_outside_the_mesh_is_rejected() {
    let file = ply_file(TRIANGLE);
    let out = plyview(&[file.path().to_str().unwrap(), "--highlight", "7"]);
    assert!(!out.status.success());

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains('7'), "stderr was {stderr:?}");
}

#[test]
fn opacity_must_be_a_fraction() {
    let file = ply_file(TRIANGLE);
    let out = plyview(&[file.path().to_str().unwrap(), "--opacity", "2"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn highlight_and_no_highlight_conflict() {
    let file = ply_file(TRIANGLE);
    let out = plyview(&[file.path().to_str().unwrap(), "--highlight", "0", "--no-highlight"]);
    assert_eq!(out.status.code(), Some(2));
}
