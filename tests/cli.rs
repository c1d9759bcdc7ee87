#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SCENE: &str = r#"<MRML version="Slicer4">
  <Volume id="vol1" name="Head CT" references="display:disp1;storage:store1"/>
  <VolumeDisplay id="disp1" window="80" level="40" references="colorNode:lut1"/>
  <VolumeArchetypeStorage id="store1" fileName="head.nrrd"/>
  <ColorTable id="lut1" name="Grey" type="1" numcolors="256"/>
</MRML>
"#;

const DANGLING: &str = r#"<MRML version="Slicer4">
  <VolumeDisplay id="disp1" references="colorNode:missing"/>
</MRML>
"#;

const DUPLICATE: &str = r#"<MRML version="Slicer4">
  <Volume id="vol1" name="First"/>
  <Volume id="vol1" name="Second"/>
</MRML>
"#;

/// Runs `mrml` against an empty config directory inside `temp`.
fn mrml_cmd(temp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("mrml"));
    cmd.env("NO_COLOR", "1")
        .arg("--config")
        .arg(temp.path().join("config"));
    cmd
}

fn write_scene(temp: &TempDir, content: &str) -> PathBuf {
    let path = temp.path().join("scene.mrml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn inspect_lists_nodes() {
    let temp = TempDir::new().unwrap();
    let scene = write_scene(&temp, SCENE);

    mrml_cmd(&temp)
        .arg("inspect")
        .arg(&scene)
        .assert()
        .success()
        .stdout(predicate::str::contains("vol1"))
        .stdout(predicate::str::contains("Head CT"))
        .stdout(predicate::str::contains("vtkMRMLColorTableNode"))
        .stdout(predicate::str::contains("4 node(s), 3 reference(s)"));
}

#[test]
fn inspect_json_is_machine_readable() {
    let temp = TempDir::new().unwrap();
    let scene = write_scene(&temp, SCENE);

    let output = mrml_cmd(&temp)
        .args(["inspect", "--json"])
        .arg(&scene)
        .output()
        .unwrap();
    assert!(output.status.success());

    let nodes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let nodes = nodes.as_array().unwrap();
    assert_eq!(nodes.len(), 4);
    assert_eq!(nodes[0]["id"], "vol1");
    assert_eq!(nodes[0]["class"], "vtkMRMLScalarVolumeNode");
    assert_eq!(nodes[3]["name"], "Grey");
}

#[test]
fn check_passes_on_clean_scene() {
    let temp = TempDir::new().unwrap();
    let scene = write_scene(&temp, SCENE);

    mrml_cmd(&temp)
        .arg("check")
        .arg(&scene)
        .assert()
        .success()
        .stdout(predicate::str::contains("No problems found in 4 node(s)."));
}

#[test]
fn check_fails_on_dangling_reference() {
    let temp = TempDir::new().unwrap();
    let scene = write_scene(&temp, DANGLING);

    mrml_cmd(&temp)
        .arg("check")
        .arg(&scene)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("1 dangling reference(s):"))
        .stdout(predicate::str::contains("disp1 --colorNode--> missing"));
}

#[test]
fn normalize_writes_canonical_scene() {
    let temp = TempDir::new().unwrap();
    let scene = write_scene(&temp, SCENE);
    let target = temp.path().join("out.mrml");

    mrml_cmd(&temp)
        .arg("normalize")
        .arg(&scene)
        .arg("-o")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 4 node(s)"));

    let written = fs::read_to_string(&target).unwrap();
    assert!(written.starts_with("<?xml"));
    assert!(written.contains(r#"<MRML version="Slicer4">"#));
    assert!(written.contains(r#"fileName="head.nrrd""#));

    // A second pass over the normalized file changes nothing.
    mrml_cmd(&temp)
        .arg("normalize")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::eq(written.as_str()));
}

#[test]
fn duplicate_ids_fail_by_default() {
    let temp = TempDir::new().unwrap();
    let scene = write_scene(&temp, DUPLICATE);

    mrml_cmd(&temp)
        .arg("inspect")
        .arg(&scene)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("vol1"));
}

#[test]
fn renumber_policy_comes_from_config() {
    let temp = TempDir::new().unwrap();
    let scene = write_scene(&temp, DUPLICATE);
    let config = temp.path().join("config");
    fs::create_dir_all(&config).unwrap();
    fs::write(config.join("mrml.json"), r#"{ "id_conflict": "renumber" }"#).unwrap();

    mrml_cmd(&temp)
        .arg("inspect")
        .arg(&scene)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 node(s)"))
        .stdout(predicate::str::contains("Renumbered vol1 to vtkMRMLScalarVolumeNode1"));
}

#[test]
fn missing_file_reports_error() {
    let temp = TempDir::new().unwrap();

    mrml_cmd(&temp)
        .arg("check")
        .arg(temp.path().join("nope.mrml"))
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error:"));
}
