//! End-to-end tests of the host binary.

use std::path::PathBuf;

use archi_app::ConfigStep;
use archi_blob::{ConfigBlob, InterfaceDecl, LibraryDecl, Serializable};
use archi_core::{ArrayLayout, ParamList, SlotKey, Value};
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn archi() -> Command {
    Command::cargo_bin("archi").expect("binary must build")
}

fn write_blob(dir: &TempDir, name: &str, blob: &ConfigBlob) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, blob.to_bytes().expect("blob must serialize")).expect("write blob");
    path
}

#[test]
fn no_inputs_exit_zero_with_logo() {
    archi()
        .assert()
        .success()
        .stdout(predicate::str::contains("_"));
}

#[test]
fn no_logo_suppresses_the_banner() {
    archi()
        .arg("--no-logo")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn empty_blob_exits_zero() {
    let dir = TempDir::new().unwrap();
    let path = write_blob(&dir, "empty.blob", &ConfigBlob::default());

    archi().arg("-L").arg(&path).assert().success();
}

#[test]
fn missing_input_maps_to_the_resource_exit_code() {
    archi()
        .arg("-L")
        .arg("/nonexistent/archi.blob")
        .assert()
        .code(70); // resource status -6
}

#[test]
fn malformed_blob_maps_to_the_format_exit_code() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.blob");
    std::fs::write(&path, b"not a blob at all").unwrap();

    archi().arg("-L").arg(&path).assert().code(72); // format status -8
}

#[test]
fn unknown_interface_maps_to_the_key_exit_code() {
    let dir = TempDir::new().unwrap();
    let blob = ConfigBlob {
        steps: vec![ConfigStep::Init {
            key: "x".into(),
            interface: "no.such.interface".into(),
            params: ParamList::new(),
        }],
        ..ConfigBlob::default()
    };
    let path = write_blob(&dir, "unknown.blob", &blob);

    archi().arg("-L").arg(&path).assert().code(68); // key status -4
}

#[test]
fn invalid_arguments_map_to_the_misuse_exit_code() {
    archi().arg("--verbose").arg("shouty").assert().code(66); // misuse status -2
}

#[test]
fn help_exits_zero() {
    archi()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

fn counting_blob() -> ConfigBlob {
    // Convert a string to a number, file it into an array cell, read it
    // back through an assignment between contexts.
    ConfigBlob {
        steps: vec![
            ConfigStep::Init {
                key: "n".into(),
                interface: "archi.convert.string_to_number".into(),
                params: ParamList::new().with(
                    "string",
                    Value::data_of(String::from("42"), ArrayLayout::of_count(1)),
                ),
            },
            ConfigStep::Init {
                key: "cells".into(),
                interface: "archi.array".into(),
                params: ParamList::new().with(
                    "num_elements",
                    Value::with_layout(ArrayLayout::of_count(2)),
                ),
            },
            ConfigStep::Assign {
                key: "cells".into(),
                slot: SlotKey::indexed("element", vec![0]),
                source: "n".into(),
                source_slot: Some(SlotKey::named("value")),
            },
            ConfigStep::Assign {
                key: "cells".into(),
                slot: SlotKey::indexed("element", vec![1]),
                source: "n".into(),
                source_slot: None,
            },
            ConfigStep::Final { key: "n".into() },
        ],
        ..ConfigBlob::default()
    }
}

#[test]
fn builtin_interfaces_wire_together() {
    let dir = TempDir::new().unwrap();
    let path = write_blob(&dir, "wiring.blob", &counting_blob());

    archi().arg("-L").arg(&path).assert().success();
}

#[test]
fn dry_run_skips_failing_steps() {
    let dir = TempDir::new().unwrap();
    let blob = ConfigBlob {
        steps: vec![ConfigStep::Init {
            key: "x".into(),
            interface: "no.such.interface".into(),
            params: ParamList::new(),
        }],
        ..ConfigBlob::default()
    };
    let path = write_blob(&dir, "failing.blob", &blob);

    archi().arg("-L").arg("--dry-run").arg(&path).assert().success();
}

#[test]
fn hsp_executes_from_a_blob() {
    let dir = TempDir::new().unwrap();
    let blob = ConfigBlob {
        steps: vec![
            ConfigStep::Init {
                key: "h".into(),
                interface: "archi.hsp".into(),
                params: ParamList::new(),
            },
            ConfigStep::Assign {
                key: "h".into(),
                slot: SlotKey::named("entry_state.function"),
                source: "archi.executable".into(),
                source_slot: Some(SlotKey::named("hsp_state_advance")),
            },
            ConfigStep::Act {
                key: "h".into(),
                action: SlotKey::named("execute"),
                params: ParamList::new(),
            },
        ],
        ..ConfigBlob::default()
    };
    let path = write_blob(&dir, "hsp.blob", &blob);

    archi().arg("-L").arg(&path).assert().success();
}

#[test]
fn blobs_apply_in_command_line_order() {
    let dir = TempDir::new().unwrap();

    // The first blob declares the interface alias, the second uses it.
    let first = ConfigBlob {
        libraries: vec![LibraryDecl {
            key: "self".into(),
            pathname: String::new(),
            lazy: false,
            global: false,
        }],
        interfaces: vec![InterfaceDecl {
            key: "aliased.array".into(),
            library: "self".into(),
            symbol: "archi_array_interface".into(),
        }],
        ..ConfigBlob::default()
    };
    let second = ConfigBlob {
        steps: vec![ConfigStep::Init {
            key: "a".into(),
            interface: "aliased.array".into(),
            params: ParamList::new(),
        }],
        ..ConfigBlob::default()
    };

    let first_path = write_blob(&dir, "first.blob", &first);
    let second_path = write_blob(&dir, "second.blob", &second);

    archi()
        .arg("-L")
        .arg(&first_path)
        .arg(&second_path)
        .assert()
        .success();

    // In the other order the alias does not exist yet.
    archi()
        .arg("-L")
        .arg(&second_path)
        .arg(&first_path)
        .assert()
        .code(68);
}

#[test]
fn verbose_error_logging_names_the_failing_step() {
    let dir = TempDir::new().unwrap();
    let blob = ConfigBlob {
        steps: vec![ConfigStep::Final { key: "ghost".into() }],
        ..ConfigBlob::default()
    };
    let path = write_blob(&dir, "ghost.blob", &blob);

    archi()
        .arg("-L")
        .arg("-m")
        .arg("--verbose")
        .arg("error")
        .arg(&path)
        .assert()
        .code(68)
        .stderr(predicate::str::contains("ghost"));
}
