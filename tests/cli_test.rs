//! End-to-end tests: parse command lines and run them against a temp definition file.

use std::path::Path;

use clap::Parser;
use rstest::rstest;
use tempfile::TempDir;

use dataform::cli::args::Cli;
use dataform::cli::commands::execute_command;
use dataform::cli::CliResult;
use dataform::config::Settings;
use dataform::domain::DataFormDocument;
use dataform::exitcode;
use dataform::infrastructure::di::ServiceContainer;
use dataform::util::testing;

fn run(file: &Path, args: &[&str]) -> CliResult<()> {
    let file = file.to_string_lossy().to_string();
    let mut argv = vec!["dataform", "-f", file.as_str()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).expect("valid command line");
    let container = ServiceContainer::new(Settings::default());
    execute_command(&cli, &container)
}

fn read(file: &Path) -> DataFormDocument {
    serde_json::from_str(&std::fs::read_to_string(file).unwrap()).unwrap()
}

fn setup() -> (TempDir, std::path::PathBuf) {
    testing::init_test_setup();
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("form.json");
    run(&file, &["init"]).unwrap();
    run(&file, &["add", "ns", "-t", "namespace"]).unwrap();
    run(&file, &["add", "tbl", "-t", "table", "-p", "ns"]).unwrap();
    run(&file, &["add", "amount", "-t", "number", "-p", "ns/tbl"]).unwrap();
    (dir, file)
}

#[test]
fn given_built_tree_when_bound_and_renamed_then_binding_path_follows() {
    let (_dir, file) = setup();

    run(
        &file,
        &[
            "bind", "ns/tbl/amount", "--unit", "book", "--sheet", "s1", "--range", "R1C2:R9C2",
        ],
    )
    .unwrap();
    run(&file, &["rename", "ns", "orders"]).unwrap();

    let doc = read(&file);
    assert_eq!(doc.bindings.len(), 1);
    assert_eq!(doc.bindings[0].name, "amount");
    assert_eq!(doc.bindings[0].node_path, ["orders", "tbl", "amount"]);
}

#[test]
fn given_duplicate_name_when_adding_then_data_error_and_file_unchanged() {
    let (_dir, file) = setup();
    let before = std::fs::read_to_string(&file).unwrap();

    let err = run(&file, &["add", "amount", "-p", "ns/tbl"]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::DATAERR);
    assert_eq!(std::fs::read_to_string(&file).unwrap(), before);
}

#[test]
fn given_namespace_when_retyped_to_table_then_nested_table_and_bindings_dropped() {
    let (_dir, file) = setup();
    run(
        &file,
        &["bind", "ns/tbl/amount", "--unit", "b", "--sheet", "s", "--range", "R0C0"],
    )
    .unwrap();

    run(&file, &["retype", "ns", "table"]).unwrap();

    let doc = read(&file);
    assert_eq!(doc.nodes[0].children.as_deref().map(<[_]>::len), Some(0));
    assert!(doc.bindings.is_empty());
}

#[test]
fn given_sibling_anchor_when_adding_then_inserted_before_it() {
    let (_dir, file) = setup();
    run(&file, &["add", "id", "-p", "ns/tbl"]).unwrap();

    run(&file, &["add", "date", "-t", "date", "--before", "ns/tbl/id"]).unwrap();

    let doc = read(&file);
    let columns: Vec<_> = doc.nodes[0].children.as_ref().unwrap()[0]
        .children
        .as_ref()
        .unwrap()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(columns, ["amount", "date", "id"]);
}

#[test]
fn given_nodes_when_moved_to_root_then_order_kept() {
    let (_dir, file) = setup();
    run(&file, &["add", "id", "-p", "ns/tbl"]).unwrap();

    run(&file, &["mv", "ns/tbl/amount", "ns/tbl/id", "--index", "0"]).unwrap();

    let doc = read(&file);
    let roots: Vec<_> = doc.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(roots, ["amount", "id", "ns"]);
}

#[test]
fn given_unknown_path_when_removing_then_data_error() {
    let (_dir, file) = setup();
    let err = run(&file, &["rm", "ns/nope"]).unwrap_err();
    assert_eq!(err.exit_code(), exitcode::DATAERR);
}

#[test]
fn given_node_when_removed_then_subtree_gone() {
    let (_dir, file) = setup();
    run(&file, &["rm", "ns/tbl"]).unwrap();
    let doc = read(&file);
    assert_eq!(doc.nodes[0].children.as_deref().map(<[_]>::len), Some(0));
}

#[test]
fn given_missing_file_when_showing_tree_then_no_input() {
    let dir = TempDir::new().unwrap();
    let err = run(&dir.path().join("absent.json"), &["tree"]).unwrap_err();
    assert_eq!(err.exit_code(), exitcode::NOINPUT);
}

#[test]
fn given_existing_file_when_init_again_then_refused() {
    let (_dir, file) = setup();
    let err = run(&file, &["init"]).unwrap_err();
    assert_eq!(err.exit_code(), exitcode::CANTCREAT);
}

#[test]
fn given_unknown_binding_when_unbinding_then_data_error() {
    let (_dir, file) = setup();
    let err = run(&file, &["unbind", "nothing"]).unwrap_err();
    assert_eq!(err.exit_code(), exitcode::DATAERR);
}

#[rstest]
#[case::add(&["add", "a/b", "-p", "ns"])]
#[case::rename(&["rename", "ns/tbl", "t/1"])]
fn given_name_with_separator_when_naming_then_usage_error_and_file_unchanged(
    #[case] args: &[&str],
) {
    let (_dir, file) = setup();
    let before = std::fs::read_to_string(&file).unwrap();

    let err = run(&file, args).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::USAGE);
    assert_eq!(std::fs::read_to_string(&file).unwrap(), before);
}
