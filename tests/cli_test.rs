//! Tests for argument parsing, rendering and command dispatch

use std::sync::Arc;

use clap::Parser;
use condtree::application::services::SearchService;
use condtree::cli::commands::{execute_with_service, render};
use condtree::cli::{Cli, CliError, Commands, OutputFormat};
use condtree::domain::transport::decode;
use condtree::domain::{parse_chain, RebuildMode};
use condtree::exitcode;
use condtree::infrastructure::traits::InMemorySearchStore;
use condtree::util::testing;
use rstest::rstest;

fn example() -> Vec<&'static str> {
    vec!["SUBJECT CONTAINS invoice", "and", "READ EQUALS true"]
}

#[test]
fn given_build_args_when_parsing_then_collects_expressions() {
    let cli = Cli::parse_from([
        "condtree",
        "-dd",
        "build",
        "--format",
        "sql",
        "SUBJECT CONTAINS invoice",
        "and",
        "READ EQUALS true",
    ]);

    assert_eq!(cli.debug, 2);
    match cli.command {
        Some(Commands::Build { format, exprs }) => {
            assert_eq!(format, OutputFormat::Sql);
            assert_eq!(exprs.len(), 3);
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[rstest]
#[case::tree(OutputFormat::Tree, "AND [1, 6]")]
#[case::rows(OutputFormat::Rows, r#""left_label":1"#)]
#[case::sql(OutputFormat::Sql, "(subject LIKE ? AND read = ?)")]
#[case::json(OutputFormat::Json, r#""kind": "AND""#)]
fn given_tree_when_rendering_then_format_specific_output(
    #[case] format: OutputFormat,
    #[case] expected: &str,
) {
    testing::init_test_setup();
    let (mut tree, root) = parse_chain(&example()).unwrap();

    let rendered = render(&mut tree, root, format).unwrap();

    assert!(
        rendered.contains(expected),
        "{:?} output lacks {:?}:\n{}",
        format,
        expected,
        rendered
    );
}

#[test]
fn given_tree_when_rendering_hex_then_decodes_back() {
    let (mut tree, root) = parse_chain(&example()).unwrap();

    let hex = render(&mut tree, root, OutputFormat::Hex).unwrap();

    let bytes: Vec<u8> = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
        .collect();
    let decoded = decode(&bytes).unwrap();
    assert!(tree.structurally_eq(root, &decoded, decoded.root().unwrap()));
}

#[test]
fn given_save_then_show_when_dispatching_then_succeeds() {
    // Arrange
    let service = SearchService::new(Arc::new(InMemorySearchStore::new()), RebuildMode::Strict);
    let save = Commands::Save {
        name: "inbox".to_string(),
        exprs: example().into_iter().map(String::from).collect(),
    };
    let show = Commands::Show {
        name: "inbox".to_string(),
        format: OutputFormat::Sql,
    };

    // Act / Assert
    execute_with_service(&save, &service).unwrap();
    execute_with_service(&show, &service).unwrap();
    execute_with_service(&Commands::List, &service).unwrap();
    assert_eq!(service.list().unwrap(), vec!["inbox"]);
}

#[test]
fn given_unknown_search_when_showing_then_noinput_exit_code() {
    let service = SearchService::new(Arc::new(InMemorySearchStore::new()), RebuildMode::Strict);
    let show = Commands::Show {
        name: "missing".to_string(),
        format: OutputFormat::Tree,
    };

    let err = execute_with_service(&show, &service).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::NOINPUT);
}

#[test]
fn given_bad_expression_when_saving_then_dataerr_exit_code() {
    let service = SearchService::new(Arc::new(InMemorySearchStore::new()), RebuildMode::Strict);
    let save = Commands::Save {
        name: "bad".to_string(),
        exprs: vec!["SUBJECT LOOKS_LIKE x".to_string()],
    };

    let err = execute_with_service(&save, &service).unwrap_err();

    assert!(matches!(err, CliError::Infra(_)));
    assert_eq!(err.exit_code(), exitcode::DATAERR);
}
