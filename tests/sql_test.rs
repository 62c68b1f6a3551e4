//! Tests for WHERE clause rendering

use condtree::domain::{build_where_clause, parse_chain};
use rstest::rstest;

#[rstest]
#[case("SUBJECT CONTAINS invoice", "subject LIKE ?", "%invoice%")]
#[case("SUBJECT NOT_CONTAINS spam", "subject NOT LIKE ?", "%spam%")]
#[case("READ EQUALS 1", "read = ?", "1")]
#[case("FOLDER NOT_EQUALS 3", "folder_id != ?", "3")]
#[case("SENDER STARTSWITH alice", "sender_list LIKE ?", "alice%")]
#[case("TO NOT_STARTSWITH bob", "to_list NOT LIKE ?", "bob%")]
#[case("CC ENDSWITH example.com", "cc_list LIKE ?", "%example.com")]
#[case("BCC NOT_ENDSWITH .org", "bcc_list NOT LIKE ?", "%.org")]
fn given_single_condition_when_rendering_then_maps_attribute(
    #[case] condition: &str,
    #[case] sql: &str,
    #[case] arg: &str,
) {
    let (tree, root) = parse_chain(&[condition]).unwrap();

    let clause = build_where_clause(&tree, root).unwrap();

    assert_eq!(clause.sql, sql);
    assert_eq!(clause.args, vec![arg.to_string()]);
}

#[test]
fn given_nested_tree_when_rendering_then_parenthesized_in_order() {
    // Arrange
    let (tree, root) = parse_chain(&[
        "SUBJECT CONTAINS invoice",
        "and",
        "SENDER EQUALS alice@x.com",
        "or",
        "READ EQUALS true",
    ])
    .unwrap();

    // Act
    let clause = build_where_clause(&tree, root).unwrap();

    // Assert
    assert_eq!(
        clause.sql,
        "((subject LIKE ? AND sender_list = ?) OR read = ?)"
    );
    assert_eq!(clause.args, vec!["%invoice%", "alice@x.com", "true"]);
}
