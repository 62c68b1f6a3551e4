//! Tests for the binary and serde transport forms

use condtree::domain::transport::{decode, encode};
use condtree::domain::{
    parse_chain, Attribute, ConditionsTree, DomainError, NodeId, NodeKind, SearchCondition,
    SearchField, TransportNode,
};
use rstest::rstest;

fn subject(n: usize) -> SearchCondition {
    SearchCondition::new(SearchField::Subject, Attribute::Contains, format!("term {}", n))
}

/// `c0 OR c1 AND c2 OR ...`, grown at the root the way callers chain conditions.
fn left_chain(len: usize) -> (ConditionsTree, NodeId) {
    let mut tree = ConditionsTree::from_condition(subject(0));
    let mut root = tree.root().unwrap();
    for n in 1..len {
        root = if n % 2 == 0 {
            tree.and_condition(root, subject(n))
        } else {
            tree.or_condition(root, subject(n))
        }
        .unwrap();
    }
    (tree, root)
}

/// Each new condition is spliced in at the previous one: `c0 AND (c1 AND (c2 ...))`.
fn right_chain(len: usize) -> (ConditionsTree, NodeId) {
    let mut tree = ConditionsTree::from_condition(subject(0));
    let mut root = tree.root().unwrap();
    let mut tail = root;
    for n in 1..len {
        let op = tree.and_condition(tail, subject(n)).unwrap();
        if n == 1 {
            root = op;
        }
        tail = tree.get(op).unwrap().right().unwrap();
    }
    (tree, root)
}

#[test]
fn given_labeled_tree_when_round_tripping_then_structure_kept_and_labels_dropped() {
    // Arrange
    let (mut tree, root) = parse_chain(&[
        "SUBJECT CONTAINS quarterly report",
        "and",
        "SENDER EQUALS alice@x.com",
        "or",
        "READ EQUALS true",
    ])
    .unwrap();
    tree.apply_mptt_label(root).unwrap();

    // Act
    let bytes = encode(&tree, root).unwrap();
    let decoded = decode(&bytes).unwrap();

    // Assert
    let decoded_root = decoded.root().unwrap();
    assert!(tree.structurally_eq(root, &decoded, decoded_root));
    assert_eq!(decoded.get(decoded_root).unwrap().right_label(), 0);
}

#[test]
fn given_decoded_tree_when_combining_then_parent_links_are_restored() {
    let (tree, root) = parse_chain(&["SUBJECT CONTAINS a", "and", "SUBJECT CONTAINS b"]).unwrap();
    let mut decoded = decode(&encode(&tree, root).unwrap()).unwrap();
    let decoded_root = decoded.root().unwrap();
    let b = decoded.get(decoded_root).unwrap().right().unwrap();

    // b is attached, so it can't be reused as an operand
    let a2 = decoded.insert_leaf("SUBJECT CONTAINS c".parse().unwrap());
    assert!(matches!(
        decoded.and(a2, b),
        Err(DomainError::InvalidOperation(_))
    ));
}

#[rstest]
#[case::empty(vec![])]
#[case::short_ordinal(vec![2, 0])]
#[case::unknown_ordinal(vec![9, 0, 0, 0, 0, 0, 0])]
#[case::bad_marker(vec![0, 0, 0, 0, 7])]
#[case::missing_children(vec![0, 0, 0, 0, 0])]
fn given_corrupt_bytes_when_decoding_then_decode_error(#[case] bytes: Vec<u8>) {
    assert!(matches!(decode(&bytes), Err(DomainError::Decode(_))));
}

#[test]
fn given_operator_without_children_when_decoding_then_tree_has_single_node() {
    // AND, no condition, no left, no right
    let bytes = vec![0, 0, 0, 0, 0, 0, 0];
    let tree = decode(&bytes).unwrap();
    let root = tree.root().unwrap();
    assert_eq!(tree.get(root).unwrap().kind(), NodeKind::And);
    assert_eq!(tree.len(), 1);
}

#[test]
fn given_tree_when_serializing_json_then_nested_form_round_trips() {
    // Arrange
    let (tree, root) = parse_chain(&["FLAGGED EQUALS 1", "or", "CC CONTAINS bob"]).unwrap();
    let snapshot = TransportNode::from_tree(&tree, root).unwrap();

    // Act
    let json = serde_json::to_string(&snapshot).unwrap();
    let back: TransportNode = serde_json::from_str(&json).unwrap();

    // Assert
    assert!(json.contains(r#""kind":"OR""#));
    assert!(json.contains(r#""field":"FLAGGED""#));
    assert_eq!(back, snapshot);
    let rebuilt = back.into_tree().unwrap();
    assert!(tree.structurally_eq(root, &rebuilt, rebuilt.root().unwrap()));
}

#[test]
fn given_json_with_predicate_on_operator_when_rebuilding_then_decode_error() {
    let json = r#"{"kind":"AND","condition":{"field":"SUBJECT","attribute":"CONTAINS","value":"x"}}"#;
    let node: TransportNode = serde_json::from_str(json).unwrap();
    assert!(matches!(node.into_tree(), Err(DomainError::Decode(_))));
}

#[rstest]
#[case::left_folded(left_chain(1_000))]
#[case::right_nested(right_chain(1_000))]
#[case::long_left_folded(left_chain(100_000))]
fn given_deep_chain_when_round_tripping_then_structure_kept(
    #[case] chain: (ConditionsTree, NodeId),
) {
    // Arrange
    let (tree, root) = chain;

    // Act
    let decoded = decode(&encode(&tree, root).unwrap()).unwrap();

    // Assert
    let decoded_root = decoded.root().unwrap();
    assert_eq!(decoded.len(), tree.len());
    assert_eq!(decoded.depth(decoded_root).unwrap(), tree.depth(root).unwrap());
    assert!(tree.structurally_eq(root, &decoded, decoded_root));
}

#[test]
fn given_deep_chain_when_snapshotting_then_json_form_rebuilds() {
    let (tree, root) = left_chain(1_000);

    let rebuilt = TransportNode::from_tree(&tree, root)
        .unwrap()
        .into_tree()
        .unwrap();

    assert_eq!(rebuilt.len(), tree.len());
    assert!(tree.structurally_eq(root, &rebuilt, rebuilt.root().unwrap()));
}
