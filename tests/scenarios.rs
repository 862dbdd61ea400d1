//! End-to-end scenarios over the full parse → graph → query pipeline.

use gedkit::dedup::{Confidence, DedupConfig, DuplicateDetector};
use gedkit::diff::{DiffConfig, DiffEngine};
use gedkit::diff::changes::ChangeKind;
use gedkit::query::relationship::RelationshipKind;
use gedkit::{Gedcom, Graph, QueryEngine};

fn graph_of(source: &str) -> Graph {
    let tree = Gedcom::parse_str(source).unwrap();
    Graph::build(&tree).unwrap()
}

#[test]
fn minimal_tree_spouses_only() {
    let graph = graph_of(
        "\
        0 HEAD\n\
        1 GEDC\n\
        2 VERS 5.5.1\n\
        0 @I1@ INDI\n\
        1 NAME John /Doe/\n\
        1 BIRT\n\
        2 DATE 1 JAN 1900\n\
        1 FAMS @F1@\n\
        0 @I2@ INDI\n\
        1 NAME Mary /Doe/\n\
        1 BIRT\n\
        2 DATE 5 MAY 1905\n\
        1 FAMS @F1@\n\
        0 @F1@ FAM\n\
        1 HUSB @I1@\n\
        1 WIFE @I2@\n\
        0 TRLR",
    );
    let engine = QueryEngine::new(&graph);

    assert!(engine.parents("@I1@").unwrap().is_empty());

    let spouses = engine.spouses("@I1@").unwrap();
    assert_eq!(spouses.len(), 1);
    assert_eq!(spouses[0].xref, "@I2@");

    let relationship = engine.calculate_relationship("@I1@", "@I2@").unwrap();
    assert_eq!(relationship.kind.as_str(), "spouse");

    assert!(engine.ancestors("@I1@", None).unwrap().is_empty());
}

const THREE_GENERATION_LINE: &str = "\
    0 HEAD\n\
    0 @IG1@ INDI\n\
    1 NAME Gregor /Old/\n\
    1 FAMS @F0@\n\
    0 @IG2@ INDI\n\
    1 NAME Greta /Old/\n\
    1 FAMS @F0@\n\
    0 @I1@ INDI\n\
    1 NAME Frank /Old/\n\
    1 FAMC @F0@\n\
    1 FAMS @F2@\n\
    0 @I2@ INDI\n\
    1 NAME Fiona /Young/\n\
    1 FAMS @F2@\n\
    0 @I3@ INDI\n\
    1 NAME Kim /Old/\n\
    1 FAMC @F2@\n\
    0 @F0@ FAM\n\
    1 HUSB @IG1@\n\
    1 WIFE @IG2@\n\
    1 CHIL @I1@\n\
    0 @F2@ FAM\n\
    1 HUSB @I1@\n\
    1 WIFE @I2@\n\
    1 CHIL @I3@\n\
    0 TRLR";

#[test]
fn three_generation_ancestors() {
    let graph = graph_of(THREE_GENERATION_LINE);
    let engine = QueryEngine::new(&graph);

    let ancestors = engine.ancestors("@I3@", None).unwrap();
    let summary: Vec<(&str, u32)> = ancestors
        .iter()
        .map(|(node, depth)| (node.xref.as_str(), *depth))
        .collect();
    assert_eq!(
        summary,
        vec![("@I1@", 1), ("@I2@", 1), ("@IG1@", 2), ("@IG2@", 2)]
    );

    let relationship = engine.calculate_relationship("@I3@", "@IG1@").unwrap();
    assert_eq!(relationship.kind.as_str(), "ancestor");
    assert_eq!(relationship.degree, 2);
}

#[test]
fn siblings_degree_zero() {
    let graph = graph_of(
        "\
        0 HEAD\n\
        0 @I1@ INDI\n\
        1 FAMS @F1@\n\
        0 @I3@ INDI\n\
        1 NAME A /Kid/\n\
        1 FAMC @F1@\n\
        0 @I4@ INDI\n\
        1 NAME B /Kid/\n\
        1 FAMC @F1@\n\
        0 @F1@ FAM\n\
        1 HUSB @I1@\n\
        1 CHIL @I3@\n\
        1 CHIL @I4@\n\
        0 TRLR",
    );
    let engine = QueryEngine::new(&graph);

    let siblings = engine.siblings("@I3@").unwrap();
    assert_eq!(siblings.len(), 1);
    assert_eq!(siblings[0].xref, "@I4@");

    let relationship = engine.calculate_relationship("@I3@", "@I4@").unwrap();
    assert_eq!(relationship.kind, RelationshipKind::Sibling);
    assert_eq!(relationship.degree, 0);
}

#[test]
fn first_cousins_share_grandparents() {
    let graph = graph_of(
        "\
        0 HEAD\n\
        0 @IG1@ INDI\n\
        1 FAMS @F0@\n\
        0 @IG2@ INDI\n\
        1 FAMS @F0@\n\
        0 @IA@ INDI\n\
        1 FAMC @F0@\n\
        1 FAMS @FA@\n\
        0 @IB@ INDI\n\
        1 FAMC @F0@\n\
        1 FAMS @FB@\n\
        0 @IC1@ INDI\n\
        1 FAMC @FA@\n\
        0 @IC2@ INDI\n\
        1 FAMC @FB@\n\
        0 @F0@ FAM\n\
        1 HUSB @IG1@\n\
        1 WIFE @IG2@\n\
        1 CHIL @IA@\n\
        1 CHIL @IB@\n\
        0 @FA@ FAM\n\
        1 HUSB @IA@\n\
        1 CHIL @IC1@\n\
        0 @FB@ FAM\n\
        1 HUSB @IB@\n\
        1 CHIL @IC2@\n\
        0 TRLR",
    );
    let engine = QueryEngine::new(&graph);

    let relationship = engine.calculate_relationship("@IC1@", "@IC2@").unwrap();
    assert_eq!(relationship.kind.as_str(), "cousin");
    assert_eq!(relationship.degree, 1);
    assert_eq!(relationship.removal, 0);

    let lca = engine
        .lowest_common_ancestor("@IC1@", "@IC2@")
        .unwrap()
        .unwrap();
    assert!(lca.xref == "@IG1@" || lca.xref == "@IG2@");

    let common: Vec<String> = engine
        .common_ancestors("@IC1@", "@IC2@")
        .unwrap()
        .iter()
        .map(|node| node.xref.clone())
        .collect();
    assert!(common.contains(&lca.xref));
}

#[test]
fn near_identical_records_are_exact_duplicates() {
    let tree = Gedcom::parse_str(
        "\
        0 HEAD\n\
        0 @I1@ INDI\n\
        1 NAME John /Doe/\n\
        1 BIRT\n\
        2 DATE 1850\n\
        2 PLAC New York\n\
        0 @I2@ INDI\n\
        1 NAME John /Doe/\n\
        1 BIRT\n\
        2 DATE 1850\n\
        2 PLAC New York\n\
        0 TRLR",
    )
    .unwrap();
    let graph = Graph::build(&tree).unwrap();

    let report = DuplicateDetector::new(DedupConfig::default())
        .find_duplicates(&graph, None)
        .unwrap();

    assert_eq!(report.matches.len(), 1);
    let found = &report.matches[0];
    assert!(found.score >= 0.95);
    assert_eq!(found.confidence, Confidence::Exact);
    for field in ["name", "birth_date", "birth_place", "sex"] {
        assert!(found.matching_fields.iter().any(|f| f == field));
    }
}

#[test]
fn diff_tags_tolerant_date_as_semantically_equivalent() {
    let left = Gedcom::parse_str(
        "\
        0 HEAD\n\
        0 @I1@ INDI\n\
        1 NAME John /Doe/\n\
        1 BIRT\n\
        2 DATE 1800\n\
        0 TRLR",
    )
    .unwrap();
    let right = Gedcom::parse_str(
        "\
        0 HEAD\n\
        0 @I1@ INDI\n\
        1 NAME John /Doe/\n\
        1 BIRT\n\
        2 DATE ABT 1800\n\
        0 TRLR",
    )
    .unwrap();

    let change_set = DiffEngine::new(DiffConfig {
        date_tolerance: 2,
        ..DiffConfig::default()
    })
    .diff(&left, &right, None)
    .unwrap();

    assert!(change_set.added.is_empty());
    assert!(change_set.removed.is_empty());
    assert_eq!(change_set.modified.len(), 1);

    let modified = &change_set.modified[0];
    assert_eq!(modified.xref, "@I1@");
    assert_eq!(modified.changes.len(), 1);
    assert_eq!(modified.changes[0].path, "BIRT.DATE");
    assert_eq!(modified.changes[0].kind, ChangeKind::SemanticallyEquivalent);
}

#[test]
fn shortest_paths_are_symmetric_in_length() {
    let graph = graph_of(THREE_GENERATION_LINE);
    let engine = QueryEngine::new(&graph);

    let forward = engine.shortest_path("@I3@", "@IG1@").unwrap().unwrap();
    let backward = engine.shortest_path("@IG1@", "@I3@").unwrap().unwrap();
    assert_eq!(forward.len(), backward.len());
}

#[test]
fn diff_of_identical_trees_is_empty() {
    let source = THREE_GENERATION_LINE;
    let left = Gedcom::parse_str(source).unwrap();
    let right = Gedcom::parse_str(source).unwrap();
    let change_set = DiffEngine::new(DiffConfig::default())
        .diff(&left, &right, None)
        .unwrap();
    assert!(change_set.is_empty());
}
