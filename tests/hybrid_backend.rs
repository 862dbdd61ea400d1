//! Hybrid-backend behavior: persistence, reopening, and backend parity.

use gedkit::graph::{GraphConfig, HybridConfig, StorageMode};
use gedkit::{Gedcom, Graph, QueryEngine};
use tempfile::TempDir;

const SAMPLE: &str = "\
    0 HEAD\n\
    1 GEDC\n\
    2 VERS 5.5.1\n\
    0 @I1@ INDI\n\
    1 NAME John /Doe/\n\
    1 SEX M\n\
    1 BIRT\n\
    2 DATE 1 JAN 1900\n\
    2 PLAC York\n\
    1 FAMS @F1@\n\
    0 @I2@ INDI\n\
    1 NAME Mary /Doe/\n\
    1 SEX F\n\
    1 FAMS @F1@\n\
    0 @I3@ INDI\n\
    1 NAME Jim /Doe/\n\
    1 FAMC @F1@\n\
    0 @F1@ FAM\n\
    1 HUSB @I1@\n\
    1 WIFE @I2@\n\
    1 CHIL @I3@\n\
    0 TRLR";

fn hybrid_config(dir: &TempDir, file_id: &str) -> HybridConfig {
    HybridConfig::new(file_id, dir.path())
}

fn build_hybrid(dir: &TempDir, file_id: &str) -> Graph {
    let tree = Gedcom::parse_str(SAMPLE).unwrap();
    Graph::build_with_config(
        &tree,
        &GraphConfig {
            storage: StorageMode::Hybrid,
            hybrid: Some(hybrid_config(dir, file_id)),
        },
    )
    .unwrap()
}

#[test]
fn hybrid_and_memory_backends_agree() {
    let dir = TempDir::new().unwrap();
    let tree = Gedcom::parse_str(SAMPLE).unwrap();

    let memory = Graph::build(&tree).unwrap();
    let hybrid = build_hybrid(&dir, "tree-a");

    for xref in ["@I1@", "@I2@", "@I3@"] {
        let from_memory = memory.require_individual(xref).unwrap();
        let from_hybrid = hybrid.require_individual(xref).unwrap();
        assert_eq!(from_memory.as_ref(), from_hybrid.as_ref());
    }

    let memory_engine = QueryEngine::new(&memory);
    let hybrid_engine = QueryEngine::new(&hybrid);

    let memory_parents: Vec<String> = memory_engine
        .parents("@I3@")
        .unwrap()
        .iter()
        .map(|n| n.xref.clone())
        .collect();
    let hybrid_parents: Vec<String> = hybrid_engine
        .parents("@I3@")
        .unwrap()
        .iter()
        .map(|n| n.xref.clone())
        .collect();
    assert_eq!(memory_parents, hybrid_parents);

    let memory_rel = memory_engine.calculate_relationship("@I3@", "@I1@").unwrap();
    let hybrid_rel = hybrid_engine.calculate_relationship("@I3@", "@I1@").unwrap();
    assert_eq!(memory_rel, hybrid_rel);
}

#[test]
fn reopen_serves_the_persisted_graph() {
    let dir = TempDir::new().unwrap();
    let config = hybrid_config(&dir, "tree-a");
    {
        let _graph = build_hybrid(&dir, "tree-a");
        // Dropped: stores are on disk now.
    }

    let reopened = Graph::open_hybrid(&config).unwrap();
    assert_eq!(reopened.individual_count(), 3);
    assert_eq!(reopened.family_count(), 1);

    let john = reopened.require_individual("@I1@").unwrap();
    assert_eq!(john.name.as_deref(), Some("John Doe"));
    assert_eq!(john.parents.len(), 0);

    let jim = reopened.require_individual("@I3@").unwrap();
    assert_eq!(jim.parents.len(), 2);

    // Secondary indexes were rebuilt from the stores.
    let engine = QueryEngine::new(&reopened);
    let does = engine.filter().by_surname("doe").execute().unwrap();
    assert_eq!(does.len(), 3);
}

#[test]
fn multiple_file_ids_share_one_database() {
    let dir = TempDir::new().unwrap();
    let first = build_hybrid(&dir, "tree-a");
    let second = build_hybrid(&dir, "tree-b");

    assert_eq!(first.individual_count(), 3);
    assert_eq!(second.individual_count(), 3);

    // Both logical trees remain addressable afterwards.
    let reopened_a = Graph::open_hybrid(&hybrid_config(&dir, "tree-a")).unwrap();
    let reopened_b = Graph::open_hybrid(&hybrid_config(&dir, "tree-b")).unwrap();
    assert!(reopened_a.individual_by_xref("@I1@").unwrap().is_some());
    assert!(reopened_b.individual_by_xref("@I1@").unwrap().is_some());
}

#[test]
fn rebuild_replaces_prior_content_for_the_same_file_id() {
    let dir = TempDir::new().unwrap();
    let _first = build_hybrid(&dir, "tree-a");

    let smaller = "\
        0 HEAD\n\
        0 @X1@ INDI\n\
        1 NAME Solo /Person/\n\
        0 TRLR";
    let tree = Gedcom::parse_str(smaller).unwrap();
    let rebuilt = Graph::build_with_config(
        &tree,
        &GraphConfig {
            storage: StorageMode::Hybrid,
            hybrid: Some(hybrid_config(&dir, "tree-a")),
        },
    )
    .unwrap();
    assert_eq!(rebuilt.individual_count(), 1);

    let reopened = Graph::open_hybrid(&hybrid_config(&dir, "tree-a")).unwrap();
    assert_eq!(reopened.individual_count(), 1);
    assert!(reopened.individual_by_xref("@X1@").unwrap().is_some());
}
