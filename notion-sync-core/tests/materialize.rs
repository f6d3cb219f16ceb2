mod common;

use common::workspace;
use notion_sync_core::config::DocumentGroup;
use notion_sync_core::materialize::{expand_patterns, materialize};
use std::collections::BTreeMap;

fn patterns(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn group(name: &str, paths: &[&str], exclude: &[&str]) -> DocumentGroup {
    DocumentGroup {
        name: name.to_string(),
        file_patterns: patterns(paths),
        exclude_patterns: patterns(exclude),
        destination_id: format!("db-{name}"),
        extra_properties: BTreeMap::new(),
    }
}

#[test]
fn overlapping_patterns_are_deduplicated_and_sorted() {
    let dir = workspace(&[
        ("docs/b.md", "b"),
        ("docs/a.md", "a"),
        ("docs/guide/c.md", "c"),
        ("README.md", "r"),
    ]);
    let files = expand_patterns(
        dir.path(),
        &patterns(&["docs/*.md", "./docs/a.md", "README.md", "docs/**/*.md"]),
        &[],
    );
    assert_eq!(
        files,
        ["README.md", "docs/a.md", "docs/b.md", "docs/guide/c.md"]
    );
}

#[test]
fn single_star_does_not_cross_directories() {
    let dir = workspace(&[("docs/a.md", "a"), ("docs/nested/b.md", "b")]);
    let files = expand_patterns(dir.path(), &patterns(&["docs/*.md"]), &[]);
    assert_eq!(files, ["docs/a.md"]);
}

#[test]
fn directories_are_never_returned() {
    let dir = workspace(&[("docs/folder.md/inner.txt", "x"), ("docs/real.md", "y")]);
    let files = expand_patterns(dir.path(), &patterns(&["docs/*.md"]), &[]);
    assert_eq!(files, ["docs/real.md"]);
}

#[test]
fn hidden_files_need_an_explicit_pattern() {
    let dir = workspace(&[
        ("docs/.draft.md", "hidden"),
        ("docs/visible.md", "v"),
        (".github/notes.md", "n"),
    ]);
    assert_eq!(
        expand_patterns(dir.path(), &patterns(&["**/*.md"]), &[]),
        ["docs/visible.md"]
    );
    assert_eq!(
        expand_patterns(dir.path(), &patterns(&[".github/*.md", "docs/.*.md"]), &[]),
        [".github/notes.md", "docs/.draft.md"]
    );
}

#[test]
fn hidden_directory_pattern_does_not_reach_nested_hidden_entries() {
    let dir = workspace(&[
        (".github/notes.md", "n"),
        (".github/.secret.md", "s"),
        (".github/.cache/x.md", "x"),
        (".github/workflows/ci.md", "c"),
    ]);
    assert_eq!(
        expand_patterns(dir.path(), &patterns(&[".github/**/*.md"]), &[]),
        [".github/notes.md", ".github/workflows/ci.md"]
    );
}

#[test]
fn patterns_outside_the_root_match_nothing() {
    let parent = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(parent.path().join("shared")).unwrap();
    std::fs::write(parent.path().join("shared/x.md"), "x").unwrap();
    std::fs::create_dir_all(parent.path().join("repo/docs")).unwrap();
    std::fs::write(parent.path().join("repo/docs/a.md"), "a").unwrap();
    let root = parent.path().join("repo");

    let files = expand_patterns(&root, &patterns(&["../shared/*.md", "docs/*.md"]), &[]);
    assert_eq!(files, ["docs/a.md"]);
}

#[test]
fn exclude_patterns_remove_matches() {
    let dir = workspace(&[
        ("docs/a.md", "a"),
        ("docs/drafts/b.md", "b"),
        ("docs/private.md", "p"),
    ]);
    let files = expand_patterns(
        dir.path(),
        &patterns(&["docs/**/*.md"]),
        &patterns(&["**/drafts/**", "docs/private.md"]),
    );
    assert_eq!(files, ["docs/a.md"]);
}

#[test]
fn invalid_pattern_is_ignored() {
    let dir = workspace(&[("docs/a.md", "a")]);
    let files = expand_patterns(dir.path(), &patterns(&["docs/[.md", "docs/*.md"]), &[]);
    assert_eq!(files, ["docs/a.md"]);
}

#[test]
fn empty_groups_are_skipped_not_failed() {
    let dir = workspace(&[("docs/a.md", "a")]);
    let groups = [
        group("docs", &["docs/*.md"], &[]),
        group("specs", &["specs/*.md"], &[]),
        group("excluded", &["docs/*.md"], &["docs/a.md"]),
    ];
    let result = materialize(dir.path(), &groups);

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].group.name, "docs");
    assert_eq!(result.groups[0].files, ["docs/a.md"]);
    assert_eq!(result.skipped, ["specs", "excluded"]);
}

#[test]
fn materializing_twice_is_identical() {
    let dir = workspace(&[("a/1.md", ""), ("a/2.md", ""), ("b/3.md", "")]);
    let groups = [group("all", &["**/*.md"], &[]), group("a", &["a/*.md"], &[])];
    assert_eq!(
        materialize(dir.path(), &groups),
        materialize(dir.path(), &groups)
    );
}
