#![allow(clippy::unwrap_used, missing_docs)]

mod common;

use std::time::{Duration, UNIX_EPOCH};

use common::{MOCK_MTIME, MockApi, mount};
use dokufs::fs::{FsError, ROOT_INO};

#[test]
fn deep_ids_split_into_nested_directories() {
    let api = MockApi::new()
        .with_document("proj:design", "# Design")
        .with_document("proj:tasks:today", "- [ ] ship");
    let fs = mount(&api);

    let root_rows = fs.readdir(ROOT_INO).unwrap();
    let names: Vec<&str> = root_rows.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, [".", "..", "proj"], "both ids share the proj prefix");
    assert_eq!(root_rows[2].kind, fuser::FileType::Directory);

    let proj_rows = fs.readdir(root_rows[2].ino).unwrap();
    let names: Vec<&str> = proj_rows.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, [".", "..", "design.doku", "tasks"]);
    assert_eq!(proj_rows[2].kind, fuser::FileType::RegularFile);
    assert_eq!(proj_rows[3].kind, fuser::FileType::Directory);

    let task_rows = fs.readdir(proj_rows[3].ino).unwrap();
    let names: Vec<&str> = task_rows.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, [".", "..", "today.doku"]);
    assert_eq!(task_rows[2].kind, fuser::FileType::RegularFile);
}

#[test]
fn intermediate_directories_deduplicate_across_both_listings() {
    let api = MockApi::new()
        .with_document("proj:design", "# Design")
        .with_attachment("proj:logo.png", b"\x89PNG");
    let fs = mount(&api);

    let root_rows = fs.readdir(ROOT_INO).unwrap();
    let names: Vec<&str> = root_rows.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(
        names,
        [".", "..", "proj"],
        "documents and attachments under proj must share one directory"
    );

    let proj_rows = fs.readdir(root_rows[2].ino).unwrap();
    let names: Vec<&str> = proj_rows.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, [".", "..", "design.doku", "logo.png"]);
}

#[test]
fn root_level_leaves_carry_listing_attributes() {
    let api = MockApi::new()
        .with_document("readme", "hello")
        .with_attachment("logo.png", b"\x89PNG\r\n");
    let fs = mount(&api);

    let page = fs.lookup(ROOT_INO, "readme.doku").unwrap();
    assert_eq!(page.kind, fuser::FileType::RegularFile);
    assert_eq!(page.size, 5);
    assert_eq!(page.perm, 0o644);
    assert_eq!(page.mtime, UNIX_EPOCH + Duration::from_secs(MOCK_MTIME));

    let media = fs.lookup(ROOT_INO, "logo.png").unwrap();
    assert_eq!(media.size, 6);
    assert_eq!(media.kind, fuser::FileType::RegularFile);
}

#[test]
fn listings_descend_two_levels_past_the_directory() {
    let api = MockApi::new().with_document("proj:design", "# Design");
    let fs = mount(&api);

    fs.readdir(ROOT_INO).unwrap();
    let proj = fs.lookup(ROOT_INO, "proj").unwrap().ino;
    fs.readdir(proj).unwrap();

    let calls = api.list_calls();
    assert_eq!(calls[0], ("documents", String::new(), 2));
    assert_eq!(calls[1], ("attachments", String::new(), 2));
    assert_eq!(calls[2], ("documents", "proj".to_owned(), 3));
    assert_eq!(calls[3], ("attachments", "proj".to_owned(), 3));
}

#[test]
fn directories_populate_once_and_stay_authoritative() {
    let api = MockApi::new().with_document("readme", "hello");
    let fs = mount(&api);

    fs.readdir(ROOT_INO).unwrap();
    fs.readdir(ROOT_INO).unwrap();
    fs.lookup(ROOT_INO, "readme.doku").unwrap();

    let root_document_lists = api
        .list_calls()
        .iter()
        .filter(|(set, namespace, _)| *set == "documents" && namespace.is_empty())
        .count();
    assert_eq!(root_document_lists, 1, "the child map is fetched once");
}

#[test]
fn a_transient_listing_fault_surfaces_try_again_and_the_retry_succeeds() {
    let api = MockApi::new().with_document("readme", "hello");
    let fs = mount(&api);

    api.trip_transient(1);
    let err = fs.readdir(ROOT_INO).unwrap_err();
    assert!(matches!(err, FsError::TryAgain));

    let rows = fs.readdir(ROOT_INO).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].name, "readme.doku");
}
