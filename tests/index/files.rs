use rusqlite::Connection;
use scout::{
    Column, ContentHash, Connector, DirectoryStore, FileRecord, FileRepo, Filter, ScoutError,
};
use std::path::PathBuf;
use tempfile::TempDir;

fn setup() -> (TempDir, PathBuf, Connector) {
    let tmp = TempDir::new().expect("tempdir");
    let root = tmp.path().canonicalize().expect("canonical root");
    let db = Connector::open(root.join(".scout.db"), None).expect("open store");
    (tmp, root, db)
}

type FileRow = (i64, i64, String, Option<Vec<u8>>, Option<i64>, Option<i64>, i64);

fn file_rows(db: &Connector) -> Vec<FileRow> {
    let conn = Connection::open(db.path()).expect("open raw");
    let mut stmt = conn
        .prepare("SELECT id, dir_id, name, content_hash, size, mtime, updated FROM file ORDER BY id")
        .expect("prepare");
    stmt.query_map([], |row| {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    })
    .expect("query")
    .collect::<Result<Vec<_>, _>>()
    .expect("rows")
}

fn names(files: &[FileRecord]) -> Vec<String> {
    files
        .iter()
        .map(|f| f.name().expect("file name").to_string())
        .collect()
}

#[test]
fn new_creates_file_and_dir_tables() {
    let (_tmp, _root, db) = setup();
    FileRepo::new(&db).expect("file repo");
    assert!(db.table_exists("file").expect("file table"));
    assert!(db.table_exists("dir").expect("dir table"));
    assert!(db.table_exists("dir_ancestor").expect("dir_ancestor table"));
}

#[test]
fn add_resolves_parents_from_paths() {
    let (_tmp, root, db) = setup();
    let dirs = DirectoryStore::new(&db).expect("dir store");
    let files = FileRepo::new(&db).expect("file repo");
    dirs.add("test").expect("add dir");

    let stored = files
        .add(&[
            FileRecord::new("root.txt"),
            FileRecord::new(root.join("hello")),
            FileRecord::new("test/foo.txt"),
        ])
        .expect("add files");

    let rows = file_rows(&db);
    assert_eq!(rows.len(), 3);
    let summary: Vec<(i64, i64, &str)> = rows
        .iter()
        .map(|r| (r.0, r.1, r.2.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![(1, 0, "root.txt"), (2, 0, "hello"), (3, 1, "foo.txt")]
    );
    assert!(rows.iter().all(|r| r.3.is_none() && r.4.is_none() && r.5.is_none()));

    assert_eq!(stored[0].path, root.join("root.txt"));
    assert_eq!(stored[1].path, root.join("hello"));
    assert_eq!(stored[2].path, root.join("test/foo.txt"));
    assert_eq!(stored[2].dir_id, Some(1));
    assert!(stored.iter().all(|f| f.updated == Some(rows[0].6)));
}

#[test]
fn explicit_dir_id_overrides_path_parent() {
    let (_tmp, root, db) = setup();
    let dirs = DirectoryStore::new(&db).expect("dir store");
    let files = FileRepo::new(&db).expect("file repo");
    dirs.add("foo").expect("add foo");
    dirs.add("baz").expect("add baz");

    let stored = files
        .add_one(&FileRecord::new("baz/bar.txt").with_dir_id(1))
        .expect("add file");
    assert_eq!(stored.dir_id, Some(1));
    assert_eq!(stored.path, root.join("foo/bar.txt"));

    let rows = file_rows(&db);
    assert_eq!((rows[0].1, rows[0].2.as_str()), (1, "bar.txt"));
}

#[test]
fn explicit_dir_id_may_name_the_root() {
    let (_tmp, root, db) = setup();
    let files = FileRepo::new(&db).expect("file repo");
    let stored = files
        .add_one(&FileRecord::new("somewhere/x.txt").with_dir_id(0))
        .expect("add file");
    assert_eq!(stored.dir_id, Some(0));
    assert_eq!(stored.path, root.join("x.txt"));
}

#[test]
fn missing_parent_fails_whole_batch() {
    let (_tmp, _root, db) = setup();
    let dirs = DirectoryStore::new(&db).expect("dir store");
    let files = FileRepo::new(&db).expect("file repo");
    dirs.add("known").expect("add dir");

    let err = files
        .add(&[
            FileRecord::new("known/a.txt"),
            FileRecord::new("unknown/b.txt"),
        ])
        .unwrap_err();
    assert!(matches!(err, ScoutError::MissingParentDirectory(_)));
    assert!(file_rows(&db).is_empty());

    let err = files
        .add_one(&FileRecord::new("known/c.txt").with_dir_id(99))
        .unwrap_err();
    assert!(matches!(err, ScoutError::MissingParentDirectory(_)));
    assert!(file_rows(&db).is_empty());
}

#[test]
fn add_rejects_outside_and_root_paths() {
    let (_tmp, _root, db) = setup();
    let files = FileRepo::new(&db).expect("file repo");
    let err = files
        .add_one(&FileRecord::new("/definitely/elsewhere.txt"))
        .unwrap_err();
    assert!(matches!(err, ScoutError::PathOutsideTarget { .. }));
    let err = files.add_one(&FileRecord::new("")).unwrap_err();
    assert!(matches!(err, ScoutError::InvalidArgument(_)));
    assert!(file_rows(&db).is_empty());
}

#[test]
fn repeated_adds_append_observations() {
    let (_tmp, _root, db) = setup();
    let files = FileRepo::new(&db).expect("file repo");
    let record = FileRecord::new("a.txt").with_size(3).with_mtime(42);
    let first = files.add_one(&record).expect("first");
    let second = files.add_one(&record).expect("second");
    assert_eq!(first.id, Some(1));
    assert_eq!(second.id, Some(2));

    let rows = file_rows(&db);
    assert_eq!(rows.len(), 2);
    let observed = |r: &FileRow| (r.1, r.2.clone(), r.4, r.5);
    assert_eq!(observed(&rows[0]), observed(&rows[1]));
    assert_eq!(files.get(&[Filter::path("a.txt")]).expect("get").len(), 2);
}

#[test]
fn full_metadata_round_trips() {
    let (_tmp, root, db) = setup();
    let dirs = DirectoryStore::new(&db).expect("dir store");
    let files = FileRepo::new(&db).expect("file repo");
    dirs.add("foo").expect("add dir");
    let hash = ContentHash::digest(b"cafe");
    let stored = files
        .add_one(
            &FileRecord::new("foo/foo.txt")
                .with_hash(hash)
                .with_size(256)
                .with_mtime(42),
        )
        .expect("add file");

    let rows = file_rows(&db);
    assert_eq!(rows[0].3.as_deref(), Some(&hash.as_bytes()[..]));
    assert_eq!(rows[0].4, Some(256));
    assert_eq!(rows[0].5, Some(42));

    let got = files.get(&[Filter::eq(Column::Id, 1)]).expect("get");
    assert_eq!(got, vec![stored.clone()]);
    assert_eq!(got[0].path, root.join("foo/foo.txt"));
    assert_eq!(got[0].content_hash, Some(hash));
}

fn seeded() -> (TempDir, PathBuf, Connector) {
    let (tmp, root, db) = setup();
    {
        let dirs = DirectoryStore::new(&db).expect("dir store");
        let files = FileRepo::new(&db).expect("file repo");
        dirs.add("foo").expect("add foo");
        dirs.add("bar").expect("add bar");
        files
            .add(&[
                FileRecord::new("foo/a").with_size(10).with_mtime(100),
                FileRecord::new("bar/b")
                    .with_size(20)
                    .with_mtime(200)
                    .with_hash(ContentHash::digest(b"b")),
                FileRecord::new("foo/c").with_size(30),
                FileRecord::new("r").with_mtime(400),
            ])
            .expect("seed files");
    }
    (tmp, root, db)
}

#[test]
fn get_without_filters_returns_everything_in_insert_order() {
    let (_tmp, _root, db) = seeded();
    let files = FileRepo::new(&db).expect("file repo");
    let all = files.get(&[]).expect("get all");
    assert_eq!(names(&all), vec!["a", "b", "c", "r"]);
    let ids: Vec<Option<i64>> = all.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![Some(1), Some(2), Some(3), Some(4)]);
}

#[test]
fn get_by_name_and_id() {
    let (_tmp, _root, db) = seeded();
    let files = FileRepo::new(&db).expect("file repo");
    assert_eq!(files.get(&[Filter::eq(Column::Name, "a")]).unwrap()[0].id, Some(1));
    assert_eq!(
        names(&files.get(&[Filter::ne(Column::Name, "c")]).unwrap()),
        vec!["a", "b", "r"]
    );
    assert_eq!(
        names(&files.get(&[Filter::ne(Column::Id, 1)]).unwrap()),
        vec!["b", "c", "r"]
    );
    assert_eq!(names(&files.get(&[Filter::eq(Column::Id, 3)]).unwrap()), vec!["c"]);
}

#[test]
fn get_by_dir_id_reconstructs_paths() {
    let (_tmp, root, db) = seeded();
    let files = FileRepo::new(&db).expect("file repo");
    let in_foo = files.get(&[Filter::eq(Column::DirId, 1)]).unwrap();
    let paths: Vec<PathBuf> = in_foo.iter().map(|f| f.path.clone()).collect();
    assert_eq!(paths, vec![root.join("foo/a"), root.join("foo/c")]);
    assert_eq!(
        files.get(&[Filter::eq(Column::DirId, 2)]).unwrap()[0].path,
        root.join("bar/b")
    );
    assert_eq!(
        files.get(&[Filter::eq(Column::DirId, 0)]).unwrap()[0].path,
        root.join("r")
    );
    let paths: Vec<PathBuf> = files
        .get(&[Filter::ne(Column::DirId, 1)])
        .unwrap()
        .into_iter()
        .map(|f| f.path)
        .collect();
    assert_eq!(paths, vec![root.join("bar/b"), root.join("r")]);
}

#[test]
fn numeric_comparisons_and_null_tests() {
    let (_tmp, _root, db) = seeded();
    let files = FileRepo::new(&db).expect("file repo");
    assert_eq!(names(&files.get(&[Filter::gt(Column::Size, 10)]).unwrap()), vec!["b", "c"]);
    assert_eq!(names(&files.get(&[Filter::ge(Column::Size, 20)]).unwrap()), vec!["b", "c"]);
    assert_eq!(names(&files.get(&[Filter::lt(Column::Size, 20)]).unwrap()), vec!["a"]);
    assert_eq!(names(&files.get(&[Filter::le(Column::Mtime, 200)]).unwrap()), vec!["a", "b"]);
    assert_eq!(names(&files.get(&[Filter::is_null(Column::Size)]).unwrap()), vec!["r"]);
    assert_eq!(
        names(&files.get(&[Filter::not_null(Column::ContentHash)]).unwrap()),
        vec!["b"]
    );
    assert_eq!(
        names(&files.get(&[Filter::is_null(Column::ContentHash)]).unwrap()),
        vec!["a", "c", "r"]
    );
}

#[test]
fn filters_combine_with_and() {
    let (_tmp, _root, db) = seeded();
    let files = FileRepo::new(&db).expect("file repo");
    let got = files
        .get(&[
            Filter::eq(Column::DirId, 1),
            Filter::gt(Column::Size, 15),
        ])
        .unwrap();
    assert_eq!(names(&got), vec!["c"]);
    let none = files
        .get(&[Filter::eq(Column::Name, "a"), Filter::eq(Column::Name, "b")])
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn hash_equality_filter() {
    let (_tmp, _root, db) = seeded();
    let files = FileRepo::new(&db).expect("file repo");
    let got = files
        .get(&[Filter::eq(Column::ContentHash, ContentHash::digest(b"b"))])
        .unwrap();
    assert_eq!(names(&got), vec!["b"]);
    let parsed = Filter::parse("content_hash", &ContentHash::digest(b"b").to_hex()).unwrap();
    assert_eq!(files.get(&[parsed]).unwrap(), got);
}

#[test]
fn path_filter_matches_parent_and_name() {
    let (_tmp, root, db) = seeded();
    let files = FileRepo::new(&db).expect("file repo");
    let got = files.get(&[Filter::path("foo/c")]).unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].id, Some(3));
    assert_eq!(got[0].dir_id, Some(1));
    assert_eq!(got[0].path, root.join("foo/c"));

    assert_eq!(files.get(&[Filter::path(root.join("r"))]).unwrap()[0].id, Some(4));
    assert!(files.get(&[Filter::path("bar/a")]).unwrap().is_empty());
    assert!(files.get(&[Filter::path("nowhere/a")]).unwrap().is_empty());
}

#[test]
fn nested_path_filter() {
    let (_tmp, root, db) = setup();
    let dirs = DirectoryStore::new(&db).expect("dir store");
    let files = FileRepo::new(&db).expect("file repo");
    dirs.add("a/a").expect("add dirs");
    files.add_one(&FileRecord::new("a/a/a")).expect("add file");

    let got = files.get(&[Filter::path("a/a/a")]).unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].id, Some(1));
    assert_eq!(got[0].dir_id, Some(2));
    assert_eq!(got[0].path, root.join("a/a/a"));
}

#[test]
fn parsed_filters_match_typed_ones() {
    let (_tmp, _root, db) = seeded();
    let files = FileRepo::new(&db).expect("file repo");
    let parsed = vec![
        Filter::parse("size__ge", "20").unwrap(),
        Filter::parse("mtime__null", "true").unwrap(),
    ];
    assert_eq!(names(&files.get(&parsed).unwrap()), vec!["c"]);
}

#[test]
fn invalid_filters_fail_before_querying() {
    let (_tmp, _root, db) = seeded();
    let files = FileRepo::new(&db).expect("file repo");
    let err = files.get(&[Filter::eq(Column::Size, "big")]).unwrap_err();
    assert!(matches!(err, ScoutError::InvalidArgument(_)));
    let err = Filter::parse("size__like", "1").unwrap_err();
    assert!(matches!(err, ScoutError::UnsupportedFilter(_)));
    let err = files.get(&[Filter::path("/definitely/elsewhere")]).unwrap_err();
    assert!(matches!(err, ScoutError::PathOutsideTarget { .. }));
}
