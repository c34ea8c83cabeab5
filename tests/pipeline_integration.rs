//! End-to-end tests for the indexing pipelines.
//!
//! Each test copies the fixture project under `testdata/project` into a
//! scratch directory, writes a compilation database for it and runs the
//! command-line entry point against that directory.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use stmt_facts::cli::{run_index_in, IndexArgs, EXIT_SUCCESS};
use stmt_facts::{AnalysisContext, CompilationDatabase, FactDatabase, IndexError, Pipeline, Runner};
use tempfile::TempDir;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

/// Scratch copy of the fixture project with a compilation database.
fn project() -> TempDir {
    stmt_facts::init();
    let dir = TempDir::new().unwrap();
    copy_dir(&testdata_path().join("project"), dir.path());
    let root = fs::canonicalize(dir.path()).unwrap();
    let database = serde_json::json!([
        {
            "directory": root,
            "file": "src/guarded.c",
            "arguments": ["cc", "-c", "src/guarded.c", "-o", "guarded.o"],
            "output": "guarded.o"
        },
        {
            "directory": root,
            "file": "src/shapes.cpp",
            "command": "c++ -x c++ -std=c++17 -c src/shapes.cpp"
        },
        {
            "directory": root,
            "file": "src/events.c",
            "arguments": ["cc", "-c", "src/events.c"]
        },
        {
            "directory": root,
            "file": "vendor/lib.c",
            "arguments": ["cc", "-c", "vendor/lib.c"]
        },
        {
            "directory": root,
            "file": "src/guarded.c",
            "arguments": ["cc", "-DDEBUG", "-c", "src/guarded.c"]
        }
    ]);
    fs::write(
        dir.path().join("compile_commands.json"),
        serde_json::to_string_pretty(&database).unwrap(),
    )
    .unwrap();
    dir
}

fn read_facts(path: &Path) -> Vec<Value> {
    let text = fs::read_to_string(path).unwrap();
    assert!(text.ends_with('\n'), "{} lacks a trailing newline", path.display());
    match serde_json::from_str(&text).unwrap() {
        Value::Array(entries) => entries,
        other => panic!("expected an array in {}, got {}", path.display(), other),
    }
}

fn in_file<'a>(facts: &'a [Value], key: &str, file: &str) -> Vec<&'a Value> {
    facts
        .iter()
        .filter(|f| f[key].as_str().map(|l| l.contains(file)).unwrap_or(false))
        .collect()
}

fn strings(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect()
}

fn run_all(dir: &TempDir) -> PathBuf {
    let out = dir.path().join("facts");
    let args = IndexArgs {
        build_path: Some(PathBuf::from(".")),
        output_dir: Some(out.clone()),
        ..IndexArgs::default()
    };
    let code = run_index_in(&Pipeline::ALL, &args, dir.path()).expect("run should succeed");
    assert_eq!(code, EXIT_SUCCESS);
    out
}

#[test]
fn test_all_writes_every_fact_file() {
    let dir = project();
    let out = run_all(&dir);

    for name in [
        "statements.json",
        "snippets.json",
        "loops.json",
        "functions.json",
        "insertion-points.json",
    ] {
        let facts = read_facts(&out.join(name));
        assert!(!facts.is_empty(), "{} is empty", name);
    }
}

#[test]
fn test_guarded_return_statements() {
    let dir = project();
    let out = run_all(&dir);
    let root = fs::canonicalize(dir.path()).unwrap();
    let file = root.join("src/guarded.c").display().to_string();

    let statements = read_facts(&out.join("statements.json"));
    let guarded = in_file(&statements, "location", &file);
    // The second database entry for guarded.c is not indexed again.
    assert_eq!(guarded.len(), 2);

    let decl = guarded[0];
    assert_eq!(decl["location"], format!("{}@2:3::2:13", file));
    assert_eq!(decl["content"], "int b = a;");
    assert_eq!(decl["kind"], "DeclStmt");
    assert_eq!(strings(&decl["decls"]), vec!["b"]);
    assert_eq!(strings(&decl["writes"]), vec!["b"]);
    assert_eq!(strings(&decl["reads"]), vec!["a"]);
    assert_eq!(strings(&decl["requires_syntax"]), Vec::<&str>::new());

    let guard = guarded[1];
    assert_eq!(guard["content"], "if (b) return;");
    assert_eq!(guard["kind"], "IfStmt");
    assert_eq!(strings(&guard["reads"]), vec!["b"]);
    assert_eq!(strings(&guard["visible"]), vec!["a", "b"]);

    let snippets = read_facts(&out.join("snippets.json"));
    let guarded_return: Vec<_> = snippets
        .iter()
        .filter(|s| s["kind"] == "guarded-return")
        .collect();
    assert_eq!(guarded_return.len(), 1);
    assert_eq!(guarded_return[0]["content"], "if (b) return;");
    assert_eq!(
        strings(&guarded_return[0]["locations"]),
        vec![format!("{}@3:3::3:17", file).as_str()]
    );
}

#[test]
fn test_insertion_points_follow_statements() {
    let dir = project();
    let out = run_all(&dir);
    let root = fs::canonicalize(dir.path()).unwrap();
    let file = root.join("src/guarded.c").display().to_string();

    let points = read_facts(&out.join("insertion-points.json"));
    let guarded = in_file(&points, "location", &file);
    let locations: Vec<&str> = guarded
        .iter()
        .map(|p| p["location"].as_str().unwrap())
        .collect();
    assert_eq!(
        locations,
        vec![
            format!("{}@2:13", file).as_str(),
            format!("{}@3:17", file).as_str()
        ]
    );
    assert_eq!(strings(&guarded[1]["visible"]), vec!["a", "b"]);
}

#[test]
fn test_functions_and_loops() {
    let dir = project();
    let out = run_all(&dir);

    let functions = read_facts(&out.join("functions.json"));
    let names: BTreeSet<&str> = functions
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        ["drain", "f", "scale", "sum", "twice"].into_iter().collect()
    );
    let twice = functions.iter().find(|f| f["name"] == "twice").unwrap();
    assert_eq!(twice["global"], false);
    assert_eq!(twice["return-type"], "int");
    let sum = functions.iter().find(|f| f["name"] == "sum").unwrap();
    assert_eq!(sum["global"], true);

    let loops = read_facts(&out.join("loops.json"));
    let kinds: Vec<&str> = loops.iter().map(|l| l["kind"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["for", "for-range", "while"]);
}

#[test]
fn test_void_calls_collect_every_location() {
    let dir = project();
    let out = run_all(&dir);

    let snippets = read_facts(&out.join("snippets.json"));
    let calls: Vec<_> = snippets
        .iter()
        .filter(|s| s["kind"] == "void-call")
        .collect();
    let contents: Vec<&str> = calls.iter().map(|s| s["content"].as_str().unwrap()).collect();
    assert_eq!(contents, vec!["flush();", "reset();"]);
    assert_eq!(calls[0]["locations"].as_array().unwrap().len(), 2);
    assert_eq!(calls[1]["locations"].as_array().unwrap().len(), 1);

    let breaks: Vec<_> = snippets
        .iter()
        .filter(|s| s["kind"] == "guarded-break")
        .collect();
    assert_eq!(breaks.len(), 1);
    assert_eq!(breaks[0]["content"], "if (x < 0) break;");
}

#[test]
fn test_excluded_paths_are_not_indexed() {
    let dir = project();
    let out = run_all(&dir);

    for name in ["statements.json", "functions.json", "insertion-points.json"] {
        let facts = read_facts(&out.join(name));
        assert!(
            in_file(&facts, "location", "vendor/lib.c").is_empty(),
            "{} has vendored facts",
            name
        );
    }
}

#[test]
fn test_positional_files_select_entries() {
    let dir = project();
    let out = dir.path().join("only");
    let args = IndexArgs {
        files: vec![PathBuf::from("src/events.c")],
        build_path: Some(PathBuf::from("compile_commands.json")),
        output_dir: Some(out.clone()),
        ..IndexArgs::default()
    };
    run_index_in(&[Pipeline::Functions], &args, dir.path()).unwrap();

    let functions = read_facts(&out.join("functions.json"));
    assert_eq!(functions.len(), 1);
    assert_eq!(functions[0]["name"], "drain");
    assert!(!out.join("statements.json").exists());
}

#[test]
fn test_files_without_database() {
    stmt_facts::init();
    let dir = TempDir::new().unwrap();
    copy_dir(&testdata_path().join("project/src"), &dir.path().join("src"));
    let args = IndexArgs {
        files: vec![PathBuf::from("src")],
        ..IndexArgs::default()
    };
    run_index_in(&[Pipeline::Loops], &args, dir.path()).unwrap();

    let loops = read_facts(&dir.path().join("loops.json"));
    assert_eq!(loops.len(), 3);
}

#[test]
fn test_database_discovered_in_working_directory() {
    let dir = project();
    run_index_in(&[Pipeline::Functions], &IndexArgs::default(), dir.path()).unwrap();
    assert_eq!(read_facts(&dir.path().join("functions.json")).len(), 5);
}

#[test]
fn test_missing_input_is_fatal() {
    let dir = project();
    let out = dir.path().join("facts");
    let args = IndexArgs {
        files: vec![PathBuf::from("src/missing.c")],
        build_path: Some(PathBuf::from(".")),
        output_dir: Some(out.clone()),
        ..IndexArgs::default()
    };
    let err = run_index_in(&Pipeline::ALL, &args, dir.path()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<IndexError>(),
        Some(IndexError::MissingInput(_))
    ));
    assert!(!out.exists());
}

#[test]
fn test_missing_database_entry_file_is_fatal() {
    let dir = project();
    fs::remove_file(dir.path().join("src/events.c")).unwrap();
    let out = dir.path().join("facts");
    let args = IndexArgs {
        build_path: Some(PathBuf::from(".")),
        output_dir: Some(out.clone()),
        ..IndexArgs::default()
    };
    assert!(run_index_in(&Pipeline::ALL, &args, dir.path()).is_err());
    assert!(!out.exists());
}

#[test]
fn test_invalid_database_is_fatal() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("compile_commands.json"), "{ not json").unwrap();
    let args = IndexArgs {
        build_path: Some(PathBuf::from(".")),
        ..IndexArgs::default()
    };
    let err = run_index_in(&[Pipeline::Loops], &args, dir.path()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<IndexError>(),
        Some(IndexError::CompilationDatabase { .. })
    ));
}

#[test]
fn test_nothing_to_index_is_fatal() {
    let dir = TempDir::new().unwrap();
    let err = run_index_in(&[Pipeline::Loops], &IndexArgs::default(), dir.path()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<IndexError>(),
        Some(IndexError::NoInputs)
    ));
}

#[test]
fn test_snippet_database_is_idempotent() {
    let dir = project();
    let database = CompilationDatabase::load(dir.path()).unwrap();
    let context = AnalysisContext::new(dir.path(), globset::GlobSet::empty());
    let units = context.load_all(database.commands()).unwrap();

    let runner = Runner::new();
    let (once, _) = runner.snippets(&units);
    let doubled: Vec<_> = units.iter().chain(units.iter()).cloned().collect();
    let (twice, visits) = runner.snippets(&doubled);

    assert_eq!(once.to_pretty().unwrap(), twice.to_pretty().unwrap());
    assert_eq!(visits.duplicates, units.len() + 1);
}
