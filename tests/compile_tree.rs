use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use assetpipe::errors::PipelineError;
use assetpipe::fs::mock::{FsOpKind, MockFileSystem};
use assetpipe::namer::ContentHashNamer;
use assetpipe::{CompileOutput, CompileRequest, Manifest, Pipeline, ProcessorSpec, Transformed};
use assetpipe_test_utils::init_tracing;

fn manifest(pairs: &[(&str, &str)]) -> Manifest {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn pipeline(fs: &MockFileSystem) -> Pipeline {
    Pipeline::new(Arc::new(fs.clone()))
}

/// A tree with two top-level files and one nested file.
fn asset_tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("assets/a.json", br#"{"hi":"ho"}"#.to_vec());
    fs.add_file("assets/b.txt", b"hello".to_vec());
    fs.add_file("assets/sub/c.json", br#"{"ho":"hi"}"#.to_vec());
    fs
}

#[tokio::test]
async fn single_file_with_default_processor() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("a.json", br#"{"hi":"ho"}"#.to_vec());

    let request = CompileRequest::new("a.json", vec![ProcessorSpec::new("dist")]);
    let output = pipeline(&fs).compile(&request).await.unwrap();

    assert_eq!(output, CompileOutput::Single(manifest(&[("a.json", "a.json")])));
    assert_eq!(fs.contents("dist/a.json").unwrap(), br#"{"hi":"ho"}"#.to_vec());
}

#[tokio::test]
async fn single_file_with_content_hash_namer() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("a.json", br#"{"hi":"ho"}"#.to_vec());

    let processor = ProcessorSpec::new("dist").rename_with(ContentHashNamer::new(8));
    let request = CompileRequest::new("a.json", vec![processor]);
    let output = pipeline(&fs).compile(&request).await.unwrap();

    assert_eq!(
        output,
        CompileOutput::Single(manifest(&[("a.json", "a-DF67FD3A.json")]))
    );
    assert!(fs.exists("dist/a-DF67FD3A.json"));
}

#[tokio::test]
async fn directory_keeps_relative_layout() {
    init_tracing();
    let fs = asset_tree();

    let request = CompileRequest::new("assets", vec![ProcessorSpec::new("dist")]);
    let output = pipeline(&fs).compile(&request).await.unwrap();

    assert_eq!(
        output,
        CompileOutput::Single(manifest(&[
            ("a.json", "a.json"),
            ("b.txt", "b.txt"),
            ("sub/c.json", "sub/c.json"),
        ]))
    );
    assert_eq!(fs.contents("dist/sub/c.json").unwrap(), br#"{"ho":"hi"}"#.to_vec());
}

#[tokio::test]
async fn non_recursive_processor_ignores_nested_files_but_sibling_does_not() {
    init_tracing();
    let fs = asset_tree();

    let request = CompileRequest::new(
        "assets",
        vec![
            ProcessorSpec::new("flat").recursive(false),
            ProcessorSpec::new("dist"),
        ],
    );
    let output = pipeline(&fs).compile(&request).await.unwrap();

    let manifests = output.into_manifests();
    assert_eq!(manifests.len(), 2);
    assert_eq!(
        manifests[0],
        manifest(&[("a.json", "a.json"), ("b.txt", "b.txt")])
    );
    assert!(manifests[1].contains_key("sub/c.json"));
    assert!(!fs.exists("flat/sub/c.json"));
    assert!(fs.exists("dist/sub/c.json"));
}

#[tokio::test]
async fn include_predicate_sees_directories_and_files_but_not_the_entry() {
    init_tracing();
    let fs = asset_tree();
    let calls: Arc<Mutex<Vec<(String, bool)>>> = Arc::default();

    let recorder = Arc::clone(&calls);
    let processor = ProcessorSpec::new("dist").include(move |rel, is_dir| {
        recorder.lock().unwrap().push((rel.to_string(), is_dir));
        true
    });
    let request = CompileRequest::new("assets", vec![processor]);
    pipeline(&fs).compile(&request).await.unwrap();

    let mut calls = calls.lock().unwrap().clone();
    calls.sort();
    assert_eq!(
        calls,
        vec![
            ("a.json".to_string(), false),
            ("b.txt".to_string(), false),
            ("sub".to_string(), true),
            ("sub/c.json".to_string(), false),
        ]
    );
}

#[tokio::test]
async fn excluded_directory_is_not_listed() {
    init_tracing();
    let fs = asset_tree();

    let processor = ProcessorSpec::new("dist").include(|rel, is_dir| !(is_dir && rel == "sub"));
    let request = CompileRequest::new("assets", vec![processor]);
    let output = pipeline(&fs).compile(&request).await.unwrap();

    assert_eq!(
        output,
        CompileOutput::Single(manifest(&[("a.json", "a.json"), ("b.txt", "b.txt")]))
    );
    assert_eq!(fs.ops_of(FsOpKind::ReadDir), vec![PathBuf::from("assets")]);
    assert!(!fs.ops_of(FsOpKind::Read).contains(&PathBuf::from("assets/sub/c.json")));
}

#[tokio::test]
async fn file_rejected_by_every_processor_is_not_read() {
    init_tracing();
    let fs = asset_tree();

    let json_only = |rel: &str, is_dir: bool| is_dir || rel.ends_with(".json");
    let request = CompileRequest::new(
        "assets",
        vec![
            ProcessorSpec::new("one").include(json_only),
            ProcessorSpec::new("two").include(json_only),
        ],
    );
    pipeline(&fs).compile(&request).await.unwrap();

    let reads = fs.ops_of(FsOpKind::Read);
    assert!(!reads.contains(&PathBuf::from("assets/b.txt")));
    // Read once, shared by both processors.
    let a_reads = reads
        .iter()
        .filter(|p| **p == PathBuf::from("assets/a.json"))
        .count();
    assert_eq!(a_reads, 1);
}

#[tokio::test]
async fn skip_leaves_no_trace_for_that_processor_only() {
    init_tracing();
    let fs = asset_tree();

    let request = CompileRequest::new(
        "assets",
        vec![
            ProcessorSpec::new("dist"),
            ProcessorSpec::new("skipped").transform_fn(|contents, _| {
                if contents.starts_with(b"{") {
                    Ok(Transformed::Skip)
                } else {
                    Ok(Transformed::Keep(contents.to_vec()))
                }
            }),
        ],
    );
    let manifests = pipeline(&fs).compile(&request).await.unwrap().into_manifests();

    assert_eq!(manifests[0].len(), 3);
    assert_eq!(manifests[1], manifest(&[("b.txt", "b.txt")]));

    let skipped_dirs: Vec<_> = fs
        .ops_of(FsOpKind::CreateDir)
        .into_iter()
        .filter(|p| p.starts_with("skipped"))
        .collect();
    assert_eq!(skipped_dirs, vec![PathBuf::from("skipped")]);
    let skipped_writes: Vec<_> = fs
        .ops_of(FsOpKind::Write)
        .into_iter()
        .filter(|p| p.starts_with("skipped"))
        .collect();
    assert_eq!(skipped_writes, vec![PathBuf::from("skipped/b.txt")]);
}

#[tokio::test]
async fn transform_output_is_what_gets_written_and_hashed() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src/greeting.txt", b"hello".to_vec());

    let processor = ProcessorSpec::new("out")
        .transform_fn(|contents, _| Ok(Transformed::Keep(contents.to_ascii_uppercase())))
        .rename_with(ContentHashNamer::new(4));
    let request = CompileRequest::new("src", vec![processor]);
    let output = pipeline(&fs).compile(&request).await.unwrap();

    // sha256("HELLO") = 3733cd97...
    assert_eq!(
        output,
        CompileOutput::Single(manifest(&[("greeting.txt", "greeting-3733.txt")]))
    );
    assert_eq!(fs.contents("out/greeting-3733.txt").unwrap(), b"HELLO".to_vec());
}

#[tokio::test]
async fn custom_rename_receives_relative_path() {
    init_tracing();
    let fs = asset_tree();

    let processor = ProcessorSpec::new("dist")
        .include(|rel, is_dir| is_dir || rel.ends_with(".json"))
        .rename_fn(|rel, _| Ok(format!("{}.out", rel.replace('/', "_"))));
    let request = CompileRequest::new("assets", vec![processor]);
    let output = pipeline(&fs).compile(&request).await.unwrap();

    assert_eq!(
        output,
        CompileOutput::Single(manifest(&[
            ("a.json", "a.json.out"),
            ("sub/c.json", "sub/sub_c.json.out"),
        ]))
    );
}

#[tokio::test]
async fn write_failure_propagates_as_io_error() {
    init_tracing();
    let fs = asset_tree();
    fs.fail_next(FsOpKind::Write, "dist/sub/c.json", "disk full");

    let request = CompileRequest::new("assets", vec![ProcessorSpec::new("dist")]);
    let err = pipeline(&fs).compile(&request).await.unwrap_err();

    match err {
        PipelineError::Io { op, path, .. } => {
            assert_eq!(op, "write");
            assert_eq!(path, PathBuf::from("dist/sub/c.json"));
        }
        other => panic!("expected Io error, got {other:?}"),
    }
}

#[tokio::test]
async fn failing_file_does_not_stop_its_siblings() {
    init_tracing();
    let fs = MockFileSystem::new();
    for name in ["a", "b", "c"] {
        fs.add_file(format!("assets/{name}.json"), b"{}".to_vec());
    }
    fs.fail_next(FsOpKind::Read, "assets/a.json", "unreadable");

    let request = CompileRequest::new("assets", vec![ProcessorSpec::new("dist")]);
    let err = pipeline(&fs).compile(&request).await.unwrap_err();

    assert!(matches!(err, PipelineError::Io { op: "read", .. }));
    assert!(fs.exists("dist/b.json"));
    assert!(fs.exists("dist/c.json"));
    assert!(!fs.exists("dist/a.json"));
}

#[tokio::test]
async fn first_failure_in_child_order_is_reported() {
    init_tracing();
    let fs = asset_tree();
    fs.fail_next(FsOpKind::Read, "assets/a.json", "first");
    fs.fail_next(FsOpKind::Read, "assets/b.txt", "second");

    let request = CompileRequest::new("assets", vec![ProcessorSpec::new("dist")]);
    let err = pipeline(&fs).compile(&request).await.unwrap_err();

    match err {
        PipelineError::Io { path, .. } => assert_eq!(path, PathBuf::from("assets/a.json")),
        other => panic!("expected Io error, got {other:?}"),
    }
    assert!(fs.exists("dist/sub/c.json"));
}

#[tokio::test]
async fn manifest_output_is_normalized_against_the_output_root() {
    init_tracing();
    let fs = asset_tree();

    let processor = ProcessorSpec::new("dist")
        .include(|rel, is_dir| is_dir || rel == "sub/c.json")
        .rename_fn(|_, _| Ok("../lifted.json".to_string()));
    let request = CompileRequest::new("assets", vec![processor]);
    let output = pipeline(&fs).compile(&request).await.unwrap();

    assert_eq!(
        output,
        CompileOutput::Single(manifest(&[("sub/c.json", "lifted.json")]))
    );
    assert!(fs.exists("dist/lifted.json"));
}

#[tokio::test]
async fn missing_entry_fails_on_stat() {
    init_tracing();
    let fs = MockFileSystem::new();

    let request = CompileRequest::new("nowhere", vec![ProcessorSpec::new("dist")]);
    let err = pipeline(&fs).compile(&request).await.unwrap_err();

    assert!(matches!(err, PipelineError::Io { op: "stat", .. }));
}

#[tokio::test]
async fn zero_processors_compile_to_an_empty_list() {
    init_tracing();
    let fs = asset_tree();

    let request = CompileRequest::new("assets", Vec::new());
    let output = pipeline(&fs).compile(&request).await.unwrap();

    assert_eq!(output, CompileOutput::Multiple(Vec::new()));
    assert!(fs.ops_of(FsOpKind::ReadDir).is_empty());
}

#[tokio::test]
async fn manifest_json_has_sorted_keys() {
    init_tracing();
    let fs = asset_tree();

    let request = CompileRequest::new("assets", vec![ProcessorSpec::new("dist")]);
    let output = pipeline(&fs).compile(&request).await.unwrap();
    let json = serde_json::to_string(&output).unwrap();

    assert_eq!(
        json,
        r#"{"a.json":"a.json","b.txt":"b.txt","sub/c.json":"sub/c.json"}"#
    );

    let two = CompileOutput::Multiple(vec![HashMap::new(), manifest(&[("x", "y")])]);
    assert_eq!(serde_json::to_string(&two).unwrap(), r#"[{},{"x":"y"}]"#);
}
