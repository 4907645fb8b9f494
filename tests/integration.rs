//! End-to-end tests that load, validate, serialize and run whole flows.
mod common;
use common::*;
use flowline::prelude::*;
use std::fs;

/// Builds a flow exercising every entity kind at once: a concatenate
/// whose parts are a node, a nested pipe and a file-fed pipe, streamed
/// into one consumer.
fn deep_flow(corpus: &std::path::Path, out: &std::path::Path) -> String {
    format!(
        "\
node=header
command=echo begin

node=emit
command=printf mid1\\nmid2\\n

node=upcase
command=tr a-z A-Z

node=passthrough
command=cat

node=save
command=sh -c 'cat > {out}'

pipe=emit_upcase
from=emit
to=upcase

file=corpus
path={corpus}

pipe=tail_section
from=corpus
to=passthrough

concatenate=sections
parts=3
part_1=header
part_2=emit_upcase
part_3=tail_section

pipe=report
from=sections
to=save
",
        out = out.display(),
        corpus = corpus.display()
    )
}

#[test]
fn test_deeply_nested_flow_runs_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let corpus = dir.path().join("corpus.txt");
    let out = dir.path().join("out.txt");
    fs::write(&corpus, "tail\n").expect("write corpus");

    let flow = deep_flow(&corpus, &out);
    assert_eq!(run_action(&flow, "report"), 0);
    assert_eq!(read_trimmed(&out), "begin\nMID1\nMID2\ntail");
}

#[test]
fn test_every_action_in_the_deep_flow_validates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let corpus = dir.path().join("corpus.txt");
    let out = dir.path().join("out.txt");
    fs::write(&corpus, "tail\n").expect("write corpus");

    let store = store_from(&deep_flow(&corpus, &out));
    for name in store.action_names() {
        validate(&store, name).unwrap_or_else(|e| panic!("'{name}' should validate: {e}"));
    }
}

#[test]
fn test_reserialized_flow_behaves_identically() {
    let dir = tempfile::tempdir().expect("tempdir");
    let corpus = dir.path().join("corpus.txt");
    let out_first = dir.path().join("first.txt");
    fs::write(&corpus, "tail\n").expect("write corpus");

    let first = store_from(&deep_flow(&corpus, &out_first));
    let reloaded = load(&first.to_flow_text()).expect("round-trip should parse");
    assert_eq!(first, reloaded);

    assert_eq!(
        Executor::new(&reloaded)
            .run("report")
            .expect("reloaded flow should run"),
        0
    );
    assert_eq!(read_trimmed(&out_first), "begin\nMID1\nMID2\ntail");
}

#[test]
fn test_independent_stores_do_not_interfere() {
    // Two stores reuse the same names with different commands; each
    // executor only sees the store it was built over.
    let first = store_from("node=job\ncommand=sh -c 'exit 1'\n");
    let second = store_from("node=job\ncommand=true\n");

    let first_code = Executor::new(&first).run("job").expect("first runs");
    let second_code = Executor::new(&second).run("job").expect("second runs");
    assert_eq!(first_code, 1);
    assert_eq!(second_code, 0);
}

#[test]
fn test_concatenate_of_pipes_runs_each_to_completion() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("out.txt");
    let flow = format!(
        "\
node=emit_a
command=echo apple

node=emit_b
command=echo banana

node=append
command=sh -c 'cat >> {out}'

pipe=first
from=emit_a
to=append

pipe=second
from=emit_b
to=append

concatenate=chained
parts=2
part_1=first
part_2=second
",
        out = out.display()
    );
    assert_eq!(run_action(&flow, "chained"), 0);
    assert_eq!(read_trimmed(&out), "apple\nbanana");
}
