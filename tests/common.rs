//! Common test utilities for building flow stores and running actions.
use flowline::prelude::*;
use std::path::Path;

/// Parses flow text, panicking on parse errors so tests read cleanly.
#[allow(dead_code)]
pub fn store_from(text: &str) -> FlowStore {
    load(text).expect("flow text should parse")
}

/// Loads the text and runs one action, returning its aggregate exit code.
#[allow(dead_code)]
pub fn run_action(text: &str, action: &str) -> i32 {
    let store = store_from(text);
    Executor::new(&store)
        .run(action)
        .expect("action should wire and run")
}

/// Reads a file produced by a test pipeline, trimming the trailing newline.
#[allow(dead_code)]
pub fn read_trimmed(path: &Path) -> String {
    std::fs::read_to_string(path)
        .expect("pipeline output file should exist")
        .trim_end()
        .to_string()
}

/// A small flow covering every block kind, used by loader round-trip tests.
#[allow(dead_code)]
pub const KITCHEN_SINK_FLOW: &str = "\
node=emit
command=echo hello world

node=count
command=wc -l

stderr=noisy
command=sh -c 'echo oops >&2'

pipe=emit_count
from=emit
to=count

concatenate=both
parts=2
part_1=emit
part_2=emit_count

file=corpus
path=/var/tmp/corpus.txt
";
