//! Tests for the flow-file loader and its grammar serializer.
mod common;
use common::*;
use flowline::prelude::*;

#[test]
fn test_load_node_block() {
    let store = store_from("node=emit\ncommand=echo hello\n");
    let node = store.node("emit").expect("node should exist");
    assert_eq!(node.command, "echo hello");
    assert!(!node.merge_stderr);
}

#[test]
fn test_load_stderr_block_sets_merge_flag() {
    let store = store_from("stderr=noisy\ncommand=sh -c 'echo oops >&2'\n");
    let node = store.node("noisy").expect("stderr block declares a node");
    assert!(node.merge_stderr);
    assert_eq!(node.command, "sh -c 'echo oops >&2'");
}

#[test]
fn test_load_pipe_block() {
    let store = store_from(KITCHEN_SINK_FLOW);
    let pipe = store.pipe("emit_count").expect("pipe should exist");
    assert_eq!(pipe.from, "emit");
    assert_eq!(pipe.to, "count");
}

#[test]
fn test_load_concatenate_block() {
    let store = store_from(KITCHEN_SINK_FLOW);
    let concatenate = store.concatenate("both").expect("concatenate should exist");
    assert_eq!(concatenate.parts, vec!["emit", "emit_count"]);
}

#[test]
fn test_load_file_block() {
    let store = store_from(KITCHEN_SINK_FLOW);
    let file = store.file("corpus").expect("file should exist");
    assert_eq!(file.path, "/var/tmp/corpus.txt");
}

#[test]
fn test_blank_lines_between_blocks_are_ignored() {
    let store = store_from("\n\nnode=a\ncommand=true\n\n\n\nnode=b\ncommand=false\n\n");
    assert!(store.node("a").is_some());
    assert!(store.node("b").is_some());
}

#[test]
fn test_unknown_directive_is_rejected() {
    let err = load("node=a\ncommand=true\nbogus line\n").expect_err("should fail");
    assert!(matches!(
        err,
        ParseError::UnknownDirective { line: 3, .. }
    ));
}

#[test]
fn test_missing_field_is_rejected() {
    // The pipe block consumes exactly the next two lines; a node header
    // where 'from=' should be is an error, not a new block.
    let err = load("pipe=p\nnode=a\n").expect_err("should fail");
    assert!(matches!(
        err,
        ParseError::MissingField {
            block: "pipe",
            field: "from",
            ..
        }
    ));
}

#[test]
fn test_truncated_block_at_eof_is_rejected() {
    let err = load("node=a\n").expect_err("should fail");
    assert!(matches!(
        err,
        ParseError::MissingField {
            block: "node",
            field: "command",
            ..
        }
    ));
}

#[test]
fn test_unparsable_part_count_is_rejected() {
    let err = load("concatenate=c\nparts=two\npart_1=a\npart_2=b\n").expect_err("should fail");
    assert!(matches!(err, ParseError::BadPartCount { .. }));

    let err = load("concatenate=c\nparts=0\n").expect_err("zero parts is invalid");
    assert!(matches!(err, ParseError::BadPartCount { .. }));
}

#[test]
fn test_mislabelled_part_is_rejected() {
    let err = load("concatenate=c\nparts=2\npart_1=a\npart_3=b\n").expect_err("should fail");
    assert!(matches!(
        err,
        ParseError::MissingPart {
            declared: 2,
            index: 2,
            ..
        }
    ));
}

#[test]
fn test_unterminated_quote_fails_at_load_time() {
    let err = load("node=bad\ncommand=echo \"never closed\n").expect_err("should fail");
    match err {
        ParseError::BadCommand { name, source } => {
            assert_eq!(name, "bad");
            assert!(matches!(source, TokenizeError::UnterminatedQuote { .. }));
        }
        other => panic!("expected a command error, got {other:?}"),
    }
}

#[test]
fn test_empty_command_fails_at_load_time() {
    let err = load("node=bad\ncommand=\n").expect_err("should fail");
    assert!(matches!(
        err,
        ParseError::BadCommand {
            source: TokenizeError::EmptyCommand,
            ..
        }
    ));
}

#[test]
fn test_last_definition_wins_within_a_namespace() {
    let store = store_from("node=a\ncommand=echo one\n\nnode=a\ncommand=echo two\n");
    assert_eq!(store.node("a").expect("node exists").command, "echo two");
}

#[test]
fn test_round_trip_preserves_the_store() {
    let first = store_from(KITCHEN_SINK_FLOW);
    let rendered = first.to_flow_text();
    let second = load(&rendered).expect("serialized text should reload");
    assert_eq!(first, second);
}

#[test]
fn test_round_trip_is_stable_after_one_pass() {
    let first = store_from(KITCHEN_SINK_FLOW);
    let rendered = first.to_flow_text();
    let reloaded = load(&rendered).expect("serialized text should reload");
    assert_eq!(rendered, reloaded.to_flow_text());
}

#[test]
fn test_action_names_cover_all_namespaces() {
    let store = store_from(KITCHEN_SINK_FLOW);
    let names = store.action_names();
    assert_eq!(
        names,
        vec!["both", "corpus", "count", "emit", "emit_count", "noisy"]
    );
}
