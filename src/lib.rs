//! # Flowline - Pipeline Description and Execution Engine
//!
//! **Flowline** is a miniature pipeline-description language and executor. A
//! flow file declares named **nodes** (shell-like commands), **pipes**
//! (two-ended connections between named entities), **concatenations**
//! (ordered sequences run end-to-end) and **files** (static byte sources).
//! Running an action resolves its name against those definitions and
//! realizes it as a tree of OS processes wired together with anonymous
//! pipes and standard-stream redirection.
//!
//! Flowline targets Unix: it relies on anonymous pipes, exec semantics and
//! signal-aware exit statuses.
//!
//! ## Core Workflow
//!
//! 1. **Load**: parse flow-file text into a [`flow::FlowStore`] with
//!    [`flow::load`]. The store is immutable from then on and is always
//!    passed by reference, so tests and embedders can hold any number of
//!    independent stores.
//! 2. **Resolve**: an action name is looked up in a fixed order (node,
//!    then pipe, then concatenate, then file) and the whole reference
//!    graph is validated - unknown names, misplaced files and reference
//!    cycles are rejected before anything is spawned.
//! 3. **Execute**: [`executor::Executor`] wires the resolved graph into a
//!    process tree and drives it to completion, returning the aggregate
//!    shell-style exit code.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowline::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let text = "\
//! node=emit
//! command=echo hello
//!
//! node=count
//! command=wc -c
//!
//! pipe=emit_length
//! from=emit
//! to=count
//! ";
//!
//!     let store = load(text)?;
//!     let executor = Executor::new(&store);
//!
//!     // Runs `echo hello | wc -c` as two concurrent processes joined by
//!     // an anonymous pipe and returns the consumer's exit code.
//!     let code = executor.run("emit_length")?;
//!     println!("pipeline exited with {code}");
//!     Ok(())
//! }
//! ```
//!
//! ## Flow File Format
//!
//! The format is strict and line-oriented; a block is opened by its header
//! line and every field is consumed as exactly the next physical line:
//!
//! ```text
//! node=<name>
//! command=<shell-like command string>
//!
//! pipe=<name>
//! from=<reference-name>
//! to=<reference-name>
//!
//! concatenate=<name>
//! parts=<N>
//! part_1=<reference-name>
//! ...
//! part_N=<reference-name>
//!
//! file=<name>
//! path=<filesystem path>
//!
//! stderr=<name>
//! command=<shell-like command string>
//! ```
//!
//! An `stderr=` block declares a node whose stderr is merged into its
//! stdout wherever that ends up pointing, giving `2>&1` behavior inside a
//! pipeline.

pub mod error;
pub mod executor;
pub mod flow;
pub mod prelude;
pub mod resolver;
pub mod tokenizer;
