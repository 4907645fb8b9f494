//! The process graph executor.
//!
//! A resolved action is first wired into a task tree: every pipe is
//! created and every descriptor duplicated before anything runs. The
//! driver then starts all initially-runnable leaves and advances the
//! tree as children exit, so both sides of a pipe always make progress
//! independently and every spawned process is reaped.

use crate::error::{ExecError, FlowError, ParseError};
use crate::flow::{FlowStore, Resolved};
use crate::resolver;
use crate::tokenizer;
use log::{debug, warn};
use std::fs::File;
use std::io::{self, PipeReader, PipeWriter};
use std::os::fd::AsFd;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

/// How long the driver sleeps between sweeps when no child has exited.
const SWEEP_INTERVAL: Duration = Duration::from_millis(2);

/// Exit code reported for a subtree whose process image could not be
/// spawned, matching the shell convention for a missing command.
const SPAWN_FAILURE_CODE: i32 = 127;

/// Program used to realize a file source. It receives the already-opened
/// file as stdin, so it dumps bytes without interpreting its arguments.
const FILE_READER: &str = "cat";

type TaskId = usize;

/// Input wiring for one task: the read end of a pipe it owns, or the
/// invoking process's stdin.
#[derive(Default)]
enum Input {
    #[default]
    Inherit,
    Pipe(PipeReader),
}

impl Input {
    fn duplicate(&self) -> Result<Input, ExecError> {
        match self {
            Input::Inherit => Ok(Input::Inherit),
            Input::Pipe(reader) => reader
                .try_clone()
                .map(Input::Pipe)
                .map_err(ExecError::CloneStream),
        }
    }
}

/// Output wiring for one task: the write end of a pipe it owns, or the
/// invoking process's stdout.
#[derive(Default)]
enum Output {
    #[default]
    Inherit,
    Pipe(PipeWriter),
}

impl Output {
    fn duplicate(&self) -> Result<Output, ExecError> {
        match self {
            Output::Inherit => Ok(Output::Inherit),
            Output::Pipe(writer) => writer
                .try_clone()
                .map(Output::Pipe)
                .map_err(ExecError::CloneStream),
        }
    }
}

enum TaskKind {
    /// One spawned command.
    Process { argv: Vec<String>, merge_stderr: bool },
    /// Synthesized content dump for a file source. The file is opened
    /// during wiring so a missing path fails before anything runs.
    FileSource { content: Option<File> },
    /// A concatenate: parts run strictly in order, each to completion.
    Sequence { parts: Vec<TaskId>, next: usize },
    /// A pipe: both sides run at once; the aggregate status follows the
    /// consumer side.
    Pipeline {
        from: TaskId,
        to: TaskId,
        pending: usize,
        from_status: Option<i32>,
        to_status: Option<i32>,
    },
}

struct Task {
    /// Entity name, kept for diagnostics.
    label: String,
    kind: TaskKind,
    parent: Option<TaskId>,
    stdin: Input,
    stdout: Output,
    status: Option<i32>,
}

impl Task {
    fn leaf(label: &str, parent: Option<TaskId>, kind: TaskKind, stdin: Input, stdout: Output) -> Self {
        Self {
            label: label.to_string(),
            kind,
            parent,
            stdin,
            stdout,
            status: None,
        }
    }

    /// Sequences and pipelines hold no descriptors themselves; their
    /// children own the wired ends.
    fn group(label: &str, parent: Option<TaskId>, kind: TaskKind) -> Self {
        Self::leaf(label, parent, kind, Input::Inherit, Output::Inherit)
    }
}

enum StartAction {
    Spawn,
    Descend(Vec<TaskId>),
    Finished,
}

enum Advance {
    StartNext(TaskId),
    Abort { rest: Vec<TaskId>, code: i32 },
    FinishSequence(i32),
    FinishPipe { from: i32, to: i32 },
    Wait,
}

/// Realizes resolved actions as trees of OS processes connected by
/// anonymous pipes.
pub struct Executor<'a> {
    store: &'a FlowStore,
}

impl<'a> Executor<'a> {
    pub fn new(store: &'a FlowStore) -> Self {
        Self { store }
    }

    /// Validates the reference graph rooted at `action`, wires it into a
    /// task tree and drives it to completion.
    ///
    /// The returned value is the aggregate shell-style exit code of the
    /// action. A non-zero child status is reported through this value,
    /// not as an error; `Err` is reserved for conditions that prevent
    /// the tree from being wired or waited on at all.
    pub fn run(&self, action: &str) -> Result<i32, FlowError> {
        resolver::validate(self.store, action)?;

        let mut runtime = Runtime {
            store: self.store,
            tasks: Vec::new(),
            running: Vec::new(),
        };
        let root = runtime.build(action, None, Input::Inherit, Output::Inherit)?;
        runtime.start(root);
        runtime.drive()?;
        Ok(runtime.tasks[root].status.unwrap_or(0))
    }
}

struct Runtime<'a> {
    store: &'a FlowStore,
    tasks: Vec<Task>,
    /// Children that have been spawned and not yet reaped.
    running: Vec<(TaskId, Child)>,
}

impl<'a> Runtime<'a> {
    fn push(&mut self, task: Task) -> TaskId {
        self.tasks.push(task);
        self.tasks.len() - 1
    }

    /// Recursively wires `name` into the task tree. All pipes are
    /// created and all descriptor duplication happens here, before a
    /// single process is spawned; each leaf ends up owning exactly the
    /// ends it will pass to its child.
    fn build(
        &mut self,
        name: &str,
        parent: Option<TaskId>,
        stdin: Input,
        stdout: Output,
    ) -> Result<TaskId, FlowError> {
        match resolver::resolve_action(self.store, name)? {
            Resolved::Node(node) => {
                let argv = tokenizer::tokenize(&node.command).map_err(|source| {
                    ParseError::BadCommand {
                        name: node.name.clone(),
                        source,
                    }
                })?;
                Ok(self.push(Task::leaf(
                    name,
                    parent,
                    TaskKind::Process {
                        argv,
                        merge_stderr: node.merge_stderr,
                    },
                    stdin,
                    stdout,
                )))
            }
            Resolved::File(file) => {
                let content = File::open(&file.path).map_err(|source| ExecError::FileOpen {
                    path: file.path.clone(),
                    source,
                })?;
                // A file source never reads the surrounding input.
                drop(stdin);
                Ok(self.push(Task::leaf(
                    name,
                    parent,
                    TaskKind::FileSource {
                        content: Some(content),
                    },
                    Input::Inherit,
                    stdout,
                )))
            }
            Resolved::Pipe(pipe) => {
                let (reader, writer) = io::pipe().map_err(ExecError::PipeCreate)?;
                let id = self.push(Task::group(
                    name,
                    parent,
                    TaskKind::Pipeline {
                        from: 0,
                        to: 0,
                        pending: 2,
                        from_status: None,
                        to_status: None,
                    },
                ));
                let from_id = self.build(&pipe.from, Some(id), stdin, Output::Pipe(writer))?;
                let to_id = self.build(&pipe.to, Some(id), Input::Pipe(reader), stdout)?;
                if let TaskKind::Pipeline { from, to, .. } = &mut self.tasks[id].kind {
                    *from = from_id;
                    *to = to_id;
                }
                Ok(id)
            }
            Resolved::Concatenate(concatenate) => {
                let id = self.push(Task::group(
                    name,
                    parent,
                    TaskKind::Sequence {
                        parts: Vec::new(),
                        next: 0,
                    },
                ));
                let mut parts = Vec::with_capacity(concatenate.parts.len());
                for part in &concatenate.parts {
                    let part_stdin = stdin.duplicate()?;
                    let part_stdout = stdout.duplicate()?;
                    parts.push(self.build(part, Some(id), part_stdin, part_stdout)?);
                }
                // The masters drop here. Each part owns its duplicate,
                // so a downstream consumer sees end-of-stream only once
                // the last part has run (or been cancelled).
                drop(stdin);
                drop(stdout);
                if let TaskKind::Sequence { parts: slot, .. } = &mut self.tasks[id].kind {
                    *slot = parts;
                }
                Ok(id)
            }
        }
    }

    /// Starts a subtree: leaves spawn, a sequence starts its first part,
    /// a pipeline starts both sides before either is waited on.
    fn start(&mut self, id: TaskId) {
        let action = match &mut self.tasks[id].kind {
            TaskKind::Process { .. } | TaskKind::FileSource { .. } => StartAction::Spawn,
            TaskKind::Sequence { parts, next } => {
                if let Some(&first) = parts.first() {
                    *next = 1;
                    StartAction::Descend(vec![first])
                } else {
                    StartAction::Finished
                }
            }
            TaskKind::Pipeline { from, to, .. } => StartAction::Descend(vec![*from, *to]),
        };
        match action {
            StartAction::Spawn => self.spawn_leaf(id),
            StartAction::Descend(children) => {
                for child in children {
                    self.start(child);
                }
            }
            StartAction::Finished => self.complete(id, 0),
        }
    }

    fn spawn_leaf(&mut self, id: TaskId) {
        match self.try_spawn(id) {
            Ok(child) => {
                debug!("'{}' running as pid {}", self.tasks[id].label, child.id());
                self.running.push((id, child));
            }
            Err(err) => {
                // Fatal for this subtree only; running siblings are
                // still swept and reaped.
                eprintln!("flowline: {err}");
                self.complete(id, SPAWN_FAILURE_CODE);
            }
        }
    }

    fn try_spawn(&mut self, id: TaskId) -> Result<Child, ExecError> {
        let task = &mut self.tasks[id];
        let stdin = std::mem::take(&mut task.stdin);
        let stdout = std::mem::take(&mut task.stdout);
        match &mut task.kind {
            TaskKind::Process { argv, merge_stderr } => {
                let mut command = Command::new(&argv[0]);
                command.args(&argv[1..]);
                match stdin {
                    Input::Pipe(reader) => {
                        command.stdin(Stdio::from(reader));
                    }
                    Input::Inherit => {}
                }
                let merge = *merge_stderr;
                match stdout {
                    Output::Pipe(writer) => {
                        if merge {
                            let dup = writer.try_clone().map_err(ExecError::CloneStream)?;
                            command.stderr(Stdio::from(dup));
                        }
                        command.stdout(Stdio::from(writer));
                    }
                    Output::Inherit => {
                        if merge {
                            let dup = io::stdout()
                                .as_fd()
                                .try_clone_to_owned()
                                .map_err(ExecError::CloneStream)?;
                            command.stderr(Stdio::from(dup));
                        }
                    }
                }
                command.spawn().map_err(|source| ExecError::Spawn {
                    program: argv[0].clone(),
                    source,
                })
            }
            TaskKind::FileSource { content } => {
                let file = content.take().ok_or_else(|| ExecError::Spawn {
                    program: FILE_READER.to_string(),
                    source: io::Error::other("file source already consumed"),
                })?;
                drop(stdin);
                let mut command = Command::new(FILE_READER);
                command.stdin(Stdio::from(file));
                if let Output::Pipe(writer) = stdout {
                    command.stdout(Stdio::from(writer));
                }
                command.spawn().map_err(|source| ExecError::Spawn {
                    program: FILE_READER.to_string(),
                    source,
                })
            }
            TaskKind::Sequence { .. } | TaskKind::Pipeline { .. } => Err(ExecError::Spawn {
                program: task.label.clone(),
                source: io::Error::other("only processes and file sources can be spawned"),
            }),
        }
    }

    /// Sweeps the running children until every spawned process has been
    /// reaped. Completion is event-driven over any child exit, never a
    /// blocking wait on one predetermined child: with sequences sitting
    /// on both sides of a pipe, the side that finishes first must be
    /// free to advance while the other is still writing.
    fn drive(&mut self) -> Result<(), ExecError> {
        while !self.running.is_empty() {
            let mut progressed = false;
            let mut index = 0;
            while index < self.running.len() {
                match self.running[index].1.try_wait() {
                    Ok(Some(status)) => {
                        let (id, _) = self.running.swap_remove(index);
                        let code = exit_code(status);
                        debug!("'{}' exited with status {}", self.tasks[id].label, code);
                        self.complete(id, code);
                        progressed = true;
                    }
                    Ok(None) => index += 1,
                    Err(source) => return Err(ExecError::Wait(source)),
                }
            }
            if !progressed && !self.running.is_empty() {
                thread::sleep(SWEEP_INTERVAL);
            }
        }
        Ok(())
    }

    /// Records a subtree's status and advances its parent: a sequence
    /// starts its next part (or aborts the remainder on failure), a
    /// pipeline finishes once both sides are done.
    fn complete(&mut self, id: TaskId, code: i32) {
        self.tasks[id].status = Some(code);
        let Some(parent_id) = self.tasks[id].parent else {
            return;
        };

        let advance = match &mut self.tasks[parent_id].kind {
            TaskKind::Sequence { parts, next } => {
                if code != 0 {
                    let rest = parts[*next..].to_vec();
                    *next = parts.len();
                    Advance::Abort { rest, code }
                } else if *next < parts.len() {
                    let part = parts[*next];
                    *next += 1;
                    Advance::StartNext(part)
                } else {
                    Advance::FinishSequence(0)
                }
            }
            TaskKind::Pipeline {
                from,
                pending,
                from_status,
                to_status,
                ..
            } => {
                if id == *from {
                    *from_status = Some(code);
                } else {
                    *to_status = Some(code);
                }
                *pending -= 1;
                if *pending == 0 {
                    Advance::FinishPipe {
                        from: from_status.unwrap_or(0),
                        to: to_status.unwrap_or(0),
                    }
                } else {
                    Advance::Wait
                }
            }
            TaskKind::Process { .. } | TaskKind::FileSource { .. } => Advance::Wait,
        };

        match advance {
            Advance::StartNext(part) => self.start(part),
            Advance::Abort { rest, code } => {
                for task in rest {
                    self.cancel(task);
                }
                self.complete(parent_id, code);
            }
            Advance::FinishSequence(code) => self.complete(parent_id, code),
            Advance::FinishPipe { from, to } => {
                if from != 0 {
                    warn!(
                        "producer side of pipe '{}' exited with status {}",
                        self.tasks[parent_id].label, from
                    );
                }
                self.complete(parent_id, to);
            }
            Advance::Wait => {}
        }
    }

    /// Releases the descriptors of a subtree that will never start, so
    /// consumers further down the line observe end-of-stream.
    fn cancel(&mut self, id: TaskId) {
        self.tasks[id].stdin = Input::Inherit;
        self.tasks[id].stdout = Output::Inherit;
        let children = match &mut self.tasks[id].kind {
            TaskKind::Process { .. } => Vec::new(),
            TaskKind::FileSource { content } => {
                content.take();
                Vec::new()
            }
            TaskKind::Sequence { parts, next } => parts[*next..].to_vec(),
            TaskKind::Pipeline { from, to, .. } => vec![*from, *to],
        };
        for child in children {
            self.cancel(child);
        }
    }
}

/// Maps an exit status to the shell convention: the exit code when the
/// child exited, 128 plus the signal number when it was killed.
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 128,
    }
}
