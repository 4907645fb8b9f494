use thiserror::Error;

/// Errors that can occur while splitting a command string into arguments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("unterminated {quote} quote in command '{command}'")]
    UnterminatedQuote { quote: char, command: String },

    #[error("command is empty")]
    EmptyCommand,
}

/// Errors that can occur while parsing a flow file into a `FlowStore`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(
        "line {line}: expected a block header (node=, pipe=, concatenate=, file= or stderr=), found '{text}'"
    )]
    UnknownDirective { line: usize, text: String },

    #[error("line {line}: {block} '{name}' is missing its '{field}=' line")]
    MissingField {
        line: usize,
        block: &'static str,
        name: String,
        field: &'static str,
    },

    #[error("line {line}: concatenate '{name}' has an invalid part count '{value}'")]
    BadPartCount {
        line: usize,
        name: String,
        value: String,
    },

    #[error(
        "line {line}: concatenate '{name}' declares {declared} parts, but 'part_{index}=' is missing or mislabelled"
    )]
    MissingPart {
        line: usize,
        name: String,
        declared: usize,
        index: usize,
    },

    #[error("node '{name}': {source}")]
    BadCommand {
        name: String,
        #[source]
        source: TokenizeError,
    },
}

/// Errors that can occur while resolving an action name against the store.
///
/// All of these are raised before a single process is spawned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no node, pipe, concatenate or file is named '{0}'")]
    UnknownReference(String),

    #[error(
        "file '{name}' cannot be used as {position}; a file may only feed the producer side of a pipe"
    )]
    KindMismatch {
        name: String,
        position: &'static str,
    },

    #[error("reference cycle detected: {path}")]
    Cycle { path: String },
}

/// Errors that can occur while realizing a resolved action as processes.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to create a pipe: {0}")]
    PipeCreate(#[source] std::io::Error),

    #[error("failed to open file '{path}': {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to duplicate a stream descriptor: {0}")]
    CloneStream(#[source] std::io::Error),

    #[error("failed while waiting for child processes: {0}")]
    Wait(#[source] std::io::Error),
}

/// Umbrella error covering a whole load-and-run invocation.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}
