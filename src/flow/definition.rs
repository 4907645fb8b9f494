use ahash::AHashMap;
use itertools::Itertools;
use serde::Serialize;

/// A leaf executable unit: a name bound to one shell-like command string.
///
/// The command is kept verbatim and only tokenized when the node is
/// realized as a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDef {
    pub name: String,
    pub command: String,
    /// When set, the child's stderr is redirected to wherever its stdout
    /// ends up after pipe wiring (`2>&1` placed after the redirection).
    pub merge_stderr: bool,
}

/// A two-ended connector. `from` and `to` are names, resolved lazily
/// against the same store at execution time; either side may name a
/// node, another pipe, a concatenate or (for `from`) a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipeDef {
    pub name: String,
    pub from: String,
    pub to: String,
}

/// An ordered sequence of references executed end-to-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcatenateDef {
    pub name: String,
    pub parts: Vec<String>,
}

/// A static byte source backed by a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDef {
    pub name: String,
    pub path: String,
}

/// A reference resolved to the entity that defines it.
///
/// Names are not guaranteed unique across the four namespaces, so
/// resolution follows a fixed lookup order: node, then pipe, then
/// concatenate, then file. The executor matches on this exhaustively;
/// adding an entity kind without handling it everywhere is a compile
/// error rather than a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    Node(&'a NodeDef),
    Pipe(&'a PipeDef),
    Concatenate(&'a ConcatenateDef),
    File(&'a FileDef),
}

impl Resolved<'_> {
    pub fn name(&self) -> &str {
        match self {
            Resolved::Node(n) => &n.name,
            Resolved::Pipe(p) => &p.name,
            Resolved::Concatenate(c) => &c.name,
            Resolved::File(f) => &f.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Resolved::Node(_) => "node",
            Resolved::Pipe(_) => "pipe",
            Resolved::Concatenate(_) => "concatenate",
            Resolved::File(_) => "file",
        }
    }
}

/// The definition store: four name-to-entity mappings, populated once by
/// the loader and treated as read-only for the rest of the run.
///
/// The store is always passed by reference; tests and embedders can hold
/// as many independent stores as they like.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlowStore {
    pub(crate) nodes: AHashMap<String, NodeDef>,
    pub(crate) pipes: AHashMap<String, PipeDef>,
    pub(crate) concatenates: AHashMap<String, ConcatenateDef>,
    pub(crate) files: AHashMap<String, FileDef>,
}

impl FlowStore {
    /// Resolves a name using the fixed node > pipe > concatenate > file
    /// lookup order.
    pub fn resolve(&self, name: &str) -> Option<Resolved<'_>> {
        if let Some(node) = self.nodes.get(name) {
            return Some(Resolved::Node(node));
        }
        if let Some(pipe) = self.pipes.get(name) {
            return Some(Resolved::Pipe(pipe));
        }
        if let Some(concatenate) = self.concatenates.get(name) {
            return Some(Resolved::Concatenate(concatenate));
        }
        self.files.get(name).map(Resolved::File)
    }

    pub fn node(&self, name: &str) -> Option<&NodeDef> {
        self.nodes.get(name)
    }

    pub fn pipe(&self, name: &str) -> Option<&PipeDef> {
        self.pipes.get(name)
    }

    pub fn concatenate(&self, name: &str) -> Option<&ConcatenateDef> {
        self.concatenates.get(name)
    }

    pub fn file(&self, name: &str) -> Option<&FileDef> {
        self.files.get(name)
    }

    /// All names declared anywhere in the store, deduplicated and sorted.
    pub fn action_names(&self) -> Vec<&str> {
        self.nodes
            .keys()
            .chain(self.pipes.keys())
            .chain(self.concatenates.keys())
            .chain(self.files.keys())
            .map(String::as_str)
            .unique()
            .sorted()
            .collect()
    }
}
