use crate::error::ParseError;
use crate::flow::definition::{ConcatenateDef, FileDef, FlowStore, NodeDef, PipeDef};
use crate::tokenizer;
use itertools::Itertools;
use log::warn;

/// Parses flow-file text into a populated [`FlowStore`].
///
/// The grammar is strict and line-oriented: a block is opened by its
/// header prefix (`node=`, `pipe=`, `concatenate=`, `file=`, `stderr=`)
/// and every subsequent field is consumed as exactly the next physical
/// line. Blank lines between blocks are ignored; anything else that is
/// not a block header is an error.
///
/// Node commands are tokenized here so that quoting mistakes surface at
/// load time rather than mid-execution.
pub fn load(text: &str) -> Result<FlowStore, ParseError> {
    let mut store = FlowStore::default();
    let mut parser = Parser::new(text);

    while let Some(line) = parser.next_line() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(name) = line.strip_prefix("node=") {
            let name = name.to_string();
            let command = parser.field("node", &name, "command")?.to_string();
            push_node(
                &mut store,
                NodeDef {
                    name,
                    command,
                    merge_stderr: false,
                },
            )?;
        } else if let Some(name) = line.strip_prefix("stderr=") {
            let name = name.to_string();
            let command = parser.field("stderr", &name, "command")?.to_string();
            push_node(
                &mut store,
                NodeDef {
                    name,
                    command,
                    merge_stderr: true,
                },
            )?;
        } else if let Some(name) = line.strip_prefix("pipe=") {
            let name = name.to_string();
            let from = parser.field("pipe", &name, "from")?.to_string();
            let to = parser.field("pipe", &name, "to")?.to_string();
            if store
                .pipes
                .insert(name.clone(), PipeDef { name: name.clone(), from, to })
                .is_some()
            {
                warn!("pipe '{name}' is defined more than once; the last definition wins");
            }
        } else if let Some(name) = line.strip_prefix("concatenate=") {
            let name = name.to_string();
            let count_text = parser.field("concatenate", &name, "parts")?;
            let declared: usize = match count_text.parse() {
                Ok(count) if count > 0 => count,
                _ => {
                    return Err(ParseError::BadPartCount {
                        line: parser.line_no,
                        name,
                        value: count_text.to_string(),
                    });
                }
            };
            let mut parts = Vec::with_capacity(declared);
            for index in 1..=declared {
                parts.push(parser.part(&name, declared, index)?.to_string());
            }
            if store
                .concatenates
                .insert(name.clone(), ConcatenateDef { name: name.clone(), parts })
                .is_some()
            {
                warn!("concatenate '{name}' is defined more than once; the last definition wins");
            }
        } else if let Some(name) = line.strip_prefix("file=") {
            let name = name.to_string();
            let path = parser.field("file", &name, "path")?.to_string();
            if store
                .files
                .insert(name.clone(), FileDef { name: name.clone(), path })
                .is_some()
            {
                warn!("file '{name}' is defined more than once; the last definition wins");
            }
        } else {
            return Err(ParseError::UnknownDirective {
                line: parser.line_no,
                text: line.to_string(),
            });
        }
    }

    warn_on_collisions(&store);
    Ok(store)
}

fn push_node(store: &mut FlowStore, node: NodeDef) -> Result<(), ParseError> {
    tokenizer::tokenize(&node.command).map_err(|source| ParseError::BadCommand {
        name: node.name.clone(),
        source,
    })?;
    let name = node.name.clone();
    if store.nodes.insert(name.clone(), node).is_some() {
        warn!("node '{name}' is defined more than once; the last definition wins");
    }
    Ok(())
}

/// Names are not required to be unique across the four namespaces; the
/// fixed lookup order decides collisions, but a flow file relying on
/// that is almost certainly a mistake worth hearing about.
fn warn_on_collisions(store: &FlowStore) {
    for name in store.action_names() {
        let owners: Vec<&str> = [
            store.nodes.contains_key(name).then_some("node"),
            store.pipes.contains_key(name).then_some("pipe"),
            store.concatenates.contains_key(name).then_some("concatenate"),
            store.files.contains_key(name).then_some("file"),
        ]
        .into_iter()
        .flatten()
        .collect();
        if owners.len() > 1 {
            warn!(
                "name '{}' is declared as {}; lookup order ({}) decides which one runs",
                name,
                owners.iter().join(" and "),
                owners.iter().join(" before "),
            );
        }
    }
}

/// Line reader that tracks position for error reporting.
struct Parser<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    /// 1-based number of the most recently read line.
    line_no: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            line_no: 0,
        }
    }

    fn next_line(&mut self) -> Option<&'a str> {
        self.lines.next().map(|(index, line)| {
            self.line_no = index + 1;
            line
        })
    }

    /// Consumes the next physical line, requiring the `<field>=` prefix.
    fn field(
        &mut self,
        block: &'static str,
        name: &str,
        field: &'static str,
    ) -> Result<&'a str, ParseError> {
        let expected_line = self.line_no + 1;
        let missing = |line| ParseError::MissingField {
            line,
            block,
            name: name.to_string(),
            field,
        };
        match self.next_line() {
            Some(line) => line
                .strip_prefix(field)
                .and_then(|rest| rest.strip_prefix('='))
                .ok_or_else(|| missing(self.line_no)),
            None => Err(missing(expected_line)),
        }
    }

    /// Consumes the next physical line, requiring the exact `part_<i>=`
    /// prefix for the given index.
    fn part(
        &mut self,
        name: &str,
        declared: usize,
        index: usize,
    ) -> Result<&'a str, ParseError> {
        let expected_line = self.line_no + 1;
        let missing = |line| ParseError::MissingPart {
            line,
            name: name.to_string(),
            declared,
            index,
        };
        let prefix = format!("part_{index}=");
        match self.next_line() {
            Some(line) => line
                .strip_prefix(&prefix)
                .ok_or_else(|| missing(self.line_no)),
            None => Err(missing(expected_line)),
        }
    }
}

impl FlowStore {
    /// Renders the store back into flow-file text.
    ///
    /// Blocks are emitted sorted by name within each kind so the output
    /// is deterministic; reloading the result yields an equal store.
    pub fn to_flow_text(&self) -> String {
        let mut out = String::new();
        for node in self.nodes.values().sorted_by(|a, b| a.name.cmp(&b.name)) {
            let header = if node.merge_stderr { "stderr" } else { "node" };
            out.push_str(&format!(
                "{}={}\ncommand={}\n\n",
                header, node.name, node.command
            ));
        }
        for pipe in self.pipes.values().sorted_by(|a, b| a.name.cmp(&b.name)) {
            out.push_str(&format!(
                "pipe={}\nfrom={}\nto={}\n\n",
                pipe.name, pipe.from, pipe.to
            ));
        }
        for concatenate in self
            .concatenates
            .values()
            .sorted_by(|a, b| a.name.cmp(&b.name))
        {
            out.push_str(&format!(
                "concatenate={}\nparts={}\n",
                concatenate.name,
                concatenate.parts.len()
            ));
            for (index, part) in concatenate.parts.iter().enumerate() {
                out.push_str(&format!("part_{}={}\n", index + 1, part));
            }
            out.push('\n');
        }
        for file in self.files.values().sorted_by(|a, b| a.name.cmp(&b.name)) {
            out.push_str(&format!("file={}\npath={}\n\n", file.name, file.path));
        }
        out
    }
}
