use crate::error::ResolveError;
use crate::flow::{FlowStore, Resolved};
use ahash::AHashSet;
use itertools::Itertools;

/// Looks up an action name against the store.
///
/// The lookup order is fixed: node, then pipe, then concatenate, then
/// file. The first match decides the execution strategy.
pub fn resolve_action<'a>(store: &'a FlowStore, name: &str) -> Result<Resolved<'a>, ResolveError> {
    store
        .resolve(name)
        .ok_or_else(|| ResolveError::UnknownReference(name.to_string()))
}

/// Where a reference appears in the graph. Files are only accepted where
/// they can act as a byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Action,
    PipeFrom,
    PipeTo,
    ConcatenatePart,
}

impl Position {
    fn describe(self) -> &'static str {
        match self {
            Position::Action => "an action",
            Position::PipeFrom => "the producer side of a pipe",
            Position::PipeTo => "the consumer side of a pipe",
            Position::ConcatenatePart => "a concatenate part",
        }
    }
}

/// Walks the whole reference graph rooted at `name` before anything is
/// spawned: unresolved names, files outside a producer position and
/// reference cycles are all rejected here, so execution never starts a
/// process it would have to abandon.
pub fn validate(store: &FlowStore, name: &str) -> Result<(), ResolveError> {
    let mut trail = Vec::new();
    let mut checked = AHashSet::new();
    walk(store, name, Position::Action, &mut trail, &mut checked)
}

fn walk(
    store: &FlowStore,
    name: &str,
    position: Position,
    trail: &mut Vec<(&'static str, String)>,
    checked: &mut AHashSet<(&'static str, String)>,
) -> Result<(), ResolveError> {
    let resolved = resolve_action(store, name)?;
    match resolved {
        Resolved::Node(_) => Ok(()),
        Resolved::File(_) => match position {
            Position::Action | Position::PipeFrom => Ok(()),
            Position::PipeTo | Position::ConcatenatePart => Err(ResolveError::KindMismatch {
                name: name.to_string(),
                position: position.describe(),
            }),
        },
        Resolved::Pipe(pipe) => {
            let key = (resolved.kind(), name.to_string());
            if checked.contains(&key) {
                return Ok(());
            }
            enter(trail, &key, name)?;
            walk(store, &pipe.from, Position::PipeFrom, trail, checked)?;
            walk(store, &pipe.to, Position::PipeTo, trail, checked)?;
            trail.pop();
            checked.insert(key);
            Ok(())
        }
        Resolved::Concatenate(concatenate) => {
            let key = (resolved.kind(), name.to_string());
            if checked.contains(&key) {
                return Ok(());
            }
            enter(trail, &key, name)?;
            for part in &concatenate.parts {
                walk(store, part, Position::ConcatenatePart, trail, checked)?;
            }
            trail.pop();
            checked.insert(key);
            Ok(())
        }
    }
}

/// Pushes a compound entity onto the active reference trail, failing if
/// it is already there. The trail is keyed by kind as well as name: a
/// pipe may legitimately reference a node that shares its name.
fn enter(
    trail: &mut Vec<(&'static str, String)>,
    key: &(&'static str, String),
    name: &str,
) -> Result<(), ResolveError> {
    if trail.contains(key) {
        let path = trail
            .iter()
            .map(|(_, entry)| entry.as_str())
            .chain(std::iter::once(name))
            .join(" -> ");
        return Err(ResolveError::Cycle { path });
    }
    trail.push(key.clone());
    Ok(())
}
