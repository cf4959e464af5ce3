//! # Path Resolver
//!
//! Parses path strings such as `items[0].title` or `user["first name"]`
//! into components, reads them out of a [`Context`] and writes through them.
//!
//! Grammar: `base(.key|[index])*`. `base` and dotted keys run until the next
//! `.` or `[`. A bracketed segment of decimal digits is an index; anything
//! else is a dynamic key (surrounding quotes are stripped).
//!
//! Reads never fail: any miss along the chain yields `Node::Null`.
//! Writes rebuild the base variable and store it back with a single `set`.

use crate::context::Context;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tessera_common::{Node, NodeMap};
use thiserror::Error;

/// Writes may pad sequences with nulls up to this index, no further
const MAX_WRITE_INDEX: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathComponent {
    /// Base name or dotted key
    Key(String),
    /// Bracketed decimal integer
    Index(usize),
    /// Bracketed non-integer key
    DynamicKey(String),
}

impl PathComponent {
    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathComponent::Key(key) | PathComponent::DynamicKey(key) => Some(key),
            PathComponent::Index(_) => None,
        }
    }
}

impl std::fmt::Display for PathComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathComponent::Key(key) => write!(f, "{}", key),
            PathComponent::Index(index) => write!(f, "[{}]", index),
            PathComponent::DynamicKey(key) => write!(f, "[{:?}]", key),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("Path is empty")]
    Empty,

    #[error("Path '{path}' ends with a dot")]
    TrailingDot { path: String },

    #[error("Empty key in path '{path}' at offset {offset}")]
    EmptyKey { path: String, offset: usize },

    #[error("Empty brackets in path '{path}' at offset {offset}")]
    EmptyBracket { path: String, offset: usize },

    #[error("Unterminated bracket in path '{path}' at offset {offset}")]
    UnterminatedBracket { path: String, offset: usize },

    #[error("Unexpected character '{ch}' in path '{path}' at offset {offset}")]
    UnexpectedCharacter {
        path: String,
        ch: char,
        offset: usize,
    },

    #[error("Index {index} exceeds the write limit of {limit}")]
    IndexTooLarge { index: usize, limit: usize },
}

pub type PathResult<T> = Result<T, PathError>;

/// Parse a path string into components
pub fn parse_components(path: &str) -> PathResult<Vec<PathComponent>> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let chars: Vec<(usize, char)> = path.char_indices().collect();
    let mut components = Vec::new();
    let mut pos = 0;

    let (base, next) = read_key(path, &chars, pos)?;
    if base.is_empty() {
        return Err(PathError::EmptyKey {
            path: path.to_string(),
            offset: 0,
        });
    }
    components.push(PathComponent::Key(base));
    pos = next;

    while pos < chars.len() {
        let (offset, ch) = chars[pos];
        match ch {
            '.' => {
                let (key, next) = read_key(path, &chars, pos + 1)?;
                if key.is_empty() {
                    return Err(if next >= chars.len() {
                        PathError::TrailingDot {
                            path: path.to_string(),
                        }
                    } else {
                        PathError::EmptyKey {
                            path: path.to_string(),
                            offset,
                        }
                    });
                }
                components.push(PathComponent::Key(key));
                pos = next;
            }
            '[' => {
                let close = chars[pos + 1..]
                    .iter()
                    .position(|(_, c)| *c == ']')
                    .map(|i| pos + 1 + i)
                    .ok_or_else(|| PathError::UnterminatedBracket {
                        path: path.to_string(),
                        offset,
                    })?;
                let inner: String = chars[pos + 1..close].iter().map(|(_, c)| c).collect();
                if inner.is_empty() {
                    return Err(PathError::EmptyBracket {
                        path: path.to_string(),
                        offset,
                    });
                }
                components.push(bracket_component(inner));
                pos = close + 1;

                if let Some(&(offset, ch)) = chars.get(pos) {
                    if ch != '.' && ch != '[' {
                        return Err(PathError::UnexpectedCharacter {
                            path: path.to_string(),
                            ch,
                            offset,
                        });
                    }
                }
            }
            other => {
                return Err(PathError::UnexpectedCharacter {
                    path: path.to_string(),
                    ch: other,
                    offset,
                })
            }
        }
    }

    Ok(components)
}

/// Read a key token starting at `pos`; returns the key and the position of
/// the delimiter that ended it.
fn read_key(path: &str, chars: &[(usize, char)], mut pos: usize) -> PathResult<(String, usize)> {
    let mut key = String::new();
    while let Some(&(offset, ch)) = chars.get(pos) {
        match ch {
            '.' | '[' => break,
            ']' => {
                return Err(PathError::UnexpectedCharacter {
                    path: path.to_string(),
                    ch,
                    offset,
                })
            }
            _ => key.push(ch),
        }
        pos += 1;
    }
    Ok((key, pos))
}

fn bracket_component(inner: String) -> PathComponent {
    if inner.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(index) = inner.parse::<usize>() {
            return PathComponent::Index(index);
        }
    }

    let unquoted = ['"', '\'']
        .iter()
        .find_map(|quote| {
            inner
                .strip_prefix(*quote)
                .and_then(|rest| rest.strip_suffix(*quote))
        })
        .map(str::to_string);
    PathComponent::DynamicKey(unquoted.unwrap_or(inner))
}

/// Memoizes parsed paths by their literal string
#[derive(Debug, Default)]
pub struct PathCache {
    entries: RefCell<HashMap<String, Rc<[PathComponent]>>>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse through the cache. Failures are not cached.
    pub fn parse(&self, path: &str) -> PathResult<Rc<[PathComponent]>> {
        if let Some(components) = self.entries.borrow().get(path) {
            return Ok(Rc::clone(components));
        }

        let components: Rc<[PathComponent]> = parse_components(path)?.into();
        self.entries
            .borrow_mut()
            .insert(path.to_string(), Rc::clone(&components));
        Ok(components)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

/// Read the value addressed by `components` from `context`
pub fn resolve_components(context: &Context, components: &[PathComponent]) -> Node {
    let Some((base, rest)) = components.split_first() else {
        return Node::Null;
    };
    let Some(base) = base.as_key() else {
        return Node::Null;
    };

    context.with_value(base, |value| {
        value
            .and_then(|value| walk(value, rest))
            .cloned()
            .unwrap_or(Node::Null)
    })
}

/// Walk `components` below `node`
pub fn walk<'a>(node: &'a Node, components: &[PathComponent]) -> Option<&'a Node> {
    let mut current = node;
    for component in components {
        current = match (component, current) {
            (_, Node::Null) => return None,
            (PathComponent::Index(index), Node::Sequence(items)) => items.get(*index)?,
            (PathComponent::Key(key) | PathComponent::DynamicKey(key), Node::Mapping(map)) => {
                map.get(key)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at `components` inside `context`.
///
/// A single component writes the variable directly. Deeper paths rebuild the
/// base variable (initializing it when unset) and store it with one `set`.
/// Any node in the way that is not the container a component needs is
/// replaced by an empty one. On failure the context is left untouched.
pub fn write_components(
    context: &Context,
    components: &[PathComponent],
    value: Node,
) -> PathResult<()> {
    let Some((base, rest)) = components.split_first() else {
        return Err(PathError::Empty);
    };
    let Some(base) = base.as_key() else {
        return Err(PathError::Empty);
    };

    if rest.is_empty() {
        context.set(base, value);
        return Ok(());
    }

    let current = match context.get(base) {
        Some(Node::Null) | None => seed_for(rest),
        Some(existing) => existing,
    };
    let updated = modify_value_at_path(current, rest, value)?;
    context.set(base, updated);
    Ok(())
}

/// Return `node` with `value` written at `components`
pub fn modify_value_at_path(
    node: Node,
    components: &[PathComponent],
    value: Node,
) -> PathResult<Node> {
    let Some((head, tail)) = components.split_first() else {
        return Ok(value);
    };

    match head {
        PathComponent::Key(key) | PathComponent::DynamicKey(key) => {
            let mut map = match node {
                Node::Mapping(map) => map,
                _ => NodeMap::new(),
            };

            let slot = map.entry(key.clone()).or_insert(Node::Null);
            let child = match std::mem::take(slot) {
                Node::Null => seed_for(tail),
                existing => existing,
            };
            *slot = modify_value_at_path(child, tail, value)?;
            Ok(Node::Mapping(map))
        }
        PathComponent::Index(index) => {
            let index = *index;
            if index > MAX_WRITE_INDEX {
                return Err(PathError::IndexTooLarge {
                    index,
                    limit: MAX_WRITE_INDEX,
                });
            }

            let mut items = match node {
                Node::Sequence(items) => items,
                _ => Vec::new(),
            };

            if items.len() <= index {
                items.resize(index + 1, Node::Null);
            }
            let child = match std::mem::take(&mut items[index]) {
                Node::Null => seed_for(tail),
                existing => existing,
            };
            items[index] = modify_value_at_path(child, tail, value)?;
            Ok(Node::Sequence(items))
        }
    }
}

/// Empty container matching the kind of the next component
fn seed_for(next: &[PathComponent]) -> Node {
    match next.first() {
        Some(PathComponent::Index(_)) => Node::Sequence(Vec::new()),
        Some(_) => Node::Mapping(NodeMap::new()),
        None => Node::Null,
    }
}
