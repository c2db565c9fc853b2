//! Path addressing into a JSON record value.
//!
//! Segments are separated by `.` or `/`; `[n]` and all-digit segments index
//! arrays. `pets[0].name`, `pets.0.name` and `pets/0/name` are equivalent.

use crate::error::OperationalError;
use serde_json::{Map, Value};

/// How far past its current end a single write may grow an array.
pub const MAX_ARRAY_GROWTH: usize = 4096;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Key(String),
    Index(usize),
}

impl Token {
    fn key(&self) -> String {
        match self {
            Token::Key(key) => key.clone(),
            Token::Index(index) => index.to_string(),
        }
    }

    fn empty_container(&self) -> Value {
        match self {
            Token::Key(_) => Value::Object(Map::new()),
            Token::Index(_) => Value::Array(Vec::new()),
        }
    }
}

fn tokenize(path: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for segment in path.split(|c| c == '.' || c == '/') {
        let mut rest = segment;
        while !rest.is_empty() {
            let (head, tail) = match rest.find('[') {
                Some(0) => match rest.find(']') {
                    Some(close) => (&rest[1..close], &rest[close + 1..]),
                    None => (&rest[1..], ""),
                },
                Some(open) => (&rest[..open], &rest[open..]),
                None => (rest, ""),
            };
            if !head.is_empty() {
                tokens.push(match head.parse::<usize>() {
                    Ok(index) => Token::Index(index),
                    Err(_) => Token::Key(head.to_string()),
                });
            }
            rest = tail;
        }
    }
    tokens
}

/// True if `path` names at least one segment. Paths made only of
/// separators or empty brackets (`"."`, `"/"`, `"[]"`) do not.
pub fn has_segments(path: &str) -> bool {
    !tokenize(path).is_empty()
}

/// Look up the value at `path`.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    tokenize(path)
        .iter()
        .try_fold(root, |current, token| get_child(current, token))
}

/// Write `value` at `path`, creating intermediate containers. `None`
/// erases: object keys are removed, array slots become `null`.
///
/// A rejected write may leave intermediate containers behind; callers
/// restore the previous value on error.
pub fn set(root: &mut Value, path: &str, value: Option<Value>) -> Result<(), OperationalError> {
    let tokens = tokenize(path);
    let Some((last, parents)) = tokens.split_last() else {
        return match value {
            Some(value @ (Value::Object(_) | Value::Array(_))) => {
                *root = value;
                Ok(())
            }
            Some(_) => Err(OperationalError::WriteRejected(format!(
                "path {path:?} has no segments and the record root must stay an object or array"
            ))),
            None => Ok(()),
        };
    };

    let mut current = root;
    for (position, token) in parents.iter().enumerate() {
        if value.is_none() && get_child(current, token).is_none() {
            return Ok(());
        }
        let next = &tokens[position + 1];
        current = child_mut(current, token, next)?;
    }

    match value {
        Some(value) => *slot_mut(current, last)? = value,
        None => erase(current, last),
    }
    Ok(())
}

fn get_child<'a>(current: &'a Value, token: &Token) -> Option<&'a Value> {
    match (token, current) {
        (Token::Index(index), Value::Array(items)) => items.get(*index),
        (token, Value::Object(map)) => map.get(&token.key()),
        _ => None,
    }
}

/// Descend into `token`, making sure the child is a container suitable
/// for `next`.
fn child_mut<'a>(
    current: &'a mut Value,
    token: &Token,
    next: &Token,
) -> Result<&'a mut Value, OperationalError> {
    let child = slot_mut(current, token)?;
    let fits = matches!(
        (next, &*child),
        (_, Value::Object(_)) | (Token::Index(_), Value::Array(_))
    );
    if !fits {
        *child = next.empty_container();
    }
    Ok(child)
}

/// Mutable slot for `token`, coercing `current` into the right container.
fn slot_mut<'a>(current: &'a mut Value, token: &Token) -> Result<&'a mut Value, OperationalError> {
    match (token, current) {
        (Token::Index(index), Value::Array(items)) => {
            let index = *index;
            if index >= items.len() {
                let growth = index - items.len();
                if growth >= MAX_ARRAY_GROWTH {
                    return Err(OperationalError::WriteRejected(format!(
                        "index {index} is too far past the end of an array of length {}",
                        items.len()
                    )));
                }
                items.resize(index + 1, Value::Null);
            }
            Ok(&mut items[index])
        }
        (token, Value::Object(map)) => Ok(map.entry(token.key()).or_insert(Value::Null)),
        (token, current) => {
            *current = token.empty_container();
            slot_mut(current, token)
        }
    }
}

fn erase(current: &mut Value, token: &Token) {
    match (token, current) {
        (token, Value::Object(map)) => {
            map.remove(&token.key());
        }
        (Token::Index(index), Value::Array(items)) => {
            if let Some(item) = items.get_mut(*index) {
                *item = Value::Null;
            }
        }
        _ => {}
    }
}
