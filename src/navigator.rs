/// Generic navigation over a parsed value tree: traversal, token paths, and
/// position lookup. No schema knowledge lives here.
///
/// A `Path` token is either an object property name or the decimal form of a
/// list index; the empty path denotes the root. `build_path` and
/// `resolve_path` are inverses for every node reachable from the root.
use crate::value::{Value, ValueKind};

pub type Path = Vec<String>;

/// Depth-first pre-order traversal. `parent` is `None` only for the root
/// call; `depth` starts at 0.
pub fn walk<F>(tree: &Value, visit: &mut F)
where
    F: FnMut(&Value, Option<&Value>, usize),
{
    walk_inner(tree, None, 0, visit);
}

fn walk_inner<'a, F>(node: &'a Value, parent: Option<&'a Value>, depth: usize, visit: &mut F)
where
    F: FnMut(&Value, Option<&Value>, usize),
{
    visit(node, parent, depth);
    for child in children(node) {
        walk_inner(child, Some(node), depth + 1, visit);
    }
}

fn children(node: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match &node.kind {
        ValueKind::Object(map) => Box::new(map.values()),
        ValueKind::List(items) => Box::new(items.iter()),
        _ => Box::new(std::iter::empty()),
    }
}

/// Consume path tokens left to right. At an object a token is a property
/// name; at a list it must parse as a valid non-negative index. Any
/// mismatch yields `None`. The empty path returns the root.
pub fn resolve_path<'a>(tree: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = tree;
    for token in path {
        current = match &current.kind {
            ValueKind::Object(map) => map.get(token)?,
            ValueKind::List(items) => {
                // Only plain decimal indices: no signs, no fractions.
                if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                let index: usize = token.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Inverse of `resolve_path`. Reachability is by identity: a structurally
/// identical but distinct node is not found.
pub fn build_path(tree: &Value, target: &Value) -> Option<Path> {
    let mut path = Vec::new();
    if build_path_inner(tree, target, &mut path) {
        Some(path)
    } else {
        None
    }
}

fn build_path_inner(node: &Value, target: &Value, path: &mut Path) -> bool {
    if std::ptr::eq(node, target) {
        return true;
    }
    match &node.kind {
        ValueKind::Object(map) => {
            for (key, child) in map.entries() {
                path.push(key.clone());
                if build_path_inner(child, target, path) {
                    return true;
                }
                path.pop();
            }
        }
        ValueKind::List(items) => {
            let mut buf = itoa::Buffer::new();
            for (i, child) in items.iter().enumerate() {
                path.push(buf.format(i).to_string());
                if build_path_inner(child, target, path) {
                    return true;
                }
                path.pop();
            }
        }
        _ => {}
    }
    false
}

/// The unique immediate container of `target`; `None` for the root and for
/// nodes not in the tree.
pub fn find_parent<'a>(tree: &'a Value, target: &Value) -> Option<&'a Value> {
    for child in children(tree) {
        if std::ptr::eq(child, target) {
            return Some(tree);
        }
        if let Some(parent) = find_parent(child, target) {
            return Some(parent);
        }
    }
    None
}

/// The most specific (deepest) node whose span contains the position. When
/// sibling spans touch at the query position the later sibling wins.
pub fn find_value_at_location(tree: &Value, line: u32, column: u32) -> Option<&Value> {
    if !tree.location.contains(line, column) {
        return None;
    }
    let mut best = tree;
    loop {
        let mut next = None;
        for child in children(best) {
            if child.location.contains(line, column) {
                next = Some(child);
            }
        }
        match next {
            Some(child) => best = child,
            None => return Some(best),
        }
    }
}

pub fn find_all<'a, P>(tree: &'a Value, predicate: P) -> Vec<&'a Value>
where
    P: Fn(&Value) -> bool,
{
    let mut out = Vec::new();
    collect_matches(tree, &predicate, &mut out);
    out
}

fn collect_matches<'a, P>(node: &'a Value, predicate: &P, out: &mut Vec<&'a Value>)
where
    P: Fn(&Value) -> bool,
{
    if predicate(node) {
        out.push(node);
    }
    for child in children(node) {
        collect_matches(child, predicate, out);
    }
}

pub fn find_first<'a, P>(tree: &'a Value, predicate: P) -> Option<&'a Value>
where
    P: Fn(&Value) -> bool,
{
    find_first_inner(tree, &predicate)
}

fn find_first_inner<'a, P>(node: &'a Value, predicate: &P) -> Option<&'a Value>
where
    P: Fn(&Value) -> bool,
{
    if predicate(node) {
        return Some(node);
    }
    for child in children(node) {
        if let Some(found) = find_first_inner(child, predicate) {
            return Some(found);
        }
    }
    None
}
