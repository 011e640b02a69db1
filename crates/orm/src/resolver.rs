//! Column path resolution.
//!
//! Turns the ordered column labels of a result set into a [`Plan`]: one
//! [`Binding`] per column that reaches a member of the target type graph.
//!
//! - `Rel__Leaf` labels descend through related objects segment by segment.
//! - Bare labels bind to the root first, then to the single related object
//!   that can still take them. Once the root member is claimed, a repeated
//!   label (as produced by joins) moves on to a related object.
//! - Labels that reach nothing are ignored, so partial projections work.

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::{Member, MemberKind, TypeDescriptor};
use crate::error::Error;

/// A resolved column: where it sits in the row and which member path it
/// feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Position of the column in the row.
    pub column: usize,
    /// Column label.
    pub name: String,
    /// Member indices from the root: related objects first, the scalar leaf
    /// last.
    pub path: Vec<usize>,
}

/// Resolved bindings for one target type and one result-set shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    bindings: Vec<Binding>,
    ignored: Vec<String>,
}

impl Plan {
    /// Bindings in column order.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Labels of columns that reach no member.
    #[must_use]
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }
}

struct Resolved {
    path: Vec<usize>,
    owner: &'static str,
    member: &'static str,
}

impl Resolved {
    fn new(path: Vec<usize>, owner: &TypeDescriptor, member: &Member) -> Self {
        Self {
            path,
            owner: owner.type_name(),
            member: member.name,
        }
    }
}

/// Resolve `columns` against `root`, splitting prefixed labels on `separator`.
///
/// # Errors
///
/// Returns [`Error::AmbiguousColumn`], [`Error::UnresolvablePath`] or
/// [`Error::DuplicateBinding`] before any row is materialized.
pub fn resolve(
    root: &Arc<TypeDescriptor>, columns: &[&str], separator: &str,
) -> Result<Plan, Error> {
    let mut claimed: HashMap<Vec<usize>, usize> = HashMap::new();
    let mut plan = Plan::default();

    for (position, &column) in columns.iter().enumerate() {
        let resolved = if !separator.is_empty() && column.contains(separator) {
            resolve_prefixed(root, column, separator)?
        } else {
            resolve_bare(root, column, &claimed)?
        };

        let Some(resolved) = resolved else {
            plan.ignored.push(column.to_string());
            continue;
        };

        if let Some(&first) = claimed.get(&resolved.path) {
            return Err(Error::DuplicateBinding {
                first: columns[first].to_string(),
                second: column.to_string(),
                type_name: resolved.owner,
                member: resolved.member,
            });
        }

        claimed.insert(resolved.path.clone(), position);
        plan.bindings.push(Binding {
            column: position,
            name: column.to_string(),
            path: resolved.path,
        });
    }

    tracing::debug!(
        type_name = root.type_name(),
        bound = plan.bindings.len(),
        ignored = ?plan.ignored,
        "resolved column plan"
    );

    Ok(plan)
}

fn resolve_prefixed(
    root: &Arc<TypeDescriptor>, column: &str, separator: &str,
) -> Result<Option<Resolved>, Error> {
    let mut segments: Vec<&str> = column.split(separator).collect();
    let leaf = segments.pop().unwrap_or_default();

    let mut current = Arc::clone(root);
    let mut path = Vec::with_capacity(segments.len() + 1);

    for (depth, segment) in segments.iter().enumerate() {
        let unresolvable = || Error::UnresolvablePath {
            column: column.to_string(),
            segment: (*segment).to_string(),
            type_name: current.type_name(),
        };

        let Some(member) = current.member(segment) else {
            // no partial match at all: an extra column, not a broken path
            if depth == 0 {
                return Ok(None);
            }
            return Err(unresolvable());
        };
        let MemberKind::Reference(describe) = member.kind else {
            return Err(unresolvable());
        };

        path.push(member.index);
        current = describe()?;
    }

    let Some(member) = current.member(leaf).filter(|m| matches!(m.kind, MemberKind::Value)) else {
        return Err(Error::UnresolvablePath {
            column: column.to_string(),
            segment: leaf.to_string(),
            type_name: current.type_name(),
        });
    };
    if !member.writable {
        return Ok(None);
    }

    path.push(member.index);
    Ok(Some(Resolved::new(path, &current, member)))
}

fn resolve_bare(
    root: &Arc<TypeDescriptor>, column: &str, claimed: &HashMap<Vec<usize>, usize>,
) -> Result<Option<Resolved>, Error> {
    let direct = root.member(column).filter(|m| matches!(m.kind, MemberKind::Value));

    if let Some(member) = direct {
        if !member.writable {
            return Ok(None);
        }
        if !claimed.contains_key(&vec![member.index]) {
            return Ok(Some(Resolved::new(vec![member.index], root, member)));
        }
    }

    let mut candidates = Vec::new();
    for (reference, describe) in root.references() {
        let related = describe()?;
        let Some(member) = related.member(column) else {
            continue;
        };
        if !member.is_bindable_value() {
            continue;
        }
        let path = vec![reference.index, member.index];
        if !claimed.contains_key(&path) {
            candidates.push((reference.name, Resolved::new(path, &related, member)));
        }
    }

    match candidates.len() {
        // a claimed root member reports the collision in `resolve`
        0 => Ok(direct.map(|member| Resolved::new(vec![member.index], root, member))),
        1 => Ok(candidates.pop().map(|(_, resolved)| resolved)),
        _ => Err(Error::AmbiguousColumn {
            column: column.to_string(),
            candidates: candidates.into_iter().map(|(name, _)| name.to_string()).collect(),
        }),
    }
}
