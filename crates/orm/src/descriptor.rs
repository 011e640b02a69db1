//! Static shape of mapped types.
//!
//! A [`TypeDescriptor`] lists the members of a [`Poco`] and, for related
//! objects, how to reach the nested descriptor. Descriptors are built once per
//! type from [`Poco::members`] and shared through a process-wide registry.

use std::any::TypeId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use crate::error::Error;
use crate::poco::{MemberSpec, Poco};

static REGISTRY: LazyLock<DashMap<TypeId, Arc<TypeDescriptor>>> = LazyLock::new(DashMap::new);

/// Resolves the descriptor of a related type.
pub type Describe = fn() -> Result<Arc<TypeDescriptor>, Error>;

/// How a member receives column values.
#[derive(Debug, Clone, Copy)]
pub enum MemberKind {
    /// A scalar member assigned directly from one column.
    Value,
    /// A related object populated from prefixed or inferred columns.
    Reference(Describe),
}

/// A member of a mapped type.
#[derive(Debug, Clone)]
pub struct Member {
    /// Declared member name.
    pub name: &'static str,
    /// Position of the member in declaration order. Used as the path step.
    pub index: usize,
    /// Value or related object.
    pub kind: MemberKind,
    /// Read-only members are never bound.
    pub writable: bool,
}

impl Member {
    /// Returns `true` for a writable scalar member.
    #[must_use]
    pub const fn is_bindable_value(&self) -> bool {
        self.writable && matches!(self.kind, MemberKind::Value)
    }
}

/// Shape of one mapped type.
#[derive(Debug)]
pub struct TypeDescriptor {
    type_name: &'static str,
    members: Vec<Member>,
    by_key: HashMap<String, usize>,
}

impl TypeDescriptor {
    /// Builds a descriptor from member specifications.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateMember`] when two members normalise to the
    /// same column name.
    pub fn build(type_name: &'static str, specs: Vec<MemberSpec>) -> Result<Self, Error> {
        let type_name = short_type_name(type_name);
        let mut members = Vec::with_capacity(specs.len());
        let mut by_key = HashMap::with_capacity(specs.len());

        for (index, spec) in specs.into_iter().enumerate() {
            match by_key.entry(normalize(spec.name)) {
                Entry::Occupied(existing) => {
                    let first: &Member = &members[*existing.get()];
                    return Err(Error::DuplicateMember {
                        type_name,
                        first: first.name,
                        second: spec.name,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(index);
                }
            }
            members.push(Member {
                name: spec.name,
                index,
                kind: spec.kind,
                writable: spec.writable,
            });
        }

        Ok(Self {
            type_name,
            members,
            by_key,
        })
    }

    /// Name of the described type, without its module path.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// All members in declaration order.
    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Looks a member up by column name, ignoring case and underscores.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.by_key.get(&normalize(name)).map(|&index| &self.members[index])
    }

    /// Related-object members in declaration order.
    pub fn references(&self) -> impl Iterator<Item = (&Member, Describe)> {
        self.members.iter().filter_map(|member| match member.kind {
            MemberKind::Reference(describe) => Some((member, describe)),
            MemberKind::Value => None,
        })
    }
}

/// Returns the shared descriptor for `T`, building it on first use.
///
/// Concurrent first use may build the descriptor more than once; the first
/// stored copy wins and every caller receives an equivalent value.
///
/// # Errors
///
/// Returns an error if the declared members of `T` are inconsistent.
pub fn descriptor_of<T: Poco>() -> Result<Arc<TypeDescriptor>, Error> {
    let type_id = TypeId::of::<T>();
    if let Some(existing) = REGISTRY.get(&type_id) {
        return Ok(Arc::clone(existing.value()));
    }

    let built = Arc::new(TypeDescriptor::build(std::any::type_name::<T>(), T::members())?);
    tracing::trace!(type_name = built.type_name(), members = built.members().len(), "registered type");

    Ok(Arc::clone(REGISTRY.entry(type_id).or_insert(built).value()))
}

/// Canonical form used to compare column labels with member names:
/// ASCII-lowercase with underscores removed, so `UserId`, `userid` and
/// `user_id` are the same member.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.chars().filter(|ch| *ch != '_').map(|ch| ch.to_ascii_lowercase()).collect()
}

fn short_type_name(full: &'static str) -> &'static str {
    // generic arguments may contain `::`, so only split the leading path
    let head = full.find('<').unwrap_or(full.len());
    full[..head].rfind("::").map_or(full, |pos| &full[pos + 2..])
}
