//! Immutable-field validation
//!
//! Topology types declare which of their fields are immutable by
//! implementing [`Immutable`]. [`ImmutableFieldValidator`] walks an original
//! and a candidate value in lock-step and fails on the first immutable
//! field whose value differs. Fields an implementation does not list are
//! never inspected.
//!
//! Collection entries are matched by identity (group name, node name), not
//! by index. An entry present on one side only is reported as a change of
//! its identity field.

use std::fmt::Display;

use crate::path::FieldPath;
use crate::topology::{GlobalOptions, NodeSpec, RoleGroup, Topology};

/// Placeholder value for an entity the candidate dropped
pub const REMOVED: &str = "<removed>";

/// Placeholder value for an entity the original did not have
pub const ABSENT: &str = "<absent>";

const UNSET: &str = "<unset>";

/// Attempted change of an immutable field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("immutable field changed: {path} ({old} -> {new})")]
pub struct ImmutableFieldViolation {
    /// Location of the field
    pub path: FieldPath,
    /// Value in the original topology
    pub old: String,
    /// Value in the candidate topology
    pub new: String,
}

impl ImmutableFieldViolation {
    /// Create a violation
    #[must_use]
    pub fn new(path: FieldPath, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            path,
            old: old.into(),
            new: new.into(),
        }
    }
}

/// Immutability policy for a topology element
pub trait Immutable {
    /// Compare every immutable field of `self` against `candidate`
    ///
    /// # Errors
    /// Returns the first violation found below `path`.
    fn check_immutable(
        &self,
        candidate: &Self,
        path: &FieldPath,
    ) -> Result<(), ImmutableFieldViolation>;
}

/// Entry point for immutable-field checks
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmutableFieldValidator;

impl ImmutableFieldValidator {
    /// Create new validator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Fail if `candidate` changes any immutable field of `original`
    ///
    /// # Errors
    /// Returns the first [`ImmutableFieldViolation`] in walk order.
    pub fn check_diff<T: Immutable>(
        &self,
        original: &T,
        candidate: &T,
    ) -> Result<(), ImmutableFieldViolation> {
        original.check_immutable(candidate, &FieldPath::root())
    }
}

fn ensure_unchanged<V>(path: FieldPath, old: &V, new: &V) -> Result<(), ImmutableFieldViolation>
where
    V: PartialEq + Display + ?Sized,
{
    if old == new {
        Ok(())
    } else {
        Err(ImmutableFieldViolation::new(path, old.to_string(), new.to_string()))
    }
}

fn ensure_unchanged_opt(
    path: FieldPath,
    old: Option<&str>,
    new: Option<&str>,
) -> Result<(), ImmutableFieldViolation> {
    if old == new {
        Ok(())
    } else {
        Err(ImmutableFieldViolation::new(
            path,
            old.unwrap_or(UNSET),
            new.unwrap_or(UNSET),
        ))
    }
}

/// Lock-step walk over a collection keyed by an identity field
///
/// `key` extracts an entry's identity; `identity` is the name of that field,
/// reported when an entry appears on one side only.
fn check_keyed<T, K>(
    original: &[T],
    candidate: &[T],
    path: &FieldPath,
    identity: &str,
    key: K,
) -> Result<(), ImmutableFieldViolation>
where
    T: Immutable,
    K: Fn(&T) -> &str,
{
    for old in original {
        let id = key(old);
        let entry = path.child(id);
        match candidate.iter().find(|c| key(*c) == id) {
            Some(new) => old.check_immutable(new, &entry)?,
            None => {
                return Err(ImmutableFieldViolation::new(
                    entry.child(identity),
                    id,
                    REMOVED,
                ))
            }
        }
    }

    if let Some(added) = candidate
        .iter()
        .find(|c| !original.iter().any(|o| key(o) == key(*c)))
    {
        let id = key(added);
        return Err(ImmutableFieldViolation::new(
            path.child(id).child(identity),
            ABSENT,
            id,
        ));
    }

    Ok(())
}

impl Immutable for Topology {
    fn check_immutable(
        &self,
        candidate: &Self,
        path: &FieldPath,
    ) -> Result<(), ImmutableFieldViolation> {
        self.global
            .check_immutable(&candidate.global, &path.child("global"))?;
        check_keyed(
            &self.groups,
            &candidate.groups,
            &path.child("groups"),
            "name",
            |g| g.name.as_str(),
        )
    }
}

impl Immutable for GlobalOptions {
    fn check_immutable(
        &self,
        candidate: &Self,
        path: &FieldPath,
    ) -> Result<(), ImmutableFieldViolation> {
        ensure_unchanged(path.child("user"), &self.user, &candidate.user)?;
        ensure_unchanged(path.child("deploy_dir"), &self.deploy_dir, &candidate.deploy_dir)?;
        ensure_unchanged(path.child("data_dir"), &self.data_dir, &candidate.data_dir)
    }
}

impl Immutable for RoleGroup {
    fn check_immutable(
        &self,
        candidate: &Self,
        path: &FieldPath,
    ) -> Result<(), ImmutableFieldViolation> {
        ensure_unchanged(path.child("name"), &self.name, &candidate.name)?;
        check_keyed(
            &self.nodes,
            &candidate.nodes,
            &path.child("nodes"),
            "name",
            |n| n.name.as_str(),
        )
    }
}

impl Immutable for NodeSpec {
    fn check_immutable(
        &self,
        candidate: &Self,
        path: &FieldPath,
    ) -> Result<(), ImmutableFieldViolation> {
        ensure_unchanged(path.child("name"), &self.name, &candidate.name)?;
        ensure_unchanged(path.child("role"), &self.role, &candidate.role)?;
        ensure_unchanged(path.child("host"), &self.host, &candidate.host)?;
        ensure_unchanged(path.child("port"), &self.port, &candidate.port)?;
        ensure_unchanged_opt(
            path.child("deploy_dir"),
            self.deploy_dir.as_deref(),
            candidate.deploy_dir.as_deref(),
        )?;
        ensure_unchanged_opt(
            path.child("data_dir"),
            self.data_dir.as_deref(),
            candidate.data_dir.as_deref(),
        )
    }
}
