//! Relationship traversal.
//!
//! An expand path is a list of field names walked from a start Pod. Each
//! relationship field along the path is emitted and becomes the hop to the
//! next Pod.

use crate::catalog::Field;
use crate::error::Error;
use crate::pod::{ParentRef, Pod, PodInput};
use crate::store::ObjectStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// What to do with a step that cannot be followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalMode {
    /// Skip the step and keep walking from the current Pod.
    #[default]
    Lenient,
    /// Fail with the reason the step could not be followed.
    Strict,
}

/// A traversal request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TraverseParams {
    /// Start Pod name.
    pub pod: String,
    /// Field names to follow, in order.
    #[serde(default)]
    pub expand: Vec<String>,
    #[serde(default)]
    pub mode: TraversalMode,
}

impl TraverseParams {
    /// A lenient request.
    pub fn new<I, T>(pod: impl Into<String>, expand: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            pod: pod.into(),
            expand: expand.into_iter().map(Into::into).collect(),
            mode: TraversalMode::Lenient,
        }
    }

    /// Switch to strict mode.
    pub fn strict(mut self) -> Self {
        self.mode = TraversalMode::Strict;
        self
    }
}

/// Walks expand paths, memoizing the Pods it loads.
pub struct Traversal<'s, S: ObjectStore + ?Sized> {
    store: &'s S,
    pods: HashMap<String, Option<Pod<'s, S>>>,
}

impl<'s, S: ObjectStore + ?Sized> Traversal<'s, S> {
    /// Create a traversal over `store`.
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            pods: HashMap::new(),
        }
    }

    /// Follow `params.expand` from `params.pod`.
    ///
    /// Returns one field per step that is a relationship, in path order.
    /// Repeated names are followed again.
    pub fn traverse(&mut self, params: &TraverseParams) -> Result<Vec<Field>, Error> {
        let strict = params.mode == TraversalMode::Strict;
        let mut current = params.pod.clone();
        let mut path = Vec::with_capacity(params.expand.len());

        for name in &params.expand {
            let Some(pod) = self.pod(&current)? else {
                if strict {
                    return Err(Error::PodNotFound(current));
                }
                debug!(pod = %current, field = %name, "skipping step on unresolved pod");
                continue;
            };

            match pod.field(name)? {
                Some(field) if field.is_relationship() => {
                    if let Some(target) = field.pick.as_ref().map(|p| p.target_pod()) {
                        current = target.to_string();
                    }
                    path.push(field);
                }
                Some(_) if strict => {
                    return Err(Error::NotRelationship {
                        pod: current,
                        field: name.clone(),
                    });
                }
                None if strict => {
                    return Err(Error::UnknownField {
                        pod: current,
                        field: name.clone(),
                    });
                }
                _ => debug!(pod = %current, field = %name, "skipping non-relationship step"),
            }
        }

        Ok(path)
    }

    fn pod(&mut self, name: &str) -> Result<Option<&mut Pod<'s, S>>, Error> {
        if !self.pods.contains_key(name) {
            let mut pod = Pod::new(self.store);
            let found = pod.init(PodInput::from(name), 0, ParentRef::None)?.is_some();
            self.pods.insert(name.to_string(), found.then_some(pod));
        }
        Ok(self.pods.get_mut(name).and_then(Option::as_mut))
    }
}

/// Run a single traversal with a fresh Pod memo.
pub fn traverse<S: ObjectStore + ?Sized>(
    store: &S,
    params: &TraverseParams,
) -> Result<Vec<Field>, Error> {
    Traversal::new(store).traverse(params)
}
