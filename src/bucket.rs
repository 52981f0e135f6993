use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::path::Path;

/// One failure reported by the schema validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: Path,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: Path, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

/// Issues grouped by path.
///
/// Paths keep the order they were first seen in, and messages keep the order
/// they were reported in. Every path holds at least one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueBuckets {
    groups: Vec<(Path, Vec<String>)>,
    index: HashMap<Path, usize>,
}

impl IssueBuckets {
    fn insert(&mut self, issue: ValidationIssue) {
        match self.index.get(&issue.path) {
            Some(&position) => self.groups[position].1.push(issue.message),
            None => {
                self.index.insert(issue.path.clone(), self.groups.len());
                self.groups.push((issue.path, vec![issue.message]));
            }
        }
    }

    /// Distinct paths in first-seen order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.groups.iter().map(|(path, _)| path)
    }

    pub fn messages(&self, path: &Path) -> Option<&[String]> {
        self.index
            .get(path)
            .map(|&position| self.groups[position].1.as_slice())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub(crate) fn into_groups(self) -> Vec<(Path, Vec<String>)> {
        self.groups
    }
}

/// Groups issues by path. Duplicate messages are kept.
#[instrument(skip_all)]
pub fn bucket<I>(issues: I) -> IssueBuckets
where
    I: IntoIterator<Item = ValidationIssue>,
{
    let mut buckets = IssueBuckets::default();
    let mut issue_count = 0usize;

    for issue in issues {
        issue_count += 1;
        buckets.insert(issue);
    }

    debug!(
        issue_count,
        path_count = buckets.len(),
        "Bucketed validation issues by path"
    );

    buckets
}
