use std::collections::HashMap;

use tracing::{debug, instrument, trace};

use crate::{bucket::IssueBuckets, diagnostic::Diagnostic, locator::SourceLiteral};

/// Pairs each bucketed path with the first literal found at that path.
///
/// Returns one diagnostic per path, in the buckets' first-seen order. Paths that
/// no literal matched (a missing key, an index out of bounds, a mismatch on a
/// whole object or array) come back without a location. The literal sequence is
/// read only until every path has matched.
#[instrument(skip_all, fields(path_count = buckets.len()))]
pub fn correlate<I>(buckets: IssueBuckets, literals: I) -> Vec<Diagnostic>
where
    I: IntoIterator<Item = SourceLiteral>,
{
    let mut open: HashMap<_, usize> = buckets
        .paths()
        .enumerate()
        .map(|(position, path)| (path.clone(), position))
        .collect();
    let mut locations: Vec<Option<SourceLiteral>> = vec![None; buckets.len()];

    for literal in literals {
        if open.is_empty() {
            break;
        }
        if let Some(position) = open.remove(&literal.path) {
            trace!(
                path = %literal.path,
                line = literal.start_line,
                column = literal.start_column,
                "Matched path to literal"
            );
            locations[position] = Some(literal);
        }
    }

    debug!(
        matched = buckets.len() - open.len(),
        unmatched = open.len(),
        "Correlated issues with source literals"
    );

    buckets
        .into_groups()
        .into_iter()
        .zip(locations)
        .map(|((path, messages), location)| Diagnostic {
            path,
            messages,
            location,
        })
        .collect()
}
