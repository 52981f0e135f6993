use serde_json::Value;
use tracing::{instrument, trace};

use crate::path::{Path, Segment};

/// Converts a JSON pointer (`/runtime/ports/0`) into a [`Path`].
///
/// Pointer tokens carry no type, so the instance the pointer was produced from is
/// walked alongside it: a token addressing an array becomes an index, anything
/// else stays a key. Past the end of the instance (missing key, index out of
/// bounds) the last container seen decides.
#[instrument(skip(instance), fields(pointer = json_pointer))]
pub fn into_path(json_pointer: &str, instance: &Value) -> Path {
    let Some(tokens) = json_pointer.strip_prefix('/') else {
        trace!("Pointer addresses the document root");
        return Path::root();
    };

    let mut current = Some(instance);
    let mut inside_array = false;
    let mut path = Path::root();

    for token in tokens.split('/').map(unescape) {
        if let Some(value) = current {
            inside_array = value.is_array();
        }

        let segment = match token.parse::<usize>() {
            Ok(index) if inside_array => Segment::Index(index),
            _ => Segment::Key(token),
        };

        current = current.and_then(|value| match (&segment, value) {
            (Segment::Index(index), Value::Array(items)) => items.get(*index),
            (Segment::Key(key), Value::Object(map)) => map.get(key),
            _ => None,
        });

        trace!(segment = %segment, resolved = current.is_some(), "Processed pointer token");
        path.push(segment);
    }

    path
}

/// Decodes `~1` and `~0`, in that order
fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}
