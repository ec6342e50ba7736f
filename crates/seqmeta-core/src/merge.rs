//! RFC 7396 JSON Merge Patch.
//!
//! # Merge Rules
//!
//! | Patch | Target | Result |
//! |-------|--------|--------|
//! | not an object | anything | the patch, verbatim |
//! | object | object | target with each patch member merged in |
//! | object | not an object | `{}` with each patch member merged in |
//!
//! Within an object patch, a `null` member deletes the key and any other
//! member is merged recursively against the target's value for that key
//! (or against nothing, when the key is absent). Arrays are opaque: they
//! replace, never merge element-wise.
//!
//! Keys are merged independently of each other, so the iteration order of
//! the patch never affects the result.

use crate::value::{JsonValue, Map};

/// Apply `patch` to `target`, producing a new document.
///
/// Neither input is modified. The function is total: every pair of values
/// has a defined result.
#[must_use]
pub fn merge(target: &JsonValue, patch: &JsonValue) -> JsonValue {
    if !patch.is_object() {
        return patch.clone();
    }
    merge_owned(target.clone(), patch)
}

/// Apply `patch` to an owned `target`.
///
/// Same rules as [`merge`]; members the patch does not touch are moved into
/// the result rather than cloned.
#[must_use]
pub fn merge_owned(target: JsonValue, patch: &JsonValue) -> JsonValue {
    let JsonValue::Object(patch_entries) = patch else {
        return patch.clone();
    };

    let mut result = match target {
        JsonValue::Object(entries) => entries,
        _ => Map::new(),
    };
    merge_entries(&mut result, patch_entries);
    JsonValue::Object(result)
}

fn merge_entries(result: &mut Map, patch_entries: &Map) {
    for (key, patch_value) in patch_entries {
        if patch_value.is_null() {
            result.remove(key);
            continue;
        }
        // An absent key merges against `null`, which rule 2a turns into `{}`
        // when the patch value is an object.
        let existing = result.remove(key).unwrap_or(JsonValue::Null);
        result.insert(key.clone(), merge_owned(existing, patch_value));
    }
}

/// Apply each patch in turn.
#[must_use]
pub fn merge_all<'a, I>(target: JsonValue, patches: I) -> JsonValue
where
    I: IntoIterator<Item = &'a JsonValue>,
{
    patches.into_iter().fold(target, merge_owned)
}

/// Whether applying `patch` leaves `target` structurally unchanged.
#[must_use]
pub fn is_noop(target: &JsonValue, patch: &JsonValue) -> bool {
    match (target, patch) {
        (JsonValue::Object(entries), JsonValue::Object(patch_entries)) => {
            patch_entries
                .iter()
                .all(|(key, patch_value)| match (entries.get(key), patch_value) {
                    (None, JsonValue::Null) => true,
                    (None, _) | (Some(_), JsonValue::Null) => false,
                    (Some(existing), _) => is_noop(existing, patch_value),
                })
        }
        (_, JsonValue::Object(_)) => false,
        _ => target == patch,
    }
}

/// Derive a merge patch that turns `source` into `target`.
///
/// Unchanged members are omitted and removed members map to `null`. The
/// result satisfies `merge(source, diff(source, target)) == target` as long
/// as `target` holds no `null`-valued object members, which a merge patch
/// has no way to express.
#[must_use]
pub fn diff(source: &JsonValue, target: &JsonValue) -> JsonValue {
    let (JsonValue::Object(from), JsonValue::Object(to)) = (source, target) else {
        return target.clone();
    };

    let mut patch = Map::new();
    for key in from.keys().filter(|key| !to.contains_key(*key)) {
        patch.insert(key.clone(), JsonValue::Null);
    }
    for (key, value) in to {
        match from.get(key) {
            Some(existing) if existing == value => {}
            Some(existing) => {
                patch.insert(key.clone(), diff(existing, value));
            }
            None => {
                patch.insert(key.clone(), value.clone());
            }
        }
    }
    JsonValue::Object(patch)
}
