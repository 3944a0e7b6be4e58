use crate::keys::Key;
use std::collections::BTreeSet;

/// Normalizes a raw key list into the working set presented to the mapper
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Drop entries that are empty after trimming
/// 3. Remove duplicates by exact (case-sensitive) string equality
/// 4. Sort lexicographically
///
/// The result is the same for any permutation of the input, so runs over the
/// same key file always dispatch keys in the same order.
///
/// # Examples
///
/// ```
/// use weather_harvest::keys::normalize_keys;
///
/// let keys = normalize_keys(["Beta", " Alpha", "alpha ", "Alpha", ""]);
/// let names: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
/// assert_eq!(names, vec!["Alpha", "Beta", "alpha"]);
/// ```
pub fn normalize_keys<I, S>(raw: I) -> Vec<Key>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|s| Key::new(s.as_ref()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
