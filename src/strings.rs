//! String helpers

use std::collections::HashSet;
use std::hash::Hash;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StringError {
    #[error("{needle:?} not contained in {haystack:?}")]
    NotFound { needle: String, haystack: String },

    #[error("{value:?} does not start with {prefix:?}")]
    MissingPrefix { value: String, prefix: String },
}

/// Replace the first occurrence of `old`, failing if there is none.
pub fn replace_one(s: &str, old: &str, new: &str) -> Result<String, StringError> {
    let Some(pos) = s.find(old) else {
        return Err(StringError::NotFound {
            needle: old.to_owned(),
            haystack: s.to_owned(),
        });
    };
    let mut result = String::with_capacity(s.len() - old.len() + new.len());
    result.push_str(&s[..pos]);
    result.push_str(new);
    result.push_str(&s[pos + old.len()..]);
    Ok(result)
}

/// Drop repeated items, keeping the first occurrence of each.
pub fn remove_duplicates<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Strip `prefix` from `s`. With `required`, a missing prefix is an error.
pub fn remove_prefix<'a>(s: &'a str, prefix: &str, required: bool) -> Result<&'a str, StringError> {
    match s.strip_prefix(prefix) {
        Some(rest) => Ok(rest),
        None if required => Err(StringError::MissingPrefix {
            value: s.to_owned(),
            prefix: prefix.to_owned(),
        }),
        None => Ok(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_one_only_first() {
        assert_eq!(replace_one("a-b-c", "-", "+").unwrap(), "a+b-c");
    }

    #[test]
    fn test_replace_one_missing() {
        let err = replace_one("abc", "x", "y").unwrap_err();
        assert!(matches!(err, StringError::NotFound { .. }));
    }

    #[test]
    fn test_remove_duplicates_keeps_order() {
        assert_eq!(remove_duplicates(["b", "a", "b", "c", "a"]), ["b", "a", "c"]);
    }

    #[test]
    fn test_remove_prefix() {
        assert_eq!(remove_prefix("libfoo", "lib", false).unwrap(), "foo");
        assert_eq!(remove_prefix("foo", "lib", false).unwrap(), "foo");
        assert!(remove_prefix("foo", "lib", true).is_err());
    }
}
