//! Parser for the structured tag string handed over at initialization.
//!
//! Grammar: pairs separated by `,` or `;`, each pair `key=value` split at the
//! first `=`. Whitespace around pairs, keys and values is trimmed. Pairs with no
//! `=` or an empty key are skipped.

use tracing::debug;

/// Parse a tag string into `(key, value)` pairs, in input order.
///
/// ```
/// use profiler_agent_core::tags::parse_tags;
///
/// let tags = parse_tags("env=prod; region = eu ,broken,=nokey");
/// assert_eq!(
///     tags,
///     vec![
///         ("env".to_string(), "prod".to_string()),
///         ("region".to_string(), "eu".to_string()),
///     ]
/// );
/// ```
#[must_use]
pub fn parse_tags(input: &str) -> Vec<(String, String)> {
    input
        .split(|c: char| c == ',' || c == ';')
        .filter_map(parse_pair)
        .collect()
}

fn parse_pair(pair: &str) -> Option<(String, String)> {
    let pair = pair.trim();
    if pair.is_empty() {
        return None;
    }

    let Some((key, value)) = pair.split_once('=') else {
        debug!("Skipping malformed tag '{}': missing '='", pair);
        return None;
    };

    let key = key.trim();
    if key.is_empty() {
        debug!("Skipping malformed tag '{}': empty key", pair);
        return None;
    }

    Some((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pairs(tags: &[(&str, &str)]) -> Vec<(String, String)> {
        tags.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_tags("").is_empty());
        assert!(parse_tags("  ").is_empty());
        assert!(parse_tags(",;,").is_empty());
    }

    #[test]
    fn test_comma_and_semicolon_delimiters() {
        assert_eq!(
            parse_tags("a=1,b=2;c=3"),
            pairs(&[("a", "1"), ("b", "2"), ("c", "3")])
        );
    }

    #[test]
    fn test_malformed_pairs_are_skipped() {
        assert_eq!(
            parse_tags("novalue,=orphan,ok=yes, ,also"),
            pairs(&[("ok", "yes")])
        );
    }

    #[test]
    fn test_value_keeps_inner_equals() {
        assert_eq!(parse_tags("query=a=b"), pairs(&[("query", "a=b")]));
    }

    #[test]
    fn test_empty_value_is_kept() {
        assert_eq!(parse_tags("flag="), pairs(&[("flag", "")]));
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        assert_eq!(
            parse_tags("env=dev,env=prod"),
            pairs(&[("env", "dev"), ("env", "prod")])
        );
    }

    proptest! {
        #[test]
        fn test_parse_never_yields_empty_keys(input in ".*") {
            for (key, _) in parse_tags(&input) {
                prop_assert!(!key.is_empty());
                prop_assert!(!key.contains(','));
                prop_assert!(!key.contains(';'));
                prop_assert!(!key.contains('='));
            }
        }

        #[test]
        fn test_well_formed_pairs_all_survive(
            tags in prop::collection::vec(("[a-z][a-z0-9_.]{0,8}", "[a-z0-9:/._-]{0,8}"), 0..8)
        ) {
            let input = tags
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(";");
            prop_assert_eq!(parse_tags(&input), tags);
        }
    }
}
