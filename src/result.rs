//! Render results for one pass.
//!
//! Results are produced fresh on every pass by mapping each input item
//! through the template (and the key function, if any). They do not persist:
//! the reconciler commits their content into fragments and drops them.

use rustc_hash::FxHashMap;

use crate::error::{RepeatError, RepeatResult};
use crate::key::Key;

/// Template output for one item, tagged with its key.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult<K, C> {
    /// Identity of the item this pass
    pub key: Key<K>,
    /// Materialized content handed to the container
    pub content: C,
}

impl<K, C> RenderResult<K, C> {
    /// Create a result with an explicit key.
    pub fn new(key: Key<K>, content: C) -> Self {
        Self { key, content }
    }
}

/// Build the keyed result list for a pass.
///
/// Keys default to the item's index when `key_fn` is `None`.
pub fn build_results<I, K, C>(
    items: impl IntoIterator<Item = I>,
    key_fn: Option<&dyn Fn(&I, usize) -> K>,
    template: &dyn Fn(&I, usize) -> C,
) -> Vec<RenderResult<K, C>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let key = match key_fn {
                Some(f) => Key::Item(f(&item, index)),
                None => Key::Index(index),
            };
            RenderResult::new(key, template(&item, index))
        })
        .collect()
}

/// Reject result lists where two items share a key.
pub fn ensure_unique_keys<K, C>(results: &[RenderResult<K, C>]) -> RepeatResult<()>
where
    K: std::hash::Hash + Eq,
{
    let mut seen: FxHashMap<&Key<K>, usize> = FxHashMap::default();
    seen.reserve(results.len());
    for (index, result) in results.iter().enumerate() {
        if let Some(&first) = seen.get(&result.key) {
            return Err(RepeatError::DuplicateKey { first, second: index });
        }
        seen.insert(&result.key, index);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_default_to_index() {
        let template: &dyn Fn(&&'static str, usize) -> String = &|s, i| format!("{}{}", s, i);
        let results = build_results::<_, u32, _>(["a", "b"], None, template);
        assert_eq!(results[0].key, Key::Index(0));
        assert_eq!(results[1].key, Key::Index(1));
        assert_eq!(results[1].content, "b1");
    }

    #[test]
    fn test_key_fn_receives_item_and_index() {
        let key_fn: &dyn Fn(&&'static str, usize) -> String = &|s, i| format!("{}-{}", s, i);
        let template: &dyn Fn(&&'static str, usize) -> usize = &|s, _| s.len();
        let results = build_results(["x", "y"], Some(key_fn), template);
        assert_eq!(results[0].key, Key::Item("x-0".to_string()));
        assert_eq!(results[1].key, Key::Item("y-1".to_string()));
        assert_eq!(results[1].content, 1);
    }

    #[test]
    fn test_ensure_unique_keys() {
        let ok = vec![
            RenderResult::new(Key::Item(1), ()),
            RenderResult::new(Key::Item(2), ()),
        ];
        assert!(ensure_unique_keys(&ok).is_ok());

        let dup = vec![
            RenderResult::new(Key::Item(1), ()),
            RenderResult::new(Key::Item(2), ()),
            RenderResult::new(Key::Item(1), ()),
        ];
        assert_eq!(
            ensure_unique_keys(&dup),
            Err(RepeatError::DuplicateKey { first: 0, second: 2 })
        );
    }
}
