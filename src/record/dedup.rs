//! Fresh ids for a copied subtree.
//!
//! Pass 1 maps every distinct id to a new one. Pass 2 applies the map to
//! component ids and to the `io`-prefixed properties that reference other
//! components, so bindings inside the subtree follow their targets while
//! bindings to components outside it stay untouched.

use rustc_hash::FxHashMap;
use serde_json::Value;

use super::ComponentRecord;
use crate::graph::ComponentId;

/// Replace every id in `record` and rewrite internal references.
/// Returns the `old -> new` substitution map.
pub fn deduplicate_ids(record: &mut ComponentRecord) -> FxHashMap<ComponentId, ComponentId> {
    let mut map = FxHashMap::default();
    record.visit(&mut |r| {
        if let Some(id) = r.id() {
            map.entry(id).or_insert_with(ComponentId::new);
        }
    });

    record.visit_mut(&mut |r| {
        if let Some(id) = r.id_mut()
            && let Some(fresh) = map.get(id)
        {
            *id = *fresh;
        }
        if let Some(properties) = r.properties_mut() {
            for (key, value) in properties.iter_mut() {
                if !key.starts_with("io") {
                    continue;
                }
                if let Value::String(text) = value {
                    *text = rewrite_refs(text, &map);
                }
            }
        }
    });
    map
}

/// Rewrite the uuid of each `name,uuid` pair found in `map`.
fn rewrite_refs(text: &str, map: &FxHashMap<ComponentId, ComponentId>) -> String {
    text.split(':')
        .map(|pair| {
            let Some((name, id)) = pair.split_once(',') else {
                return pair.to_string();
            };
            match id.trim().parse::<ComponentId>().ok().and_then(|id| map.get(&id)) {
                Some(fresh) => format!("{name},{fresh}"),
                None => pair.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_refs_keeps_foreign_ids() {
        let inside = ComponentId::new();
        let outside = ComponentId::new();
        let fresh = ComponentId::new();
        let map = FxHashMap::from_iter([(inside, fresh)]);

        let text = format!("song,{inside}:volume,{outside}:garbage");
        assert_eq!(
            rewrite_refs(&text, &map),
            format!("song,{fresh}:volume,{outside}:garbage")
        );
    }
}
