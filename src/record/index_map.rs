//! Serde adapter for `BTreeMap<i32, V>` with string keys.
//!
//! Internally tagged enums buffer their content before dispatch, and
//! buffered map keys no longer parse as integers. Keys are written and read
//! as strings explicitly instead.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S, V>(map: &BTreeMap<i32, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    serializer.collect_map(map.iter().map(|(k, v)| (k.to_string(), v)))
}

pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<i32, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    BTreeMap::<String, V>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| {
            key.trim()
                .parse::<i32>()
                .map(|index| (index, value))
                .map_err(|_| D::Error::custom(format!("invalid child index `{key}`")))
        })
        .collect()
}
