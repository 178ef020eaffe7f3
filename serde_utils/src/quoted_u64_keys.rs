// JSON object keys are always strings, so maps keyed by slot, validator index,
// or operator id are persisted with stringified keys. In memory the canonical
// key type is `u64`; the conversion happens here and nowhere else.

use core::fmt::{Formatter, Result as FmtResult};
use std::collections::BTreeMap;

use serde::{
    de::{Error, MapAccess, Visitor},
    ser::SerializeMap as _,
    Deserialize, Deserializer, Serialize, Serializer,
};

pub fn deserialize<'de, V, D>(deserializer: D) -> Result<BTreeMap<u64, V>, D::Error>
where
    V: Deserialize<'de>,
    D: Deserializer<'de>,
{
    struct MapVisitor<V>(core::marker::PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for MapVisitor<V> {
        type Value = BTreeMap<u64, V>;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str("a map with stringified integer keys")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = BTreeMap::new();

            while let Some((key, value)) = access.next_entry::<String, V>()? {
                let key = key.parse().map_err(A::Error::custom)?;
                map.insert(key, value);
            }

            Ok(map)
        }
    }

    deserializer.deserialize_map(MapVisitor(core::marker::PhantomData))
}

pub fn serialize<V: Serialize, S: Serializer>(
    map: &BTreeMap<u64, V>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut serialized = serializer.serialize_map(Some(map.len()))?;

    for (key, value) in map {
        serialized.serialize_entry(&key.to_string(), value)?;
    }

    serialized.end()
}
