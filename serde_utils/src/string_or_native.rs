// The Eth Beacon Node API and the relay bid trace endpoints represent slots,
// validator indices, and block numbers as JSON strings, while our own snapshot
// files store them as native numbers. Accept both when deserializing and emit
// the native representation when serializing.

use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    marker::PhantomData,
    str::FromStr,
};

use serde::{
    de::{Error, Visitor},
    Deserializer, Serialize, Serializer,
};

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: From<u64> + FromStr<Err: Display>,
    D: Deserializer<'de>,
{
    struct NumberOrString<T>(PhantomData<T>);

    impl<T: From<u64> + FromStr<Err: Display>> Visitor<'_> for NumberOrString<T> {
        type Value = T;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str("an unsigned integer, quoted or not")
        }

        fn visit_u64<E: Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(value.into())
        }

        fn visit_str<E: Error>(self, string: &str) -> Result<Self::Value, E> {
            string.parse().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(NumberOrString(PhantomData))
}

pub fn serialize<T: Serialize, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    value.serialize(serializer)
}
