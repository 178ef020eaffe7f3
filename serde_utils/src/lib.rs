pub mod quoted_u64_keys;
pub mod string_or_native;
