//! Layering of command line settings over the config file.
//!
//! Both sides are converted to JSON. A command line value only wins when it differs from
//! the default, as clap can not tell an explicit default from an absent argument.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{from_value, to_value, Result, Value};

/// Returns `base` with every non-default value of `overrides` applied on top.
#[inline]
pub fn merge<T>(base: &T, overrides: &T) -> Result<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    let mut merged = to_value(base)?;
    let defaults = to_value(T::default())?;
    overlay(&mut merged, to_value(overrides)?, &defaults);
    from_value(merged)
}

/// Copies the values of `overrides` that differ from `defaults` onto `base`, recursing into
/// objects key by key.
#[inline]
pub fn overlay(base: &mut Value, overrides: Value, defaults: &Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                let default = defaults.get(&key).unwrap_or(&Value::Null);
                overlay(base.entry(key).or_insert(Value::Null), value, default);
            }
        }
        (base, value) => {
            if value != *defaults {
                *base = value;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use glslp::{GpuVendor, PackingRule, ParserConfig};
    use serde_json::json;

    use super::*;

    fn from_file() -> ParserConfig {
        let mut config = ParserConfig::default();
        config.push_constants_size = 256;
        config.gpu_vendor = GpuVendor::Nvidia;
        config
    }

    #[test_log::test]
    fn defaults_on_the_command_line_keep_file_values() {
        let merged = merge(&from_file(), &ParserConfig::default()).unwrap();
        assert_eq!(merged, from_file());
    }

    #[test_log::test]
    fn explicit_command_line_values_win() {
        let mut from_cli = ParserConfig::default();
        from_cli.gpu_vendor = GpuVendor::Intel;
        from_cli.packing = PackingRule::Std430;

        let merged = merge(&from_file(), &from_cli).unwrap();
        assert_eq!(merged.push_constants_size, 256);
        assert_eq!(merged.gpu_vendor, GpuVendor::Intel);
        assert_eq!(merged.packing, PackingRule::Std430);
    }

    #[test_log::test]
    fn overlay_recurses_into_objects() {
        let mut base = json!({ "outer": { "kept": 1, "replaced": 2 } });
        let defaults = json!({ "outer": { "kept": 0, "replaced": 0 } });
        overlay(
            &mut base,
            json!({ "outer": { "kept": 0, "replaced": 3 } }),
            &defaults,
        );
        assert_eq!(base, json!({ "outer": { "kept": 1, "replaced": 3 } }));
    }
}
