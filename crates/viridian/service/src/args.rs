//! Positional string arguments of one operation.

use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::str::FromStr;
use viridian_engine::{RegistryError, RegistryResult};
use viridian_types::AssetId;

/// Arguments checked against an operation's parameter list.
#[derive(Clone, Copy, Debug)]
pub struct Args<'a> {
    operation: &'static str,
    params: &'static [&'static str],
    values: &'a [String],
}

impl<'a> Args<'a> {
    /// Fails unless exactly one value is supplied per parameter.
    pub fn new(
        operation: &'static str,
        params: &'static [&'static str],
        values: &'a [String],
    ) -> RegistryResult<Self> {
        if values.len() != params.len() {
            return Err(RegistryError::InvalidArgument(format!(
                "{operation} expects {} arguments ({}), got {}",
                params.len(),
                params.join(", "),
                values.len()
            )));
        }
        Ok(Self {
            operation,
            params,
            values,
        })
    }

    fn invalid(&self, param: &str, reason: impl Display) -> RegistryError {
        RegistryError::InvalidArgument(format!("{}: {param}: {reason}", self.operation))
    }

    /// Raw value of `param`.
    pub fn raw(&self, param: &str) -> RegistryResult<&'a str> {
        self.params
            .iter()
            .position(|p| *p == param)
            .map(|index| self.values[index].as_str())
            .ok_or_else(|| {
                RegistryError::InvalidArgument(format!(
                    "{} has no parameter {param}",
                    self.operation
                ))
            })
    }

    pub fn required(&self, param: &str) -> RegistryResult<&'a str> {
        let value = self.raw(param)?;
        if value.trim().is_empty() {
            return Err(self.invalid(param, "must not be empty"));
        }
        Ok(value)
    }

    /// `None` for an empty value.
    pub fn optional(&self, param: &str) -> RegistryResult<Option<String>> {
        let value = self.raw(param)?;
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    pub fn id(&self, param: &str) -> RegistryResult<AssetId> {
        self.required(param).map(AssetId::new)
    }

    /// `None` for an empty value, which asks the registry to allocate one.
    pub fn optional_id(&self, param: &str) -> RegistryResult<Option<AssetId>> {
        Ok(self.optional(param)?.map(AssetId::new))
    }

    /// Parse through `FromStr`.
    pub fn parse<T>(&self, param: &str) -> RegistryResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.raw(param)?
            .trim()
            .parse()
            .map_err(|err| self.invalid(param, err))
    }

    /// Decode a JSON value.
    pub fn json<T: DeserializeOwned>(&self, param: &str) -> RegistryResult<T> {
        serde_json::from_str(self.raw(param)?).map_err(|err| self.invalid(param, err))
    }

    /// Decode a JSON list. An empty value is an empty list.
    pub fn json_list<T: DeserializeOwned>(&self, param: &str) -> RegistryResult<Vec<T>> {
        if self.raw(param)?.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.json(param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viridian_engine::ErrorKind;

    const PARAMS: &[&str] = &["id", "labels", "weight"];

    fn values(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn arity_is_exact() {
        let short = values(&["a", "[]"]);
        let err = Args::new("op", PARAMS, &short).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn empty_values_map_to_defaults() {
        let raw = values(&["", "", "3"]);
        let args = Args::new("op", PARAMS, &raw).unwrap();
        assert_eq!(args.optional_id("id").unwrap(), None);
        assert!(args.json_list::<AssetId>("labels").unwrap().is_empty());
        assert_eq!(args.parse::<i32>("weight").unwrap(), 3);
        assert!(args.id("id").is_err());
    }

    #[test]
    fn malformed_json_is_invalid() {
        let raw = values(&["a", "[\"l1\",", "x"]);
        let args = Args::new("op", PARAMS, &raw).unwrap();
        assert!(args.json_list::<AssetId>("labels").is_err());
        assert!(args.parse::<i32>("weight").is_err());
    }
}
