use std::str::FromStr;

use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// An environment variable is set but could not be parsed into the expected type.
#[derive(Debug, Error)]
#[error("Invalid value for environment variable {name}: {value:?}")]
pub struct InvalidEnvVarError {
    /// Name of the offending variable.
    pub name: String,
    /// The raw value that failed to parse.
    pub value: String,
}

/// Reads an environment variable, returning a structured error if it's missing.
///
/// Empty values are treated as missing so that `FOO=` in a `.env` file does not
/// silently override a configured default.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MissingEnvVarError(name.to_string())),
    }
}

/// Reads and parses an optional environment variable.
///
/// Returns `Ok(None)` when the variable is unset, and an error when it is set
/// to something that does not parse as `T`.
pub fn parse_env_var<T: FromStr>(name: &str) -> Result<Option<T>, InvalidEnvVarError> {
    match get_env_var(name) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| InvalidEnvVarError {
            name: name.to_string(),
            value: raw,
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable name so they can run in parallel.

    #[test]
    fn missing_var_is_an_error() {
        let err = get_env_var("SHARED_UTILS_TEST_DEFINITELY_UNSET").unwrap_err();
        assert_eq!(err.0, "SHARED_UTILS_TEST_DEFINITELY_UNSET");
    }

    #[test]
    fn parse_reports_bad_values() {
        unsafe { std::env::set_var("SHARED_UTILS_TEST_BAD_NUMBER", "ten") };
        let err = parse_env_var::<u64>("SHARED_UTILS_TEST_BAD_NUMBER").unwrap_err();
        assert_eq!(err.value, "ten");

        unsafe { std::env::set_var("SHARED_UTILS_TEST_GOOD_NUMBER", " 42 ") };
        assert_eq!(parse_env_var::<u64>("SHARED_UTILS_TEST_GOOD_NUMBER").unwrap(), Some(42));
        assert_eq!(parse_env_var::<u64>("SHARED_UTILS_TEST_UNSET_NUMBER").unwrap(), None);
    }
}
