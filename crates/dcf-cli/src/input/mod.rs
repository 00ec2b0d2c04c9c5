pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Typed input from `--input` when given, otherwise from piped stdin.
/// `None` when neither source supplied anything.
pub fn read_typed<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_input(path).map(Some);
    }
    match stdin::read_stdin()? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}
