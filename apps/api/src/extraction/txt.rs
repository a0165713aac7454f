use crate::extraction::ExtractError;

/// Decodes the bytes as UTF-8, verbatim. There is no fallback encoding.
pub fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    Ok(std::str::from_utf8(bytes)?.to_string())
}
