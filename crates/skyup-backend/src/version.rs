//! Version parsing and comparison

use std::cmp::Ordering;

use crate::error::BackendError;

/// Parse dotted numeric versions (e.g. "1.4.2", "v1.4.2", "1.4.2\n")
pub fn parse_version(s: &str) -> Result<(u32, u32, u32), BackendError> {
    let trimmed = s.trim();
    let s = trimmed.trim_start_matches(['v', 'V']);
    let parts: Vec<&str> = s.split('.').collect();

    if parts.len() != 3 {
        return Err(BackendError::Version(format!(
            "{trimmed}: expected X.Y.Z"
        )));
    }

    let component = |part: &str| {
        part.parse::<u32>()
            .map_err(|_| BackendError::Version(format!("{trimmed}: invalid component {part}")))
    };

    Ok((component(parts[0])?, component(parts[1])?, component(parts[2])?))
}

/// Returns true if `remote` is newer than `local`
pub fn is_newer(local: &str, remote: &str) -> Result<bool, BackendError> {
    let local = parse_version(local)?;
    let remote = parse_version(remote)?;

    Ok(remote.cmp(&local) == Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("0.2.38").unwrap(), (0, 2, 38));
        assert_eq!(parse_version("v1.0.0").unwrap(), (1, 0, 0));
        assert_eq!(parse_version(" 2.10.3\n").unwrap(), (2, 10, 3));
    }

    #[test]
    fn test_parse_version_invalid() {
        assert!(parse_version("").is_err());
        assert!(parse_version("1.2").is_err());
        assert!(parse_version("1.2.3.4").is_err());
        assert!(parse_version("a.b.c").is_err());
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer("0.2.38", "0.2.39").unwrap());
        assert!(!is_newer("0.2.38", "0.2.38").unwrap());
        assert!(!is_newer("0.2.39", "0.2.38").unwrap());
        assert!(is_newer("0.2.38", "0.3.0").unwrap());
        assert!(is_newer("0.9.99", "1.0.0").unwrap());
        assert!(!is_newer("1.0.0", "0.9.99").unwrap());
    }
}
