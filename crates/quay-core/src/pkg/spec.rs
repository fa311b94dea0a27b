//! Package spec parsing.
//!
//! A spec is what the user types after `quay add`:
//! - `left-pad`
//! - `left-pad@1.3.0`
//! - `axios@^1.0.0`
//! - `axios@1.7` (partial version, normalized later by the resolver)
//! - `@types/node@^20`

use super::error::PkgError;

/// A parsed package specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Full package name (e.g. `@scope/name` or `name`).
    pub name: String,
    /// Scope without the `@` prefix, if scoped.
    pub scope: Option<String>,
    /// Version specifier (`None` means latest).
    pub spec: Option<String>,
}

impl PackageSpec {
    /// Parse a package specification string.
    ///
    /// # Errors
    /// Returns `PKG_SPEC_INVALID` if the spec is malformed.
    pub fn parse(input: &str) -> Result<Self, PkgError> {
        let input = input.trim();

        if input.is_empty() {
            return Err(PkgError::spec_invalid("Empty package spec"));
        }

        if let Some(rest) = input.strip_prefix('@') {
            Self::parse_scoped(input, rest)
        } else {
            Self::parse_unscoped(input)
        }
    }

    fn parse_scoped(input: &str, rest: &str) -> Result<Self, PkgError> {
        let Some((scope, after_slash)) = rest.split_once('/') else {
            return Err(PkgError::spec_invalid(format!(
                "Invalid scoped package: missing '/' in '{input}'"
            )));
        };

        if scope.is_empty() || after_slash.is_empty() {
            return Err(PkgError::spec_invalid(format!(
                "Invalid scoped package: empty scope or name in '{input}'"
            )));
        }

        // A second @ after the slash separates the specifier.
        let (pkg_name, spec) = match after_slash.split_once('@') {
            Some((n, s)) => (n, Some(s)),
            None => (after_slash, None),
        };

        if pkg_name.is_empty() {
            return Err(PkgError::spec_invalid(format!(
                "Invalid scoped package: empty name in '{input}'"
            )));
        }
        if spec.is_some_and(str::is_empty) {
            return Err(PkgError::spec_invalid(format!(
                "Invalid package spec: empty version specifier in '{input}'"
            )));
        }

        Self::validate_name(pkg_name)?;

        Ok(Self {
            name: format!("@{scope}/{pkg_name}"),
            scope: Some(scope.to_string()),
            spec: spec.map(String::from),
        })
    }

    fn parse_unscoped(input: &str) -> Result<Self, PkgError> {
        let (name, spec) = match input.split_once('@') {
            Some((n, s)) => (n, Some(s)),
            None => (input, None),
        };

        if name.is_empty() {
            return Err(PkgError::spec_invalid(format!(
                "Invalid package spec: empty name in '{input}'"
            )));
        }
        if spec.is_some_and(str::is_empty) {
            return Err(PkgError::spec_invalid(format!(
                "Invalid package spec: empty version specifier in '{input}'"
            )));
        }

        Self::validate_name(name)?;

        Ok(Self {
            name: name.to_string(),
            scope: None,
            spec: spec.map(String::from),
        })
    }

    fn validate_name(name: &str) -> Result<(), PkgError> {
        for c in name.chars() {
            if !c.is_alphanumeric() && c != '-' && c != '_' && c != '.' {
                return Err(PkgError::spec_invalid(format!(
                    "Invalid character '{c}' in package name '{name}'"
                )));
            }
        }
        Ok(())
    }

    /// Check if this is a scoped package.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    /// The specifier to resolve, defaulting to the latest tag.
    #[must_use]
    pub fn specifier(&self) -> &str {
        self.spec.as_deref().unwrap_or("latest")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let spec = PackageSpec::parse("left-pad").unwrap();
        assert_eq!(spec.name, "left-pad");
        assert_eq!(spec.scope, None);
        assert_eq!(spec.spec, None);
        assert_eq!(spec.specifier(), "latest");
    }

    #[test]
    fn test_parse_with_version() {
        let spec = PackageSpec::parse("left-pad@1.3.0").unwrap();
        assert_eq!(spec.name, "left-pad");
        assert_eq!(spec.spec, Some("1.3.0".to_string()));
    }

    #[test]
    fn test_parse_with_range() {
        let spec = PackageSpec::parse("axios@^1.0.0").unwrap();
        assert_eq!(spec.name, "axios");
        assert_eq!(spec.specifier(), "^1.0.0");
    }

    #[test]
    fn test_parse_partial_version() {
        let spec = PackageSpec::parse("axios@1.7").unwrap();
        assert_eq!(spec.specifier(), "1.7");
    }

    #[test]
    fn test_parse_scoped() {
        let spec = PackageSpec::parse("@types/node").unwrap();
        assert_eq!(spec.name, "@types/node");
        assert_eq!(spec.scope, Some("types".to_string()));
        assert!(spec.is_scoped());
    }

    #[test]
    fn test_parse_scoped_with_range() {
        let spec = PackageSpec::parse("@types/node@^20").unwrap();
        assert_eq!(spec.name, "@types/node");
        assert_eq!(spec.specifier(), "^20");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(PackageSpec::parse("").is_err());
        assert!(PackageSpec::parse("   ").is_err());
        assert!(PackageSpec::parse("@").is_err());
        assert!(PackageSpec::parse("@scope").is_err());
        assert!(PackageSpec::parse("@scope/").is_err());
        assert!(PackageSpec::parse("left-pad@").is_err());
        assert!(PackageSpec::parse("has space@1.0.0").is_err());
    }
}
