//! Version ranges (`name/[>=1.0 <2.0]`) resolved against a recipe search,
//! using semver comparators.
//!
//! Comparators may be separated by spaces or commas. Candidate versions with
//! fewer than three components are padded with zeros (`1.2` reads as
//! `1.2.0`); versions that still do not parse are ignored.

use graft_core::config::Remote;
use graft_core::provider::{RangeResolver, RecipeSearch};
use graft_core::requirement::Requirement;
use graft_util::errors::GraftError;
use semver::{Version, VersionReq};

/// Pins ranges to the highest matching version the search knows about.
pub struct SemverRangeResolver<'a> {
    search: &'a dyn RecipeSearch,
}

impl<'a> SemverRangeResolver<'a> {
    pub fn new(search: &'a dyn RecipeSearch) -> Self {
        Self { search }
    }
}

impl RangeResolver for SemverRangeResolver<'_> {
    fn resolve(
        &self,
        requirement: &mut Requirement,
        consumer: &str,
        _update: bool,
        remotes: &[Remote],
    ) -> miette::Result<()> {
        let reference = &requirement.reference;
        let Some(expr) = reference.range_expr() else {
            return Ok(());
        };
        let range = parse_range(expr)?;
        let candidates = self.search.versions(
            &reference.name,
            reference.user.as_deref(),
            reference.channel.as_deref(),
            remotes,
        )?;

        let best = candidates
            .iter()
            .filter_map(|text| parse_version(text).map(|v| (v, text)))
            .filter(|(v, _)| range.matches(v))
            .max_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, text)| text.clone());
        let Some(version) = best else {
            return Err(GraftError::Generic {
                message: format!(
                    "no version of '{}' matches '{expr}' ({} candidates)",
                    reference.name,
                    candidates.len()
                ),
            }
            .into());
        };

        tracing::debug!(
            "{consumer}: version range '{expr}' for {} resolved to {version}",
            reference.name
        );
        requirement.reference.version = version;
        requirement.reference.revision = None;
        Ok(())
    }
}

/// Parse a range expression such as `>=1.0 <2.0` or `~1.2, !=1.2.3`.
pub fn parse_range(expr: &str) -> Result<VersionReq, GraftError> {
    let comparators: Vec<&str> = expr
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect();
    let joined = if comparators.is_empty() {
        "*".to_string()
    } else {
        comparators.join(", ")
    };
    VersionReq::parse(&joined).map_err(|e| GraftError::Generic {
        message: format!("invalid version range '{expr}': {e}"),
    })
}

/// Parse a version, padding missing minor and patch components.
pub fn parse_version(text: &str) -> Option<Version> {
    if let Ok(version) = Version::parse(text) {
        return Some(version);
    }
    let (core, rest) = match text.find(['-', '+']) {
        Some(at) => text.split_at(at),
        None => (text, ""),
    };
    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0{rest}"),
        2 => format!("{core}.0{rest}"),
        _ => return None,
    };
    Version::parse(&padded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::reference::PackageRef;

    struct Versions(Vec<&'static str>);

    impl RecipeSearch for Versions {
        fn versions(
            &self,
            _name: &str,
            _user: Option<&str>,
            _channel: Option<&str>,
            _remotes: &[Remote],
        ) -> miette::Result<Vec<String>> {
            Ok(self.0.iter().map(|v| v.to_string()).collect())
        }
    }

    fn resolve(available: Vec<&'static str>, reference: &str) -> miette::Result<Requirement> {
        let search = Versions(available);
        let resolver = SemverRangeResolver::new(&search);
        let mut req = Requirement::new(PackageRef::parse(reference).unwrap());
        resolver.resolve(&mut req, "app/1.0", false, &[])?;
        Ok(req)
    }

    #[test]
    fn picks_highest_match() {
        let req = resolve(vec!["1.0", "1.5.2", "2.0", "1.9"], "zlib/[>=1.0 <2.0]").unwrap();
        assert_eq!(req.reference.version, "1.9");
    }

    #[test]
    fn commas_work_like_spaces() {
        let req = resolve(vec!["1.1", "1.2.8", "1.3"], "zlib/[>1.1, <1.3]").unwrap();
        assert_eq!(req.reference.version, "1.2.8");
    }

    #[test]
    fn pinned_versions_are_untouched() {
        let req = resolve(vec!["2.0"], "zlib/1.2.11#rev").unwrap();
        assert_eq!(req.reference.to_string(), "zlib/1.2.11#rev");
    }

    #[test]
    fn no_match_is_an_error() {
        let err = resolve(vec!["1.0", "latest"], "zlib/[>=3]").unwrap_err();
        assert!(err.to_string().contains("no version of 'zlib' matches '>=3'"), "got: {err}");
    }

    #[test]
    fn invalid_range_is_an_error() {
        let err = resolve(vec!["1.0"], "zlib/[>=x.y]").unwrap_err();
        assert!(err.to_string().contains("invalid version range"), "got: {err}");
    }

    #[test]
    fn lenient_versions() {
        assert_eq!(parse_version("1"), Some(Version::new(1, 0, 0)));
        assert_eq!(parse_version("1.2"), Some(Version::new(1, 2, 0)));
        assert_eq!(parse_version("1.2-beta").unwrap().pre.as_str(), "beta");
        assert_eq!(parse_version("latest"), None);
        assert_eq!(parse_version("1.2.3.4"), None);
    }
}
