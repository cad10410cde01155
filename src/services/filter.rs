// src/services/filter.rs

//! Include/exclude channel name filtering.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::Result;

/// Compiled include/exclude globs for one server.
#[derive(Debug, Clone)]
pub struct ChannelFilter {
    include_all: bool,
    include: GlobSet,
    exclude: GlobSet,
}

impl ChannelFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include_all: include.iter().any(|p| p == "*"),
            include: build_globset(include)?,
            exclude: build_globset(exclude)?,
        })
    }

    /// Exclusions are checked first; `*` in the include list selects everything else.
    pub fn should_include(&self, name: &str) -> bool {
        if self.exclude.is_match(name) {
            return false;
        }
        self.include_all || self.include.is_match(name)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.is_match(name)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(include: &[&str], exclude: &[&str]) -> ChannelFilter {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        ChannelFilter::new(&owned(include), &owned(exclude)).unwrap()
    }

    #[test]
    fn test_exclude_before_include() {
        let f = filter(&["*"], &["admin", "private-*"]);
        assert!(!f.should_include("admin"));
        assert!(!f.should_include("private-logs"));
        assert!(f.should_include("general"));
    }

    #[test]
    fn test_explicit_includes() {
        let f = filter(&["general", "dev-*"], &[]);
        assert!(f.should_include("general"));
        assert!(f.should_include("dev-tools"));
        assert!(!f.should_include("random"));
    }

    #[test]
    fn test_empty_include_selects_nothing() {
        let f = filter(&[], &[]);
        assert!(!f.should_include("general"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(ChannelFilter::new(&["[oops".to_string()], &[]).is_err());
    }
}
