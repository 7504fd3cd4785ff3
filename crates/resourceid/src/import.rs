//! Import-ID matching.
//!
//! Users may type an import id in more than one shape, usually the
//! canonical long form and a shortened one. [`ImportFormats`] tries each
//! pattern in order and returns the named captures of the first match.

use crate::error::{Error, Result};
use crate::segments::require_non_empty;
use regex::Regex;
use std::collections::HashMap;

/// An ordered list of accepted import-id patterns.
#[derive(Debug, Clone)]
pub struct ImportFormats {
    patterns: Vec<Regex>,
}

impl ImportFormats {
    /// Compile a list of patterns carrying named capture groups.
    pub fn new(patterns: &[&str]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| Error::InvalidPattern {
                    pattern: (*p).to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Match `id` against each pattern and return the first match's groups.
    pub fn parse(&self, id: &str) -> Result<ImportFields> {
        for pattern in &self.patterns {
            let Some(caps) = pattern.captures(id) else {
                continue;
            };
            let fields = pattern
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect();
            return Ok(ImportFields { fields });
        }

        Err(Error::UnmatchedImportId {
            id: id.to_string(),
            formats: self.patterns.iter().map(|p| p.as_str().to_string()).collect(),
        })
    }
}

/// Named captures from a matched import id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportFields {
    fields: HashMap<String, String>,
}

impl ImportFields {
    /// Fetch a capture, rejecting missing or whitespace-only values.
    pub fn get(&self, name: &str) -> Result<&str> {
        let value = self.fields.get(name).map(String::as_str).unwrap_or("");
        require_non_empty(name, value)
    }

    /// Fetch an optional capture (absent when its branch did not match).
    pub fn optional(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Accepted import shapes per resource, canonical form first.
pub mod formats {
    pub const APPLICATION: &[&str] = &[r"^apps/(?P<app>[^/]+)$", r"^(?P<app>[^/]+)$"];

    pub const APPLICATION_PERMISSION: &[&str] =
        &[r"^permissions/(?P<name>[^/]+)$", r"^(?P<name>[^/]+)$"];

    pub const PROFILE: &[&str] = &[
        r"^apps/(?P<app>[^/]+)/paps/(?P<profile>[^/]+)$",
        r"^(?P<app>[^/]+)/(?P<profile>[^/]+)$",
    ];

    pub const PROFILE_PERMISSION: &[&str] = &[
        r"^apps/(?P<app>[^/]+)/paps/(?P<profile>[^/]+)/permissions/(?P<name>[^/]+)/type/(?P<type>[^/]+)$",
        r"^paps/(?P<profile>[^/]+)/permissions/(?P<name>[^/]+)/type/(?P<type>[^/]+)$",
        r"^(?P<app>[^/]+)/(?P<profile>[^/]+)/(?P<name>[^/]+)/(?P<type>[^/]+)$",
    ];

    pub const CONSTRAINT: &[&str] = &[
        r"^paps/(?P<profile>[^/]+)/permissions/(?P<name>[^/]+)/(?P<ptype>[^/]+)/constraints/(?P<ctype>[^/]+)/(?P<value>[^/]+)$",
        r"^(?P<profile>[^/]+)/(?P<name>[^/]+)/(?P<ptype>[^/]+)/(?P<ctype>[^/]+)/(?P<value>[^/]+)$",
    ];

    pub const ENVIRONMENT: &[&str] = &[
        r"^apps/(?P<app>[^/]+)/root-environment-group/environments/(?P<id>[^/]+)$",
        r"^(?P<app>[^/]+)/environments/(?P<id>[^/]+)$",
    ];

    pub const ENVIRONMENT_GROUP: &[&str] = &[
        r"^apps/(?P<app>[^/]+)/root-environment-group/groups/(?P<id>[^/]+)$",
        r"^(?P<app>[^/]+)/groups/(?P<id>[^/]+)$",
    ];

    pub const PROFILE_POLICY: &[&str] = &[
        r"^paps/(?P<profile>[^/]+)/policies/(?P<policy>[^/]+)$",
        r"^(?P<profile>[^/]+)/(?P<policy>[^/]+)$",
    ];

    pub const POLICY_PRIORITY: &[&str] = &[
        r"^paps/(?P<profile>[^/]+)/policies/priority$",
        r"^(?P<profile>[^/]+)$",
    ];

    pub const ADVANCED_SETTINGS: &[&str] =
        &[r"^(?P<type>[a-z_]+)/(?P<id>.+)/advanced-settings$"];

    pub const RESOURCE_MANAGER_PROFILE: &[&str] = &[
        r"^resource-manager/profile/(?P<profile>[^/]+)$",
        r"^(?P<profile>[^/]+)$",
    ];

    pub const TAG_MEMBER: &[&str] = &[
        r"^tags/(?P<tag>[^/]+)/users/(?P<user>[^/]+)$",
        r"^(?P<tag>[^/]+)/(?P<user>[^/]+)$",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_permission_long_and_short() {
        let formats = ImportFormats::new(formats::PROFILE_PERMISSION).unwrap();

        let long = formats
            .parse("apps/A/paps/P/permissions/Viewer/type/role")
            .unwrap();
        assert_eq!(long.get("app").unwrap(), "A");
        assert_eq!(long.get("profile").unwrap(), "P");
        assert_eq!(long.get("name").unwrap(), "Viewer");
        assert_eq!(long.get("type").unwrap(), "role");

        let short = formats.parse("A/P/Viewer/role").unwrap();
        assert_eq!(short.get("profile").unwrap(), "P");
        assert_eq!(short.get("type").unwrap(), "role");

        let state_form = formats.parse("paps/P/permissions/Viewer/type/role").unwrap();
        assert_eq!(state_form.optional("app"), None);
        assert_eq!(state_form.get("name").unwrap(), "Viewer");
    }

    #[test]
    fn test_unmatched_lists_original_id() {
        let formats = ImportFormats::new(formats::PROFILE).unwrap();
        let err = formats.parse("a/b/c").unwrap_err();
        match err {
            Error::UnmatchedImportId { id, formats } => {
                assert_eq!(id, "a/b/c");
                assert_eq!(formats.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_whitespace_capture_rejected() {
        let formats = ImportFormats::new(formats::TAG_MEMBER).unwrap();
        let fields = formats.parse("tags/ /users/u1").unwrap();
        assert!(fields.get("tag").is_err());
        assert_eq!(fields.get("user").unwrap(), "u1");
    }

    #[test]
    fn test_advanced_settings_format() {
        let formats = ImportFormats::new(formats::ADVANCED_SETTINGS).unwrap();
        let fields = formats
            .parse("resource_manager_profile_policy/resource-manager/profiles/p/policies/x/advanced-settings")
            .unwrap();
        assert_eq!(fields.get("type").unwrap(), "resource_manager_profile_policy");
        assert_eq!(
            fields.get("id").unwrap(),
            "resource-manager/profiles/p/policies/x"
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let err = ImportFormats::new(&["(unclosed"]).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_all_builtin_formats_compile() {
        for set in [
            formats::APPLICATION,
            formats::APPLICATION_PERMISSION,
            formats::PROFILE,
            formats::PROFILE_PERMISSION,
            formats::CONSTRAINT,
            formats::ENVIRONMENT,
            formats::ENVIRONMENT_GROUP,
            formats::PROFILE_POLICY,
            formats::POLICY_PRIORITY,
            formats::ADVANCED_SETTINGS,
            formats::RESOURCE_MANAGER_PROFILE,
            formats::TAG_MEMBER,
        ] {
            assert!(ImportFormats::new(set).is_ok());
        }
    }
}
