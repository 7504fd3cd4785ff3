//! # resourceid
//!
//! Opaque identifiers for managed privileged-access entities.
//!
//! A managed entity is often identified by several server-side keys at
//! once (a profile, a permission name and a permission type). This crate
//! packs such composite identities into one `/`-separated string and
//! unpacks them again on every read, update, delete and import.
//!
//! ## Example
//!
//! ```
//! use resourceid::ProfilePermissionId;
//!
//! let id = ProfilePermissionId::new("P", "Viewer", "role");
//! assert_eq!(id.to_string(), "paps/P/permissions/Viewer/type/role");
//!
//! let parsed: ProfilePermissionId = "apps/A/paps/P/permissions/Viewer/type/role".parse()?;
//! assert_eq!(parsed, id);
//! # Ok::<(), resourceid::Error>(())
//! ```
//!
//! Import ids are matched separately with [`ImportFormats`], which accepts
//! several user-facing shapes per resource:
//!
//! ```
//! use resourceid::{ImportFormats, formats};
//!
//! let fields = ImportFormats::new(formats::PROFILE)?.parse("my-app/my-profile")?;
//! assert_eq!(fields.get("profile")?, "my-profile");
//! # Ok::<(), resourceid::Error>(())
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod ids;
pub mod import;
mod segments;

pub use error::{Error, Result};
pub use ids::{
    AdvancedSettingsId, BrokerPoolId, ConstraintId, EnvironmentGroupId, EnvironmentId,
    PolicyPriorityId, PolicyTail, ProfilePermissionId, ProfilePolicyId, ProfileSettingsId,
    ResourceManagerProfileId, TagMemberId,
};
pub use import::{ImportFields, ImportFormats, formats};
pub use segments::{last_segment, require_non_empty};
