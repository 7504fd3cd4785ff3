//! Wire models for the tenant API.

pub mod app;
pub mod catalog;
pub mod directory;
pub mod policy;
pub mod profile;
pub mod settings;

pub use app::{
    AppProperty, Application, EnvironmentAttribute, EnvironmentEntity, EnvironmentKind,
    PropertiesPatch, UserAccountMapping, UserAccountMappings,
};
pub use catalog::{CatalogApp, CatalogProperty, CatalogVersion};
pub use directory::{
    LabelAssociation, LabelAssociations, Permission, ResourceManagerProfile, Role,
    ServerResource, SessionAttribute, SessionAttributeType, Tag, TagMembers, User,
};
pub use policy::{Policy, PolicyOrder, PolicyOrderEntry};
pub use profile::{
    Association, ConstraintOperation, ConstraintValue, Profile, ProfilePermission, Status,
};
pub use settings::{
    AdvancedSettings, FilterCriterion, InstantMessaging, Itsm, Justification, Setting,
    SettingsEnvelope,
};
