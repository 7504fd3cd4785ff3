//! Applications: catalog-typed apps with overridable and secret properties

use super::{Api, deleted, known, required};
use anyhow::{Context, Result};
use declarative::{PartialApply, Resource, Value};
use drift::Property;
use drift::sensitive::{dedupe, ensure_unique_names, is_hash_of, unmask};
use pamclient::catalog::{find_version, validate_properties, writable};
use pamclient::models::app::ICON_URL;
use pamclient::models::{
    AppProperty, Application, PropertiesPatch, UserAccountMapping, UserAccountMappings,
};
use pamclient::{AllowNoContent, LockKey, NotFoundAsNone};
use resourceid::{ImportFormats, formats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountMapping {
    pub account_name: String,
    pub user_attribute: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationState {
    #[serde(default)]
    pub id: Value<String>,
    pub name: String,
    #[serde(default)]
    pub description: Value<String>,
    /// Catalog type, e.g. `Snowflake`
    pub application_type: String,
    pub version: String,
    #[serde(default)]
    pub properties: Value<Vec<Property>>,
    /// Plaintext values; the server only ever returns them masked
    #[serde(default)]
    pub sensitive_properties: Value<Vec<Property>>,
    #[serde(default)]
    pub user_account_mappings: Value<Vec<AccountMapping>>,
    #[serde(default)]
    pub root_environment_group_id: Value<String>,
}

pub struct ApplicationResource {
    api: Api,
}

impl ApplicationResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn check_catalog(&self, plan: &ApplicationState, properties: &[AppProperty]) -> Result<()> {
        let catalog = self.api.client().catalog(self.api.cancel())?;
        let version = find_version(&catalog, &plan.application_type, &plan.version)?;
        validate_properties(version, properties)?;
        Ok(())
    }

    /// Properties and user mappings, written after the app itself exists
    fn configure(&self, id: &str, properties: &[AppProperty], plan: &ApplicationState) -> Result<()> {
        let client = self.api.client();
        let cancel = self.api.cancel();
        if !properties.is_empty() {
            let body = PropertiesPatch {
                properties: properties.to_vec(),
            };
            client
                .patch(cancel, &format!("apps/{id}/properties"), &body, LockKey::Application)
                .allow_no_content()
                .context("Failed to set application properties")?;
        }
        if let Some(mappings) = plan.user_account_mappings.known() {
            let body = UserAccountMappings {
                user_account_mappings: mappings
                    .iter()
                    .map(|m| UserAccountMapping {
                        account_name: m.account_name.clone(),
                        user_attribute: m.user_attribute.clone(),
                    })
                    .collect(),
            };
            client
                .post(
                    cancel,
                    &format!("apps/{id}/user-account-mappings"),
                    &body,
                    LockKey::Application,
                )
                .allow_no_content()
                .context("Failed to set user account mappings")?;
        }
        Ok(())
    }

    fn read_back(&self, state: &ApplicationState) -> Result<ApplicationState> {
        Resource::read(self, state)?
            .with_context(|| format!("application {} disappeared while being written", state.name))
    }
}

/// Plain and deduplicated sensitive properties, names unique across both
fn configured_properties(plan: &ApplicationState) -> Result<(Vec<Property>, Vec<Property>)> {
    let plain = plan.properties.known().cloned().unwrap_or_default();
    let sensitive = dedupe(plan.sensitive_properties.known().cloned().unwrap_or_default())?;
    ensure_unique_names(&plain, &sensitive)?;
    Ok((plain, sensitive))
}

fn wire_properties(plain: &[Property], sensitive: &[Property]) -> Vec<AppProperty> {
    writable(
        plain
            .iter()
            .chain(sensitive)
            .map(|p| AppProperty::new(&p.name, &p.value))
            .collect(),
    )
}

fn application_body(plan: &ApplicationState) -> Application {
    Application {
        name: plan.name.clone(),
        description: plan.description.known().cloned().unwrap_or_default(),
        app_type: plan.application_type.clone(),
        version: plan.version.clone(),
        ..Application::default()
    }
}

/// Map the server's application onto state, keeping prior plaintext
fn from_server(app: Application, prior: &ApplicationState) -> ApplicationState {
    let (secret, plain): (Vec<&AppProperty>, Vec<&AppProperty>) = app
        .properties
        .iter()
        .filter(|p| p.name != ICON_URL)
        .partition(|p| p.is_secret());

    // Only the properties the configuration manages; the catalog defines many more.
    let properties = prior.properties.known().map(|configured| {
        configured
            .iter()
            .filter_map(|c| plain.iter().find(|p| p.name == c.name))
            .map(|p| Property::new(&p.name, &p.value))
            .collect()
    });

    // With no configured secrets (an import), every server secret is adopted.
    let sensitive_properties = match prior.sensitive_properties.known() {
        Some(configured) => {
            let served: Vec<(&str, &str)> = secret
                .iter()
                .filter(|p| configured.iter().any(|c| c.name == p.name))
                .map(|p| (p.name.as_str(), p.value.as_str()))
                .collect();
            Some(unmask(served, configured))
        }
        None if secret.is_empty() => None,
        None => Some(unmask(
            secret.iter().map(|p| (p.name.as_str(), p.value.as_str())),
            &[],
        )),
    };

    let user_account_mappings = if app.user_account_mappings.is_empty()
        && !prior.user_account_mappings.is_known()
    {
        Value::Null
    } else {
        Value::Known(
            app.user_account_mappings
                .iter()
                .map(|m| AccountMapping {
                    account_name: m.account_name.clone(),
                    user_attribute: m.user_attribute.clone(),
                })
                .collect(),
        )
    };

    let description = if app.description.is_empty() && !prior.description.is_known() {
        Value::Null
    } else {
        Value::Known(app.description)
    };

    ApplicationState {
        id: Value::Known(app.id),
        name: app.name,
        description,
        application_type: app.app_type,
        version: app.version,
        properties: properties.into(),
        sensitive_properties: sensitive_properties.into(),
        user_account_mappings,
        root_environment_group_id: app.root_environment_group_id.into(),
    }
}

fn same_properties(plan: &[Property], state: Option<&Vec<Property>>) -> bool {
    let as_map = |props: &[Property]| -> BTreeMap<String, String> {
        props
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    };
    state.is_some_and(|state| as_map(plan) == as_map(state))
}

/// A configured secret matches state when it is the plaintext or its hash
fn same_secrets(plan: &[Property], state: Option<&Vec<Property>>) -> Result<bool> {
    let Some(state) = state else {
        return Ok(plan.is_empty());
    };
    if plan.len() != state.len() {
        return Ok(false);
    }
    for configured in plan {
        let Some(current) = state.iter().find(|s| s.name == configured.name) else {
            return Ok(false);
        };
        if current.value != configured.value && !is_hash_of(&current.value, &configured.value)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sorted(mappings: &[AccountMapping]) -> Vec<AccountMapping> {
    let mut out = mappings.to_vec();
    out.sort();
    out
}

impl Resource for ApplicationResource {
    type State = ApplicationState;

    fn type_name(&self) -> &'static str {
        "application"
    }

    fn create(&self, plan: &ApplicationState) -> Result<ApplicationState> {
        required("name", &plan.name)?;
        required("application_type", &plan.application_type)?;
        required("version", &plan.version)?;
        let (plain, sensitive) = configured_properties(plan)?;
        let properties = wire_properties(&plain, &sensitive);
        self.check_catalog(plan, &properties)?;

        let created: Application = self.api.client().post_json(
            self.api.cancel(),
            "apps",
            &application_body(plan),
            LockKey::Application,
        )?;
        log::info!("Created application {} ({})", created.name, created.id);

        let mut state = plan.clone();
        state.id = Value::Known(created.id.clone());
        state.root_environment_group_id = created.root_environment_group_id.clone().into();
        if plan.sensitive_properties.is_known() {
            state.sensitive_properties = Value::Known(sensitive);
        }

        // The app exists now; later failures leave it in place and in state.
        if let Err(e) = self.configure(&created.id, &properties, plan) {
            return Err(PartialApply::error(&state, format!("{e:#}")));
        }
        self.read_back(&state)
    }

    fn read(&self, prior: &ApplicationState) -> Result<Option<ApplicationState>> {
        let id = known("application id", &prior.id)?;
        let app: Option<Application> = self
            .api
            .client()
            .get_json(self.api.cancel(), &format!("apps/{id}"), LockKey::Application)
            .not_found_as_none()?;
        Ok(app.map(|app| from_server(app, prior)))
    }

    fn update(&self, plan: &ApplicationState, prior: &ApplicationState) -> Result<ApplicationState> {
        let id = known("application id", &prior.id)?;
        required("name", &plan.name)?;
        let (plain, sensitive) = configured_properties(plan)?;
        let properties = wire_properties(&plain, &sensitive);
        self.check_catalog(plan, &properties)?;

        let description_changed = plan
            .description
            .known()
            .is_some_and(|d| Some(d) != prior.description.known());
        if plan.name != prior.name || plan.version != prior.version || description_changed {
            self.api
                .client()
                .patch(
                    self.api.cancel(),
                    &format!("apps/{id}"),
                    &application_body(plan),
                    LockKey::Application,
                )
                .allow_no_content()?;
        }
        self.configure(id, &properties, plan)?;

        let mut state = plan.clone();
        state.id = prior.id.clone();
        if plan.sensitive_properties.is_known() {
            state.sensitive_properties = Value::Known(sensitive);
        }
        self.read_back(&state)
    }

    fn delete(&self, prior: &ApplicationState) -> Result<()> {
        let id = known("application id", &prior.id)?;
        deleted(self.api.client().delete(
            self.api.cancel(),
            &format!("apps?appContainerId={id}"),
            LockKey::Application,
        ))
    }

    fn import(&self, id: &str) -> Result<ApplicationState> {
        let fields = ImportFormats::new(formats::APPLICATION)?.parse(id)?;
        Ok(ApplicationState {
            id: Value::Known(fields.get("app")?.to_string()),
            ..ApplicationState::default()
        })
    }

    fn needs_update(&self, plan: &ApplicationState, state: &ApplicationState) -> Result<bool> {
        if plan.name != state.name
            || !plan.application_type.eq_ignore_ascii_case(&state.application_type)
            || plan.version != state.version
        {
            return Ok(true);
        }
        if let Some(description) = plan.description.known()
            && Some(description) != state.description.known()
        {
            return Ok(true);
        }
        if let Some(properties) = plan.properties.known()
            && !same_properties(properties, state.properties.known())
        {
            return Ok(true);
        }
        if let Some(secrets) = plan.sensitive_properties.known() {
            let secrets = dedupe(secrets.clone())?;
            if !same_secrets(&secrets, state.sensitive_properties.known())? {
                return Ok(true);
            }
        }
        if let Some(mappings) = plan.user_account_mappings.known() {
            let current = state.user_account_mappings.known().map(|m| sorted(m));
            if current != Some(sorted(mappings)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn requires_replace(&self, plan: &ApplicationState, state: &ApplicationState) -> Result<bool> {
        Ok(!plan.application_type.eq_ignore_ascii_case(&state.application_type))
    }

    fn sensitive_attributes(&self) -> &'static [&'static str] {
        &["sensitive_properties"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing;
    use pamclient::transport::Method;
    use serde_json::json;
    use std::time::Duration;

    fn catalog() -> serde_json::Value {
        json!([{
            "type": "Snowflake",
            "versions": [{
                "version": "1.0",
                "properties": [
                    {"name": "retries", "type": "java.lang.Integer"},
                    {"name": "sso", "type": "java.lang.Boolean"}
                ]
            }]
        }])
    }

    fn plan() -> ApplicationState {
        ApplicationState {
            name: "crm".into(),
            application_type: "Snowflake".into(),
            version: "1.0".into(),
            properties: Value::Known(vec![Property::new("displayName", "x")]),
            sensitive_properties: Value::Known(vec![Property::new("password", "hunter2")]),
            ..ApplicationState::default()
        }
    }

    fn served(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": "crm",
            "type": "Snowflake",
            "version": "1.0",
            "rootEnvironmentGroupId": "g0",
            "properties": [
                {"name": "displayName", "type": "java.lang.String", "value": "x"},
                {"name": "password", "type": "Secret", "value": "*"},
                {"name": "iconUrl", "type": "java.lang.String", "value": "https://icons/x.png"},
                {"name": "retries", "type": "java.lang.Integer", "value": "3"}
            ]
        })
    }

    #[test]
    fn test_create_writes_app_then_properties() {
        let (api, mock) = testing::api();
        mock.respond_json(Method::Get, "/system/apps", 200, &catalog());
        mock.respond_json(Method::Post, "/apps", 201, &json!({"id": "a1", "name": "crm", "type": "Snowflake", "version": "1.0", "rootEnvironmentGroupId": "g0"}));
        mock.respond(Method::Patch, "/apps/a1/properties", 204, "");
        mock.respond_json(Method::Get, "/apps/a1", 200, &served("a1"));

        let state = ApplicationResource::new(api).create(&plan()).unwrap();

        assert_eq!(state.id, Value::Known("a1".to_string()));
        assert_eq!(state.root_environment_group_id, Value::Known("g0".to_string()));
        assert_eq!(
            state.sensitive_properties,
            Value::Known(vec![Property::new("password", "hunter2")])
        );
        assert_eq!(
            state.properties,
            Value::Known(vec![Property::new("displayName", "x")])
        );

        let post = &mock.requests_to(Method::Post, "/apps")[0];
        assert_eq!(post.json().unwrap()["type"], "Snowflake");
        let patch = &mock.requests_to(Method::Patch, "/apps/a1/properties")[0];
        assert_eq!(patch.json().unwrap()["properties"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_masked_secret_read_without_drift() {
        let (api, mock) = testing::api();
        mock.respond_json(Method::Get, "/apps/a1", 200, &served("a1"));
        let resource = ApplicationResource::new(api);

        let mut prior = plan();
        prior.id = Value::Known("a1".into());
        let state = resource.read(&prior).unwrap().unwrap();

        assert_eq!(
            state.sensitive_properties,
            Value::Known(vec![Property::new("password", "hunter2")])
        );
        assert!(!resource.needs_update(&plan(), &state).unwrap());
    }

    #[test]
    fn test_imported_masked_secret_is_empty() {
        let (api, mock) = testing::api();
        mock.respond_json(Method::Get, "/apps/a1", 200, &served("a1"));
        let resource = ApplicationResource::new(api);

        let skeleton = resource.import("apps/a1").unwrap();
        let state = resource.read(&skeleton).unwrap().unwrap();

        assert_eq!(
            state.sensitive_properties,
            Value::Known(vec![Property::new("password", "")])
        );
        assert_eq!(state.properties, Value::Null);
        assert!(resource.needs_update(&plan(), &state).unwrap());
    }

    #[test]
    fn test_app_without_secrets_reads_null() {
        let mut app: Application = serde_json::from_value(served("a1")).unwrap();
        app.properties.retain(|p| !p.is_secret());
        let state = from_server(app, &ApplicationState::default());
        assert_eq!(state.sensitive_properties, Value::Null);
    }

    #[test]
    fn test_hashed_secret_is_not_drift() {
        let (api, _) = testing::api();
        let resource = ApplicationResource::new(api);
        let mut state = plan();
        state.id = Value::Known("a1".into());

        let mut hashed = plan();
        hashed.sensitive_properties = Value::Known(vec![Property::new(
            "password",
            drift::sensitive::hash_value("hunter2").unwrap(),
        )]);
        assert!(!resource.needs_update(&hashed, &state).unwrap());

        let mut changed = plan();
        changed.sensitive_properties = Value::Known(vec![Property::new("password", "hunter3")]);
        assert!(resource.needs_update(&changed, &state).unwrap());
    }

    #[test]
    fn test_unknown_version_rejected_before_create() {
        let (api, mock) = testing::api();
        mock.respond_json(Method::Get, "/system/apps", 200, &catalog());
        let mut plan = plan();
        plan.version = "9.9".into();

        let err = ApplicationResource::new(api).create(&plan).unwrap_err();
        assert!(format!("{err:#}").contains("9.9"));
        assert!(mock.requests_to(Method::Post, "/apps").is_empty());
    }

    #[test]
    fn test_boolean_property_validated() {
        let (api, mock) = testing::api();
        mock.respond_json(Method::Get, "/system/apps", 200, &catalog());
        let mut plan = plan();
        plan.properties = Value::Known(vec![Property::new("sso", "maybe")]);

        assert!(ApplicationResource::new(api).create(&plan).is_err());
        assert!(mock.requests_to(Method::Post, "/apps").is_empty());
    }

    #[test]
    fn test_duplicate_property_name_rejected() {
        let mut plan = plan();
        plan.properties = Value::Known(vec![Property::new("password", "x")]);
        assert!(configured_properties(&plan).is_err());
    }

    #[test]
    fn test_mapping_failure_keeps_created_app() {
        let (api, mock) = testing::api();
        mock.respond_json(Method::Get, "/system/apps", 200, &catalog());
        mock.respond_json(Method::Post, "/apps", 201, &json!({"id": "a1", "name": "crm", "type": "Snowflake", "version": "1.0"}));
        mock.respond(Method::Patch, "/apps/a1/properties", 204, "");
        mock.respond(Method::Post, "/apps/a1/user-account-mappings", 500, "boom");
        let mut plan = plan();
        plan.user_account_mappings = Value::Known(vec![AccountMapping {
            account_name: "svc".into(),
            user_attribute: "email".into(),
        }]);

        let err = ApplicationResource::new(api).create(&plan).unwrap_err();
        let partial = err.downcast_ref::<PartialApply>().unwrap();
        assert_eq!(partial.state["id"], "a1");
        assert!(partial.message.contains("user account mappings"));
        assert!(mock.requests_to(Method::Delete, "/apps").is_empty());
    }

    #[test]
    fn test_concurrent_creates_are_serialized() {
        let mock = pamclient::transport::MockExecutor::new().with_latency(Duration::from_millis(20));
        let client =
            pamclient::Client::with_executor("https://t.example", "tok", mock.clone());
        let api = Api::new(client, pamclient::CancelToken::new());

        mock.respond_json(Method::Get, "/system/apps", 200, &catalog());
        mock.respond_json(Method::Post, "/apps", 201, &json!({"id": "a1", "name": "crm", "type": "Snowflake", "version": "1.0"}));
        mock.respond_json(Method::Post, "/apps", 201, &json!({"id": "a2", "name": "erp", "type": "Snowflake", "version": "1.0"}));
        mock.respond_json(Method::Get, "/apps/a1", 200, &served("a1"));
        mock.respond_json(Method::Get, "/apps/a2", 200, &served("a2"));

        let bare = |name: &str| ApplicationState {
            name: name.into(),
            application_type: "Snowflake".into(),
            version: "1.0".into(),
            ..ApplicationState::default()
        };
        let resource = ApplicationResource::new(api);
        std::thread::scope(|s| {
            let a = s.spawn(|| resource.create(&bare("crm")));
            let b = s.spawn(|| resource.create(&bare("erp")));
            assert!(a.join().unwrap().is_ok());
            assert!(b.join().unwrap().is_ok());
        });

        assert_eq!(mock.requests_to(Method::Post, "/apps").len(), 2);
        assert_eq!(mock.max_in_flight(), 1);
    }

    #[test]
    fn test_delete_and_import() {
        let (api, mock) = testing::api();
        mock.respond(Method::Delete, "/apps?appContainerId=a1", 404, "");
        let resource = ApplicationResource::new(api);

        let skeleton = resource.import("apps/a1").unwrap();
        assert_eq!(skeleton.id, Value::Known("a1".to_string()));
        assert!(resource.delete(&skeleton).is_ok());
        assert!(resource.import("apps/a1/extra").is_err());
    }
}
