//! Resource lifecycle traits.
//!
//! A [`Resource`] manages one kind of remote entity through five verbs:
//! create, read, update, delete and import. Implementations work on a typed
//! `State`; the engine stores every resource behind the type-erased
//! [`DynResource`], which speaks `serde_json::Value`.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Lifecycle of one kind of managed entity.
///
/// # Example
///
/// ```
/// use declarative::{Resource, Value};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct NoteState {
///     #[serde(default)]
///     id: Value<String>,
///     text: String,
/// }
///
/// struct Note;
///
/// impl Resource for Note {
///     type State = NoteState;
///
///     fn type_name(&self) -> &'static str {
///         "note"
///     }
///
///     fn create(&self, plan: &NoteState) -> anyhow::Result<NoteState> {
///         Ok(NoteState { id: Value::Known("n1".into()), ..plan.clone() })
///     }
///
///     fn read(&self, prior: &NoteState) -> anyhow::Result<Option<NoteState>> {
///         Ok(Some(prior.clone()))
///     }
///
///     fn update(&self, plan: &NoteState, prior: &NoteState) -> anyhow::Result<NoteState> {
///         Ok(NoteState { id: prior.id.clone(), ..plan.clone() })
///     }
///
///     fn delete(&self, _prior: &NoteState) -> anyhow::Result<()> {
///         Ok(())
///     }
///
///     fn import(&self, id: &str) -> anyhow::Result<NoteState> {
///         Ok(NoteState { id: Value::Known(id.into()), ..NoteState::default() })
///     }
/// }
/// ```
pub trait Resource: Send + Sync {
    /// Attributes held in state.
    type State: Serialize + DeserializeOwned + Clone + Send + fmt::Debug;

    /// Type name used in manifests and state addresses.
    fn type_name(&self) -> &'static str;

    /// Create the entity and return its state.
    fn create(&self, plan: &Self::State) -> Result<Self::State>;

    /// Refresh state from the server. `None` means the entity is gone.
    fn read(&self, prior: &Self::State) -> Result<Option<Self::State>>;

    fn update(&self, plan: &Self::State, prior: &Self::State) -> Result<Self::State>;

    fn delete(&self, prior: &Self::State) -> Result<()>;

    /// Build a skeleton state from a user-typed id. The engine reads it
    /// afterwards to fill in the rest.
    fn import(&self, id: &str) -> Result<Self::State>;

    /// Whether `state` differs from what `plan` asks for.
    ///
    /// The default compares the attributes `plan` sets; resources whose
    /// server form differs in spelling override this.
    fn needs_update(&self, plan: &Self::State, state: &Self::State) -> Result<bool> {
        Ok(configured_differs(
            &serde_json::to_value(plan)?,
            &serde_json::to_value(state)?,
        ))
    }

    /// Whether a change can only be applied by deleting and recreating.
    fn requires_replace(&self, _plan: &Self::State, _state: &Self::State) -> Result<bool> {
        Ok(false)
    }

    /// Attributes whose values are masked in plan output.
    fn sensitive_attributes(&self) -> &'static [&'static str] {
        &[]
    }
}

/// Type-erased [`Resource`] over JSON attributes.
pub trait DynResource: Send + Sync {
    fn type_name(&self) -> &'static str;
    /// Check that a configuration decodes into the resource's state.
    fn validate(&self, plan: &Json) -> Result<()>;
    fn create(&self, plan: &Json) -> Result<Json>;
    fn read(&self, prior: &Json) -> Result<Option<Json>>;
    fn update(&self, plan: &Json, prior: &Json) -> Result<Json>;
    fn delete(&self, prior: &Json) -> Result<()>;
    fn import(&self, id: &str) -> Result<Json>;
    fn needs_update(&self, plan: &Json, state: &Json) -> Result<bool>;
    fn requires_replace(&self, plan: &Json, state: &Json) -> Result<bool>;
    fn sensitive_attributes(&self) -> &'static [&'static str];
}

impl<R: Resource> DynResource for R {
    fn type_name(&self) -> &'static str {
        Resource::type_name(self)
    }

    fn validate(&self, plan: &Json) -> Result<()> {
        decode(self, plan).map(|_| ())
    }

    fn create(&self, plan: &Json) -> Result<Json> {
        encode(&Resource::create(self, &decode(self, plan)?)?)
    }

    fn read(&self, prior: &Json) -> Result<Option<Json>> {
        Resource::read(self, &decode(self, prior)?)?
            .map(|state| encode(&state))
            .transpose()
    }

    fn update(&self, plan: &Json, prior: &Json) -> Result<Json> {
        let (plan, prior) = (decode(self, plan)?, decode(self, prior)?);
        encode(&Resource::update(self, &plan, &prior)?)
    }

    fn delete(&self, prior: &Json) -> Result<()> {
        Resource::delete(self, &decode(self, prior)?)
    }

    fn import(&self, id: &str) -> Result<Json> {
        encode(&Resource::import(self, id)?)
    }

    fn needs_update(&self, plan: &Json, state: &Json) -> Result<bool> {
        Resource::needs_update(self, &decode(self, plan)?, &decode(self, state)?)
    }

    fn requires_replace(&self, plan: &Json, state: &Json) -> Result<bool> {
        Resource::requires_replace(self, &decode(self, plan)?, &decode(self, state)?)
    }

    fn sensitive_attributes(&self) -> &'static [&'static str] {
        Resource::sensitive_attributes(self)
    }
}

/// Import an entity by id and read its full state.
pub fn import_and_read(resource: &dyn DynResource, id: &str) -> Result<Json> {
    let skeleton = resource
        .import(id)
        .with_context(|| format!("cannot import {} '{id}'", resource.type_name()))?;
    resource
        .read(&skeleton)?
        .with_context(|| format!("{} '{id}' does not exist", resource.type_name()))
}

fn decode<R: Resource>(resource: &R, value: &Json) -> Result<R::State> {
    serde_json::from_value(value.clone())
        .with_context(|| format!("invalid {} attributes", Resource::type_name(resource)))
}

fn encode<S: Serialize>(state: &S) -> Result<Json> {
    Ok(serde_json::to_value(state)?)
}

/// Whether any attribute set in `plan` has a different value in `state`.
///
/// Null attributes in the plan are unconstrained and ignored.
pub fn configured_differs(plan: &Json, state: &Json) -> bool {
    match (plan, state) {
        (Json::Object(plan), Json::Object(state)) => plan.iter().any(|(key, value)| {
            !value.is_null() && state.get(key).is_none_or(|current| current != value)
        }),
        _ => plan != state,
    }
}

/// Shared handle to a type-erased resource.
pub type BoxedResource = Arc<dyn DynResource>;

/// Resources by type name.
#[derive(Default, Clone)]
pub struct Registry {
    resources: BTreeMap<&'static str, BoxedResource>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resource: impl DynResource + 'static) {
        self.resources.insert(resource.type_name(), Arc::new(resource));
    }

    pub fn get(&self, type_name: &str) -> Option<&BoxedResource> {
        self.resources.get(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.resources.keys()).finish()
    }
}
