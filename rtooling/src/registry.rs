//! Session registry mapping capability names to the backend that serves them.
//!
//! Registration is last-write-wins by default. Descriptor lists keep the
//! position of the first registration, so re-running discovery never
//! duplicates entries.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rtooling::{Backend, LocalBackend, SessionRegistry, ToolDescriptor};
//!
//! let backend: Arc<dyn Backend> = Arc::new(LocalBackend::new("research"));
//! let mut registry = SessionRegistry::new();
//! let tool = ToolDescriptor::new("search_papers", "Search arXiv", serde_json::json!({}));
//!
//! registry.register_tool(tool.clone(), Arc::clone(&backend)).expect("first insert");
//! registry.register_tool(tool, backend).expect("idempotent insert");
//!
//! assert_eq!(registry.tools().count(), 1);
//! assert!(registry.resolve_tool("search_papers").is_some());
//! ```

use std::sync::Arc;

use rcommon::OrderedRegistry;
use rprovider::ToolDefinition;

use crate::capability::split_scheme;
use crate::{Backend, PromptDescriptor, ResourceDescriptor, ToolDescriptor, ToolError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Later registrations replace earlier ones.
    #[default]
    LastWins,
    /// The first backend keeps the name; later ones are rejected.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Inserted,
    /// Re-registered by the backend that already owned the key.
    Refreshed,
    /// Ownership moved from `previous` to the new backend.
    Replaced { previous: String },
}

#[derive(Clone)]
struct Entry<T> {
    descriptor: T,
    backend: Arc<dyn Backend>,
}

#[derive(Default)]
pub struct SessionRegistry {
    policy: CollisionPolicy,
    tools: OrderedRegistry<String, Entry<ToolDescriptor>>,
    prompts: OrderedRegistry<String, Entry<PromptDescriptor>>,
    resources: OrderedRegistry<String, Entry<ResourceDescriptor>>,
    templates: OrderedRegistry<String, Entry<ResourceDescriptor>>,
    schemes: OrderedRegistry<String, Arc<dyn Backend>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    pub fn register_tool(
        &mut self,
        descriptor: ToolDescriptor,
        backend: Arc<dyn Backend>,
    ) -> Result<Registration, ToolError> {
        let key = descriptor.name.clone();
        insert_entry(
            &mut self.tools,
            self.policy,
            "tool",
            key,
            Entry {
                descriptor,
                backend,
            },
        )
    }

    pub fn register_prompt(
        &mut self,
        descriptor: PromptDescriptor,
        backend: Arc<dyn Backend>,
    ) -> Result<Registration, ToolError> {
        let key = descriptor.name.clone();
        insert_entry(
            &mut self.prompts,
            self.policy,
            "prompt",
            key,
            Entry {
                descriptor,
                backend,
            },
        )
    }

    /// Registers a literal resource by URI, or a template plus its scheme.
    pub fn register_resource(
        &mut self,
        descriptor: ResourceDescriptor,
        backend: Arc<dyn Backend>,
    ) -> Result<Registration, ToolError> {
        let key = descriptor.uri.as_str().to_string();
        if !descriptor.uri.is_template() {
            return insert_entry(
                &mut self.resources,
                self.policy,
                "resource",
                key,
                Entry {
                    descriptor,
                    backend,
                },
            );
        }

        let scheme = descriptor.uri.scheme().map(ToString::to_string);
        let registration = insert_entry(
            &mut self.templates,
            self.policy,
            "resource template",
            key,
            Entry {
                descriptor,
                backend: Arc::clone(&backend),
            },
        )?;

        if let Some(scheme) = scheme {
            let owner = self
                .schemes
                .get(&scheme)
                .map(|existing| existing.name().to_string());
            match owner {
                Some(owner) if owner != backend.name() && self.policy == CollisionPolicy::Reject => {
                    return Err(ToolError::collision(format!(
                        "resource scheme '{scheme}' is already served by backend '{owner}'"
                    )));
                }
                Some(owner) if owner != backend.name() => {
                    tracing::warn!(
                        scheme = %scheme,
                        previous = %owner,
                        backend = %backend.name(),
                        "resource scheme re-registered; last registration wins"
                    );
                    self.schemes.insert(scheme, backend);
                }
                _ => {
                    self.schemes.insert(scheme, backend);
                }
            }
        }

        Ok(registration)
    }

    pub fn resolve_tool(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.tools.get(name).map(|entry| Arc::clone(&entry.backend))
    }

    pub fn resolve_prompt(&self, name: &str) -> Option<(&PromptDescriptor, Arc<dyn Backend>)> {
        self.prompts
            .get(name)
            .map(|entry| (&entry.descriptor, Arc::clone(&entry.backend)))
    }

    /// Exact URI first, then a structurally matching template, then the
    /// template registered for the URI's scheme.
    pub fn resolve_resource(&self, uri: &str) -> Option<Arc<dyn Backend>> {
        if let Some(entry) = self.resources.get(uri) {
            return Some(Arc::clone(&entry.backend));
        }

        if let Some(entry) = self
            .templates
            .values()
            .find(|entry| entry.descriptor.uri.matches(uri))
        {
            return Some(Arc::clone(&entry.backend));
        }

        let (scheme, _) = split_scheme(uri)?;
        self.schemes.get(scheme).map(Arc::clone)
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values().map(|entry| &entry.descriptor)
    }

    pub fn prompts(&self) -> impl Iterator<Item = &PromptDescriptor> {
        self.prompts.values().map(|entry| &entry.descriptor)
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.values().map(|entry| &entry.descriptor)
    }

    pub fn templates(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.templates.values().map(|entry| &entry.descriptor)
    }

    /// Tool definitions in registration order, as offered to the model.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools().map(ToolDescriptor::definition).collect()
    }

    pub fn owner_of_tool(&self, name: &str) -> Option<&str> {
        self.tools.get(name).map(|entry| entry.backend.name())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
            && self.prompts.is_empty()
            && self.resources.is_empty()
            && self.templates.is_empty()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("policy", &self.policy)
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("prompts", &self.prompts.keys().collect::<Vec<_>>())
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn insert_entry<T>(
    table: &mut OrderedRegistry<String, Entry<T>>,
    policy: CollisionPolicy,
    category: &str,
    key: String,
    entry: Entry<T>,
) -> Result<Registration, ToolError> {
    let previous = table
        .get(&key)
        .map(|existing| existing.backend.name().to_string());
    let backend = entry.backend.name().to_string();

    let registration = match previous {
        None => Registration::Inserted,
        Some(previous) if previous == backend => Registration::Refreshed,
        Some(previous) => {
            if policy == CollisionPolicy::Reject {
                return Err(ToolError::collision(format!(
                    "{category} '{key}' from backend '{backend}' collides with backend '{previous}'"
                )));
            }
            tracing::warn!(
                category,
                key = %key,
                previous = %previous,
                backend = %backend,
                "capability re-registered; last registration wins"
            );
            Registration::Replaced { previous }
        }
    };

    table.insert(key, entry);
    Ok(registration)
}
