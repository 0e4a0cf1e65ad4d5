//! Stacks: a composer plus secret wiring.
//!
//! A [`Stack`] owns a [`ResourceComposer`] and any number of
//! [`SecretManager`]s, and records declarative injection plans built inside
//! [`Stack::use_secrets`]. Calling [`Stack::inject_secrets`] resolves each
//! plan to a concrete resource and path, then injects the provider's
//! payload through the composer's merge rules. Secrets are injected once;
//! building can happen any number of times after.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use crate::composer::ResourceComposer;
use crate::error::ComposeError;
use crate::logging::SharedLogger;
use crate::secrets::{
    InjectionMeta, PreparedEffect, Provider, ProviderError, ProviderInjection,
    SecretInjectionStrategy, SecretManager, SecretManagerError,
};

/// Manager id used by [`Stack::use_secrets`].
pub const DEFAULT_SECRET_MANAGER_ID: &str = "default";

/// Errors raised by stack orchestration.
#[derive(Error, Debug)]
pub enum StackError {
    #[error("secret manager with id `{id}` already exists in this stack")]
    DuplicateManager { id: String },

    #[error("secret manager with id `{id}` is not defined")]
    ManagerNotFound { id: String },

    #[error("secret `{name}` is not declared in secret manager `{manager_id}`")]
    UndeclaredSecret { name: String, manager_id: String },

    /// No registered resource carries the provider's target kind.
    #[error("no resource of kind `{kind}` found to inject secrets into")]
    TargetNotFound { kind: String },

    /// More than one resource carries the target kind and the plan named
    /// none of them.
    #[error("multiple resources of kind `{kind}` match; name the target resource explicitly")]
    AmbiguousTarget { kind: String },

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    SecretManager(#[from] SecretManagerError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub type StackResult<T> = Result<T, StackError>;

/// One declared secret injection.
#[derive(Debug, Clone)]
pub struct SecretInjection {
    pub manager_id: String,
    pub secret_name: String,
    /// Provider reference; `None` follows the manager's resolution rules.
    pub provider_id: Option<String>,
    /// Target resource; `None` auto-selects by the provider's target kind.
    pub resource_id: Option<String>,
    /// Rename for the injected reference, e.g. the env var name.
    pub target_name: Option<String>,
    pub strategy: SecretInjectionStrategy,
}

impl SecretInjection {
    fn new(manager_id: &str, secret_name: impl Into<String>) -> Self {
        Self {
            manager_id: manager_id.to_string(),
            secret_name: secret_name.into(),
            provider_id: None,
            resource_id: None,
            target_name: None,
            strategy: SecretInjectionStrategy::default(),
        }
    }
}

/// Scope handed to the closure of [`Stack::use_secrets`].
pub struct SecretsInjectionContext<'a> {
    manager_id: &'a str,
    plans: &'a mut Vec<SecretInjection>,
}

impl SecretsInjectionContext<'_> {
    /// Declare an injection for one named secret. The returned builder
    /// refines the plan; dropping it keeps the defaults.
    pub fn secrets(&mut self, name: impl Into<String>) -> SecretInjectionBuilder<'_> {
        self.plans.push(SecretInjection::new(self.manager_id, name));
        let index = self.plans.len() - 1;
        SecretInjectionBuilder {
            plan: &mut self.plans[index],
        }
    }
}

/// Refines one injection plan.
pub struct SecretInjectionBuilder<'a> {
    plan: &'a mut SecretInjection,
}

impl SecretInjectionBuilder<'_> {
    /// Route through a specific provider instead of the manager's default.
    pub fn with_provider(self, id: impl Into<String>) -> Self {
        self.plan.provider_id = Some(id.into());
        self
    }

    /// Inject into a specific registered resource instead of auto-selecting
    /// by the provider's target kind.
    pub fn into_resource(self, id: impl Into<String>) -> Self {
        self.plan.resource_id = Some(id.into());
        self
    }

    /// Name the injected reference differently from the secret itself.
    pub fn with_target_name(self, name: impl Into<String>) -> Self {
        self.plan.target_name = Some(name.into());
        self
    }

    pub fn with_strategy(self, strategy: SecretInjectionStrategy) -> Self {
        self.plan.strategy = strategy;
        self
    }
}

/// A named unit of deployable resources with secret wiring.
pub struct Stack {
    name: String,
    composer: ResourceComposer,
    managers: IndexMap<String, SecretManager>,
    plans: Vec<SecretInjection>,
    injected: bool,
    logger: Option<SharedLogger>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_composer(name, ResourceComposer::new())
    }

    pub fn from_composer(name: impl Into<String>, composer: ResourceComposer) -> Self {
        Self {
            name: name.into(),
            composer,
            managers: IndexMap::new(),
            plans: Vec::new(),
            injected: false,
            logger: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn composer(&self) -> &ResourceComposer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut ResourceComposer {
        &mut self.composer
    }

    /// Replace the composer wholesale, keeping secret wiring.
    pub fn set_composer(&mut self, composer: ResourceComposer) {
        self.composer = composer;
    }

    /// Attach a secret manager under the default id and declare injections
    /// inside `build`.
    pub fn use_secrets<F>(&mut self, manager: SecretManager, build: F) -> StackResult<()>
    where
        F: FnOnce(&mut SecretsInjectionContext<'_>),
    {
        self.use_secrets_with_id(DEFAULT_SECRET_MANAGER_ID, manager, build)
    }

    /// Attach a secret manager under an explicit id. Ids must be unique
    /// within the stack.
    pub fn use_secrets_with_id<F>(
        &mut self,
        id: impl Into<String>,
        mut manager: SecretManager,
        build: F,
    ) -> StackResult<()>
    where
        F: FnOnce(&mut SecretsInjectionContext<'_>),
    {
        let id = id.into();
        if self.managers.contains_key(&id) {
            return Err(StackError::DuplicateManager { id });
        }
        if let Some(logger) = &self.logger {
            manager.set_logger(Arc::clone(logger));
        }
        let mut context = SecretsInjectionContext {
            manager_id: &id,
            plans: &mut self.plans,
        };
        build(&mut context);
        self.managers.insert(id, manager);
        Ok(())
    }

    pub fn secret_manager(&self, id: &str) -> StackResult<&SecretManager> {
        self.managers
            .get(id)
            .ok_or_else(|| StackError::ManagerNotFound { id: id.to_string() })
    }

    pub fn default_secret_manager(&self) -> StackResult<&SecretManager> {
        self.secret_manager(DEFAULT_SECRET_MANAGER_ID)
    }

    pub fn secret_manager_ids(&self) -> Vec<&str> {
        self.managers.keys().map(String::as_str).collect()
    }

    /// See [`ResourceComposer::override_with`].
    pub fn override_with<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.composer.override_with(overrides);
    }

    /// Resolve every declared injection plan and inject the provider
    /// payloads into the composer.
    ///
    /// Plans that resolve to the same provider, resource, and path are
    /// grouped, and the provider computes one payload for the whole group,
    /// in declaration order. Runs once; later calls are no-ops so a stack
    /// can be built repeatedly without doubling injected values. A failed
    /// run leaves every config untouched and can be retried.
    pub fn inject_secrets(&mut self) -> StackResult<()> {
        if self.injected {
            if let Some(logger) = &self.logger {
                logger.debug(&format!(
                    "secrets already injected into stack `{}`",
                    self.name
                ));
            }
            return Ok(());
        }
        let mut groups: IndexMap<(String, String, String, String), Vec<ProviderInjection>> =
            IndexMap::new();
        for plan in &self.plans {
            let (provider_id, resource_id, path) = self.resolve_plan(plan)?;
            let mut meta = InjectionMeta::new(plan.secret_name.clone());
            if let Some(target) = &plan.target_name {
                meta = meta.with_target_name(target.clone());
            }
            groups
                .entry((
                    plan.manager_id.clone(),
                    provider_id,
                    resource_id.clone(),
                    path.clone(),
                ))
                .or_default()
                .push(ProviderInjection {
                    resource_id,
                    path,
                    meta,
                });
        }
        let group_count = groups.len();
        let mut batch: Vec<(String, String, Value)> = Vec::with_capacity(group_count);
        for ((manager_id, provider_id, resource_id, path), injects) in groups {
            let manager = self
                .managers
                .get(&manager_id)
                .ok_or_else(|| StackError::ManagerNotFound {
                    id: manager_id.clone(),
                })?;
            let (_, provider) = manager.resolve_provider(Some(&provider_id))?;
            let payload = provider.injection_payload(&injects);
            batch.push((resource_id, path, payload));
        }
        self.composer.inject_all(batch)?;
        self.injected = true;
        if let Some(logger) = &self.logger {
            logger.info(&format!(
                "injected {group_count} secret payload groups into stack `{}`",
                self.name
            ));
        }
        Ok(())
    }

    fn resolve_plan(&self, plan: &SecretInjection) -> StackResult<(String, String, String)> {
        let manager =
            self.managers
                .get(&plan.manager_id)
                .ok_or_else(|| StackError::ManagerNotFound {
                    id: plan.manager_id.clone(),
                })?;
        if !manager.has_secret(&plan.secret_name) {
            return Err(StackError::UndeclaredSecret {
                name: plan.secret_name.clone(),
                manager_id: plan.manager_id.clone(),
            });
        }
        let (provider_id, provider): (String, &dyn Provider) =
            manager.resolve_provider(plan.provider_id.as_deref())?;
        let path = provider.target_path(&plan.strategy)?;
        let resource_id = match &plan.resource_id {
            Some(id) => {
                if !self.composer.contains(id) {
                    return Err(ComposeError::entry_not_found(id).into());
                }
                id.clone()
            }
            None => {
                let matches = self.composer.find_resource_ids_by_kind(provider.target_kind())?;
                match matches.as_slice() {
                    [only] => only.clone(),
                    [] => {
                        return Err(StackError::TargetNotFound {
                            kind: provider.target_kind().to_string(),
                        })
                    }
                    _ => {
                        return Err(StackError::AmbiguousTarget {
                            kind: provider.target_kind().to_string(),
                        })
                    }
                }
            }
        };
        Ok((provider_id, resource_id, path))
    }

    /// Build the stack's manifest set. Requires nothing; stacks without
    /// secret wiring are just a named composer.
    pub fn build(&self) -> StackResult<Vec<Value>> {
        Ok(self.composer.build()?)
    }

    /// Load every manager's secrets and collect their prepared effects, in
    /// manager registration order.
    pub fn prepare_secret_effects(&mut self) -> StackResult<Vec<PreparedEffect>> {
        let mut effects = Vec::new();
        for manager in self.managers.values_mut() {
            effects.extend(manager.prepare_effects()?);
        }
        Ok(effects)
    }

    /// Attach a logger to the stack, its composer, and every manager
    /// registered so far (including their connectors and providers).
    pub fn inject_logger(&mut self, logger: SharedLogger) {
        self.composer.set_logger(Arc::clone(&logger));
        for manager in self.managers.values_mut() {
            manager.set_logger(Arc::clone(&logger));
        }
        self.logger = Some(logger);
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("name", &self.name)
            .field("composer", &self.composer)
            .field("managers", &self.managers.keys().collect::<Vec<_>>())
            .field("plans", &self.plans.len())
            .field("injected", &self.injected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::LABEL_MANAGED_BY_KEY;
    use crate::logging::Logger;
    use crate::secrets::{InMemoryConnector, MockProvider};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn deployment(name: &str) -> Value {
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": name},
            "spec": {"template": {"spec": {"containers": [{"name": "main", "image": name}]}}}
        })
    }

    fn app_stack() -> Stack {
        let composer = ResourceComposer::new()
            .add_object("app", deployment("app"))
            .unwrap();
        Stack::from_composer("app-stack", composer)
    }

    fn manager(secrets: &[(&str, &str)]) -> SecretManager {
        let mut connector = InMemoryConnector::new();
        for (name, value) in secrets {
            connector.set(*name, *value);
        }
        let mut manager = SecretManager::new()
            .add_connector("memory", Box::new(connector))
            .unwrap()
            .add_provider("mock", Box::new(MockProvider::new("app-secrets")))
            .unwrap();
        for (name, _) in secrets {
            manager = manager.add_secret(*name).unwrap();
        }
        manager
    }

    #[test]
    fn test_use_secrets_registers_the_default_manager() {
        let mut stack = app_stack();
        stack.use_secrets(manager(&[("APP_KEY", "x")]), |ctx| {
            ctx.secrets("APP_KEY");
        })
        .unwrap();
        assert!(stack.default_secret_manager().is_ok());
        assert_eq!(stack.secret_manager_ids(), [DEFAULT_SECRET_MANAGER_ID]);

        let err = stack
            .use_secrets(manager(&[]), |_ctx| {})
            .unwrap_err();
        assert!(matches!(err, StackError::DuplicateManager { id } if id == "default"));
    }

    #[test]
    fn test_unknown_manager_lookup_fails() {
        let stack = app_stack();
        assert!(matches!(
            stack.secret_manager("ghost").unwrap_err(),
            StackError::ManagerNotFound { id } if id == "ghost"
        ));
    }

    #[test]
    fn test_inject_secrets_places_env_references() {
        let mut stack = app_stack();
        stack
            .use_secrets(manager(&[("APP_KEY", "x")]), |ctx| {
                ctx.secrets("APP_KEY");
            })
            .unwrap();
        stack.inject_secrets().unwrap();
        let built = stack.build().unwrap();
        assert_eq!(
            built[0]["spec"]["template"]["spec"]["containers"][0]["env"],
            json!([{
                "name": "APP_KEY",
                "valueFrom": {"secretKeyRef": {"name": "app-secrets", "key": "APP_KEY"}}
            }])
        );
        assert_eq!(built[0]["metadata"]["labels"][LABEL_MANAGED_BY_KEY], "kubricate");
    }

    #[test]
    fn test_plans_on_one_path_produce_one_payload_in_declaration_order() {
        let mut stack = app_stack();
        stack
            .use_secrets(manager(&[("DB_URL", "postgres"), ("APP_KEY", "x")]), |ctx| {
                ctx.secrets("DB_URL").with_target_name("DATABASE_URL");
                ctx.secrets("APP_KEY");
            })
            .unwrap();
        stack.inject_secrets().unwrap();
        let built = stack.build().unwrap();
        let env = &built[0]["spec"]["template"]["spec"]["containers"][0]["env"];
        assert_eq!(env.as_array().unwrap().len(), 2);
        assert_eq!(env[0]["name"], "DATABASE_URL");
        assert_eq!(env[0]["valueFrom"]["secretKeyRef"]["key"], "DB_URL");
        assert_eq!(env[1]["name"], "APP_KEY");
    }

    #[test]
    fn test_separate_container_indexes_get_separate_payloads() {
        let mut composer = ResourceComposer::new()
            .add_object("app", deployment("app"))
            .unwrap();
        composer
            .inject(
                "app",
                "spec.template.spec.containers[1]",
                json!({"name": "sidecar"}),
            )
            .unwrap();
        let mut stack = Stack::from_composer("app-stack", composer);
        stack
            .use_secrets(manager(&[("APP_KEY", "x"), ("SIDE_KEY", "y")]), |ctx| {
                ctx.secrets("APP_KEY");
                ctx.secrets("SIDE_KEY")
                    .with_strategy(SecretInjectionStrategy::Env { container_index: 1 });
            })
            .unwrap();
        stack.inject_secrets().unwrap();
        let built = stack.build().unwrap();
        let containers = &built[0]["spec"]["template"]["spec"]["containers"];
        assert_eq!(containers[0]["env"][0]["name"], "APP_KEY");
        assert_eq!(containers[1]["env"][0]["name"], "SIDE_KEY");
    }

    #[test]
    fn test_explicit_resource_target() {
        let composer = ResourceComposer::new()
            .add_object("app", deployment("app"))
            .unwrap()
            .add_object("worker", deployment("worker"))
            .unwrap();
        let mut stack = Stack::from_composer("two-deployments", composer);
        stack
            .use_secrets(manager(&[("APP_KEY", "x")]), |ctx| {
                ctx.secrets("APP_KEY").into_resource("worker");
            })
            .unwrap();
        stack.inject_secrets().unwrap();
        let built = stack.build().unwrap();
        assert!(built[0]["spec"]["template"]["spec"]["containers"][0]
            .get("env")
            .is_none());
        assert_eq!(
            built[1]["spec"]["template"]["spec"]["containers"][0]["env"][0]["name"],
            "APP_KEY"
        );
    }

    #[test]
    fn test_auto_target_requires_exactly_one_match() {
        let composer = ResourceComposer::new()
            .add_object("app", deployment("app"))
            .unwrap()
            .add_object("worker", deployment("worker"))
            .unwrap();
        let mut stack = Stack::from_composer("ambiguous", composer);
        stack
            .use_secrets(manager(&[("APP_KEY", "x")]), |ctx| {
                ctx.secrets("APP_KEY");
            })
            .unwrap();
        assert!(matches!(
            stack.inject_secrets().unwrap_err(),
            StackError::AmbiguousTarget { kind } if kind == "Deployment"
        ));

        let mut empty = Stack::new("no-deployments");
        empty
            .use_secrets(manager(&[("APP_KEY", "x")]), |ctx| {
                ctx.secrets("APP_KEY");
            })
            .unwrap();
        assert!(matches!(
            empty.inject_secrets().unwrap_err(),
            StackError::TargetNotFound { kind } if kind == "Deployment"
        ));
    }

    #[test]
    fn test_explicit_resource_must_exist() {
        let mut stack = app_stack();
        stack
            .use_secrets(manager(&[("APP_KEY", "x")]), |ctx| {
                ctx.secrets("APP_KEY").into_resource("ghost");
            })
            .unwrap();
        assert!(matches!(
            stack.inject_secrets().unwrap_err(),
            StackError::Compose(ComposeError::EntryNotFound { id }) if id == "ghost"
        ));
    }

    #[test]
    fn test_failed_inject_secrets_retry_does_not_duplicate_payloads() {
        let mut stack = app_stack();
        stack
            .use_secrets(manager(&[("APP_KEY", "x"), ("OTHER_KEY", "y")]), |ctx| {
                ctx.secrets("APP_KEY");
                ctx.secrets("OTHER_KEY").into_resource("ghost");
            })
            .unwrap();
        assert!(stack.inject_secrets().is_err());
        assert!(stack.inject_secrets().is_err());
        let resources = stack.build().unwrap();
        let containers = &resources[0]["spec"]["template"]["spec"]["containers"];
        assert!(containers[0].get("env").is_none());
    }

    #[test]
    fn test_conflicting_injection_rolls_back_earlier_groups() {
        let composer = ResourceComposer::new()
            .add_object("app", deployment("app"))
            .unwrap()
            .add_object(
                "broken",
                json!({
                    "kind": "Deployment",
                    "spec": {"template": {"spec": {"containers": [{"name": "main", "env": "nope"}]}}}
                }),
            )
            .unwrap();
        let mut stack = Stack::from_composer("half-broken", composer);
        stack
            .use_secrets(manager(&[("APP_KEY", "x"), ("OTHER_KEY", "y")]), |ctx| {
                ctx.secrets("APP_KEY").into_resource("app");
                ctx.secrets("OTHER_KEY").into_resource("broken");
            })
            .unwrap();
        assert!(matches!(
            stack.inject_secrets().unwrap_err(),
            StackError::Compose(ComposeError::InjectionConflict { id, .. }) if id == "broken"
        ));
        let resources = stack.build().unwrap();
        let app_containers = &resources[0]["spec"]["template"]["spec"]["containers"];
        assert!(app_containers[0].get("env").is_none());
        assert_eq!(
            resources[1]["spec"]["template"]["spec"]["containers"][0]["env"],
            json!("nope")
        );
    }

    #[test]
    fn test_undeclared_secret_is_rejected() {
        let mut stack = app_stack();
        stack
            .use_secrets(manager(&[("APP_KEY", "x")]), |ctx| {
                ctx.secrets("NOT_DECLARED");
            })
            .unwrap();
        assert!(matches!(
            stack.inject_secrets().unwrap_err(),
            StackError::UndeclaredSecret { name, .. } if name == "NOT_DECLARED"
        ));
    }

    #[test]
    fn test_unsupported_strategy_surfaces() {
        let mut stack = app_stack();
        stack
            .use_secrets(manager(&[("APP_KEY", "x")]), |ctx| {
                ctx.secrets("APP_KEY")
                    .with_strategy(SecretInjectionStrategy::ImagePullSecret);
            })
            .unwrap();
        assert!(matches!(
            stack.inject_secrets().unwrap_err(),
            StackError::Provider(ProviderError::UnsupportedStrategy { .. })
        ));
    }

    #[test]
    fn test_inject_secrets_runs_once() {
        let mut stack = app_stack();
        stack
            .use_secrets(manager(&[("APP_KEY", "x")]), |ctx| {
                ctx.secrets("APP_KEY");
            })
            .unwrap();
        stack.inject_secrets().unwrap();
        stack.inject_secrets().unwrap();
        let built = stack.build().unwrap();
        let env = &built[0]["spec"]["template"]["spec"]["containers"][0]["env"];
        assert_eq!(env.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_prepare_secret_effects_merges_per_target() {
        let mut stack = app_stack();
        stack
            .use_secrets(manager(&[("KEY_A", "xxx"), ("KEY_B", "yyy")]), |ctx| {
                ctx.secrets("KEY_A");
                ctx.secrets("KEY_B");
            })
            .unwrap();
        let effects = stack.prepare_secret_effects().unwrap();
        assert_eq!(effects.len(), 1);
        assert_eq!(
            effects[0].value["data"],
            json!({"KEY_A": "xxx", "KEY_B": "yyy"})
        );
    }

    #[derive(Default)]
    struct CountingLogger {
        events: AtomicUsize,
    }

    impl CountingLogger {
        fn count(&self) -> usize {
            self.events.load(Ordering::Relaxed)
        }
    }

    impl Logger for CountingLogger {
        fn debug(&self, _message: &str) {
            self.events.fetch_add(1, Ordering::Relaxed);
        }
        fn info(&self, _message: &str) {
            self.events.fetch_add(1, Ordering::Relaxed);
        }
        fn warn(&self, _message: &str) {
            self.events.fetch_add(1, Ordering::Relaxed);
        }
        fn error(&self, _message: &str) {
            self.events.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_logger_propagates_without_changing_output() {
        let mut silent = app_stack();
        silent
            .use_secrets(manager(&[("APP_KEY", "x")]), |ctx| {
                ctx.secrets("APP_KEY");
            })
            .unwrap();
        silent.inject_secrets().unwrap();
        let expected = silent.build().unwrap();

        let counter = Arc::new(CountingLogger::default());
        let handle = Arc::clone(&counter);
        let mut logged = app_stack();
        logged
            .use_secrets(manager(&[("APP_KEY", "x")]), |ctx| {
                ctx.secrets("APP_KEY");
            })
            .unwrap();
        logged.inject_logger(counter);
        logged.inject_secrets().unwrap();
        assert_eq!(logged.build().unwrap(), expected);
        assert!(handle.count() > 0);
    }
}
