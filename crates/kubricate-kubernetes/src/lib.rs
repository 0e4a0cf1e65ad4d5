//! Kubernetes secret providers for the kubricate composition engine.
//!
//! Two providers cover the common delivery shapes:
//!
//! - [`OpaqueSecretProvider`] renders values into an Opaque `v1/Secret` and
//!   injects `secretKeyRef` environment entries referencing it.
//! - [`ImagePullSecretProvider`] renders registry credentials into a
//!   `kubernetes.io/dockerconfigjson` Secret and injects the pod template's
//!   `imagePullSecrets` entry.
//!
//! Both merge effects by `namespace/name` of the manifest they create, so
//! several secrets routed through one provider collapse into a single
//! Secret object.
//!
//! ```
//! use kubricate_core::composer::ResourceComposer;
//! use kubricate_core::secrets::{InMemoryConnector, SecretManager};
//! use kubricate_core::stack::Stack;
//! use kubricate_kubernetes::{OpaqueSecretProvider, OpaqueSecretProviderConfig};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let composer = ResourceComposer::new().add_object(
//!     "app",
//!     json!({
//!         "apiVersion": "apps/v1",
//!         "kind": "Deployment",
//!         "metadata": {"name": "app"},
//!         "spec": {"template": {"spec": {"containers": [{"name": "app"}]}}}
//!     }),
//! )?;
//!
//! let manager = SecretManager::new()
//!     .add_secret("API_KEY")?
//!     .add_connector(
//!         "memory",
//!         Box::new(InMemoryConnector::new().with_secret("API_KEY", "s3cret")),
//!     )?
//!     .add_provider(
//!         "opaque",
//!         Box::new(OpaqueSecretProvider::new(OpaqueSecretProviderConfig::new(
//!             "app-secrets",
//!         ))),
//!     )?;
//!
//! let mut stack = Stack::from_composer("demo", composer);
//! stack.use_secrets(manager, |secrets| {
//!     secrets.secrets("API_KEY");
//! })?;
//! stack.inject_secrets()?;
//!
//! let resources = stack.build()?;
//! let env = &resources[0]["spec"]["template"]["spec"]["containers"][0]["env"];
//! assert_eq!(env[0]["name"], "API_KEY");
//! assert_eq!(env[0]["valueFrom"]["secretKeyRef"]["name"], "app-secrets");
//!
//! let effects = stack.prepare_secret_effects()?;
//! assert_eq!(effects[0].value["kind"], "Secret");
//! # Ok(())
//! # }
//! ```

mod image_pull;
mod merge;
mod opaque;

pub use image_pull::{
    DockerRegistryCredentials, ImagePullSecretProvider, ImagePullSecretProviderConfig,
};
pub use merge::{kubernetes_effect_identifier, merge_kubernetes_effects};
pub use opaque::{OpaqueSecretProvider, OpaqueSecretProviderConfig};
