//! Client factory abstraction
//!
//! A [`ClientFactory`] hands out the pieces a host needs to reach a cluster:
//! the raw kubeconfig, a resolved client configuration, a ready client and
//! API discovery. Everything is delegated to `kube`; nothing here talks to
//! the API server until `client` or `discovery` is awaited.

use async_trait::async_trait;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Discovery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Where the factory loads its configuration from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryOptions {
    /// Explicit kubeconfig file; `KUBECONFIG` or `~/.kube/config` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Context to use instead of the kubeconfig's current context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Builds Kubernetes clients for a host
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// The kubeconfig as loaded from disk, without context resolution
    fn raw_kubeconfig(&self) -> Result<Kubeconfig>;

    /// Resolved client configuration
    async fn config(&self) -> Result<Config>;

    /// A client ready for use
    async fn client(&self) -> Result<Client> {
        let config = self.config().await?;
        Ok(Client::try_from(config)?)
    }

    /// Discovery of the API groups and resources served by the cluster
    async fn discovery(&self) -> Result<Discovery> {
        let client = self.client().await?;
        Ok(Discovery::new(client).run().await?)
    }

    /// Namespace selected by the resolved configuration
    async fn namespace(&self) -> Result<String> {
        Ok(self.config().await?.default_namespace)
    }
}

/// Factory backed by a kubeconfig file or the ambient environment
#[derive(Debug, Clone, Default)]
pub struct KubeconfigFactory {
    options: FactoryOptions,
}

impl KubeconfigFactory {
    /// Create a factory with the given options
    pub fn new(options: FactoryOptions) -> Self {
        Self { options }
    }

    /// Options this factory was built with
    pub fn options(&self) -> &FactoryOptions {
        &self.options
    }
}

#[async_trait]
impl ClientFactory for KubeconfigFactory {
    fn raw_kubeconfig(&self) -> Result<Kubeconfig> {
        let kubeconfig = match &self.options.kubeconfig {
            Some(path) => Kubeconfig::read_from(path)?,
            None => Kubeconfig::read()?,
        };
        Ok(kubeconfig)
    }

    async fn config(&self) -> Result<Config> {
        // Nothing pinned: in-cluster config or the default kubeconfig
        if self.options.kubeconfig.is_none() && self.options.context.is_none() {
            tracing::debug!("inferring cluster configuration");
            return Ok(Config::infer().await?);
        }

        let options = KubeConfigOptions {
            context: self.options.context.clone(),
            ..Default::default()
        };
        tracing::debug!(
            kubeconfig = ?self.options.kubeconfig,
            context = ?options.context,
            "loading cluster configuration from kubeconfig"
        );

        let kubeconfig = self.raw_kubeconfig()?;
        Ok(Config::from_custom_kubeconfig(kubeconfig, &options).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KubeError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
  - name: local
    cluster:
      server: https://127.0.0.1:6443
contexts:
  - name: dev
    context:
      cluster: local
      user: developer
      namespace: team-a
  - name: prod
    context:
      cluster: local
      user: developer
users:
  - name: developer
    user:
      token: not-a-real-token
"#;

    fn kubeconfig_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();
        file
    }

    fn factory(file: &NamedTempFile, context: Option<&str>) -> KubeconfigFactory {
        KubeconfigFactory::new(FactoryOptions {
            kubeconfig: Some(file.path().to_path_buf()),
            context: context.map(str::to_string),
        })
    }

    #[test]
    fn test_raw_kubeconfig() {
        let file = kubeconfig_file();
        let kubeconfig = factory(&file, None).raw_kubeconfig().unwrap();

        assert_eq!(kubeconfig.current_context.as_deref(), Some("dev"));
        assert_eq!(kubeconfig.contexts.len(), 2);
    }

    #[test]
    fn test_raw_kubeconfig_missing_file() {
        let factory = KubeconfigFactory::new(FactoryOptions {
            kubeconfig: Some(PathBuf::from("/nonexistent/kubeconfig")),
            context: None,
        });
        assert!(matches!(
            factory.raw_kubeconfig(),
            Err(KubeError::Kubeconfig(_))
        ));
    }

    #[tokio::test]
    async fn test_config_uses_current_context() {
        let file = kubeconfig_file();
        let config = factory(&file, None).config().await.unwrap();

        assert_eq!(config.default_namespace, "team-a");
        assert_eq!(config.cluster_url.host(), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_namespace_for_named_context() {
        let file = kubeconfig_file();
        let namespace = factory(&file, Some("prod")).namespace().await.unwrap();
        assert_eq!(namespace, "default");
    }

    #[tokio::test]
    async fn test_unknown_context() {
        let file = kubeconfig_file();
        let result = factory(&file, Some("staging")).config().await;
        assert!(matches!(result, Err(KubeError::Kubeconfig(_))));
    }

    #[test]
    fn test_options_deserialize() {
        let options: FactoryOptions =
            serde_yaml::from_str("kubeconfig: /tmp/kc\ncontext: dev\n").unwrap();
        assert_eq!(options.kubeconfig, Some(PathBuf::from("/tmp/kc")));
        assert_eq!(options.context.as_deref(), Some("dev"));
        assert_eq!(FactoryOptions::default().context, None);
    }
}
