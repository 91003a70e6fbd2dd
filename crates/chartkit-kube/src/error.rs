//! Error types for chartkit-kube

use thiserror::Error;

/// Result type for chartkit-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while building Kubernetes clients
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Kubeconfig could not be read or resolved
    #[error("kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// No usable configuration in the environment
    #[error("cannot infer cluster configuration: {0}")]
    Infer(#[from] kube::config::InferConfigError),
}
