//! Chartkit Kube - Kubernetes client factory for Chartkit hosts
//!
//! Rendering never talks to a cluster. Hosts that implement the late-bound
//! `lookup` function, or apply rendered manifests, obtain their clients
//! through [`ClientFactory`] so the source of configuration (an explicit
//! kubeconfig, a named context, in-cluster inference) stays swappable.

pub mod error;
pub mod factory;

pub use error::{KubeError, Result};
pub use factory::{ClientFactory, FactoryOptions, KubeconfigFactory};
