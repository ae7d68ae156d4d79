//! A catalog and resolver for chat model endpoints.
//!
//! Models are declared once, with the providers that serve them in fallback order and
//! the generation parameters they accept. At request time the declarations resolve into
//! a stream of concrete candidates, each served by exactly one provider in one location
//! and carrying a validated parameter set:
//!
//! - [`providers`] enumerates a provider across its locations, skipping providers whose
//!   credentials are not available in the [`Environment`].
//! - [`models`] flattens a model's provider list into its fallback chain.
//! - [`presets`] flattens nested groups of models into one capability-filtered stream.
//!
//! Nothing here performs network calls. The last step, turning a candidate into a
//! client, is left to the caller through an [`Invocation`] record.

pub mod config;
pub mod env;
pub mod error;
pub mod invocation;
pub mod loader;
pub mod models;
pub mod parameters;
pub mod populate;
pub mod presets;
pub mod providers;

pub use env::{EnvVar, Environment, ProcessEnvironment};
pub use error::{Error, Result};
pub use invocation::Invocation;
pub use models::{ModelConfiguration, ModelRegistry};
pub use populate::Catalog;
pub use presets::Preset;
pub use providers::{Provider, ProviderDescriptor, ProviderKind, ProviderRegistry};
