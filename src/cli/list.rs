use std::collections::BTreeSet;

use modelroute::models::{ModelCapability, ModelConfiguration};
use modelroute::{Catalog, Environment, ProcessEnvironment, Provider, ProviderDescriptor, ProviderKind};

use super::format_output;
use super::table::{joined, Table};
use crate::{die, warn, ListArgs, ListObject};

#[derive(serde::Serialize)]
struct ProviderListing {
    provider: ProviderKind,
    name: String,
    locations: Vec<String>,
    env: Vec<String>,
    ready: bool,
}

impl From<Vec<ProviderListing>> for Table {
    fn from(value: Vec<ProviderListing>) -> Self {
        let mut tab = Table::new(vec!["PROVIDER", "NAME", "LOCATIONS", "STATUS"]);

        for provider in value {
            tab.add_row(vec![
                provider.provider.to_string(),
                provider.name,
                joined(&provider.locations),
                if provider.ready {
                    "ready".to_string()
                } else {
                    "missing-env".to_string()
                },
            ]);
        }

        tab
    }
}

#[derive(serde::Serialize)]
struct InstanceListing {
    provider: ProviderKind,
    name: String,
    location: Option<String>,
    base_url: Option<String>,
}

impl From<Vec<InstanceListing>> for Table {
    fn from(value: Vec<InstanceListing>) -> Self {
        let mut tab = Table::new(vec!["PROVIDER", "NAME", "LOCATION", "BASE_URL"]);

        for instance in value {
            tab.add_row(vec![
                instance.provider.to_string(),
                instance.name,
                instance.location.unwrap_or_default(),
                instance.base_url.unwrap_or_default(),
            ]);
        }

        tab
    }
}

#[derive(serde::Serialize)]
struct ModelListing {
    model_id: String,
    name: String,
    creator: String,
    context: u64,
    capabilities: Vec<ModelCapability>,
    providers: Vec<ProviderKind>,
}

impl From<Vec<ModelListing>> for Table {
    fn from(value: Vec<ModelListing>) -> Self {
        let mut tab = Table::new(vec!["MODEL", "NAME", "CONTEXT", "PROVIDERS"]);

        for model in value {
            let providers: Vec<String> = model.providers.iter().map(|p| p.to_string()).collect();

            tab.add_row(vec![
                model.model_id,
                model.name,
                model.context.to_string(),
                joined(&providers),
            ]);
        }

        tab
    }
}

fn provider_listing(provider: &ProviderDescriptor, env: &dyn Environment) -> ProviderListing {
    ProviderListing {
        provider: provider.kind(),
        name: provider.name().to_string(),
        locations: provider.locations().to_vec(),
        env: provider
            .env_refs()
            .into_iter()
            .map(|(field, reference)| format!("{}={}", field, reference))
            .collect(),
        ready: provider.has_valid_env(env),
    }
}

fn instance_listing(provider: &ProviderDescriptor, env: &dyn Environment) -> InstanceListing {
    let base_url = match provider.base_url(env) {
        Ok(url) => url.map(|url| url.to_string()),
        Err(err) => die!("{}", err),
    };

    InstanceListing {
        provider: provider.kind(),
        name: provider.name().to_string(),
        location: provider.current().map(|s| s.to_string()),
        base_url,
    }
}

fn model_listing(model: &ModelConfiguration) -> ModelListing {
    ModelListing {
        model_id: model.id().to_string(),
        name: model.name().to_string(),
        creator: model.identity.creator.clone(),
        context: model
            .constraints
            .context_window
            .unwrap_or(model.constraints.max_input_tokens),
        capabilities: model.capabilities.iter().copied().collect(),
        providers: model.providers.iter().map(|p| p.kind()).collect(),
    }
}

pub(crate) fn list_cmd(catalog: &Catalog, args: &ListArgs) {
    let format = args.format;
    let env = ProcessEnvironment;

    match &args.object {
        ListObject::Providers(list_args) => {
            let providers: Vec<ProviderListing> = catalog
                .providers
                .list_providers(&env, !list_args.all)
                .into_iter()
                .map(|provider| provider_listing(provider, &env))
                .collect();

            if providers.is_empty() && !list_args.all {
                warn!("no provider has its credentials set, use --all to list every provider");
            }

            format_output(providers, format);
        }
        ListObject::Instances => {
            let instances: Vec<InstanceListing> = catalog
                .providers
                .list_provider_instances(&env)
                .iter()
                .map(|provider| instance_listing(provider, &env))
                .collect();

            format_output(instances, format);
        }
        ListObject::Models(list_args) => {
            let required: BTreeSet<ModelCapability> = list_args.capability.iter().copied().collect();

            let models: Vec<ModelListing> = catalog
                .models
                .models_with_capabilities(&required)
                .into_iter()
                .map(model_listing)
                .collect();

            format_output(models, format);
        }
    }
}
