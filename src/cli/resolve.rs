use modelroute::parameters::{ModelParameters, ParameterMap};
use modelroute::{Catalog, Invocation, ModelConfiguration, ProcessEnvironment};

use super::format_output;
use super::table::Table;
use crate::{die, warn, ResolveArgs};

/// One row of a fallback chain
#[derive(serde::Serialize)]
pub(crate) struct Candidate {
    rank: usize,
    #[serde(flatten)]
    invocation: Invocation,
}

impl From<Vec<Candidate>> for Table {
    fn from(value: Vec<Candidate>) -> Self {
        let mut tab = Table::new(vec!["RANK", "MODEL", "PROVIDER", "LOCATION", "PARAMETERS"]);

        for candidate in value {
            let invocation = candidate.invocation;

            tab.add_row(vec![
                candidate.rank.to_string(),
                invocation.model_alias,
                invocation.provider.to_string(),
                invocation.location.unwrap_or_default(),
                format_parameters(&invocation.parameters),
            ]);
        }

        tab
    }
}

fn format_parameters(parameters: &ParameterMap) -> String {
    parameters
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses `name=value` pairs given with `--set`
fn parse_overrides(raw: &[String]) -> ModelParameters {
    let mut overrides = ModelParameters::default();

    for pair in raw {
        let (name, value) = match pair.split_once('=') {
            Some(pair) => pair,
            None => die!("invalid override \"{}\", expected NAME=VALUE", pair),
        };

        if let Err(err) = overrides.set_from_str(name.trim(), value) {
            die!("{}", err);
        }
    }

    overrides
}

pub(crate) fn candidate(
    rank: usize,
    model: &ModelConfiguration,
    consumer: Option<&str>,
) -> Candidate {
    match Invocation::from_configuration(model, consumer, &ProcessEnvironment) {
        Ok(invocation) => Candidate { rank, invocation },
        Err(err) => die!("{}", err),
    }
}

pub(crate) fn resolve_cmd(catalog: &Catalog, args: &ResolveArgs) {
    let env = ProcessEnvironment;

    let mut model = match catalog.models.get_model(&args.model) {
        Ok(model) => model.clone(),
        Err(err) => die!("{}", err),
    };

    let overrides = parse_overrides(&args.set);

    if let Err(err) = model.set_parameters_with(&overrides, catalog.models.validation_mode()) {
        die!("{}", err);
    }

    let candidates: Vec<Candidate> = model
        .iter(&env)
        .enumerate()
        .map(|(i, provider)| candidate(i + 1, &model.with_provider(provider), args.consumer.as_deref()))
        .collect();

    if candidates.is_empty() {
        warn!(
            "no provider of \"{}\" has its credentials set",
            model.id()
        );
    }

    format_output(candidates, args.format);
}
