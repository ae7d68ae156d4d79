use modelroute::{Catalog, ProcessEnvironment};

use super::format_output;
use super::resolve::{candidate, Candidate};
use crate::{die, warn, PresetArgs};

pub(crate) fn preset_cmd(catalog: &Catalog, args: &PresetArgs) {
    let env = ProcessEnvironment;

    let preset = match catalog.preset(&args.name) {
        Ok(preset) => preset,
        Err(err) => die!("{}", err),
    };

    let mut candidates: Vec<Candidate> = Vec::new();

    for (i, model) in preset.iter(&catalog.models, &env).enumerate() {
        let model = match model {
            Ok(model) => model,
            Err(err) => die!("preset \"{}\": {}", args.name, err),
        };

        candidates.push(candidate(i + 1, &model, args.consumer.as_deref()));
    }

    if candidates.is_empty() {
        warn!("preset \"{}\" has no usable candidate", args.name);
    }

    format_output(candidates, args.format);
}
