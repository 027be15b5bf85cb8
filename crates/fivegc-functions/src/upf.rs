//! UPF: the table of provisioned user plane configs.

use crate::support::{rebuild, spec};
use fivegc_core::resources::upf::{ActiveConfig, ACTIVE_CONFIGS};
use fivegc_core::{Kind, Object, ObjectKey};
use fivegc_runtime::{ControlLoop, Input, Inputs, Join, Target, TransformError};

/// One row per live UPF Config
pub fn active_configs(configs: &[Object]) -> Result<Vec<ActiveConfig>, TransformError> {
    let mut rows = configs
        .iter()
        .map(|config| {
            Ok(ActiveConfig {
                name: config.name().to_string(),
                namespace: config.namespace().to_string(),
                traffic_spec: spec(config)?,
            })
        })
        .collect::<Result<Vec<_>, TransformError>>()?;
    rows.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
    Ok(rows)
}

/// Maintain the ActiveConfigTable singleton
pub fn active_config() -> ControlLoop {
    let table = ObjectKey::cluster(Kind::ActiveConfigTable, ACTIVE_CONFIGS);
    ControlLoop::new("active-config", Target::Singleton(table), |inputs: &Inputs| {
        let rows = active_configs(inputs.many(Kind::UpfConfig))?;
        rebuild(inputs.primary.as_ref(), &inputs.target, &rows)
    })
    .with_input(Input::new(Kind::UpfConfig, Join::Members))
}

/// Every UPF loop
pub fn control_loops() -> Vec<ControlLoop> {
    vec![active_config()]
}
