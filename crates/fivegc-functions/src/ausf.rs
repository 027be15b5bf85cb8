//! AUSF: SUCI to SUPI resolution against the seeded identity table.

use crate::support::{rows, spec, status};
use fivegc_core::conditions::set_condition;
use fivegc_core::resources::ausf::{
    MobileIdentitySpec, MobileIdentityStatus, SuciToSupi, SUCI_TO_SUPI,
};
use fivegc_core::resources::condition::READY;
use fivegc_core::{Condition, ConditionStatus, Kind, Object, ObjectKey, STATE_LABEL};
use fivegc_runtime::{ControlLoop, Input, Inputs, Join, Predicate, Target, TransformError, Write};

/// Condition reasons
pub mod reason {
    /// SUCI resolved
    pub const READY: &str = "Ready";
    /// SUCI not in the table
    pub const MOBILE_IDENTITY_NOT_FOUND: &str = "MobileIdentityNotFound";
    /// Identity table not loaded yet
    pub const TABLE_PENDING: &str = "SuciToSupiPending";
}

/// Resolve one request. `None` for the table means it is not loaded yet.
pub fn resolve(
    request: &Object,
    table: Option<&Object>,
) -> Result<(MobileIdentityStatus, &'static str), TransformError> {
    let wanted: MobileIdentitySpec = spec(request)?;
    let mut current: MobileIdentityStatus = status(request)?;
    current.suci = wanted.suci.clone();

    let Some(table) = table else {
        current.supi = None;
        set_condition(
            &mut current.conditions,
            Condition::new(READY, ConditionStatus::Unknown, reason::TABLE_PENDING),
        );
        return Ok((current, "Pending"));
    };
    let entries: Vec<SuciToSupi> = rows(Some(table))?;
    current.supi = entries
        .into_iter()
        .find(|e| !wanted.suci.is_empty() && e.suci == wanted.suci)
        .map(|e| e.supi);
    let ready = match &current.supi {
        Some(_) => Condition::new(READY, ConditionStatus::True, reason::READY),
        None => Condition::new(READY, ConditionStatus::False, reason::MOBILE_IDENTITY_NOT_FOUND)
            .with_message(format!("{:?} is not a known subscriber", wanted.suci)),
    };
    set_condition(&mut current.conditions, ready);
    Ok((current, "Ready"))
}

/// Answer MobileIdentity requests
pub fn supi_req_handler() -> ControlLoop {
    let table = ObjectKey::cluster(Kind::SuciToSupiTable, SUCI_TO_SUPI);
    ControlLoop::new(
        "supi-req-handler",
        Target::Kind(Kind::MobileIdentity),
        |inputs: &Inputs| {
            let Some(request) = &inputs.primary else {
                return Ok(vec![]);
            };
            let (answer, state) = resolve(request, inputs.one(Kind::SuciToSupiTable))?;
            let mut next = request.clone();
            next.set_status(&answer)?;
            next.set_label(STATE_LABEL, state);
            Ok(vec![Write::Apply(next)])
        },
    )
    .with_predicate(Predicate::GenerationChanged)
    .with_input(Input::new(Kind::SuciToSupiTable, Join::Singleton(table)))
}

/// Every AUSF loop
pub fn control_loops() -> Vec<ControlLoop> {
    vec![supi_req_handler()]
}
