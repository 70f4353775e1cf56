//! Configuration of a closed model for a single carbon source experiment
use log::{debug, info, warn};

use crate::checks::atp_yield::substrates::{
    self, Gas, CARBON_DIOXIDE, GASES, OXYGEN, SUBSTRATES, WATER,
};
use crate::checks::atp_yield::{AtpYieldError, FLUX_LIMIT, SUBSTRATE_UPTAKE};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::{BoundaryType, Model, ModelError};
use crate::metabolic_model::reaction::ReactionBuilder;

use indexmap::IndexMap;

/// A single substrate and oxygen condition
#[derive(Clone, Debug, PartialEq)]
pub struct Experiment {
    /// Id of the substrate's exchange reaction, e.g. `EX_glc_D[e]`
    pub exchange_id: String,
    pub allow_oxygen: bool,
    /// Label of the results column, derived from the substrate when `None`
    pub column_name: Option<String>,
}

impl Experiment {
    pub fn new(exchange_id: &str, allow_oxygen: bool) -> Self {
        Experiment {
            exchange_id: exchange_id.to_string(),
            allow_oxygen,
            column_name: None,
        }
    }

    pub fn with_column_name(mut self, column_name: &str) -> Self {
        self.column_name = Some(column_name.to_string());
        self
    }

    /// Short substrate name, the exchange id without its `EX_` prefix up to the first `_`
    /// or `[`, e.g. `glc` for `EX_glc_D[e]`
    pub fn substrate_token(&self) -> &str {
        let stem = self
            .exchange_id
            .strip_prefix("EX_")
            .unwrap_or(&self.exchange_id);
        stem.split(['_', '[']).next().unwrap_or(stem)
    }

    /// Column label, e.g. `glc - aerobic`
    pub fn column_label(&self) -> String {
        match &self.column_name {
            Some(name) => name.clone(),
            None => format!(
                "{} - {}",
                self.substrate_token(),
                if self.allow_oxygen {
                    "aerobic"
                } else {
                    "anaerobic"
                }
            ),
        }
    }

    /// Reference yield for this substrate and oxygen condition, `None` for substrates
    /// outside the panel
    pub fn theoretical_yield(&self) -> Option<f64> {
        substrates::substrate(&self.exchange_id)
            .ok()
            .map(|s| s.theoretical_yield(self.allow_oxygen))
    }

    /// Every panel substrate, each with oxygen and then without
    pub fn panel() -> Vec<Experiment> {
        SUBSTRATES
            .iter()
            .flat_map(|s| {
                [
                    Experiment::new(s.exchange_id, true),
                    Experiment::new(s.exchange_id, false),
                ]
            })
            .collect()
    }
}

/// Make sure a gas exchange (and its extracellular metabolite) exists
///
/// A newly created exchange starts closed, at `[0, FLUX_LIMIT]`.
fn ensure_gas_exchange(model: &mut Model, gas: &Gas) -> Result<(), AtpYieldError> {
    if model.reactions.contains_key(gas.exchange_id) {
        return Ok(());
    }
    model.ensure_metabolite(Metabolite::new(
        gas.metabolite_id(),
        gas.metabolite_name,
        "e",
    ));
    let exchange_id = model.add_boundary(gas.metabolite_id(), BoundaryType::Exchange)?;
    model.set_bounds(&exchange_id, 0., FLUX_LIMIT)?;
    if let Some(exchange) = model.reactions.get_mut(&exchange_id) {
        exchange.name = Some(gas.exchange_name.to_string());
    }
    debug!("Created {}", exchange_id);
    Ok(())
}

/// Add the exchange reaction of a panel substrate
///
/// The exchange consumes the substrate's extracellular metabolite when the model has it.
/// Otherwise it is added without metabolites, so the uptake reaches nothing in the network.
///
/// # Errors
/// [`AtpYieldError::UnknownSubstrate`] if the exchange is not in the substrate table
fn create_substrate_exchange(model: &mut Model, exchange_id: &str) -> Result<(), AtpYieldError> {
    let substrate = substrates::substrate(exchange_id)?;
    let metabolite_id = substrate.metabolite_id();
    let mut stoichiometry = IndexMap::new();
    if model.metabolites.contains_key(metabolite_id) {
        stoichiometry.insert(metabolite_id.to_string(), -1.);
    } else {
        warn!(
            "{} is not in the model, adding {} without metabolites",
            metabolite_id, exchange_id
        );
    }
    let exchange = ReactionBuilder::default()
        .id(exchange_id.to_string())
        .name(Some(substrates::exchange_name(exchange_id)?.to_string()))
        .metabolites(stoichiometry)
        .lower_bound(SUBSTRATE_UPTAKE)
        .upper_bound(SUBSTRATE_UPTAKE)
        .build()
        .map_err(ModelError::from)?;
    model.add_reaction(exchange)?;
    debug!("Created {}", exchange_id);
    Ok(())
}

/// Copy the baseline and open it to a single carbon source
///
/// - oxygen exchange is `[-1000, 1000]` with oxygen allowed, `[0, 0]` otherwise
/// - water exchange is `[-1000, 1000]`
/// - carbon dioxide can be secreted up to 1000
/// - the substrate exchange is fixed at `[-1, -1]`
///
/// Missing gas and substrate exchanges are created. A created substrate exchange is empty
/// when the model lacks the substrate metabolite. The baseline is not modified.
///
/// # Errors
/// [`AtpYieldError::UnknownSubstrate`] if the substrate exchange has to be created but
/// the substrate is not in the panel
pub fn configure_carbon_source(
    baseline: &Model,
    experiment: &Experiment,
) -> Result<Model, AtpYieldError> {
    let mut model = baseline.clone();
    for gas in GASES {
        ensure_gas_exchange(&mut model, gas)?;
    }

    if experiment.allow_oxygen {
        model.set_bounds(OXYGEN.exchange_id, -FLUX_LIMIT, FLUX_LIMIT)?;
    } else {
        model.set_bounds(OXYGEN.exchange_id, 0., 0.)?;
    }
    model.set_bounds(WATER.exchange_id, -FLUX_LIMIT, FLUX_LIMIT)?;
    let co2_lower = model.reaction(CARBON_DIOXIDE.exchange_id)?.lower_bound;
    model.set_bounds(
        CARBON_DIOXIDE.exchange_id,
        co2_lower.min(FLUX_LIMIT),
        FLUX_LIMIT,
    )?;

    if model.reactions.contains_key(&experiment.exchange_id) {
        model.set_bounds(&experiment.exchange_id, SUBSTRATE_UPTAKE, SUBSTRATE_UPTAKE)?;
    } else {
        create_substrate_exchange(&mut model, &experiment.exchange_id)?;
    }
    info!(
        "Configured {} for {}",
        model.display_name(),
        experiment.column_label()
    );
    Ok(model)
}
