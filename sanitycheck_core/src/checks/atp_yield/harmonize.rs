//! Rewrite parenthesis compartment tags, e.g. `10fthf6glu(m)`, to brackets,
//! `10fthf6glu[m]`
use log::debug;

use crate::metabolic_model::model::Model;

/// Replace every `(` with `[` and every `)` with `]`
pub fn to_bracket_notation(id: &str) -> String {
    id.replace('(', "[").replace(')', "]")
}

/// Switch every metabolite and reaction id of the model to bracket compartment tags
///
/// Stoichiometry and the objective follow the new ids. Running this on a model which
/// already uses brackets changes nothing.
pub fn harmonize(model: &mut Model) {
    let before = model
        .metabolites
        .keys()
        .chain(model.reactions.keys())
        .filter(|id| id.contains(['(', ')']))
        .count();
    model.rename_metabolites(|metabolite| to_bracket_notation(&metabolite.id));
    model.rename_reactions(|reaction| to_bracket_notation(&reaction.id));
    debug!("Harmonized {} ids to bracket notation", before);
}
