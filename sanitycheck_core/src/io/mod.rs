//! Module for reading Models from COBRA JSON, YAML and MATLAB files
pub mod json;
pub mod matlab;
pub mod yaml;

use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::io::json::JsonError;
use crate::io::matlab::MatlabError;
use crate::io::yaml::YamlError;
use crate::metabolic_model::model::Model;

/// Reaction id suffixes rewritten to bracket compartment tags after loading
const REACTION_SUFFIXES: [(&str, &str); 3] = [("_c", "[c]"), ("_m", "[m]"), ("_e", "[e]")];

/// Supported model file formats, chosen by file extension
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    Json,
    Yaml,
    Matlab,
}

impl ModelFormat {
    /// Determine the format from the extension of `path`
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(ModelFormat::Json),
            Some("yml") | Some("yaml") => Ok(ModelFormat::Yaml),
            Some("mat") => Ok(ModelFormat::Matlab),
            _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Load a model, choosing the parser from the file extension
///
/// After parsing, compartment suffixes are rewritten to bracket tags (see
/// [`normalize_compartment_suffixes`]) and a model without a name is named after the
/// file stem.
///
/// # Errors
/// [`LoadError::UnsupportedFormat`] for any extension other than `.json`, `.yml`,
/// `.yaml` or `.mat` (checked before the file is opened), otherwise the error of the
/// format specific reader.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model, LoadError> {
    let path = path.as_ref();
    let format = ModelFormat::from_path(path)?;
    debug!("Reading {} as {:?}", path.display(), format);
    let mut model = match format {
        ModelFormat::Json => Model::read_json(path)?,
        ModelFormat::Yaml => Model::read_yaml(path)?,
        ModelFormat::Matlab => Model::read_matlab(path)?,
    };
    normalize_compartment_suffixes(&mut model);
    if model.name.as_deref().map_or(true, str::is_empty) {
        model.name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
    }
    info!(
        "Loaded model {} ({} reactions, {} metabolites)",
        model.display_name(),
        model.reactions.len(),
        model.metabolites.len()
    );
    Ok(model)
}

/// Rewrite underscore compartment suffixes into bracket tags
///
/// - Reaction ids ending in `_c`, `_m` or `_e` get that suffix replaced by `[c]`, `[m]`
///   or `[e]`.
/// - Metabolite ids ending in `_<compartment>`, where `<compartment>` is the metabolite's
///   own compartment, become `<id>[<compartment>]`.
pub fn normalize_compartment_suffixes(model: &mut Model) {
    model.rename_reactions(|reaction| {
        REACTION_SUFFIXES
            .iter()
            .find_map(|(suffix, tag)| {
                reaction
                    .id
                    .strip_suffix(suffix)
                    .map(|stem| format!("{stem}{tag}"))
            })
            .unwrap_or_else(|| reaction.id.clone())
    });
    model.rename_metabolites(|metabolite| {
        metabolite
            .compartment
            .as_deref()
            .filter(|c| !c.is_empty())
            .and_then(|c| {
                metabolite
                    .id
                    .strip_suffix(c)
                    .and_then(|rest| rest.strip_suffix('_'))
                    .filter(|stem| !stem.is_empty())
                    .map(|stem| format!("{stem}[{c}]"))
            })
            .unwrap_or_else(|| metabolite.id.clone())
    });
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unsupported model format for {0}, expected .json, .yml, .yaml or .mat")]
    UnsupportedFormat(PathBuf),
    #[error("Unable to read JSON model: {0}")]
    Json(#[from] JsonError),
    #[error("Unable to read YAML model: {0}")]
    Yaml(#[from] YamlError),
    #[error("Unable to read MATLAB model: {0}")]
    Matlab(#[from] MatlabError),
}
