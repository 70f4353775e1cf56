//! Module providing MATLAB IO for Models
//!
//! Reads Level 5 MAT-files (what `save -v7` and older versions write) holding a COBRA
//! model struct with at least the `rxns`, `mets` and `S` fields. Compressed data
//! elements are inflated with zlib. HDF5 based v7.3 files are not supported.
use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;
use indexmap::IndexMap;
use log::debug;
use thiserror::Error;

use crate::configuration;
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::{Model, ModelError};
use crate::metabolic_model::reaction::ReactionBuilder;

const HEADER_LEN: usize = 128;
const HEADER_TEXT_LEN: usize = 116;

// region Data Types
const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_INT64: u32 = 12;
const MI_UINT64: u32 = 13;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;
const MI_UTF8: u32 = 16;
const MI_UTF16: u32 = 17;
const MI_UTF32: u32 = 18;

const MX_CELL: u32 = 1;
const MX_STRUCT: u32 = 2;
const MX_CHAR: u32 = 4;
const MX_SPARSE: u32 = 5;
const MX_DOUBLE: u32 = 6;
const MX_UINT64: u32 = 15;
// endregion Data Types

/// A decoded MATLAB array
#[derive(Clone, Debug, PartialEq)]
enum MatArray {
    /// Any numeric or logical class, values in column major order
    Numeric { dims: Vec<usize>, values: Vec<f64> },
    /// Character array, one string per row with trailing padding removed
    Char(Vec<String>),
    Cell(Vec<MatArray>),
    /// Struct array, every field holds one value per struct element
    Struct {
        fields: IndexMap<String, Vec<MatArray>>,
    },
    /// Compressed sparse column matrix
    Sparse {
        ncols: usize,
        row_indices: Vec<usize>,
        col_starts: Vec<usize>,
        values: Vec<f64>,
    },
    Empty,
}

impl MatArray {
    /// Field of the first element of a struct array
    fn field(&self, name: &str) -> Option<&MatArray> {
        match self {
            MatArray::Struct { fields } => fields.get(name).and_then(|values| values.first()),
            _ => None,
        }
    }

    fn numbers(&self) -> Option<&[f64]> {
        match self {
            MatArray::Numeric { values, .. } => Some(values.as_slice()),
            MatArray::Empty => Some(&[][..]),
            _ => None,
        }
    }

    /// Strings of a char array or of a cell array of char arrays
    fn strings(&self) -> Vec<String> {
        match self {
            MatArray::Char(rows) => rows.clone(),
            MatArray::Cell(cells) => cells
                .iter()
                .map(|cell| cell.strings().into_iter().next().unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Nonzero entries of a two dimensional matrix as (row, column, value)
    fn triplets(&self) -> Option<Vec<(usize, usize, f64)>> {
        match self {
            MatArray::Sparse {
                ncols,
                row_indices,
                col_starts,
                values,
            } => {
                let mut triplets = Vec::with_capacity(values.len());
                for col in 0..*ncols {
                    for k in col_starts[col]..col_starts[col + 1] {
                        if values[k] != 0. {
                            triplets.push((row_indices[k], col, values[k]));
                        }
                    }
                }
                Some(triplets)
            }
            MatArray::Numeric { dims, values } if dims.len() == 2 => {
                let nrows = dims[0];
                if nrows == 0 {
                    return Some(Vec::new());
                }
                Some(
                    values
                        .iter()
                        .enumerate()
                        .filter(|(_, v)| **v != 0.)
                        .map(|(i, v)| (i % nrows, i / nrows, *v))
                        .collect(),
                )
            }
            MatArray::Empty => Some(Vec::new()),
            _ => None,
        }
    }
}

// region Parsing
/// Sequential reader over the data elements of a buffer
struct ElementReader<'a> {
    data: &'a [u8],
    pos: usize,
    big_endian: bool,
}

impl<'a> ElementReader<'a> {
    fn new(data: &'a [u8], big_endian: bool) -> Self {
        ElementReader {
            data,
            pos: 0,
            big_endian,
        }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Upper bound on the number of data elements left, each takes at least 8 bytes
    fn max_elements(&self) -> usize {
        self.data.len().saturating_sub(self.pos) / 8
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], MatlabError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(MatlabError::Truncated)?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u32(&mut self) -> Result<u32, MatlabError> {
        let bytes = self.take(4)?;
        Ok(read_u32(bytes, self.big_endian))
    }

    /// Read the next data element, returning its type and payload
    fn next_element(&mut self) -> Result<(u32, &'a [u8]), MatlabError> {
        let first = self.u32()?;
        if first >> 16 != 0 {
            // Small data element, tag and up to 4 bytes of data share one 8 byte word
            let data_type = first & 0xffff;
            let len = (first >> 16) as usize;
            let payload = self.take(4)?;
            return payload
                .get(..len)
                .map(|bytes| (data_type, bytes))
                .ok_or_else(|| MatlabError::Malformed(format!("small element of {len} bytes")));
        }
        let len = self.u32()? as usize;
        let payload = self.take(len)?;
        if first != MI_COMPRESSED {
            let padding = (8 - len % 8) % 8;
            self.pos = (self.pos + padding).min(self.data.len());
        }
        Ok((first, payload))
    }
}

fn read_u32(bytes: &[u8], big_endian: bool) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    if big_endian {
        u32::from_be_bytes(word)
    } else {
        u32::from_le_bytes(word)
    }
}

/// Parse the header and every variable of a MAT-file
fn parse_mat_file(data: &[u8]) -> Result<Vec<(String, MatArray)>, MatlabError> {
    if data.len() < HEADER_LEN {
        return Err(MatlabError::NotMatFile);
    }
    let text = String::from_utf8_lossy(&data[..HEADER_TEXT_LEN]);
    if text.starts_with("MATLAB 7.3") {
        return Err(MatlabError::UnsupportedVersion("7.3 (HDF5)".to_string()));
    }
    let big_endian = match &data[126..128] {
        b"IM" => false,
        b"MI" => true,
        _ => return Err(MatlabError::NotMatFile),
    };
    debug!("MAT-file header: {}", text.trim_end());
    read_variables(&data[HEADER_LEN..], big_endian)
}

fn read_variables(data: &[u8], big_endian: bool) -> Result<Vec<(String, MatArray)>, MatlabError> {
    let mut variables = Vec::new();
    let mut reader = ElementReader::new(data, big_endian);
    while !reader.is_empty() {
        let (data_type, payload) = reader.next_element()?;
        match data_type {
            MI_COMPRESSED => variables.extend(read_variables(&inflate(payload)?, big_endian)?),
            MI_MATRIX => variables.push(read_matrix(payload, big_endian)?),
            other => debug!("Skipping top level element of type {}", other),
        }
    }
    Ok(variables)
}

fn inflate(payload: &[u8]) -> Result<Vec<u8>, MatlabError> {
    let mut decoder = ZlibDecoder::new(payload);
    let mut buf = Vec::new();
    decoder
        .read_to_end(&mut buf)
        .map_err(|e| MatlabError::Decompression(format!("{e}")))?;
    Ok(buf)
}

fn expect_matrix(data_type: u32) -> Result<(), MatlabError> {
    if data_type != MI_MATRIX {
        return Err(MatlabError::Malformed(format!(
            "expected a matrix element, found type {data_type}"
        )));
    }
    Ok(())
}

/// Decode a matrix element into its name and value
fn read_matrix(payload: &[u8], big_endian: bool) -> Result<(String, MatArray), MatlabError> {
    if payload.is_empty() {
        return Ok((String::new(), MatArray::Empty));
    }
    let mut reader = ElementReader::new(payload, big_endian);
    let (_, flags) = reader.next_element()?;
    if flags.len() < 4 {
        return Err(MatlabError::Malformed("array flags".to_string()));
    }
    let class = read_u32(flags, big_endian) & 0xff;
    let (dims_type, dims_raw) = reader.next_element()?;
    let dims = to_indices(decode_numbers(dims_type, dims_raw, big_endian)?);
    let (_, name_raw) = reader.next_element()?;
    let name = String::from_utf8_lossy(name_raw)
        .trim_end_matches('\0')
        .to_string();
    let count = dims
        .iter()
        .try_fold(1usize, |acc, dim| acc.checked_mul(*dim))
        .ok_or_else(|| MatlabError::Malformed(format!("dimensions {dims:?} overflow")))?;

    let array = match class {
        MX_CELL => {
            if count > reader.max_elements() {
                return Err(MatlabError::Malformed(format!(
                    "cell array {name} has more cells than data"
                )));
            }
            let mut cells = Vec::with_capacity(count);
            for _ in 0..count {
                let (data_type, cell) = reader.next_element()?;
                expect_matrix(data_type)?;
                cells.push(read_matrix(cell, big_endian)?.1);
            }
            MatArray::Cell(cells)
        }
        MX_STRUCT => {
            let (len_type, len_raw) = reader.next_element()?;
            let name_len = decode_numbers(len_type, len_raw, big_endian)?
                .first()
                .map_or(0, |len| *len as usize);
            let (_, names_raw) = reader.next_element()?;
            let names: Vec<String> = if name_len == 0 {
                Vec::new()
            } else {
                names_raw
                    .chunks(name_len)
                    .map(|chunk| String::from_utf8_lossy(chunk).trim_end_matches('\0').to_string())
                    .collect()
            };
            if !names.is_empty()
                && count
                    .checked_mul(names.len())
                    .map_or(true, |elements| elements > reader.max_elements())
            {
                return Err(MatlabError::Malformed(format!(
                    "struct array {name} has more fields than data"
                )));
            }
            let mut fields: IndexMap<String, Vec<MatArray>> = names
                .iter()
                .map(|field| (field.clone(), Vec::with_capacity(count)))
                .collect();
            for _ in 0..count {
                for field in &names {
                    let (data_type, value) = reader.next_element()?;
                    expect_matrix(data_type)?;
                    let value = read_matrix(value, big_endian)?.1;
                    if let Some(values) = fields.get_mut(field) {
                        values.push(value);
                    }
                }
            }
            MatArray::Struct { fields }
        }
        MX_CHAR => {
            if reader.is_empty() {
                MatArray::Char(Vec::new())
            } else {
                let (data_type, text) = reader.next_element()?;
                let chars = decode_chars(data_type, text, big_endian)?;
                let nrows = dims.first().copied().unwrap_or(0);
                if nrows > chars.len() {
                    return Err(MatlabError::Malformed(format!(
                        "char array {name} has {nrows} rows but {} characters",
                        chars.len()
                    )));
                }
                MatArray::Char(char_rows(&chars, nrows))
            }
        }
        MX_SPARSE => {
            let nrows = dims.first().copied().unwrap_or(0);
            let ncols = dims.get(1).copied().unwrap_or(0);
            let (ir_type, ir) = reader.next_element()?;
            let row_indices = to_indices(decode_numbers(ir_type, ir, big_endian)?);
            let (jc_type, jc) = reader.next_element()?;
            let col_starts = to_indices(decode_numbers(jc_type, jc, big_endian)?);
            // Logical sparse matrices may omit the values
            let values = if reader.is_empty() {
                vec![1.; row_indices.len()]
            } else {
                let (pr_type, pr) = reader.next_element()?;
                decode_numbers(pr_type, pr, big_endian)?
            };
            let nnz = col_starts.get(ncols).copied().ok_or_else(|| {
                MatlabError::Malformed(format!("sparse matrix {name} column index"))
            })?;
            if nnz > row_indices.len()
                || nnz > values.len()
                || col_starts.windows(2).any(|w| w[0] > w[1])
                || row_indices[..nnz].iter().any(|row| *row >= nrows)
            {
                return Err(MatlabError::Malformed(format!("sparse matrix {name}")));
            }
            MatArray::Sparse {
                ncols,
                row_indices,
                col_starts,
                values,
            }
        }
        MX_DOUBLE..=MX_UINT64 => {
            let values = if reader.is_empty() {
                Vec::new()
            } else {
                let (data_type, real) = reader.next_element()?;
                decode_numbers(data_type, real, big_endian)?
            };
            MatArray::Numeric { dims, values }
        }
        other => return Err(MatlabError::UnsupportedClass(other)),
    };
    Ok((name, array))
}

fn to_indices(values: Vec<f64>) -> Vec<usize> {
    values.into_iter().map(|v| v as usize).collect()
}

/// Convert the payload of a numeric data element to f64
fn decode_numbers(data_type: u32, bytes: &[u8], big_endian: bool) -> Result<Vec<f64>, MatlabError> {
    macro_rules! convert {
        ($t:ty) => {{
            const N: usize = std::mem::size_of::<$t>();
            bytes
                .chunks_exact(N)
                .map(|chunk| {
                    let mut buf = [0u8; N];
                    buf.copy_from_slice(chunk);
                    let value = if big_endian {
                        <$t>::from_be_bytes(buf)
                    } else {
                        <$t>::from_le_bytes(buf)
                    };
                    value as f64
                })
                .collect()
        }};
    }
    Ok(match data_type {
        MI_INT8 => convert!(i8),
        MI_UINT8 => convert!(u8),
        MI_INT16 => convert!(i16),
        MI_UINT16 => convert!(u16),
        MI_INT32 => convert!(i32),
        MI_UINT32 => convert!(u32),
        MI_SINGLE => convert!(f32),
        MI_DOUBLE => convert!(f64),
        MI_INT64 => convert!(i64),
        MI_UINT64 => convert!(u64),
        other => return Err(MatlabError::UnsupportedDataType(other)),
    })
}

fn decode_chars(data_type: u32, bytes: &[u8], big_endian: bool) -> Result<Vec<char>, MatlabError> {
    match data_type {
        MI_UTF8 | MI_INT8 | MI_UINT8 => Ok(String::from_utf8_lossy(bytes).chars().collect()),
        MI_UTF16 | MI_UINT16 | MI_INT16 => {
            let units = bytes.chunks_exact(2).map(|c| {
                if big_endian {
                    u16::from_be_bytes([c[0], c[1]])
                } else {
                    u16::from_le_bytes([c[0], c[1]])
                }
            });
            Ok(char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect())
        }
        MI_UTF32 | MI_UINT32 | MI_INT32 => Ok(bytes
            .chunks_exact(4)
            .map(|c| char::from_u32(read_u32(c, big_endian)).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()),
        other => Err(MatlabError::UnsupportedDataType(other)),
    }
}

/// Split a column major char matrix into its rows
fn char_rows(chars: &[char], nrows: usize) -> Vec<String> {
    if nrows == 0 {
        return Vec::new();
    }
    let ncols = chars.len() / nrows;
    (0..nrows)
        .map(|row| {
            (0..ncols)
                .map(|col| chars[row + col * nrows])
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect()
}
// endregion Parsing

// region Conversion
/// Compartment from a `[c]`, `(c)` or `_c` style id suffix
fn compartment_from_id(id: &str) -> Option<String> {
    for (open, close) in [('[', ']'), ('(', ')')] {
        if let Some(rest) = id.strip_suffix(close) {
            return rest.rsplit_once(open).map(|(_, c)| c.to_string());
        }
    }
    id.rsplit_once('_')
        .map(|(_, c)| c)
        .filter(|c| !c.is_empty() && c.len() <= 2)
        .map(str::to_string)
}

fn strings_field(cobra: &MatArray, field: &str) -> Vec<String> {
    cobra.field(field).map(MatArray::strings).unwrap_or_default()
}

/// Numeric field which must hold one value per reaction (or metabolite) when present
fn numbers_field(
    cobra: &MatArray,
    field: &str,
    expected: usize,
) -> Result<Option<Vec<f64>>, MatlabError> {
    match cobra.field(field).and_then(MatArray::numbers) {
        None => Ok(None),
        Some([]) => Ok(None),
        Some(values) if values.len() == expected => Ok(Some(values.to_vec())),
        Some(values) => Err(MatlabError::LengthMismatch {
            field: field.to_string(),
            expected,
            found: values.len(),
        }),
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

fn model_from_struct(variable: &str, cobra: &MatArray) -> Result<Model, MatlabError> {
    let config = configuration::current();
    let met_ids = cobra
        .field("mets")
        .map(MatArray::strings)
        .ok_or(MatlabError::MissingField("mets"))?;
    let rxn_ids = cobra
        .field("rxns")
        .map(MatArray::strings)
        .ok_or(MatlabError::MissingField("rxns"))?;
    let triplets = cobra
        .field("S")
        .ok_or(MatlabError::MissingField("S"))?
        .triplets()
        .ok_or_else(|| MatlabError::Malformed("S is not a two dimensional matrix".to_string()))?;

    // Metabolites
    let met_names = strings_field(cobra, "metNames");
    let met_formulas = strings_field(cobra, "metFormulas");
    let met_charges = numbers_field(cobra, "metCharges", met_ids.len())?;
    let comps = strings_field(cobra, "comps");
    let met_comps: Vec<Option<String>> = match cobra.field("metComps") {
        Some(MatArray::Numeric { values, .. }) => values
            .iter()
            .map(|index| {
                (*index as usize)
                    .checked_sub(1)
                    .and_then(|i| comps.get(i))
                    .cloned()
            })
            .collect(),
        Some(comp_array @ (MatArray::Cell(_) | MatArray::Char(_))) => comp_array
            .strings()
            .into_iter()
            .map(|c| Some(c).filter(|c| !c.is_empty()))
            .collect(),
        _ => met_ids.iter().map(|id| compartment_from_id(id)).collect(),
    };

    let mut model = Model::new_empty();
    for (i, id) in met_ids.iter().enumerate() {
        model.add_metabolite(Metabolite {
            id: id.clone(),
            name: non_empty(met_names.get(i)),
            compartment: met_comps.get(i).cloned().flatten(),
            charge: met_charges.as_ref().map_or(0, |charges| charges[i] as i32),
            formula: non_empty(met_formulas.get(i)),
            notes: None,
            annotation: None,
        })?;
    }

    // Reactions
    let mut stoichiometry: Vec<IndexMap<String, f64>> = vec![IndexMap::new(); rxn_ids.len()];
    for (row, col, coefficient) in triplets {
        let met_id = met_ids.get(row).ok_or_else(|| {
            MatlabError::Malformed(format!("S has row {row} but there are {} mets", met_ids.len()))
        })?;
        let column = stoichiometry.get_mut(col).ok_or_else(|| {
            let count = rxn_ids.len();
            MatlabError::Malformed(format!("S has column {col} but there are {count} rxns"))
        })?;
        column.insert(met_id.clone(), coefficient);
    }
    let lower_bounds = numbers_field(cobra, "lb", rxn_ids.len())?;
    let upper_bounds = numbers_field(cobra, "ub", rxn_ids.len())?;
    let objective = numbers_field(cobra, "c", rxn_ids.len())?;
    let rxn_names = strings_field(cobra, "rxnNames");
    let gene_rules = strings_field(cobra, "grRules");
    let subsystems = strings_field(cobra, "subSystems");
    for (i, (id, metabolites)) in rxn_ids.iter().zip(stoichiometry).enumerate() {
        let reaction = ReactionBuilder::default()
            .id(id.clone())
            .metabolites(metabolites)
            .name(non_empty(rxn_names.get(i)))
            .lower_bound(lower_bounds.as_ref().map_or(config.lower_bound, |lb| lb[i]))
            .upper_bound(upper_bounds.as_ref().map_or(config.upper_bound, |ub| ub[i]))
            .gene_reaction_rule(non_empty(gene_rules.get(i)))
            .subsystem(non_empty(subsystems.get(i)))
            .build()
            .map_err(ModelError::from)?;
        model.add_reaction(reaction)?;
        if let Some(coefficient) = objective.as_ref().map(|c| c[i]).filter(|c| *c != 0.) {
            model.objective.insert(id.clone(), coefficient);
        }
    }

    let comp_names = strings_field(cobra, "compNames");
    if !comps.is_empty() && comps.len() == comp_names.len() {
        model.compartments = Some(comps.into_iter().zip(comp_names).collect());
    }
    model.id = strings_field(cobra, "modelID")
        .into_iter()
        .next()
        .filter(|id| !id.is_empty())
        .or_else(|| Some(variable.to_string()));
    model.name = ["modelName", "description"]
        .iter()
        .filter_map(|field| strings_field(cobra, field).into_iter().next())
        .find(|name| !name.is_empty());
    Ok(model)
}

impl Model {
    /// Read a COBRA model from a Level 5 MAT-file
    ///
    /// The first variable which is a struct with `rxns` and `mets` fields is used.
    pub fn read_matlab<P: AsRef<Path>>(path: P) -> Result<Model, MatlabError> {
        let data = fs::read(path)?;
        Model::from_mat_bytes(&data)
    }

    /// Parse a COBRA model from the bytes of a Level 5 MAT-file
    pub fn from_mat_bytes(data: &[u8]) -> Result<Model, MatlabError> {
        let variables = parse_mat_file(data)?;
        let (variable, cobra) = variables
            .iter()
            .find(|(_, array)| array.field("rxns").is_some() && array.field("mets").is_some())
            .ok_or(MatlabError::NoModel)?;
        debug!("Reading COBRA model from MATLAB variable {}", variable);
        model_from_struct(variable, cobra)
    }
}
// endregion Conversion

#[derive(Error, Debug)]
pub enum MatlabError {
    #[error("Unable to read file: {0}")]
    UnableToRead(#[from] std::io::Error),
    #[error("Not a Level 5 MAT-file")]
    NotMatFile,
    #[error("Unsupported MAT-file version {0}")]
    UnsupportedVersion(String),
    #[error("MAT-file ended in the middle of a data element")]
    Truncated,
    #[error("Unable to inflate compressed data element: {0}")]
    Decompression(String),
    #[error("Unsupported MAT-file data type {0}")]
    UnsupportedDataType(u32),
    #[error("Unsupported MATLAB array class {0}")]
    UnsupportedClass(u32),
    #[error("Malformed MAT-file: {0}")]
    Malformed(String),
    #[error("No variable in the file is a COBRA model struct with rxns and mets")]
    NoModel,
    #[error("COBRA model struct has no {0} field")]
    MissingField(&'static str),
    #[error("Field {field} has {found} entries, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        found: usize,
    },
    #[error("Invalid model: {0}")]
    InvalidModel(#[from] ModelError),
}
