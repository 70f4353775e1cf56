//! Table collecting one column of ATP yields per experiment
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;

use crate::checks::atp_yield::AtpYieldError;

/// A single table entry
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ResultCell {
    Value(f64),
    /// The model could not be solved
    NotANumber,
    /// Nothing to report, e.g. no theoretical yield is known
    Missing,
}

impl ResultCell {
    pub fn value(&self) -> Option<f64> {
        match self {
            ResultCell::Value(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<Option<f64>> for ResultCell {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(value) => ResultCell::Value(value),
            None => ResultCell::Missing,
        }
    }
}

impl Display for ResultCell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultCell::Value(value) => {
                let rounded = format!("{:.4}", value);
                let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
                // -0.0000 should print as 0
                if trimmed == "-0" {
                    write!(f, "0")
                } else {
                    write!(f, "{}", trimmed)
                }
            }
            ResultCell::NotANumber => write!(f, "NaN"),
            ResultCell::Missing => write!(f, "-"),
        }
    }
}

/// Results of a single experiment
#[derive(Clone, Debug, PartialEq)]
pub struct ResultColumn {
    pub label: String,
    /// Optimal flux through the ATP demand reaction
    pub atp_yield: ResultCell,
    /// Flux through the ATP synthase at that optimum
    pub synthase_flux: ResultCell,
    pub theoretical: ResultCell,
}

impl ResultColumn {
    fn cells(&self) -> [ResultCell; 3] {
        [self.atp_yield, self.synthase_flux, self.theoretical]
    }
}

/// Rows are fixed when the table is created, columns are only ever appended
#[derive(Clone, Debug, PartialEq)]
pub struct ResultsTable {
    row_labels: [String; 3],
    columns: IndexMap<String, ResultColumn>,
}

impl ResultsTable {
    pub fn new(model_name: &str, synthase_id: &str) -> Self {
        ResultsTable {
            row_labels: [
                format!("{}: ATP yield", model_name),
                format!("{}: {} yield", model_name, synthase_id),
                "Theoretical".to_string(),
            ],
            columns: IndexMap::new(),
        }
    }

    pub fn row_labels(&self) -> &[String; 3] {
        &self.row_labels
    }

    /// Append a column
    ///
    /// # Errors
    /// [`AtpYieldError::DuplicateColumn`] if a column with the same label exists
    pub fn push_column(&mut self, column: ResultColumn) -> Result<(), AtpYieldError> {
        if self.columns.contains_key(&column.label) {
            return Err(AtpYieldError::DuplicateColumn(column.label));
        }
        self.columns.insert(column.label.clone(), column);
        Ok(())
    }

    /// Columns in the order they were added
    pub fn columns(&self) -> impl Iterator<Item = &ResultColumn> {
        self.columns.values()
    }

    pub fn column(&self, label: &str) -> Option<&ResultColumn> {
        self.columns.get(label)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Display for ResultsTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label_width = self
            .row_labels
            .iter()
            .map(|label| label.chars().count())
            .max()
            .unwrap_or(0);
        let rendered: Vec<(String, [String; 3])> = self
            .columns
            .values()
            .map(|column| {
                (
                    column.label.clone(),
                    column.cells().map(|cell| cell.to_string()),
                )
            })
            .collect();
        let widths: Vec<usize> = rendered
            .iter()
            .map(|(label, cells)| {
                cells
                    .iter()
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(label.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:label_width$}", "")?;
        for ((label, _), width) in rendered.iter().zip(&widths) {
            write!(f, "  {:>width$}", label, width = *width)?;
        }
        writeln!(f)?;
        for (row, row_label) in self.row_labels.iter().enumerate() {
            write!(f, "{:label_width$}", row_label)?;
            for ((_, cells), width) in rendered.iter().zip(&widths) {
                write!(f, "  {:>width$}", cells[row], width = *width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(label: &str, atp_yield: ResultCell) -> ResultColumn {
        ResultColumn {
            label: label.to_string(),
            atp_yield,
            synthase_flux: ResultCell::Value(28.),
            theoretical: ResultCell::Value(31.),
        }
    }

    #[test]
    fn cell_display() {
        assert_eq!(ResultCell::Value(30.).to_string(), "30");
        assert_eq!(ResultCell::Value(22.5).to_string(), "22.5");
        assert_eq!(ResultCell::Value(1. / 3.).to_string(), "0.3333");
        assert_eq!(ResultCell::Value(-1e-9).to_string(), "0");
        assert_eq!(ResultCell::NotANumber.to_string(), "NaN");
        assert_eq!(ResultCell::Missing.to_string(), "-");
        assert_eq!(ResultCell::from(None), ResultCell::Missing);
        assert_eq!(ResultCell::from(Some(2.)).value(), Some(2.));
        assert_eq!(ResultCell::NotANumber.value(), None);
    }

    #[test]
    fn columns_keep_insertion_order() {
        let mut table = ResultsTable::new("toy", "ATPS4m");
        assert!(table.is_empty());
        table.push_column(column("glc - aerobic", ResultCell::Value(30.))).unwrap();
        table.push_column(column("glc - anaerobic", ResultCell::NotANumber)).unwrap();
        assert_eq!(table.len(), 2);
        let labels: Vec<&str> = table.columns().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["glc - aerobic", "glc - anaerobic"]);
        assert_eq!(
            table.column("glc - anaerobic").unwrap().atp_yield,
            ResultCell::NotANumber
        );
        assert_eq!(table.row_labels()[0], "toy: ATP yield");
        assert_eq!(table.row_labels()[1], "toy: ATPS4m yield");
        assert_eq!(table.row_labels()[2], "Theoretical");
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let mut table = ResultsTable::new("toy", "ATPS4m");
        table.push_column(column("glc - aerobic", ResultCell::Value(30.))).unwrap();
        assert!(matches!(
            table.push_column(column("glc - aerobic", ResultCell::Value(1.))),
            Err(AtpYieldError::DuplicateColumn(_))
        ));
        assert_eq!(table.column("glc - aerobic").unwrap().atp_yield, ResultCell::Value(30.));
    }

    #[test]
    fn table_rendering() {
        let mut table = ResultsTable::new("toy", "ATPS4m");
        table.push_column(column("glc - aerobic", ResultCell::Value(30.))).unwrap();
        table.push_column(column("fru - aerobic", ResultCell::NotANumber)).unwrap();
        let rendered = table.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].trim_start().starts_with("glc - aerobic"));
        assert!(lines[1].starts_with("toy: ATP yield"));
        assert!(lines[1].ends_with("NaN"));
        assert!(lines[2].starts_with("toy: ATPS4m yield"));
        assert!(lines[3].starts_with("Theoretical"));
        assert!(lines[3].ends_with("31"));
        // Every line has the same width
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|line| line.chars().count() == width));
    }
}
