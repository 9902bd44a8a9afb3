use crate::core::log::event::SolutionRow;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct TableRecord<'a> {
    generation: u32,
    rank: u32,
    value: f64,
    fitness: f64,
    genes: &'a str,
}

/// Appends ready generations to a CSV table, one row per chromosome.
///
/// Genes are written space-separated in a single column so the table keeps a
/// fixed width regardless of how many genes the run optimizes.
pub struct SolutionTable<W: Write> {
    writer: csv::Writer<W>,
    rows_written: usize,
}

impl SolutionTable<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let file = File::create(path)?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> SolutionTable<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            rows_written: 0,
        }
    }

    pub fn append_generation(
        &mut self,
        generation: u32,
        rows: &[SolutionRow],
    ) -> Result<(), TableError> {
        for row in rows {
            let genes = row
                .genes
                .iter()
                .map(|g| g.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            self.writer.serialize(TableRecord {
                generation,
                rank: row.rank,
                value: row.value,
                fitness: row.fitness,
                genes: &genes,
            })?;
            self.rows_written += 1;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn into_inner(self) -> Result<W, TableError> {
        self.writer
            .into_inner()
            .map_err(|e| TableError::Io(e.into_error()))
    }
}
