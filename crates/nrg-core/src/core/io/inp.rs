use crate::core::models::ligand::{AtomNeighbours, FlexBond};
use crate::core::utils::columns::{fixed_u32, slice_and_trim, strip_line_ending};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

const FLEDIH_ATOM_START: usize = 10;
const FLEDIH_ATOM_WIDTH: usize = 5;

#[derive(Debug, Error)]
pub enum InpError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid {record} record on line {line}: columns {columns} hold '{value}'")]
    InvalidField {
        record: &'static str,
        line: usize,
        columns: &'static str,
        value: String,
    },
}

/// Records of a FlexAID ligand `.inp` file that the monitor needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InpRecords {
    pub neighbours: BTreeMap<u32, AtomNeighbours>,
    pub flex_bonds: BTreeMap<u32, FlexBond>,
}

pub struct InpFile;

impl InpFile {
    pub fn read_from(reader: &mut impl BufRead) -> Result<InpRecords, InpError> {
        let mut records = InpRecords::default();

        for (line_num, line_res) in reader.lines().enumerate() {
            let raw = line_res?;
            let line = strip_line_ending(&raw);
            let line_num = line_num + 1;

            if line.starts_with("HETTYP") {
                let field = |columns: &'static str, start, end| {
                    fixed_u32(line, start, end).ok_or_else(|| InpError::InvalidField {
                        record: "HETTYP",
                        line: line_num,
                        columns,
                        value: slice_and_trim(line, start, end).to_string(),
                    })
                };
                let atom = field("8-11", 7, 11)?;
                let atom_type = fixed_u32(line, 11, 13).unwrap_or(0);
                let neighbours = [
                    field("23-26", 22, 26)?,
                    field("28-31", 27, 31)?,
                    field("33-36", 32, 36)?,
                ];
                records.neighbours.insert(
                    atom,
                    AtomNeighbours {
                        atom_type,
                        neighbours,
                    },
                );
            } else if line.starts_with("FLEDIH") {
                let index = fixed_u32(line, 7, 9).ok_or_else(|| InpError::InvalidField {
                    record: "FLEDIH",
                    line: line_num,
                    columns: "8-9",
                    value: slice_and_trim(line, 7, 9).to_string(),
                })?;

                let mut atoms = Vec::new();
                let mut start = FLEDIH_ATOM_START;
                while start < line.len() {
                    let end = start + FLEDIH_ATOM_WIDTH;
                    let value = slice_and_trim(line, start, end);
                    if !value.is_empty() {
                        let atom = value.parse().map_err(|_| InpError::InvalidField {
                            record: "FLEDIH",
                            line: line_num,
                            columns: "11-",
                            value: value.to_string(),
                        })?;
                        atoms.push(atom);
                    }
                    start = end;
                }
                records.flex_bonds.insert(index, FlexBond::new(index, atoms));
            }
        }

        Ok(records)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<InpRecords, InpError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
REFPCG comment line\n\
HETTYP  901 1  C1  m     0    0    0\n\
HETTYP  902 1  N1  m   901    0    0\n\
HETTYP  903 3  C2  m   902  901    0\n\
HETTYP  904 3  C3  m   903  902  901\n\
FLEDIH  4   916  917\n\
FLEDIH 12   903  904  902\n";

    #[test]
    fn parses_neighbours_and_flexible_bonds() {
        let records = InpFile::read_from(&mut Cursor::new(SAMPLE)).unwrap();

        assert_eq!(records.neighbours.len(), 4);
        let n904 = records.neighbours[&904];
        assert_eq!(n904.atom_type, 3);
        assert_eq!(n904.neighbours, [903, 902, 901]);

        assert_eq!(records.flex_bonds[&4].atoms, vec![916, 917]);
        assert_eq!(records.flex_bonds[&12].atoms, vec![903, 904, 902]);
    }

    #[test]
    fn invalid_neighbour_column_is_reported_with_line_number() {
        let bad = "HETTYP  901 1  C1  m   abc    0    0\n";
        let err = InpFile::read_from(&mut Cursor::new(bad)).unwrap_err();
        match err {
            InpError::InvalidField {
                record, line, value, ..
            } => {
                assert_eq!(record, "HETTYP");
                assert_eq!(line, 1);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = InpFile::read_from_path(dir.path().join("absent.inp"));
        assert!(matches!(result, Err(InpError::Io(_))));
    }
}
