use crate::core::models::ligand::InternalCoordinate;
use crate::core::utils::columns::{fixed_f64, fixed_u32, slice_and_trim, strip_line_ending};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IcError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid internal coordinate on line {line}: columns {columns} hold '{value}'")]
    InvalidField {
        line: usize,
        columns: &'static str,
        value: String,
    },
}

/// Reader for the ligand internal-coordinate (`.ic`) file.
///
/// Every non-`REFPCG` line describes one ligand atom, so the number of records
/// is the number of atoms the engine announces through `lout[...]` lines.
pub struct IcFile;

impl IcFile {
    pub fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<BTreeMap<u32, InternalCoordinate>, IcError> {
        let mut coordinates = BTreeMap::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let raw = line_res?;
            let line = strip_line_ending(&raw);
            let line_num = line_num + 1;

            if line.starts_with("REFPCG") || line.trim().is_empty() {
                continue;
            }

            let invalid = |columns: &'static str, start, end| IcError::InvalidField {
                line: line_num,
                columns,
                value: slice_and_trim(line, start, end).to_string(),
            };

            let atom = fixed_u32(line, 1, 5).ok_or_else(|| invalid("2-5", 1, 5))?;
            let distance = fixed_f64(line, 7, 15).ok_or_else(|| invalid("8-15", 7, 15))?;
            let angle = fixed_f64(line, 16, 24).ok_or_else(|| invalid("17-24", 16, 24))?;
            let dihedral = fixed_f64(line, 25, 33).ok_or_else(|| invalid("26-33", 25, 33))?;

            coordinates.insert(
                atom,
                InternalCoordinate {
                    distance,
                    angle,
                    dihedral,
                },
            );
        }

        Ok(coordinates)
    }

    pub fn read_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<BTreeMap<u32, InternalCoordinate>, IcError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_records_and_skips_reference_lines() {
        let content = concat!(
            "REFPCG   0.000   0.000\n",
            "  901     1.500  109.500  180.000\n",
            "  902     1.330  120.000  -60.000\n",
            "\n",
        );
        let coordinates = IcFile::read_from(&mut Cursor::new(content)).unwrap();

        assert_eq!(coordinates.len(), 2);
        let c902 = coordinates[&902];
        assert_eq!(c902.distance, 1.33);
        assert_eq!(c902.angle, 120.0);
        assert_eq!(c902.dihedral, -60.0);
    }

    #[test]
    fn blank_numeric_field_is_rejected() {
        let content = "  901     1.500           180.000\n";
        let err = IcFile::read_from(&mut Cursor::new(content)).unwrap_err();
        assert!(matches!(
            err,
            IcError::InvalidField {
                line: 1,
                columns: "17-24",
                ..
            }
        ));
    }
}
