//! Maps raw engine output lines to [`ParseEvent`]s.
//!
//! The engine output grammar is line oriented and loosely versioned: every
//! recognizer below is anchored at the start of the line, and any line that
//! does not fully satisfy one of them becomes [`ParseEvent::Unrecognized`].
//! Recognizers are tried in a fixed order so that a future overlap between
//! formats resolves the same way the engine's original consumer resolved it.

use super::event::{ParseEvent, RankingMode, SolutionRow};
use crate::core::models::keys::{AtomPairKey, ResidueKey};
use crate::core::utils::columns::{fixed_f64, split_leading_digits, strip_line_ending};
use nalgebra::Point3;
use phf::{Map, phf_map};

const GRID_FIELD_WIDTH: usize = 8;

static RANKING_WORDS: Map<&'static str, RankingMode> = phf_map! {
    "energy" => RankingMode::ByEnergy,
    "fitnes" => RankingMode::ByFitness,
};

/// Classifies one line of engine output. Never fails.
pub fn classify(line: &str) -> ParseEvent {
    let line = strip_line_ending(line);

    grid_vertex(line)
        .or_else(|| solution_row(line))
        .or_else(|| generation_start(line))
        .or_else(|| ranking_mode(line))
        .or_else(|| clustering_started(line))
        .or_else(|| rotamer_announcement(line))
        .or_else(|| done(line))
        .or_else(|| flex_dihedral_shift(line))
        .or_else(|| listed_atom(line))
        .or_else(|| protein_centroid(line))
        .or_else(|| ready_signal(line))
        .or_else(|| fatal_error(line))
        .unwrap_or_else(|| ParseEvent::Unrecognized {
            raw: line.to_string(),
        })
}

fn ends_token(rest: &str) -> bool {
    rest.is_empty() || rest.starts_with(char::is_whitespace)
}

/// `Grid[<index>]=` followed by three 8-column floats.
fn grid_vertex(line: &str) -> Option<ParseEvent> {
    let rest = line.strip_prefix("Grid[")?;
    let (digits, rest) = split_leading_digits(rest);
    let coords = rest.strip_prefix("]=")?;
    let index = digits.parse().ok()?;

    let x = fixed_f64(coords, 0, GRID_FIELD_WIDTH)?;
    let y = fixed_f64(coords, GRID_FIELD_WIDTH, 2 * GRID_FIELD_WIDTH)?;
    let z = fixed_f64(coords, 2 * GRID_FIELD_WIDTH, 3 * GRID_FIELD_WIDTH)?;

    Some(ParseEvent::GridVertex {
        index,
        position: Point3::new(x, y, z),
    })
}

/// `    3 (  g1  g2 ... )  value= <v> fitnes= <f>`
fn solution_row(line: &str) -> Option<ParseEvent> {
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();
    let (digits, rest) = split_leading_digits(trimmed);
    let genes_text = rest.strip_prefix(" (")?;
    let rank = digits.parse().ok()?;
    let column_offset = indent + digits.len() + 2;

    let close = genes_text.find(')')?;
    let genes = genes_text[..close]
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<Vec<f64>, _>>()
        .ok()?;

    let tail = &genes_text[close + 1..];
    let value_start = tail.find("value=")? + "value=".len();
    let fitness_marker = tail.find("fitnes=")?;
    if fitness_marker < value_start {
        return None;
    }
    let value = tail[value_start..fitness_marker].trim().parse().ok()?;
    let fitness = tail[fitness_marker + "fitnes=".len()..]
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;

    Some(ParseEvent::SolutionRow {
        row: SolutionRow {
            rank,
            genes,
            value,
            fitness,
        },
        column_offset,
    })
}

fn generation_start(line: &str) -> Option<ParseEvent> {
    let rest = line.strip_prefix("Generation:")?.trim_start();
    let (digits, after) = split_leading_digits(rest);
    if !ends_token(after) {
        return None;
    }
    Some(ParseEvent::GenerationStart {
        number: digits.parse().ok()?,
    })
}

fn ranking_mode(line: &str) -> Option<ParseEvent> {
    let rest = line.strip_prefix("best by ")?;
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let (word, after) = rest.split_at(end);
    if !ends_token(after) {
        return None;
    }
    RANKING_WORDS
        .get(word)
        .map(|mode| ParseEvent::RankingMode { mode: *mode })
}

fn clustering_started(line: &str) -> Option<ParseEvent> {
    line.starts_with("clustering all individuals")
        .then_some(ParseEvent::ClusteringStarted)
}

/// `Rotamer for GLU81- with dihedrals  -87.647  -80.859   27.236`
fn rotamer_announcement(line: &str) -> Option<ParseEvent> {
    if !line.starts_with("Rotamer for") {
        return None;
    }
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["Rotamer", "for", residue, "with", "dihedrals", dihedrals @ ..]
            if !dihedrals.is_empty() =>
        {
            let residue = ResidueKey::from_token(residue)?;
            let dihedrals = dihedrals
                .iter()
                .map(|w| w.parse())
                .collect::<Result<Vec<f64>, _>>()
                .ok()?;
            Some(ParseEvent::RotamerAnnouncement { residue, dihedrals })
        }
        _ => None,
    }
}

fn done(line: &str) -> Option<ParseEvent> {
    line.starts_with("Done.").then_some(ParseEvent::Done)
}

/// `shiftval= <atom A> <atom B> <..> <..> <shift>`; atoms are fields 1 and 2,
/// the shift is field 5.
fn flex_dihedral_shift(line: &str) -> Option<ParseEvent> {
    if !line.starts_with("shiftval=") {
        return None;
    }
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 6 {
        return None;
    }
    Some(ParseEvent::FlexDihedralShift {
        atoms: AtomPairKey::new(fields[1], fields[2]),
        shift: fields[5].parse().ok()?,
    })
}

/// `lout[<position>]=   <atom>`
fn listed_atom(line: &str) -> Option<ParseEvent> {
    let rest = line.strip_prefix("lout[")?;
    let (position, rest) = split_leading_digits(rest);
    let rest = rest.strip_prefix("]=")?.trim_start();
    let (atom, after) = split_leading_digits(rest);
    if !ends_token(after) {
        return None;
    }
    Some(ParseEvent::ListedAtom {
        position: position.parse().ok()?,
        atom_index: atom.parse().ok()?,
    })
}

fn protein_centroid(line: &str) -> Option<ParseEvent> {
    let rest = line.strip_prefix("the protein center of coordinates is:")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let mut fields = rest.split_whitespace().map(str::parse::<f64>);
    let x = fields.next()?.ok()?;
    let y = fields.next()?.ok()?;
    let z = fields.next()?.ok()?;
    Some(ParseEvent::ProteinCentroid {
        center: Point3::new(x, y, z),
    })
}

fn ready_signal(line: &str) -> Option<ParseEvent> {
    line.starts_with("SIGMA_SHARE")
        .then_some(ParseEvent::ReadySignal)
}

fn fatal_error(line: &str) -> Option<ParseEvent> {
    line.starts_with("ERROR").then(|| ParseEvent::FatalError {
        message: line.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unrecognized(line: &str) -> bool {
        matches!(classify(line), ParseEvent::Unrecognized { .. })
    }

    #[test]
    fn grid_vertex_reads_three_fixed_width_fields() {
        let event = classify("Grid[12]=   1.000   2.500  -3.250\n");
        assert_eq!(
            event,
            ParseEvent::GridVertex {
                index: 12,
                position: Point3::new(1.0, 2.5, -3.25),
            }
        );
    }

    #[test]
    fn grid_vertex_with_blank_field_is_unrecognized() {
        assert!(unrecognized("Grid[3]=   1.000           -3.250"));
    }

    #[test]
    fn solution_row_reports_rank_values_and_column_offset() {
        let line = "    0 (   16.819   128.976    15.591   154.488   171.496  -137.480 )  value= -406.907 fitnes=  100.000";
        match classify(line) {
            ParseEvent::SolutionRow { row, column_offset } => {
                assert_eq!(row.rank, 0);
                assert_eq!(
                    row.genes,
                    vec![16.819, 128.976, 15.591, 154.488, 171.496, -137.48]
                );
                assert_eq!(row.value, -406.907);
                assert_eq!(row.fitness, 100.0);
                assert_eq!(column_offset, 7);
                assert_eq!(&line[column_offset..column_offset + 3], "   ");
            }
            other => panic!("expected a solution row, got {other:?}"),
        }
    }

    #[test]
    fn solution_row_without_fitness_is_unrecognized() {
        assert!(unrecognized(" 3 (  1.0 2.0 ) value= -10.0"));
        assert!(unrecognized(" 3 (  1.0 x ) value= -10.0 fitnes= 1.0"));
    }

    #[test]
    fn generation_start_accepts_padding_and_missing_newline() {
        assert_eq!(
            classify("Generation:   7\n"),
            ParseEvent::GenerationStart { number: 7 }
        );
        assert_eq!(
            classify("Generation: 0"),
            ParseEvent::GenerationStart { number: 0 }
        );
        assert!(unrecognized("Generation: 7a"));
        assert!(unrecognized("Generation:"));
    }

    #[test]
    fn ranking_mode_maps_known_words_only() {
        assert_eq!(
            classify("best by energy\n"),
            ParseEvent::RankingMode {
                mode: RankingMode::ByEnergy
            }
        );
        assert_eq!(
            classify("best by fitnes"),
            ParseEvent::RankingMode {
                mode: RankingMode::ByFitness
            }
        );
        assert!(unrecognized("best by volume"));
    }

    #[test]
    fn rotamer_announcement_collects_all_dihedrals() {
        let event = classify("Rotamer for GLU81- with dihedrals  -87.647  -80.859   27.236");
        assert_eq!(
            event,
            ParseEvent::RotamerAnnouncement {
                residue: ResidueKey::new("GLU", 81, ' '),
                dihedrals: vec![-87.647, -80.859, 27.236],
            }
        );
        assert!(unrecognized("Rotamer for GLU81- with dihedrals"));
    }

    #[test]
    fn flex_dihedral_shift_uses_fields_one_two_and_five() {
        let event = classify("shiftval= 916 917 a b 12.500");
        assert_eq!(
            event,
            ParseEvent::FlexDihedralShift {
                atoms: AtomPairKey::new("916", "917"),
                shift: 12.5,
            }
        );
        assert!(unrecognized("shiftval= 916 917"));
    }

    #[test]
    fn listed_atom_reads_position_and_atom() {
        assert_eq!(
            classify("lout[3]=  905\n"),
            ParseEvent::ListedAtom {
                position: 3,
                atom_index: 905,
            }
        );
    }

    #[test]
    fn protein_centroid_reads_three_floats() {
        assert_eq!(
            classify("the protein center of coordinates is: 1.000 2.000 3.000"),
            ParseEvent::ProteinCentroid {
                center: Point3::new(1.0, 2.0, 3.0),
            }
        );
    }

    #[test]
    fn markers_are_recognized() {
        assert_eq!(classify("SIGMA_SHARE\n"), ParseEvent::ReadySignal);
        assert_eq!(classify("Done.\n"), ParseEvent::Done);
        assert_eq!(
            classify("clustering all individuals"),
            ParseEvent::ClusteringStarted
        );
    }

    #[test]
    fn error_line_keeps_message_without_newline() {
        assert_eq!(
            classify("ERROR disk full\n"),
            ParseEvent::FatalError {
                message: "ERROR disk full".to_string()
            }
        );
    }

    #[test]
    fn unknown_and_empty_lines_are_unrecognized() {
        assert_eq!(
            classify("some future informational line\n"),
            ParseEvent::Unrecognized {
                raw: "some future informational line".to_string()
            }
        );
        assert!(unrecognized(""));
        assert!(unrecognized("   "));
    }

    #[test]
    fn classification_is_deterministic() {
        let lines = [
            "Grid[1]=   0.000   0.000   0.000",
            " 1 (  1.0 ) value= 2.0 fitnes= 3.0",
            "best by energy",
            "ERROR x",
            "garbage",
        ];
        for line in lines {
            assert_eq!(classify(line), classify(line));
        }
    }
}
