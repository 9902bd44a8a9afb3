/// Returns the trimmed text between byte columns `start..end`, or `""` when
/// the line is too short or the range does not fall on character boundaries.
pub fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or("").trim()
}

/// Parses a fixed-width float field. Blank fields are rejected.
pub fn fixed_f64(line: &str, start: usize, end: usize) -> Option<f64> {
    let field = slice_and_trim(line, start, end);
    if field.is_empty() {
        return None;
    }
    field.parse().ok()
}

/// Parses a fixed-width unsigned integer field. Blank fields are rejected.
pub fn fixed_u32(line: &str, start: usize, end: usize) -> Option<u32> {
    let field = slice_and_trim(line, start, end);
    if field.is_empty() {
        return None;
    }
    field.parse().ok()
}

/// Splits `text` at the end of its leading ASCII digits.
pub fn split_leading_digits(text: &str) -> (&str, &str) {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    text.split_at(end)
}

/// Strips a trailing `\n` or `\r\n`.
pub fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_and_trim_handles_short_lines() {
        assert_eq!(slice_and_trim("abc", 1, 10), "bc");
        assert_eq!(slice_and_trim("abc", 5, 10), "");
    }

    #[test]
    fn fixed_f64_tolerates_padding_and_rejects_blanks() {
        assert_eq!(fixed_f64("  -1.250  ", 0, 10), Some(-1.25));
        assert_eq!(fixed_f64("        ", 0, 8), None);
        assert_eq!(fixed_f64("  1.x   ", 0, 8), None);
    }

    #[test]
    fn fixed_u32_parses_padded_integers() {
        assert_eq!(fixed_u32("HETTYP  902", 7, 11), Some(902));
        assert_eq!(fixed_u32("HETTYP     ", 7, 11), None);
    }

    #[test]
    fn split_leading_digits_stops_at_first_non_digit() {
        assert_eq!(split_leading_digits("12] rest"), ("12", "] rest"));
        assert_eq!(split_leading_digits("abc"), ("", "abc"));
    }

    #[test]
    fn strip_line_ending_removes_lf_and_crlf() {
        assert_eq!(strip_line_ending("Done.\n"), "Done.");
        assert_eq!(strip_line_ending("Done.\r\n"), "Done.");
        assert_eq!(strip_line_ending("Done."), "Done.");
    }
}
