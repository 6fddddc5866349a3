//! Formatted output helpers for CLI commands.
//!
//! Provides consistent table formatting and a heavy rule for headers.

/// Heavy horizontal rule printed under section headers.
pub const RULE: &str = "═══════════════════════════════════";

/// Lays out `rows` under `headers` in left-aligned columns.
///
/// Every column is as wide as its widest cell; the last column is not
/// padded. Rows shorter than the header leave trailing cells empty.
#[must_use]
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Vec<String> = headers.iter().map(|h| (*h).to_string()).collect();
    let mut out = String::new();
    for row in std::iter::once(&header).chain(rows) {
        let line = widths
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let cell = row.get(i).map_or("", String::as_str);
                if i + 1 == widths.len() {
                    cell.to_string()
                } else {
                    format!("{cell:<width$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Marker shown next to a unit in listings.
#[must_use]
pub const fn realized_marker(realized: bool) -> &'static str {
    if realized { "●" } else { "○" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_string()).collect()
    }

    #[test]
    fn format_table_aligns_columns() {
        let table = format_table(
            &["UNIT", "OUTPUT", "VALUE"],
            &[
                row(&["network", "vpc", "vpc-0a1b"]),
                row(&["backend", "service-name", "backend"]),
            ],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "UNIT     OUTPUT        VALUE");
        assert_eq!(lines[1], "network  vpc           vpc-0a1b");
        assert_eq!(lines[2], "backend  service-name  backend");
    }

    #[test]
    fn format_table_without_rows_prints_header() {
        assert_eq!(format_table(&["NAME", "KIND"], &[]), "NAME  KIND\n");
    }

    #[test]
    fn format_table_tolerates_short_rows() {
        let table = format_table(&["A", "B"], &[row(&["x"])]);
        assert_eq!(table.lines().nth(1), Some("x"));
    }

    #[test]
    fn rule_is_a_single_heavy_line() {
        assert_eq!(RULE.chars().count(), 35);
        assert!(RULE.chars().all(|c| c == '═'));
    }

    #[test]
    fn realized_marker_differs() {
        assert_ne!(realized_marker(true), realized_marker(false));
    }
}
