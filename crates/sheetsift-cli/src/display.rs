//! Plain-text rendering of filtered rows and the per-chunk diagnostic summary.

use std::fmt::Write;

use sheetsift_ai::{QueryReport, ShortCircuit};

const MAX_CELL_WIDTH: usize = 40;

/// Render rows as an aligned table with a header rule.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(display_width(cell));
            }
        }
    }

    let mut out = String::new();
    push_line(&mut out, headers, &widths);
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    push_line(&mut out, &rule, &widths);
    for row in rows {
        push_line(&mut out, row, &widths);
    }
    let _ = writeln!(out, "({} row{})", rows.len(), if rows.len() == 1 { "" } else { "s" });
    out
}

/// One line per failed chunk plus a totals line.
pub fn render_summary(report: &QueryReport) -> String {
    let mut out = String::new();
    match report.short_circuit {
        Some(ShortCircuit::EmptyQuery) => {
            let _ = writeln!(out, "empty query: returned all {} rows", report.total_rows);
            return out;
        }
        Some(ShortCircuit::EmptyDataset) => {
            let _ = writeln!(out, "dataset has no rows");
            return out;
        }
        None => {}
    }

    for (outcome, error) in report.failed() {
        let _ = writeln!(
            out,
            "chunk {} (rows {}-{}) failed: {error}",
            outcome.span.ordinal + 1,
            outcome.span.first_index(),
            outcome.span.last_index(),
        );
    }
    let salvaged = report.chunks.iter().filter(|c| c.salvaged).count();
    let rejected: usize = report.chunks.iter().map(|c| c.rejected.len()).sum();
    let _ = writeln!(
        out,
        "{} of {} rows matched; {}/{} chunks succeeded, {salvaged} salvaged, {rejected} indices dropped",
        report.indices.len(),
        report.total_rows,
        report.succeeded(),
        report.chunks.len(),
    );
    if report.is_degraded() {
        let _ = writeln!(out, "warning: some chunks failed, results may be incomplete");
    }
    out
}

fn push_line<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize]) {
    let line: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            let cell = cells.get(i).map(|c| truncate(c.as_ref())).unwrap_or_default();
            format!("{cell:<w$}")
        })
        .collect();
    let _ = writeln!(out, "{}", line.join(" | ").trim_end());
}

fn display_width(s: &str) -> usize {
    s.chars().count().min(MAX_CELL_WIDTH)
}

fn truncate(s: &str) -> String {
    let single_line = s.replace(['\n', '\r'], " ");
    if single_line.chars().count() <= MAX_CELL_WIDTH {
        single_line
    } else {
        let mut t: String = single_line.chars().take(MAX_CELL_WIDTH - 1).collect();
        t.push('…');
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn table_aligns_columns() {
        let headers = s(&["Event", "Category"]);
        let rows = vec![s(&["Sunrise flow", "yoga"]), s(&["5k", "running"])];
        let table = render_table(&headers, &rows);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Event        | Category");
        assert_eq!(lines[1], "------------ | --------");
        assert_eq!(lines[2], "Sunrise flow | yoga");
        assert_eq!(lines[3], "5k           | running");
        assert_eq!(lines[4], "(2 rows)");
    }

    #[test]
    fn table_with_no_rows() {
        let table = render_table(&s(&["A"]), &[]);
        assert!(table.ends_with("(0 rows)\n"));
    }

    #[test]
    fn long_cells_truncated() {
        let long = "x".repeat(100);
        let table = render_table(&s(&["A"]), &[vec![long]]);
        let row = table.lines().nth(2).unwrap();
        assert_eq!(row.chars().count(), MAX_CELL_WIDTH);
        assert!(row.ends_with('…'));
    }

    #[test]
    fn multiline_cell_flattened() {
        assert_eq!(truncate("a\nb"), "a b");
    }
}
