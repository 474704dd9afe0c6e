//! Prompt rendering for one chunk.
//!
//! Rows are labelled with their original 1-based index so the indices the
//! classifier returns can be used against the full dataset directly.

use serde_json::Value;
use sheetsift_core::Chunk;

/// Render the classification instruction for `chunk`.
pub fn render(query: &str, headers: &[String], chunk: &Chunk<'_>, threshold: f32) -> String {
    let rows = chunk
        .indexed_rows()
        .map(|(index, row)| format!("Row {index}: {}", json_array(row)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Instructions:\n\
         1. Analyze the provided spreadsheet data (Headers and Rows) in relation to the User Query.\n\
         2. For EACH row, calculate a relevance score from 0.0 to 1.0 indicating how well it matches the query.\n\
         3. Identify the row indices (1-based, as labelled below) that have a relevance score GREATER THAN OR EQUAL TO {threshold}.\n\
         4. Return ONLY a JSON array containing these row indices, e.g. [3, 7, 12].\n\
         5. Respond ONLY with the JSON array, without any additional text or markdown formatting.\n\
         \n\
         Headers: {headers}\n\
         Rows:\n\
         {rows}\n\
         User Query: {query}\n\
         \n\
         Output:",
        headers = json_array(headers),
    )
}

fn json_array(cells: &[String]) -> String {
    Value::from(cells.to_vec()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsift_core::Dataset;

    fn dataset(n: usize) -> Dataset {
        Dataset::new(
            vec!["Event".into(), "Category".into()],
            (1..=n)
                .map(|i| vec![format!("event {i}"), "misc".into()])
                .collect(),
        )
    }

    #[test]
    fn rows_use_original_indices() {
        let ds = dataset(25);
        let chunk = ds.chunks(10).nth(1).unwrap();
        let prompt = render("yoga", &ds.headers, &chunk, 0.7);

        assert!(prompt.contains("Row 11: [\"event 11\",\"misc\"]"));
        assert!(prompt.contains("Row 20: [\"event 20\",\"misc\"]"));
        assert!(!prompt.contains("Row 1:"));
        assert!(!prompt.contains("Row 21:"));
    }

    #[test]
    fn includes_headers_query_and_threshold() {
        let ds = dataset(3);
        let chunk = ds.chunks(100).next().unwrap();
        let prompt = render("morning yoga classes", &ds.headers, &chunk, 0.7);

        assert!(prompt.contains("Headers: [\"Event\",\"Category\"]"));
        assert!(prompt.contains("User Query: morning yoga classes"));
        assert!(prompt.contains("GREATER THAN OR EQUAL TO 0.7"));
        assert!(prompt.contains("ONLY with the JSON array"));
        assert!(prompt.trim_end().ends_with("Output:"));
    }

    #[test]
    fn cells_are_json_escaped() {
        let ds = Dataset::new(
            vec!["Note".into()],
            vec![vec!["say \"hi\"\nthen leave".into()]],
        );
        let chunk = ds.chunks(10).next().unwrap();
        let prompt = render("q", &ds.headers, &chunk, 0.5);
        assert!(prompt.contains(r#"Row 1: ["say \"hi\"\nthen leave"]"#));
    }
}
