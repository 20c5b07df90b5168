use std::collections::HashMap;

/// Combine one or more column values into a single row label.
///
/// Values are trimmed; empty ones are omitted entirely rather than kept as
/// blank segments. Returns `""` when every part is empty, which excludes the
/// row from both engine passes.
pub fn row_label(row: &HashMap<String, String>, columns: &[String]) -> String {
    let parts: Vec<&str> = columns
        .iter()
        .filter_map(|column| row.get(column))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();
    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn empty_segments_are_omitted() {
        let row = row(&[("A", "x"), ("B", ""), ("C", "y")]);
        assert_eq!(row_label(&row, &cols(&["A", "B", "C"])), "x | y");
    }

    #[test]
    fn all_empty_yields_empty_label() {
        let row = row(&[("A", ""), ("B", "   ")]);
        assert_eq!(row_label(&row, &cols(&["A", "B"])), "");
    }

    #[test]
    fn values_are_trimmed() {
        let row = row(&[("A", "  alice "), ("B", "ops\t")]);
        assert_eq!(row_label(&row, &cols(&["A", "B"])), "alice | ops");
    }

    #[test]
    fn column_order_is_preserved() {
        let row = row(&[("A", "x"), ("B", "y")]);
        assert_eq!(row_label(&row, &cols(&["B", "A"])), "y | x");
    }

    #[test]
    fn missing_columns_read_as_empty() {
        let row = row(&[("A", "x")]);
        assert_eq!(row_label(&row, &cols(&["A", "Nope"])), "x");
    }
}
