use crate::domain::model::FlatRow;
use std::collections::HashSet;

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalized names of companies the user already knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingCompanySet {
    names: HashSet<String>,
}

impl ExistingCompanySet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| normalize_name(name.as_ref()))
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&normalize_name(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Rows whose Company Name is not already known, in input order.
pub fn find_new(candidates: Vec<FlatRow>, existing: &ExistingCompanySet) -> Vec<FlatRow> {
    candidates
        .into_iter()
        .filter(|row| {
            let known = existing.contains(row.company_name());
            if known {
                tracing::debug!("Already known: {}", row.company_name());
            }
            !known
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str) -> FlatRow {
        FlatRow::new(vec![
            ("Company Name".to_string(), name.to_string()),
            ("City".to_string(), "Boston".to_string()),
        ])
    }

    fn names(rows: &[FlatRow]) -> Vec<&str> {
        rows.iter().map(FlatRow::company_name).collect()
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Acme Pharma\t"), "acme pharma");
        assert_eq!(normalize_name("BETABIO"), "betabio");
    }

    #[test]
    fn test_empty_set_keeps_everything_in_order() {
        let rows = vec![row("Y"), row("X"), row("Z")];
        let result = find_new(rows.clone(), &ExistingCompanySet::default());
        assert_eq!(result, rows);
    }

    #[test]
    fn test_filters_known_names_case_and_whitespace_insensitive() {
        let existing = ExistingCompanySet::from_names(["  acme PHARMA ", "Gamma Therapeutics"]);
        let rows = vec![
            row("Acme Pharma"),
            row("BetaBio"),
            row(" gamma therapeutics"),
            row("Delta Bio"),
        ];
        let result = find_new(rows, &existing);
        assert_eq!(names(&result), vec!["BetaBio", "Delta Bio"]);
    }

    #[test]
    fn test_duplicates_within_candidates_are_kept() {
        let existing = ExistingCompanySet::from_names(["Acme"]);
        let result = find_new(vec![row("New Co"), row("New Co"), row("Acme")], &existing);
        assert_eq!(names(&result), vec!["New Co", "New Co"]);
    }

    #[test]
    fn test_find_new_is_idempotent() {
        let existing = ExistingCompanySet::from_names(["acme pharma"]);
        let rows = vec![row("Acme Pharma"), row("BetaBio"), row("")];
        let once = find_new(rows, &existing);
        let twice = find_new(once.clone(), &existing);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_blank_names_are_not_members() {
        let existing = ExistingCompanySet::from_names(["", "   ", "Acme"]);
        assert_eq!(existing.len(), 1);
        assert!(!existing.contains(""));
    }
}
