use crate::table::{Table, cell_text};

pub const SPORT_ALIASES: ColumnAliases = ColumnAliases::new(&["sport", "category"]);
pub const BOOKMAKER_ALIASES: ColumnAliases = ColumnAliases::new(&["book", "bookmaker", "house"]);

const TENNIS: &str = "tennis";

/// Ranked column-name fragments, matched case-insensitively against a
/// table's schema once per table.
#[derive(Debug, Clone, Copy)]
pub struct ColumnAliases {
    fragments: &'static [&'static str],
}

impl ColumnAliases {
    pub const fn new(fragments: &'static [&'static str]) -> Self {
        Self { fragments }
    }

    /// Indices of columns whose lower-cased name contains any fragment.
    pub fn resolve(&self, table: &Table) -> Vec<usize> {
        table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| {
                let lower = name.to_lowercase();
                self.fragments.iter().any(|frag| lower.contains(frag))
            })
            .map(|(idx, _)| idx)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyTable,
    EmptyNeedle,
    NoMatchingColumn,
}

/// Result of a lenient filter. `Skipped` hands the input back untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    Applied { table: Table, columns: Vec<String> },
    Skipped { table: Table, reason: SkipReason },
}

impl FilterOutcome {
    pub fn table(&self) -> &Table {
        match self {
            FilterOutcome::Applied { table, .. } | FilterOutcome::Skipped { table, .. } => table,
        }
    }

    pub fn into_table(self) -> Table {
        match self {
            FilterOutcome::Applied { table, .. } | FilterOutcome::Skipped { table, .. } => table,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            FilterOutcome::Skipped { reason, .. } => Some(*reason),
            FilterOutcome::Applied { .. } => None,
        }
    }

    pub fn describe(&self, label: &str) -> String {
        match self {
            FilterOutcome::Applied { table, columns } => format!(
                "{label}: kept {} rows via [{}]",
                table.len(),
                columns.join(", ")
            ),
            FilterOutcome::Skipped { reason, .. } => {
                let why = match reason {
                    SkipReason::EmptyTable => "empty table",
                    SkipReason::EmptyNeedle => "no filter text",
                    SkipReason::NoMatchingColumn => "no matching column",
                };
                format!("{label}: skipped ({why})")
            }
        }
    }
}

/// Keeps rows whose sport/category columns mention tennis.
pub fn filter_tennis(table: Table) -> FilterOutcome {
    if table.is_empty() {
        return FilterOutcome::Skipped {
            table,
            reason: SkipReason::EmptyTable,
        };
    }
    filter_any_column(table, SPORT_ALIASES, TENNIS)
}

/// Keeps rows whose bookmaker-like columns contain `needle`.
pub fn filter_by_bookmaker(table: Table, needle: &str) -> FilterOutcome {
    if needle.is_empty() {
        return FilterOutcome::Skipped {
            table,
            reason: SkipReason::EmptyNeedle,
        };
    }
    if table.is_empty() {
        return FilterOutcome::Skipped {
            table,
            reason: SkipReason::EmptyTable,
        };
    }
    filter_any_column(table, BOOKMAKER_ALIASES, needle)
}

fn filter_any_column(table: Table, aliases: ColumnAliases, needle: &str) -> FilterOutcome {
    let candidates = aliases.resolve(&table);
    if candidates.is_empty() {
        return FilterOutcome::Skipped {
            table,
            reason: SkipReason::NoMatchingColumn,
        };
    }

    let needle = needle.to_lowercase();
    let keep: Vec<usize> = table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            candidates.iter().any(|idx| {
                row.get(*idx)
                    .map(|cell| cell_text(cell).to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
        })
        .map(|(idx, _)| idx)
        .collect();

    let columns = candidates
        .iter()
        .map(|idx| table.columns[*idx].clone())
        .collect();
    FilterOutcome::Applied {
        table: table.select_rows(&keep),
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_any;
    use serde_json::json;

    #[test]
    fn aliases_match_case_insensitively() {
        let table = normalize_any(&json!([{"SportName": "x", "Bookie": "y", "HouseId": 1}]));
        assert_eq!(SPORT_ALIASES.resolve(&table), vec![0]);
        assert_eq!(BOOKMAKER_ALIASES.resolve(&table), vec![1, 2]);
    }

    #[test]
    fn bookmaker_filter_ors_columns() {
        let table = normalize_any(&json!([
            {"bookmaker": "Caliente", "house": ""},
            {"bookmaker": "bet365", "house": "caliente mx"},
            {"bookmaker": "bet365", "house": "other"},
        ]));
        let out = filter_by_bookmaker(table, "CALIENTE");
        assert_eq!(out.table().len(), 2);
        assert!(out.skip_reason().is_none());
    }

    #[test]
    fn null_cells_never_match() {
        let table = normalize_any(&json!([{"sport": null}, {"sport": "Tennis ATP"}]));
        let out = filter_tennis(table);
        assert_eq!(out.table().len(), 1);
        assert_eq!(out.table().cell_text(0, "sport"), "Tennis ATP");
    }
}
