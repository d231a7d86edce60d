//! Incident table helpers for reporting.

use std::collections::BTreeMap;

use qcwatch_types::IncidentRecord;

/// Records with the given error description, in table order.
pub fn with_description<'a>(
    incidents: &'a [IncidentRecord],
    description: &'a str,
) -> impl Iterator<Item = &'a IncidentRecord> + 'a {
    incidents
        .iter()
        .filter(move |r| r.error_description == description)
}

/// Records ordered by system then variable. Order within a column is the
/// recording order.
pub fn sorted_for_report(incidents: &[IncidentRecord]) -> Vec<IncidentRecord> {
    let mut sorted = incidents.to_vec();
    sorted.sort_by(|a, b| {
        (a.system_name.as_str(), a.variable_name.as_str())
            .cmp(&(b.system_name.as_str(), b.variable_name.as_str()))
    });
    sorted
}

/// Failed sample count per error description.
pub fn failed_samples_by_description(incidents: &[IncidentRecord]) -> BTreeMap<&str, u64> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for r in incidents {
        *counts.entry(r.error_description.as_str()).or_default() += r.run_length;
    }
    counts
}

#[cfg(test)]
mod tests {
    use qcwatch_types::Timestamp;

    use super::*;

    fn record(system: &str, variable: &str, start: i64, error: &str) -> IncidentRecord {
        IncidentRecord::builder()
            .system(system)
            .variable(variable)
            .span(Timestamp::from_secs(start), Timestamp::from_secs(start), 1)
            .error(error)
            .build()
    }

    #[test]
    fn report_order_is_stable_within_a_column() {
        let table = vec![
            record("Simple", "B", 0, "Data > upper bound, 1"),
            record("Simple", "A", 3, "Missing data"),
            record("", "", 0, "Missing timestamp"),
            record("Simple", "A", 1, "Corrupt data"),
        ];
        let sorted = sorted_for_report(&table);
        let order: Vec<(&str, i64)> = sorted
            .iter()
            .map(|r| (r.variable_name.as_str(), r.start_time.as_millis() / 1000))
            .collect();
        assert_eq!(order, vec![("", 0), ("A", 3), ("A", 1), ("B", 0)]);
    }

    #[test]
    fn filter_and_count_by_description() {
        let table = vec![
            record("S", "A", 0, "Missing data"),
            record("S", "B", 0, "Corrupt data"),
            record("S", "C", 0, "Missing data"),
        ];
        assert_eq!(with_description(&table, "Missing data").count(), 2);
        let counts = failed_samples_by_description(&table);
        assert_eq!(counts.get("Missing data"), Some(&2));
        assert_eq!(counts.get("Corrupt data"), Some(&1));
    }
}
