use super::client::{Outcome, TestResultRecord};
use crate::report::Breakdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Automated,
    Manual,
}

/// A test result reduced to what aggregation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedResult {
    pub kind: ResultKind,
    pub outcome: Outcome,
}

/// Results carrying an automated test name came from an automated run.
pub fn classify(record: &TestResultRecord) -> ClassifiedResult {
    let kind = match record.automated_test_name.as_deref() {
        Some(name) if !name.trim().is_empty() => ResultKind::Automated,
        _ => ResultKind::Manual,
    };

    ClassifiedResult {
        kind,
        outcome: record.outcome,
    }
}

/// Anything that neither passed nor failed counts as skipped.
pub fn tally<'a>(results: impl IntoIterator<Item = &'a ClassifiedResult>) -> Breakdown {
    let (total, passed, failed) =
        results
            .into_iter()
            .fold((0, 0, 0), |(total, passed, failed), r| match r.outcome {
                Outcome::Passed => (total + 1, passed + 1, failed),
                Outcome::Failed => (total + 1, passed, failed + 1),
                _ => (total + 1, passed, failed),
            });

    Breakdown::new(total, passed, failed, total - passed - failed)
}

/// Automated and manual breakdowns, in that order.
pub fn breakdowns<'a>(
    results: impl IntoIterator<Item = &'a ClassifiedResult>,
) -> (Breakdown, Breakdown) {
    let (automated, manual): (Vec<_>, Vec<_>) = results
        .into_iter()
        .partition(|r| r.kind == ResultKind::Automated);

    (tally(automated), tally(manual))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::azure::client::TestCaseRef;

    fn record(outcome: Outcome, automated_test_name: Option<&str>) -> TestResultRecord {
        TestResultRecord {
            outcome,
            automated_test_name: automated_test_name.map(String::from),
            test_case: Some(TestCaseRef {
                id: "77".to_string(),
                name: "Checkout".to_string(),
            }),
            error_message: None,
        }
    }

    #[test]
    fn test_automated_test_name_marks_automated() {
        let result = classify(&record(Outcome::Passed, Some("Shop.Tests.Checkout")));

        assert_eq!(result.kind, ResultKind::Automated);
    }

    #[test]
    fn test_missing_or_blank_name_marks_manual() {
        assert_eq!(
            classify(&record(Outcome::Passed, None)).kind,
            ResultKind::Manual
        );
        assert_eq!(
            classify(&record(Outcome::Passed, Some("  "))).kind,
            ResultKind::Manual
        );
    }

    #[test]
    fn test_breakdowns_split_by_kind() {
        let results: Vec<_> = [
            record(Outcome::Passed, Some("a")),
            record(Outcome::Passed, Some("b")),
            record(Outcome::Failed, Some("c")),
            record(Outcome::NotExecuted, Some("d")),
            record(Outcome::Failed, None),
            record(Outcome::Blocked, None),
        ]
        .iter()
        .map(classify)
        .collect();

        let (automated, manual) = breakdowns(&results);

        assert_eq!(automated, Breakdown::new(4, 2, 1, 1));
        assert!((automated.pass_rate - 66.7).abs() < f64::EPSILON);
        assert_eq!(manual, Breakdown::new(2, 0, 1, 1));
        assert!(manual.pass_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_tally_of_nothing_is_zero() {
        let breakdown = tally(&[]);

        assert_eq!(breakdown, Breakdown::default());
    }
}
