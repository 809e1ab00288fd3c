//! Due-date policy

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Named loan policies. Both are kept: approval always overwrites the
/// provisional due date computed at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoanPolicy {
    /// Provisional due date set when a request is submitted
    StandardLoan,
    /// Effective due date set when staff approve the request
    ApprovedLoan,
}

impl LoanPolicy {
    pub fn loan_days(self) -> i64 {
        match self {
            LoanPolicy::StandardLoan => 15,
            LoanPolicy::ApprovedLoan => 14,
        }
    }
}

pub fn compute_due_date(reference: DateTime<Utc>, policy: LoanPolicy) -> DateTime<Utc> {
    reference + Duration::days(policy.loan_days())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_policies_stay_distinct() {
        let reference = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();

        assert_eq!(
            compute_due_date(reference, LoanPolicy::StandardLoan),
            Utc.with_ymd_and_hms(2024, 3, 16, 10, 30, 0).unwrap()
        );
        assert_eq!(
            compute_due_date(reference, LoanPolicy::ApprovedLoan),
            Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_crosses_month_and_leap_day() {
        let reference = Utc.with_ymd_and_hms(2024, 2, 20, 0, 0, 0).unwrap();
        assert_eq!(
            compute_due_date(reference, LoanPolicy::ApprovedLoan),
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
        );
    }
}
