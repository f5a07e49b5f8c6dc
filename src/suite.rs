//! Case files: one ruleset, many subjects with expected outcomes.
//!
//! ```json
//! {
//!   "rules": {"integer": true, "range": [1, 3]},
//!   "record": "stopAtFirst",
//!   "cases": [
//!     {"name": "in range", "subject": 2, "expect": true},
//!     {"subject": 4, "expect": false, "record": ["0 root: range(1, 3) failed - integer 4"]}
//!   ]
//! }
//! ```
use serde::Deserialize;
use serde_json::Value;

use crate::challenge::{Challenger, RecordMode};
use crate::descriptor::RuleProvider;
use crate::error::ChallengeError;
use crate::normalize::{Normalizer, ROOT};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SuiteFile {
    pub rules: Value,
    #[serde(default = "default_record")]
    pub record: RecordMode,
    pub cases: Vec<Case>,
}

fn default_record() -> RecordMode {
    RecordMode::StopAtFirst
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Case {
    #[serde(default)]
    pub name: Option<String>,
    pub subject: Value,
    pub expect: bool,
    /// Expected record lines, compared exactly when present.
    #[serde(default)]
    pub record: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    pub name: String,
    pub expected: bool,
    pub actual: bool,
    pub record: Vec<String>,
    pub record_matches: bool,
}

impl CaseOutcome {
    pub fn ok(&self) -> bool {
        self.expected == self.actual && self.record_matches
    }
}

impl SuiteFile {
    /// Normalizes the suite's ruleset once and challenges every case with it.
    pub fn run<P: RuleProvider + ?Sized>(&self, provider: &P) -> Result<Vec<CaseOutcome>, ChallengeError> {
        let rules = Normalizer::new(provider).normalize(&self.rules)?;
        let mut challenger = Challenger::new(provider).with_record(self.record);

        let mut outcomes = Vec::with_capacity(self.cases.len());
        for (i, case) in self.cases.iter().enumerate() {
            let actual = challenger.challenge(&case.subject, &rules, ROOT)?;
            let record = challenger.record_lines();
            let record_matches = case.record.as_ref().is_none_or(|want| *want == record);
            outcomes.push(CaseOutcome {
                name: case.name.clone().unwrap_or_else(|| format!("case {i}")),
                expected: case.expect,
                actual,
                record,
                record_matches,
            });
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_de::from_str_with_path;
    use crate::rules::StandardRules;

    const SUITE: &str = r#"{
        "rules": {"tableElements": {"wheels": ["integer", {"range": [1, 3]}], "saddle": "string"}},
        "cases": [
            {"name": "bike", "subject": {"wheels": 2, "saddle": "gel"}, "expect": true},
            {"subject": {"wheels": 4, "saddle": "gel"}, "expect": false,
             "record": ["1 root.wheels: range(1, 3) failed - integer 4"]},
            {"name": "wrong guess", "subject": {"wheels": 1}, "expect": true}
        ]
    }"#;

    #[test]
    fn runs_every_case() {
        let suite: SuiteFile = from_str_with_path(SUITE).unwrap();
        assert_eq!(suite.record, RecordMode::StopAtFirst);
        let outcomes = suite.run(&StandardRules::new()).unwrap();
        let verdicts: Vec<(&str, bool)> = outcomes.iter().map(|o| (o.name.as_str(), o.ok())).collect();
        assert_eq!(verdicts, [("bike", true), ("case 1", true), ("wrong guess", false)]);
        assert_eq!(outcomes[2].record, ["0 root: required key `saddle` is missing - map(1)"]);
    }

    #[test]
    fn malformed_cases_report_their_path() {
        let src = r#"{"rules": "integer", "cases": [{"subject": 1, "expect": "yes"}]}"#;
        let err = from_str_with_path::<SuiteFile>(src).unwrap_err();
        assert_eq!(err.path, "cases[0].expect");
    }

    #[test]
    fn bad_rules_fail_the_whole_suite() {
        let src = r#"{"rules": {"nope": true}, "cases": []}"#;
        let suite: SuiteFile = from_str_with_path(src).unwrap();
        assert!(matches!(suite.run(&StandardRules::new()), Err(ChallengeError::Definition(_))));
    }
}
