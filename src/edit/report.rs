use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_TESTS: usize = 20;
const MAX_SUMMARY_CHARS: usize = 5000;
const MAX_NAME_CHARS: usize = 200;
const MAX_TEXT_CHARS: usize = 500;

/// Aggregate verdict of a cross-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overall {
    Pass,
    Fail,
    #[default]
    Mixed,
}

impl Overall {
    /// Lenient parse: anything unrecognised is `Mixed`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "pass" => Overall::Pass,
            "fail" => Overall::Fail,
            _ => Overall::Mixed,
        }
    }
}

impl std::fmt::Display for Overall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Overall::Pass => write!(f, "pass"),
            Overall::Fail => write!(f, "fail"),
            Overall::Mixed => write!(f, "mixed"),
        }
    }
}

/// Verdict of a single hidden test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
}

impl TestStatus {
    /// Lenient parse: anything other than "pass" counts as a failure.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("pass") {
            TestStatus::Pass
        } else {
            TestStatus::Fail
        }
    }

    pub fn is_pass(self) -> bool {
        self == TestStatus::Pass
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "pass"),
            TestStatus::Fail => write!(f, "fail"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counts {
    #[serde(rename = "pass", default)]
    pub pass_count: u32,
    #[serde(rename = "fail", default)]
    pub fail_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: TestStatus,
    #[serde(default)]
    pub reason: String,
}

/// Result of verifying the source against hidden tests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CrossCheckReport {
    pub overall: Overall,
    #[serde(default)]
    pub counts: Counts,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tests: Vec<TestOutcome>,
}

impl CrossCheckReport {
    /// Build a report whose counts are derived from `tests`.
    pub fn new(overall: Overall, summary: impl Into<String>, tests: Vec<TestOutcome>) -> Self {
        let counts = Self::tally(&tests);
        Self {
            overall,
            counts,
            summary: summary.into(),
            tests,
        }
    }

    pub fn tally(tests: &[TestOutcome]) -> Counts {
        let pass_count = tests.iter().filter(|t| t.status.is_pass()).count() as u32;
        Counts {
            pass_count,
            fail_count: tests.len() as u32 - pass_count,
        }
    }

    /// Whether `counts` agrees with the entries in `tests`.
    ///
    /// Always true for a report straight from [`CrossCheckReport::sanitize`];
    /// may be false for one rebuilt from a display surface.
    pub fn counts_consistent(&self) -> bool {
        self.counts == Self::tally(&self.tests)
    }

    /// Ingest a raw cross-check payload.
    ///
    /// Unknown verdicts are coerced (`mixed` / `fail`), text fields are
    /// truncated, at most 20 tests are kept, non-object test entries are
    /// dropped, and counts are recomputed from what remains.
    pub fn sanitize(raw: &Value) -> Self {
        let text = |v: Option<&Value>, default: &str| match v {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => default.to_string(),
            Some(other) => other.to_string(),
        };

        let overall = raw
            .get("overall")
            .and_then(Value::as_str)
            .map(Overall::from_label)
            .unwrap_or_default();
        let summary = truncate(&text(raw.get("summary"), ""), MAX_SUMMARY_CHARS);

        let tests = raw
            .get("tests")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .take(MAX_TESTS)
                    .filter(|t| t.is_object())
                    .map(|t| TestOutcome {
                        name: truncate(&text(t.get("name"), "Unnamed test"), MAX_NAME_CHARS),
                        description: truncate(&text(t.get("description"), ""), MAX_TEXT_CHARS),
                        status: t
                            .get("status")
                            .and_then(Value::as_str)
                            .map(TestStatus::from_label)
                            .unwrap_or(TestStatus::Fail),
                        reason: truncate(&text(t.get("reason"), ""), MAX_TEXT_CHARS),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self::new(overall, summary, tests)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
