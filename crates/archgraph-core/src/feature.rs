use crate::NodeId;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static STEP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(Given|When|Then|And|But)\b").expect("static step keyword pattern")
});
static FEATURE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*Feature:\s*(.*?)\s*$").expect("static feature pattern"));

/// A Gherkin file attached to one node and version tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub node_id: NodeId,
    pub version: String,
    pub filename: String,
    pub title: String,
    pub content: String,
    pub step_count: u32,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Feature {
    /// Builds a feature record, deriving title and step count from `content`.
    pub fn parse(
        node_id: impl Into<NodeId>,
        version: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let filename = filename.into();
        let content = content.into();
        let title = parse_title(&content).unwrap_or_else(|| {
            filename
                .strip_suffix(".feature")
                .unwrap_or(&filename)
                .to_string()
        });
        let step_count = count_steps(&content).total();

        Self {
            node_id: node_id.into(),
            version: version.into(),
            filename,
            title,
            content,
            step_count,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounts {
    pub given: u32,
    pub when: u32,
    pub then: u32,
    pub and: u32,
    pub but: u32,
}

impl StepCounts {
    pub fn total(&self) -> u32 {
        self.given + self.when + self.then + self.and + self.but
    }
}

/// Counts step lines by leading keyword.
pub fn count_steps(content: &str) -> StepCounts {
    let mut counts = StepCounts::default();
    for line in content.lines() {
        let Some(caps) = STEP_LINE.captures(line) else {
            continue;
        };
        match &caps[1] {
            "Given" => counts.given += 1,
            "When" => counts.when += 1,
            "Then" => counts.then += 1,
            "And" => counts.and += 1,
            _ => counts.but += 1,
        }
    }
    counts
}

/// Text after the first `Feature:` keyword, if any line carries one.
pub fn parse_title(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| FEATURE_LINE.captures(line))
        .map(|caps| caps[1].to_string())
        .filter(|title| !title.is_empty())
}

/// Feature totals for one node and version tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCountSummary {
    pub node_id: NodeId,
    pub version: String,
    pub feature_count: u32,
    pub step_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN: &str = "\
@auth
Feature: User login
  Scenario: valid credentials
    Given a registered user
    And the login page
    When they submit valid credentials
    Then they see the dashboard
    But no warning banner
  # Given inside a comment is not a step
  Scenario: Givenness is not a keyword
    Givenchy is not a step either
";

    #[test]
    fn counts_keyword_led_lines_only() {
        let counts = count_steps(LOGIN);
        assert_eq!(counts.given, 1);
        assert_eq!(counts.and, 1);
        assert_eq!(counts.when, 1);
        assert_eq!(counts.then, 1);
        assert_eq!(counts.but, 1);
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn repeated_counts_are_independent() {
        let first = count_steps(LOGIN);
        let empty = count_steps("");
        let second = count_steps(LOGIN);
        assert_eq!(first, second);
        assert_eq!(empty.total(), 0);
    }

    #[test]
    fn title_falls_back_to_filename() {
        let parsed = Feature::parse("auth", "mvp", "login.feature", LOGIN);
        assert_eq!(parsed.title, "User login");
        assert_eq!(parsed.step_count, 5);

        let untitled = Feature::parse("auth", "mvp", "logout.feature", "Given nothing");
        assert_eq!(untitled.title, "logout");
        assert_eq!(untitled.step_count, 1);
    }
}
