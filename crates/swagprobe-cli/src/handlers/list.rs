//! List command handler

use crate::commands::{ListArgs, ListFormat};
use crate::error::CliResult;
use serde::Serialize;
use swagprobe::suite::{select, TestCase};

#[derive(Debug, Serialize)]
struct CaseEntry {
    id: String,
    description: &'static str,
    epic: &'static str,
    feature: &'static str,
    story: &'static str,
    severity: &'static str,
}

impl From<&TestCase> for CaseEntry {
    fn from(case: &TestCase) -> Self {
        let taxonomy = case.taxonomy();
        Self {
            id: case.id(),
            description: case.description(),
            epic: taxonomy.epic,
            feature: taxonomy.feature,
            story: taxonomy.story,
            severity: taxonomy.severity.as_str(),
        }
    }
}

/// Cases as text lines or a JSON array
pub fn render_list(cases: &[TestCase], format: ListFormat) -> CliResult<String> {
    match format {
        ListFormat::Text => {
            let width = cases.iter().map(|c| c.id().len()).max().unwrap_or(0);
            Ok(cases
                .iter()
                .map(|case| format!("{:<width$}  {}", case.id(), case.description()))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        ListFormat::Json => {
            let entries: Vec<CaseEntry> = cases.iter().map(CaseEntry::from).collect();
            Ok(serde_json::to_string_pretty(&entries)?)
        }
    }
}

/// Execute the list command
pub fn execute_list(args: &ListArgs) -> CliResult<()> {
    let cases = select(args.filter.as_deref());
    println!("{}", render_list(&cases, args.format)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_text_lists_every_case() {
        let cases = TestCase::all();
        let text = render_list(&cases, ListFormat::Text).unwrap();
        assert_eq!(text.lines().count(), cases.len());
        assert!(text.contains("login[locked_out_user]"));
        assert!(text.contains("locked-out message"));
        assert!(text.lines().last().unwrap().starts_with("end_to_end"));
    }

    #[test]
    fn test_json_carries_taxonomy() {
        let text = render_list(&select(Some("end_to_end")), ListFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["id"], "end_to_end");
        assert_eq!(value[0]["severity"], "blocker");
        assert_eq!(value[0]["epic"], "Checkout");
    }

    #[test]
    fn test_empty_selection() {
        assert_eq!(render_list(&select(Some("zzz")), ListFormat::Text).unwrap(), "");
    }
}
