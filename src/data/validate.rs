use std::collections::HashSet;
use std::fmt;

use crate::tables::{RosterStore, RosterTable, TableIssue, UnitTable, UnitTableStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }
}

fn push_issues(report: &mut ValidationReport, sheet: &str, issues: &[TableIssue]) {
    for issue in issues {
        report.push(
            ValidationSeverity::Error,
            format!("{sheet}[row {}, col {}]", issue.row, issue.column),
            issue.message.clone(),
        );
    }
}

/// Check the roster and both unit tables for problems that would make assembly silently
/// lose data.
pub fn validate_tables(roster: &RosterTable, heroes: &UnitTable, ships: &UnitTable) -> ValidationReport {
    let mut report = ValidationReport::default();

    push_issues(&mut report, "roster", roster.issues());
    let mut names = HashSet::new();
    let mut codes = HashSet::new();
    for row in roster.base_attributes() {
        if !names.insert(row.name.as_str()) {
            report.push(
                ValidationSeverity::Error,
                format!("roster '{}'", row.name),
                "duplicate member name",
            );
        }
        if !codes.insert(row.ally_code) {
            report.push(
                ValidationSeverity::Error,
                format!("roster '{}'", row.name),
                format!("duplicate ally code {}", row.ally_code),
            );
        }
        match row.heroes_gp.checked_add(row.ships_gp) {
            None => report.push(
                ValidationSeverity::Error,
                format!("roster '{}'", row.name),
                "hero and ship GP out of range",
            ),
            Some(sum) if sum > row.gp => report.push(
                ValidationSeverity::Warning,
                format!("roster '{}'", row.name),
                "hero and ship GP exceed total GP",
            ),
            Some(_) => {}
        }
    }

    let mut base_ids = HashSet::new();
    for table in [heroes, ships] {
        let sheet = table.kind().as_str();
        push_issues(&mut report, sheet, table.issues());

        for def in table.definitions() {
            if !base_ids.insert(def.base_id.clone()) {
                report.push(
                    ValidationSeverity::Error,
                    format!("{sheet} '{}'", def.base_id),
                    "duplicate base id",
                );
            }
            if def.tags.is_empty() {
                report.push(
                    ValidationSeverity::Warning,
                    format!("{sheet} '{}'", def.base_id),
                    "definition has no tags and will never match a tag filter",
                );
            }
        }

        let members: HashSet<&str> = table.members().iter().map(String::as_str).collect();
        for name in &names {
            if !members.contains(name) {
                report.push(
                    ValidationSeverity::Warning,
                    format!("{sheet} '{name}'"),
                    "roster member has no column",
                );
            }
        }
        for member in table.members() {
            if !names.contains(member.as_str()) {
                report.push(
                    ValidationSeverity::Info,
                    format!("{sheet} '{member}'"),
                    "column belongs to no roster member",
                );
            }
        }
    }

    report
}
