//! Output formatting utilities
//!
//! This module renders reconciliation results as JSON, YAML, or a styled
//! table view with color support.

use crate::account::{AccountSnapshot, MonitoringStatus, ReconcileOutcome, ServiceKind};
use crate::error::Result;
use crossterm::style::{Color as CrosstermColor, Stylize};
use crossterm::terminal::size;
use tabled::{
    settings::{object::Rows, Alignment, Color, Modify, Padding, Style, Width},
    Table, Tabled,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
}

/// Color theme for console output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub header: CrosstermColor,
    pub success: CrosstermColor,
    pub warning: CrosstermColor,
    pub accent: CrosstermColor,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            header: CrosstermColor::Blue,
            success: CrosstermColor::Green,
            warning: CrosstermColor::Yellow,
            accent: CrosstermColor::Magenta,
        }
    }
}

/// One row of the monitoring table
#[derive(Tabled)]
struct MonitoringRow {
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Retention (days)")]
    retention_days: String,
}

impl MonitoringRow {
    fn new(service: ServiceKind, status: &MonitoringStatus) -> Self {
        Self {
            service: service.to_string(),
            enabled: status
                .enabled
                .map(|e| e.to_string())
                .unwrap_or_else(|| "-".to_string()),
            retention_days: status
                .retention_days
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Renders results in the selected format
pub struct TableFormatter {
    theme: ColorTheme,
    format: OutputFormat,
    no_color: bool,
}

impl TableFormatter {
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        Self {
            theme: ColorTheme::default(),
            format,
            no_color,
        }
    }

    /// Render a reconciliation outcome
    pub fn format_outcome(&self, outcome: &ReconcileOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(outcome)?),
            OutputFormat::Table => {
                let changed = if outcome.changed { "yes" } else { "no" };
                let changed = if self.no_color {
                    changed.to_string()
                } else if outcome.changed {
                    changed.with(self.theme.warning).to_string()
                } else {
                    changed.with(self.theme.success).to_string()
                };
                Ok(format!(
                    "{}: {}\n{}",
                    self.style_key("Changed"),
                    changed,
                    self.format_snapshot_table(&outcome.state)
                ))
            }
        }
    }

    /// Render an account snapshot on its own
    pub fn format_snapshot(&self, snapshot: &AccountSnapshot) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(snapshot)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(snapshot)?),
            OutputFormat::Table => Ok(self.format_snapshot_table(snapshot)),
        }
    }

    fn format_snapshot_table(&self, snapshot: &AccountSnapshot) -> String {
        if !snapshot.exists() {
            return "Storage account does not exist".to_string();
        }

        let dash = || "-".to_string();
        let mut pairs: Vec<(&str, String)> = vec![
            ("Name", snapshot.name.clone().unwrap_or_else(dash)),
            (
                "Resource Group",
                snapshot.resource_group.clone().unwrap_or_else(dash),
            ),
            ("Location", snapshot.location.clone().unwrap_or_else(dash)),
            ("Kind", snapshot.kind.clone().unwrap_or_else(dash)),
            ("SKU", snapshot.account_type.clone().unwrap_or_else(dash)),
            (
                "Provisioning State",
                snapshot.provisioning_state.clone().unwrap_or_else(dash),
            ),
            ("ID", snapshot.id.clone().unwrap_or_else(dash)),
        ];

        if let Some(approved) = &snapshot.private_endpoint_connection {
            if !approved.is_empty() {
                pairs.push(("Approved Connections", approved.join(", ")));
            }
        }

        let mut output = self.format_key_value_pairs(&pairs);

        if !snapshot.monitoring.is_empty() {
            let rows: Vec<MonitoringRow> = snapshot
                .monitoring
                .iter()
                .map(|(service, status)| MonitoringRow::new(*service, status))
                .collect();
            output.push('\n');
            output.push_str(&self.style_table(Table::new(rows)));
        }

        output
    }

    fn style_table(&self, mut table: Table) -> String {
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()))
            .with(Padding::new(1, 1, 0, 0));

        if !self.no_color {
            table.with(Modify::new(Rows::first()).with(Color::FG_BLUE));
        }

        if let Ok((width, _)) = size() {
            table.with(Width::wrap(width as usize));
        }

        table.to_string()
    }

    fn style_key(&self, key: &str) -> String {
        if self.no_color {
            key.to_string()
        } else {
            key.with(self.theme.header).bold().to_string()
        }
    }

    /// Format key-value pairs with aligned keys
    pub fn format_key_value_pairs(&self, pairs: &[(&str, String)]) -> String {
        let max_key_length = pairs.iter().map(|(key, _)| key.len()).max().unwrap_or(0);

        pairs
            .iter()
            .map(|(key, value)| {
                let padded = format!("{:width$}", key, width = max_key_length);
                let formatted_key = if self.no_color {
                    padded
                } else {
                    padded.with(self.theme.accent).bold().to_string()
                };
                format!("{}: {}", formatted_key, value)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> ReconcileOutcome {
        let mut state = AccountSnapshot {
            id: Some("/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts/acct1".to_string()),
            name: Some("acct1".to_string()),
            resource_group: Some("rg1".to_string()),
            private_endpoint_connection: Some(vec!["pe1".to_string()]),
            ..Default::default()
        };
        state.monitoring.insert(
            ServiceKind::Blob,
            MonitoringStatus {
                enabled: Some(true),
                retention_days: Some(15),
            },
        );
        ReconcileOutcome {
            changed: true,
            state,
        }
    }

    #[test]
    fn test_json_output_shape() {
        let formatter = TableFormatter::new(OutputFormat::Json, true);
        let json: serde_json::Value =
            serde_json::from_str(&formatter.format_outcome(&outcome()).unwrap()).unwrap();

        assert_eq!(json["changed"], true);
        assert_eq!(json["state"]["monitoring"]["blob"]["retention_days"], 15);
        assert_eq!(json["state"]["private_endpoint_connection"][0], "pe1");
    }

    #[test]
    fn test_table_output_without_color() {
        let formatter = TableFormatter::new(OutputFormat::Table, true);
        let text = formatter.format_outcome(&outcome()).unwrap();

        assert!(text.starts_with("Changed: yes"));
        assert!(text.contains("acct1"));
        assert!(text.contains("Retention (days)"));
        assert!(text.contains("pe1"));
    }

    #[test]
    fn test_absent_snapshot_table() {
        let formatter = TableFormatter::new(OutputFormat::Table, true);
        let text = formatter
            .format_snapshot(&AccountSnapshot::default())
            .unwrap();
        assert_eq!(text, "Storage account does not exist");
    }
}
