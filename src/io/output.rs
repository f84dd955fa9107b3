use crate::formatting::{FormattingConfig, Styler};
use crate::isolation::Classification;
use crate::report::{Finding, Report};
use crate::schema::ClassifiedSchema;
use comfy_table::{presets, ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Terminal,
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "terminal" => Some(Self::Terminal),
            "json" => Some(Self::Json),
            "markdown" | "md" => Some(Self::Markdown),
            _ => None,
        }
    }
}

pub trait ReportWriter {
    fn write_report(&mut self, report: &Report) -> anyhow::Result<()>;
}

pub fn create_writer<'w>(
    format: OutputFormat,
    writer: Box<dyn Write + 'w>,
    formatting: FormattingConfig,
) -> Box<dyn ReportWriter + 'w> {
    match format {
        OutputFormat::Json => Box::new(JsonWriter::new(writer)),
        OutputFormat::Markdown => Box::new(MarkdownWriter::new(writer)),
        OutputFormat::Terminal => Box::new(TerminalWriter::new(writer, formatting)),
    }
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ReportWriter for JsonWriter<W> {
    fn write_report(&mut self, report: &Report) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        self.writer.write_all(json.as_bytes())?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

pub struct MarkdownWriter<W: Write> {
    writer: W,
}

impl<W: Write> MarkdownWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_header(&mut self, report: &Report) -> anyhow::Result<()> {
        writeln!(self.writer, "# Tenant Isolation Report")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "Generated by {} {}", report.tool, report.version)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_summary(&mut self, report: &Report) -> anyhow::Result<()> {
        let summary = &report.summary;
        writeln!(self.writer, "## Summary")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| Metric | Value |")?;
        writeln!(self.writer, "|--------|-------|")?;
        writeln!(self.writer, "| Access points | {} |", summary.total)?;
        for (classification, count) in &summary.by_classification {
            writeln!(self.writer, "| {} | {} |", classification, count)?;
        }
        for (severity, count) in summary.by_severity.iter().rev() {
            writeln!(self.writer, "| Severity {} | {} |", severity.as_str(), count)?;
        }
        writeln!(self.writer, "| Suppressed | {} |", summary.suppressed)?;
        writeln!(self.writer, "| Analyzer errors | {} |", summary.analyzer_errors)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_finding(&mut self, finding: &Finding) -> anyhow::Result<()> {
        writeln!(
            self.writer,
            "### `{}` {}",
            finding.location.file_position(),
            finding.location.handler
        )?;
        writeln!(self.writer)?;
        let mut status = finding.classification.to_string();
        if let Some(rule) = &finding.rule_id {
            status.push_str(&format!(" (`{rule}`)"));
        }
        if let Some(severity) = finding.severity {
            status.push_str(&format!(", {}", severity.as_str()));
        }
        if finding.suppressed {
            status.push_str(", suppressed");
        }
        writeln!(self.writer, "- **Status:** {status}")?;
        if let Some(route) = &finding.location.route {
            writeln!(self.writer, "- **Route:** `{route}`")?;
        }
        if !finding.entities.is_empty() {
            writeln!(self.writer, "- **Entities:** {}", finding.entities.join(", "))?;
        }
        writeln!(self.writer, "- **Why:** {}", finding.rationale)?;
        if let Some(fix) = &finding.suggested_fix {
            writeln!(self.writer, "- **Fix:** {fix}")?;
        }
        if let Some(reason) = &finding.suppression_reason {
            writeln!(self.writer, "- **Suppressed because:** {reason}")?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}

impl<W: Write> ReportWriter for MarkdownWriter<W> {
    fn write_report(&mut self, report: &Report) -> anyhow::Result<()> {
        self.write_header(report)?;
        self.write_summary(report)?;

        writeln!(self.writer, "## Findings")?;
        writeln!(self.writer)?;
        if report.findings.is_empty() {
            writeln!(self.writer, "No findings.")?;
            writeln!(self.writer)?;
        }
        for finding in &report.findings {
            self.write_finding(finding)?;
        }

        if !report.warnings.is_empty() {
            writeln!(self.writer, "## Warnings")?;
            writeln!(self.writer)?;
            for warning in &report.warnings {
                writeln!(self.writer, "- {warning}")?;
            }
            writeln!(self.writer)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

pub struct TerminalWriter<W: Write> {
    writer: W,
    styler: Styler,
    plain: bool,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(writer: W, formatting: FormattingConfig) -> Self {
        Self {
            writer,
            styler: Styler::new(&formatting),
            plain: formatting.plain,
        }
    }

    fn write_finding(&mut self, finding: &Finding) -> anyhow::Result<()> {
        let mut head = format!(
            "{} {}",
            self.styler.classification(finding.classification),
            self.styler.bold(&finding.location.to_string())
        );
        if let Some(severity) = finding.severity {
            head.push_str(&format!(" [{}]", self.styler.severity(severity)));
        }
        if let Some(rule) = finding.rule_id.as_deref().or(finding.error_code.as_deref()) {
            head.push_str(&format!(" {}", self.styler.dim(rule)));
        }
        if finding.suppressed {
            head.push_str(&format!(" {}", self.styler.dim("(suppressed)")));
        }
        writeln!(self.writer, "{head}")?;
        writeln!(self.writer, "    {}", finding.rationale)?;
        if let Some(fix) = &finding.suggested_fix {
            writeln!(self.writer, "    {} {}", self.styler.success("fix:"), fix)?;
        }
        Ok(())
    }

    fn summary_table(&self, report: &Report) -> Table {
        let mut table = Table::new();
        table
            .load_preset(if self.plain {
                presets::ASCII_FULL
            } else {
                presets::UTF8_FULL
            })
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Classification", "Count"]);
        for classification in [
            Classification::Violation,
            Classification::Unknown,
            Classification::Exempt,
            Classification::Safe,
        ] {
            table.add_row(vec![
                classification.to_string(),
                report.summary.count(classification).to_string(),
            ]);
        }
        table.add_row(vec![
            "suppressed".to_string(),
            report.summary.suppressed.to_string(),
        ]);
        table
    }
}

impl<W: Write> ReportWriter for TerminalWriter<W> {
    fn write_report(&mut self, report: &Report) -> anyhow::Result<()> {
        writeln!(
            self.writer,
            "{}",
            self.styler
                .header(&format!("{} {}", report.tool, report.version))
        )?;
        writeln!(self.writer)?;

        for finding in &report.findings {
            self.write_finding(finding)?;
        }
        if !report.findings.is_empty() {
            writeln!(self.writer)?;
        }

        writeln!(self.writer, "{}", self.summary_table(report))?;

        for warning in &report.warnings {
            writeln!(self.writer, "{} {}", self.styler.warning("warning:"), warning)?;
        }

        let blocking = report.blocking().count();
        let verdict = if blocking > 0 {
            self.styler
                .error(&format!("{blocking} blocking violation(s)"))
        } else if report.summary.analyzer_errors > 0 {
            self.styler.warning(&format!(
                "no blocking violations, but {} unit(s) could not be analyzed",
                report.summary.analyzer_errors
            ))
        } else {
            self.styler.success("no blocking violations")
        };
        writeln!(self.writer, "{verdict}")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Render the classified schema as a table for the `schema` command.
pub fn render_schema_table(schema: &ClassifiedSchema, plain: bool) -> String {
    let mut table = Table::new();
    table
        .load_preset(if plain {
            presets::ASCII_FULL
        } else {
            presets::UTF8_FULL
        })
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Entity",
            "Storage key",
            "Scope",
            "Scoping column",
            "Source",
        ]);
    for entity in schema.iter() {
        let scope = if entity.tenant_root {
            format!("{} (root)", entity.tenant_scope)
        } else {
            entity.tenant_scope.to_string()
        };
        table.add_row(vec![
            entity.name.clone(),
            entity.storage_key.clone(),
            scope,
            entity.scoping_column.clone().unwrap_or_else(|| "-".into()),
            entity.source.to_string(),
        ]);
    }
    table.to_string()
}
