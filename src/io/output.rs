//! Report rendering.
//!
//! Every query result renders through one [`ReportWriter`], selected by
//! output format. Terminal output is the colored human view, JSON is the
//! stable machine view of the same data, and DOT exports the traced subgraph
//! for graph tooling.

use crate::analysis::{CalculationPath, ImpactReport, RiskLevel, TypeEvolution};
use crate::query::{DirectionResult, GraphExport, TraceReport};
use anyhow::{bail, Result};
use colored::Colorize;
use petgraph::dot::Dot;
use petgraph::graph::DiGraph;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
    Dot,
}

pub trait ReportWriter {
    fn write_trace(&mut self, report: &TraceReport, export: Option<&GraphExport>) -> Result<()>;
    fn write_impact(&mut self, report: &ImpactReport) -> Result<()>;
    fn write_calculation(&mut self, path: &CalculationPath) -> Result<()>;
    fn write_types(&mut self, evolution: &TypeEvolution) -> Result<()>;
}

pub fn create_writer(format: OutputFormat, out: Box<dyn Write>) -> Box<dyn ReportWriter> {
    match format {
        OutputFormat::Terminal => Box::new(TerminalWriter { out }),
        OutputFormat::Json => Box::new(JsonWriter { out }),
        OutputFormat::Dot => Box::new(DotWriter { out }),
    }
}

struct TerminalWriter {
    out: Box<dyn Write>,
}

impl TerminalWriter {
    fn direction_section(&mut self, result: &DirectionResult) -> Result<()> {
        let heading = match result.direction {
            crate::core::Direction::Forward => "Forward (what this value affects)",
            crate::core::Direction::Backward => "Backward (where this value comes from)",
            crate::core::Direction::Both => "Connected",
        };
        writeln!(self.out)?;
        writeln!(
            self.out,
            "{} {}",
            heading.bright_white().bold(),
            format!("({} reached)", result.total_count).dimmed()
        )?;
        if result.entries.is_empty() {
            writeln!(self.out, "  {}", "none".dimmed())?;
            return Ok(());
        }
        for entry in &result.entries {
            writeln!(
                self.out,
                "  {} {} {} {}",
                format!("[{}]", entry.kind).cyan(),
                entry.name.bright_white(),
                entry.location.to_string().dimmed(),
                entry.code.dimmed()
            )?;
        }
        if !result.flow_paths.is_empty() {
            writeln!(self.out)?;
            writeln!(self.out, "  {}", "Flow paths:".bright_white())?;
            for path in &result.flow_paths {
                writeln!(self.out, "    {path}")?;
            }
        }
        Ok(())
    }
}

impl ReportWriter for TerminalWriter {
    fn write_trace(&mut self, report: &TraceReport, _export: Option<&GraphExport>) -> Result<()> {
        writeln!(
            self.out,
            "{} {}",
            "Trace:".bright_white().bold(),
            report.variable.bright_yellow()
        )?;
        for def in &report.definitions {
            writeln!(
                self.out,
                "  defined at {} as {} {}",
                def.location.to_string().dimmed(),
                def.inferred_type.cyan(),
                def.code.dimmed()
            )?;
        }
        if let Some(forward) = &report.forward {
            self.direction_section(forward)?;
        }
        if let Some(backward) = &report.backward {
            self.direction_section(backward)?;
        }
        if !report.warnings.is_empty() {
            writeln!(self.out)?;
            writeln!(self.out, "{}", "Warnings".bright_white().bold())?;
            for warning in &report.warnings {
                writeln!(self.out, "  {}", warning.to_string().yellow())?;
            }
        }
        Ok(())
    }

    fn write_impact(&mut self, report: &ImpactReport) -> Result<()> {
        let risk = match report.risk {
            RiskLevel::Low => report.risk.to_string().green(),
            RiskLevel::Medium => report.risk.to_string().yellow(),
            RiskLevel::High => report.risk.to_string().red().bold(),
        };
        writeln!(
            self.out,
            "{} {} {} {}",
            "Impact:".bright_white().bold(),
            report.variable.bright_yellow(),
            "risk".dimmed(),
            risk
        )?;
        writeln!(
            self.out,
            "  {} nodes reached, {} function(s) touched",
            report.reached_count,
            report.functions_touched.len()
        )?;
        if !report.functions_touched.is_empty() {
            writeln!(
                self.out,
                "  functions: {}",
                report.functions_touched.join(", ").cyan()
            )?;
        }
        if report.exit_points.is_empty() {
            writeln!(self.out, "  no exit points")?;
        } else {
            writeln!(self.out)?;
            writeln!(self.out, "  {}", "Exit points:".bright_white())?;
            for exit in &report.exit_points {
                writeln!(
                    self.out,
                    "    {} {} {} {}",
                    format!("[{}]", exit.kind).magenta(),
                    exit.name,
                    exit.location.to_string().dimmed(),
                    exit.code.dimmed()
                )?;
            }
        }
        writeln!(self.out)?;
        writeln!(self.out, "  {}", report.recommendation.italic())?;
        Ok(())
    }

    fn write_calculation(&mut self, path: &CalculationPath) -> Result<()> {
        writeln!(
            self.out,
            "{} {}",
            "Calculation path:".bright_white().bold(),
            path.variable.bright_yellow()
        )?;
        for (i, step) in path.steps.iter().enumerate() {
            let inputs = if step.inputs.is_empty() {
                String::new()
            } else {
                format!("  <- {}", step.inputs.join(", "))
            };
            writeln!(
                self.out,
                "  {}. {} {}{}",
                i + 1,
                step.code.bright_white(),
                step.location.to_string().dimmed(),
                inputs.dimmed()
            )?;
        }
        if !path.external_inputs.is_empty() {
            writeln!(
                self.out,
                "  external inputs: {}",
                path.external_inputs.join(", ").yellow()
            )?;
        }
        Ok(())
    }

    fn write_types(&mut self, evolution: &TypeEvolution) -> Result<()> {
        writeln!(
            self.out,
            "{} {}  {}",
            "Types:".bright_white().bold(),
            evolution.name.bright_yellow(),
            evolution.chain().cyan()
        )?;
        for event in &evolution.events {
            writeln!(
                self.out,
                "  v{} {} {} {}",
                event.version,
                event.inferred_type.display_name().cyan(),
                event.location.to_string().dimmed(),
                event.expression.dimmed()
            )?;
        }
        if !evolution.warnings.is_empty() {
            writeln!(self.out)?;
            for warning in &evolution.warnings {
                writeln!(self.out, "  {}", warning.to_string().yellow())?;
            }
        }
        Ok(())
    }
}

struct JsonWriter {
    out: Box<dyn Write>,
}

impl JsonWriter {
    fn emit<T: Serialize>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.out, value)?;
        writeln!(self.out)?;
        Ok(())
    }
}

impl ReportWriter for JsonWriter {
    fn write_trace(&mut self, report: &TraceReport, _export: Option<&GraphExport>) -> Result<()> {
        self.emit(report)
    }

    fn write_impact(&mut self, report: &ImpactReport) -> Result<()> {
        self.emit(report)
    }

    fn write_calculation(&mut self, path: &CalculationPath) -> Result<()> {
        self.emit(path)
    }

    fn write_types(&mut self, evolution: &TypeEvolution) -> Result<()> {
        self.emit(evolution)
    }
}

struct DotWriter {
    out: Box<dyn Write>,
}

impl ReportWriter for DotWriter {
    fn write_trace(&mut self, _report: &TraceReport, export: Option<&GraphExport>) -> Result<()> {
        let Some(export) = export else {
            bail!("graph output requires a traced subgraph");
        };
        writeln!(self.out, "{}", render_dot(export))?;
        Ok(())
    }

    fn write_impact(&mut self, _report: &ImpactReport) -> Result<()> {
        bail!("graph output is only supported for trace")
    }

    fn write_calculation(&mut self, _path: &CalculationPath) -> Result<()> {
        bail!("graph output is only supported for trace")
    }

    fn write_types(&mut self, _evolution: &TypeEvolution) -> Result<()> {
        bail!("graph output is only supported for trace")
    }
}

/// Render the exported subgraph in Graphviz DOT form.
pub fn render_dot(export: &GraphExport) -> String {
    let mut graph: DiGraph<String, String> = DiGraph::new();
    let mut index = HashMap::new();
    for node in &export.nodes {
        let idx = graph.add_node(node.label.clone());
        index.insert(node.id, idx);
    }
    for edge in &export.edges {
        if let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) {
            graph.add_edge(from, to, edge.kind.clone());
        }
    }
    format!("{:?}", Dot::new(&graph))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ExportEdge, ExportNode};
    use crate::core::{Location, VariableKind};

    fn sample_export() -> GraphExport {
        GraphExport {
            nodes: vec![
                ExportNode {
                    id: 0,
                    label: "x v0".to_string(),
                    kind: VariableKind::Global,
                    location: Location::new("app.py", 1),
                },
                ExportNode {
                    id: 1,
                    label: "y v0".to_string(),
                    kind: VariableKind::Global,
                    location: Location::new("app.py", 2),
                },
            ],
            edges: vec![ExportEdge {
                from: 0,
                to: 1,
                kind: "Assignment".to_string(),
            }],
        }
    }

    #[test]
    fn test_dot_rendering_contains_nodes_and_edge() {
        let dot = render_dot(&sample_export());
        assert!(dot.contains("x v0"));
        assert!(dot.contains("y v0"));
        assert!(dot.contains("->"));
    }

    #[test]
    fn test_dot_writer_requires_export() {
        let report = TraceReport {
            variable: "x".to_string(),
            direction: crate::core::Direction::Both,
            definitions: vec![],
            forward: None,
            backward: None,
            warnings: vec![],
        };
        let mut writer = DotWriter {
            out: Box::new(Vec::new()),
        };
        assert!(writer.write_trace(&report, None).is_err());
        assert!(writer.write_trace(&report, Some(&sample_export())).is_ok());
    }

    #[test]
    fn test_json_writer_emits_valid_json() {
        let report = TraceReport {
            variable: "x".to_string(),
            direction: crate::core::Direction::Forward,
            definitions: vec![],
            forward: None,
            backward: None,
            warnings: vec![],
        };
        let buffer = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        struct Shared(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);
        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut writer = JsonWriter {
            out: Box::new(Shared(buffer.clone())),
        };
        writer.write_trace(&report, None).unwrap();
        let bytes = buffer.lock().unwrap().clone();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["variable"], "x");
    }
}
