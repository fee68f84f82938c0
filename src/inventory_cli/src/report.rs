use anyhow::{bail, Context};
use common::format::{as_ascii_table, as_key_value_table, as_markdown_table};
use inventory::aggregate::{
    cross_tabulate, instance_summaries, port_usage, port_usage_matrix, summary_metrics, top_n,
    CrossTab, InstanceSummary, PortUsage,
};
use inventory::{ApplicationRow, Field, Table};

use crate::cmd::{InstancesArgs, PortsArgs, SummaryArgs, TypesArgs};

fn counts_text(counts: &[(String, usize)]) -> String {
    counts
        .iter()
        .map(|(label, count)| format!("{} ({})", label, count))
        .collect::<Vec<_>>()
        .join(", ")
}

fn instances_table(summaries: &[InstanceSummary]) -> Table {
    Table::new(
        [
            "Instance ID",
            "Instance",
            "Script Version",
            "Applications",
            "Types",
            "Statuses",
            "Ports",
        ]
        .map(String::from)
        .to_vec(),
        summaries
            .iter()
            .map(|s| {
                vec![
                    s.instance_id.clone(),
                    s.instance_name.clone(),
                    s.script_version.clone(),
                    s.application_count.to_string(),
                    counts_text(&s.app_types),
                    counts_text(&s.app_statuses),
                    s.ports
                        .iter()
                        .map(u32::to_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                ]
            })
            .collect(),
    )
}

fn matrix_table(matrix: &CrossTab) -> Table {
    let mut columns = vec!["instance_name".to_string()];
    columns.extend(matrix.col_labels.iter().cloned());
    let rows = matrix
        .row_labels
        .iter()
        .zip(matrix.counts.iter())
        .map(|(label, counts)| {
            let mut row = vec![label.clone()];
            row.extend(counts.iter().map(usize::to_string));
            row
        })
        .collect();
    Table::new(columns, rows)
}

fn types_table(rows: &[ApplicationRow], matrix: bool, top: usize) -> Table {
    if matrix {
        return matrix_table(&cross_tabulate(rows, Field::InstanceName, Field::AppType));
    }
    Table::new(
        vec!["app_type".to_string(), "applications".to_string()],
        top_n(rows, Field::AppType, top)
            .into_iter()
            .map(|(app_type, count)| vec![app_type, count.to_string()])
            .collect(),
    )
}

fn usage_table(usage: &[PortUsage]) -> Table {
    Table::new(
        ["instance_name", "port", "app_name", "app_type", "app_status"]
            .map(String::from)
            .to_vec(),
        usage
            .iter()
            .map(|u| {
                vec![
                    u.instance_name.clone(),
                    u.port.to_string(),
                    u.app_name.clone(),
                    u.app_type.clone(),
                    u.app_status.clone(),
                ]
            })
            .collect(),
    )
}

/// Read-only reports over the stored dataset.
#[derive(Debug, Default)]
pub struct Report {}

impl Report {
    pub fn summary(&self, args: &SummaryArgs) -> anyhow::Result<()> {
        let rows = args.db.load_dataset()?;
        let metrics = summary_metrics(&rows);
        if args.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&metrics)
                    .context("[Report::summary] unable to serialize metrics")?
            );
            return Ok(());
        }

        println!(
            "{}",
            as_key_value_table(
                &[
                    ("Total Instances", metrics.total_instances.to_string()),
                    ("Total Applications", metrics.total_applications.to_string()),
                    ("Unique App Types", metrics.unique_app_types.to_string()),
                    (
                        "Avg Apps per Instance",
                        format!("{:.1}", metrics.avg_apps_per_instance)
                    ),
                    ("Total Ports", metrics.total_ports.to_string()),
                ],
                args.markdown,
            )
        );
        if !metrics.app_types.is_empty() {
            let rows: Vec<Vec<String>> = metrics
                .app_types
                .iter()
                .map(|(app_type, count)| vec![app_type.clone(), count.to_string()])
                .collect();
            let headers = ["App Type", "Applications"];
            println!(
                "{}",
                if args.markdown {
                    as_markdown_table(headers, rows)
                } else {
                    as_ascii_table(headers, rows)
                }
            );
        }
        Ok(())
    }

    pub fn instances(&self, args: &InstancesArgs) -> anyhow::Result<()> {
        let rows = args.db.load_dataset()?;
        let mut summaries = instance_summaries(&rows);
        if let Some(wanted) = &args.instance {
            summaries.retain(|s| &s.instance_name == wanted || &s.instance_id == wanted);
            if summaries.is_empty() {
                bail!("no instance named '{}' in {}", wanted, args.db.state_db_fs_path);
            }
        }

        if args.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summaries)
                    .context("[Report::instances] unable to serialize instances")?
            );
        } else {
            let table = instances_table(&summaries);
            println!("{}", as_ascii_table(&table.columns, &table.rows));
        }
        Ok(())
    }

    pub fn ports(&self, args: &PortsArgs) -> anyhow::Result<()> {
        let rows = args.db.load_dataset()?;
        let table = if args.list {
            usage_table(&port_usage(&rows))
        } else {
            matrix_table(&port_usage_matrix(&rows))
        };
        args.output.emit(&table)
    }

    pub fn types(&self, args: &TypesArgs) -> anyhow::Result<()> {
        let rows = args.db.load_dataset()?;
        args.output.emit(&types_table(&rows, args.matrix, args.top))
    }
}
