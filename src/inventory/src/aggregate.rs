//! Read-only summaries over a dataset snapshot. Nothing here mutates its input,
//! so every query may run concurrently against the same rows.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::{ApplicationRow, Field};

/// Values of `field` with their row counts, most frequent first. Equal counts
/// keep the order in which the values first appeared.
pub fn group_count(rows: &[ApplicationRow], field: Field) -> Vec<(String, usize)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, usize)> = Vec::new();
    for row in rows {
        let value = row.get(field);
        match index.get(value) {
            Some(&slot) => groups[slot].1 += 1,
            None => {
                index.insert(value, groups.len());
                groups.push((value.to_string(), 1));
            }
        }
    }
    // stable sort keeps first-seen order among ties
    groups.sort_by(|a, b| b.1.cmp(&a.1));
    groups
}

pub fn count_distinct(rows: &[ApplicationRow], field: Field) -> usize {
    rows.iter().map(|r| r.get(field)).collect::<HashSet<_>>().len()
}

/// `rows / groups` rounded to one decimal; `0.0` when there are no groups.
pub fn average_rows_per_group(rows: &[ApplicationRow], group_field: Field) -> f64 {
    let groups = count_distinct(rows, group_field);
    if groups == 0 {
        return 0.0;
    }
    round_one_decimal(rows.len() as f64 / groups as f64)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn top_n(rows: &[ApplicationRow], field: Field, n: usize) -> Vec<(String, usize)> {
    let mut groups = group_count(rows, field);
    groups.truncate(n);
    groups
}

/// Dense count matrix; `counts[r][c]` is the number of rows carrying
/// `row_labels[r]` and `col_labels[c]`, zero for absent combinations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrossTab {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl CrossTab {
    fn from_pairs<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> CrossTab {
        let mut row_index: HashMap<&str, usize> = HashMap::new();
        let mut col_index: HashMap<&str, usize> = HashMap::new();
        let mut tab = CrossTab::default();
        let mut cells: HashMap<(usize, usize), usize> = HashMap::new();
        for (row_value, col_value) in pairs {
            let r = *row_index.entry(row_value).or_insert_with(|| {
                tab.row_labels.push(row_value.to_string());
                tab.row_labels.len() - 1
            });
            let c = *col_index.entry(col_value).or_insert_with(|| {
                tab.col_labels.push(col_value.to_string());
                tab.col_labels.len() - 1
            });
            *cells.entry((r, c)).or_insert(0) += 1;
        }
        tab.counts = (0..tab.row_labels.len())
            .map(|r| {
                (0..tab.col_labels.len())
                    .map(|c| cells.get(&(r, c)).copied().unwrap_or(0))
                    .collect()
            })
            .collect();
        tab
    }

    pub fn get(&self, row_label: &str, col_label: &str) -> usize {
        let r = self.row_labels.iter().position(|l| l == row_label);
        let c = self.col_labels.iter().position(|l| l == col_label);
        match (r, c) {
            (Some(r), Some(c)) => self.counts[r][c],
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_labels.is_empty()
    }

    /// Reorders rows and columns with the given label orderings.
    fn sorted_by<R, C>(&self, mut row_key: R, mut col_key: C) -> CrossTab
    where
        R: FnMut(&str, &str) -> std::cmp::Ordering,
        C: FnMut(&str, &str) -> std::cmp::Ordering,
    {
        let mut rows: Vec<usize> = (0..self.row_labels.len()).collect();
        rows.sort_by(|a, b| row_key(&self.row_labels[*a], &self.row_labels[*b]));
        let mut cols: Vec<usize> = (0..self.col_labels.len()).collect();
        cols.sort_by(|a, b| col_key(&self.col_labels[*a], &self.col_labels[*b]));
        CrossTab {
            row_labels: rows.iter().map(|r| self.row_labels[*r].clone()).collect(),
            col_labels: cols.iter().map(|c| self.col_labels[*c].clone()).collect(),
            counts: rows
                .iter()
                .map(|r| cols.iter().map(|c| self.counts[*r][*c]).collect())
                .collect(),
        }
    }
}

/// Labels appear in first-seen order on both axes.
pub fn cross_tabulate(rows: &[ApplicationRow], row_field: Field, col_field: Field) -> CrossTab {
    CrossTab::from_pairs(rows.iter().map(|r| (r.get(row_field), r.get(col_field))))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_instances: usize,
    pub total_applications: usize,
    pub unique_app_types: usize,
    pub avg_apps_per_instance: f64,
    pub total_ports: usize,
    pub app_types: Vec<(String, usize)>,
}

pub fn summary_metrics(rows: &[ApplicationRow]) -> SummaryMetrics {
    SummaryMetrics {
        total_instances: count_distinct(rows, Field::InstanceId),
        total_applications: rows.len(),
        unique_app_types: count_distinct(rows, Field::AppType),
        avg_apps_per_instance: average_rows_per_group(rows, Field::InstanceId),
        total_ports: all_ports(rows).len(),
        app_types: group_count(rows, Field::AppType),
    }
}

/// Every non-blank entry of every row's `ports` text, in row order.
pub fn all_ports(rows: &[ApplicationRow]) -> Vec<String> {
    rows.iter()
        .flat_map(|r| r.ports.split(','))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Numeric ports of a `ports` text; `"8080:80"` style mappings keep the host side.
pub fn parse_ports(ports: &str) -> Vec<u32> {
    ports
        .split(',')
        .map(str::trim)
        .map(|entry| entry.split(':').next().unwrap_or_default())
        .filter(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|p| p.parse().ok())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortUsage {
    pub instance_name: String,
    pub port: u32,
    pub app_name: String,
    pub app_type: String,
    pub app_status: String,
}

pub fn port_usage(rows: &[ApplicationRow]) -> Vec<PortUsage> {
    rows.iter()
        .flat_map(|row| {
            parse_ports(&row.ports).into_iter().map(|port| PortUsage {
                instance_name: row.instance_name.clone(),
                port,
                app_name: row.app_name.clone(),
                app_type: row.app_type.clone(),
                app_status: row.app_status.clone(),
            })
        })
        .collect()
}

/// Instance × port counts, instances sorted by name and ports numerically.
pub fn port_usage_matrix(rows: &[ApplicationRow]) -> CrossTab {
    let usage = port_usage(rows);
    let ports: Vec<String> = usage.iter().map(|u| u.port.to_string()).collect();
    let tab = CrossTab::from_pairs(
        usage
            .iter()
            .zip(ports.iter())
            .map(|(u, p)| (u.instance_name.as_str(), p.as_str())),
    );
    tab.sorted_by(
        |a, b| a.cmp(b),
        |a, b| {
            let a: u32 = a.parse().unwrap_or_default();
            let b: u32 = b.parse().unwrap_or_default();
            a.cmp(&b)
        },
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstanceSummary {
    pub instance_id: String,
    pub instance_name: String,
    pub script_version: String,
    pub application_count: usize,
    pub app_types: Vec<(String, usize)>,
    pub app_statuses: Vec<(String, usize)>,
    pub ports: Vec<u32>,
}

/// One summary per instance id, in first-seen order.
pub fn instance_summaries(rows: &[ApplicationRow]) -> Vec<InstanceSummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<ApplicationRow>> = HashMap::new();
    for row in rows {
        let key = row.instance_id.as_str();
        members
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(row.clone());
    }

    order
        .into_iter()
        .filter_map(|key| members.remove(key))
        .map(|group| {
            let first = &group[0];
            let mut ports: Vec<u32> = group.iter().flat_map(|r| parse_ports(&r.ports)).collect();
            ports.sort_unstable();
            ports.dedup();
            InstanceSummary {
                instance_id: first.instance_id.clone(),
                instance_name: first.instance_name.clone(),
                script_version: first.script_version.clone(),
                application_count: group.len(),
                app_types: group_count(&group, Field::AppType),
                app_statuses: group_count(&group, Field::AppStatus),
                ports,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn row(instance: &str, app: &str, app_type: &str, ports: &str) -> ApplicationRow {
        ApplicationRow {
            instance_id: format!("id-{}", instance),
            instance_name: instance.to_string(),
            app_name: app.to_string(),
            app_type: app_type.to_string(),
            app_status: "running".to_string(),
            ports: ports.to_string(),
            ..Default::default()
        }
    }

    fn fixture() -> Vec<ApplicationRow> {
        vec![
            row("web-01", "nginx", "docker", "80, 443"),
            row("web-01", "sshd", "service", "22"),
            row("db-01", "postgres", "service", "5432"),
            row("db-01", "backup", "process", ""),
            row("web-02", "nginx", "docker", "8080:80"),
        ]
    }

    #[test]
    fn test_group_count_orders_by_count_then_first_seen() {
        assert_eq!(
            group_count(&fixture(), Field::AppType),
            vec![
                ("docker".to_string(), 2),
                ("service".to_string(), 2),
                ("process".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_count_distinct_and_top_n() {
        let rows = fixture();
        assert_eq!(count_distinct(&rows, Field::InstanceName), 3);
        assert_eq!(count_distinct(&rows, Field::AppName), 4);
        assert_eq!(top_n(&rows, Field::AppName, 1), vec![("nginx".to_string(), 2)]);
        assert_eq!(top_n(&rows, Field::AppName, 10).len(), 4);
    }

    #[test]
    fn test_average_rows_per_group() {
        assert_eq!(average_rows_per_group(&fixture(), Field::InstanceId), 1.7);
        assert_eq!(average_rows_per_group(&[], Field::InstanceId), 0.0);
    }

    #[test]
    fn test_cross_tabulate_fills_zeroes() {
        let tab = cross_tabulate(&fixture(), Field::InstanceName, Field::AppType);
        assert_eq!(tab.row_labels, vec!["web-01", "db-01", "web-02"]);
        assert_eq!(tab.col_labels, vec!["docker", "service", "process"]);
        assert_eq!(tab.counts, vec![vec![1, 1, 0], vec![0, 1, 1], vec![1, 0, 0]]);
        assert_eq!(tab.get("db-01", "docker"), 0);
        assert_eq!(tab.get("missing", "docker"), 0);
    }

    #[test]
    fn test_summary_metrics() {
        let metrics = summary_metrics(&fixture());
        assert_eq!(metrics.total_instances, 3);
        assert_eq!(metrics.total_applications, 5);
        assert_eq!(metrics.unique_app_types, 3);
        assert_eq!(metrics.avg_apps_per_instance, 1.7);
        assert_eq!(metrics.total_ports, 5);
        assert_eq!(summary_metrics(&[]), SummaryMetrics::default());
    }

    #[test]
    fn test_parse_ports() {
        assert_eq!(parse_ports("80, 443"), vec![80, 443]);
        assert_eq!(parse_ports("8080:80, 9090/tcp, "), vec![8080]);
        assert!(parse_ports("").is_empty());
    }

    #[test]
    fn test_port_usage_matrix_is_sorted() {
        let tab = port_usage_matrix(&fixture());
        assert_eq!(tab.row_labels, vec!["db-01", "web-01", "web-02"]);
        assert_eq!(tab.col_labels, vec!["22", "80", "443", "5432", "8080"]);
        assert_eq!(tab.get("web-01", "443"), 1);
        assert_eq!(tab.get("web-02", "80"), 0);
    }

    #[test]
    fn test_instance_summaries() {
        let summaries = instance_summaries(&fixture());
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].instance_name, "web-01");
        assert_eq!(summaries[0].application_count, 2);
        assert_eq!(summaries[0].ports, vec![22, 80, 443]);
        assert_eq!(
            summaries[1].app_types,
            vec![("service".to_string(), 1), ("process".to_string(), 1)]
        );
    }
}
