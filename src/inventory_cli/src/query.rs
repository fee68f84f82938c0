use inventory::{filter, project, ApplicationRow, Predicate, Table};
use tracing::debug;

use crate::cmd::QueryArgs;

#[derive(Debug, Default)]
pub struct Query {}

impl Query {
    pub fn execute(&self, args: &QueryArgs) -> anyhow::Result<()> {
        let rows = args.db.load_dataset()?;
        let table = self.select(&rows, args);
        debug!(matched = table.len(), of = rows.len(), "query");
        args.output.emit(&table)
    }

    fn select(&self, rows: &[ApplicationRow], args: &QueryArgs) -> Table {
        let predicate =
            Predicate::from_parts(args.search.as_deref(), &args.search_fields, &args.equals);
        let matched = filter(rows, &predicate);
        if args.columns.is_empty() {
            Table::from_rows(&matched)
        } else {
            project(&matched, &args.columns)
        }
    }
}
