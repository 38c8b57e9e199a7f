use pgcrud::{RowData, Table, Value};
use std::io::Read;

use crate::cli::LoadArgs;

pub fn run(args: LoadArgs) -> anyhow::Result<()> {
    let table = crate::parse_table(&args.table)?;
    let (project, session) = crate::open(&args.conn)?;
    let allow = project.allow_list(&table)?;
    let path = project.resolve_path(&args.file);

    let reader = csv::Reader::from_path(&path)
        .map_err(|e| anyhow::anyhow!("failed to open {}: {e}", path.display()))?;
    let rows = read_rows(reader)?;
    if rows.is_empty() {
        anyhow::bail!("{} has no data rows", path.display());
    }

    let loaded = session.run(|s| {
        let mut t = Table::new(&table, allow, s)?;
        let mut total = 0;
        for chunk in rows.chunks(args.batch_size) {
            total += t.insert_many(chunk)?;
            tracing::debug!(rows = total, "batch committed");
        }
        Ok(total)
    })?;

    tracing::info!(table = %table, rows = loaded, "load complete");
    println!("loaded {loaded} row(s) into {table}");
    Ok(())
}

/// Convert CSV records into rows keyed by the header.
///
/// Empty fields become NULL; other fields are typed with [`Value::infer`].
pub(crate) fn read_rows<R: Read>(mut reader: csv::Reader<R>) -> anyhow::Result<Vec<RowData>> {
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        // header is line 1
        let record = record.map_err(|e| anyhow::anyhow!("line {}: {e}", i + 2))?;
        let row: RowData = headers
            .iter()
            .zip(record.iter())
            .map(|(h, field)| (h.as_str(), Value::infer(field)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}
