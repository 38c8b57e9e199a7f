use comfy_table::{Attribute, Cell, ContentArrangement, Table as TextTable, presets::UTF8_FULL};
use pgcrud::{Columns, Record, RowData, Table, Value};

use crate::cli::SelectArgs;

pub fn run(args: SelectArgs) -> anyhow::Result<()> {
    let table = crate::parse_table(&args.table)?;
    let (project, session) = crate::open(&args.conn)?;
    let allow = project.allow_list(&table)?;

    let columns = match args.columns {
        Some(cols) => Columns::Named(cols),
        None => Columns::All,
    };
    let filters = parse_filters(&args.filters);

    let records = session.run(|s| {
        Table::new(&table, allow, s)?.select(&columns, &filters, args.limit)
    })?;

    if args.json {
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
    } else {
        println!("{}", render(&records));
        println!("{} row(s)", records.len());
    }
    Ok(())
}

fn parse_filters(raw: &[(String, String)]) -> RowData {
    raw.iter()
        .map(|(col, val)| (col.as_str(), Value::infer(val)))
        .collect()
}

fn render(records: &[Record]) -> TextTable {
    let mut out = TextTable::new();
    out.load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    if let Some(first) = records.first() {
        out.set_header(
            first
                .columns()
                .iter()
                .map(|c| Cell::new(c).add_attribute(Attribute::Bold)),
        );
    }
    for record in records {
        out.add_row(record.values().iter().map(|v| match v {
            Value::Null => Cell::new("NULL").add_attribute(Attribute::Dim),
            other => Cell::new(other.to_string()),
        }));
    }
    out
}
