//! CSV download and SQL-insert text built from stored rows.

use chrono::{DateTime, Local, TimeZone};
use defectlog_shared::RECORD_COLUMNS;

use crate::db::StoredDefect;

pub fn csv_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("defects_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

pub fn local_csv_file_name() -> String {
    csv_file_name(&Local::now())
}

/// Header plus one line per row, in the order given.
pub fn build_csv(rows: &[StoredDefect]) -> String {
    let mut header = vec!["ID", "TEST_ID"];
    header.extend(RECORD_COLUMNS);
    header.push("Created_At");

    let mut csv = String::new();
    push_csv_line(&mut csv, header.into_iter().map(str::to_string));
    for row in rows {
        let mut fields = vec![
            row.id.to_string(),
            row.test_id.map(|id| id.to_string()).unwrap_or_default(),
        ];
        fields.extend(row.record.values());
        fields.push(row.created_at.clone().unwrap_or_default());
        push_csv_line(&mut csv, fields.into_iter());
    }
    csv
}

fn push_csv_line(csv: &mut String, fields: impl Iterator<Item = String>) {
    let line = fields
        .map(|field| escape_csv(&field))
        .collect::<Vec<_>>()
        .join(",");
    csv.push_str(&line);
    csv.push('\n');
}

fn escape_csv(value: &str) -> String {
    let needs_quotes = value.contains(',')
        || value.contains('"')
        || value.contains('\n')
        || value.contains('\r');
    if needs_quotes {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

/// `[a].[b].[c]` from `a.b.c`.
fn bracket_table(table: &str) -> String {
    table
        .split('.')
        .map(|part| format!("[{part}]"))
        .collect::<Vec<_>>()
        .join(".")
}

fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// One INSERT statement per row, separated by blank lines. Rows are expected
/// in insertion order.
pub fn build_sql_inserts(rows: &[StoredDefect], table: &str) -> String {
    let target = bracket_table(table);
    let columns = RECORD_COLUMNS.join(", ");
    rows.iter()
        .map(|row| {
            let values = row
                .record
                .values()
                .iter()
                .map(|value| sql_literal(value))
                .collect::<Vec<_>>()
                .join(", ");
            format!("INSERT INTO {target}\n({columns})\nVALUES ({values});")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::db::tests::record;

    fn stored(id: i64, defect: &str) -> StoredDefect {
        StoredDefect {
            id,
            test_id: None,
            record: record(defect, id as u32),
            created_at: Some("2026-10-14 08:30:01".into()),
        }
    }

    #[test]
    fn csv_has_header_and_one_line_per_row() {
        let csv = build_csv(&[stored(2, "Burns"), stored(1, "Cracks")]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID,TEST_ID,Entry_Date,Batch_Number"));
        assert!(lines[0].ends_with("Location,Created_At"));
        assert!(lines[1].starts_with("2,,2026-10-14,B-0042"));
        assert!(lines[2].contains(",Cracks,1,LS,"));
    }

    #[test]
    fn csv_quotes_fields_with_separators() {
        let mut row = stored(1, "Cracks");
        row.record.notes = "edge, \"deep\"".into();
        let csv = build_csv(&[row]);
        assert!(csv.contains(",\"edge, \"\"deep\"\"\","));
    }

    #[test]
    fn csv_file_name_uses_date_and_time() {
        let now = NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(8, 5, 9)
            .unwrap()
            .and_utc();
        assert_eq!(csv_file_name(&now), "defects_20261014_080509.csv");
        assert!(csv_file_name(&Utc::now()).ends_with(".csv"));
    }

    #[test]
    fn sql_inserts_target_bracketed_table() {
        let sql = build_sql_inserts(
            &[stored(1, "Cracks"), stored(2, "Burns")],
            "ict_spotfire_dev.dbo.PA_InternalScrap",
        );
        let statements: Vec<&str> = sql.split("\n\n").collect();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("INSERT INTO [ict_spotfire_dev].[dbo].[PA_InternalScrap]"));
        assert!(statements[0].contains("(Entry_Date, Batch_Number, Date_Code"));
        assert!(statements[0].contains("VALUES ('2026-10-14', 'B-0042', 'D41', '19.N222.03', 'Cracks', '1', 'LS', '', '1',"));
        assert!(statements[1].contains("'Burns'"));
        assert!(statements[1].ends_with("'Inboard');"));
    }

    #[test]
    fn sql_literals_escape_quotes() {
        assert_eq!(sql_literal("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn empty_log_exports_nothing() {
        assert_eq!(build_sql_inserts(&[], "PA_InternalScrap"), "");
        assert_eq!(build_csv(&[]).lines().count(), 1);
    }
}
