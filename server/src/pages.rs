use std::fmt::Write as _;

use defectlog_shared::RECORD_COLUMNS;

use crate::db::StoredDefect;

const STYLE: &str = "body{font-family:Arial,sans-serif;background:#1e293b;color:#f1f5f9;margin:0;padding:24px}\
h1{margin:0 0 8px}a{color:#f87171}.notice{padding:12px 16px;border-radius:6px;margin:16px 0}\
.ok{background:#14532d}.info{background:#1e3a8a}.error{background:#7f1d1d}\
.table-wrap{overflow:auto;max-height:600px}table{border-collapse:collapse;font-size:13px}\
th,td{border:1px solid #475569;padding:4px 8px;white-space:nowrap}th{background:#334155;position:sticky;top:0}";

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn page(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Defect Logs</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <h1>Defect Logs</h1>\n<p><a href=\"/\">Back to the diagram</a></p>\n{body}</body>\n</html>\n"
    )
}

/// Server-rendered listing, rows in the order given (newest first).
pub fn logs_page(rows: &[StoredDefect]) -> String {
    if rows.is_empty() {
        return page(
            "<p class=\"notice info\">No defects have been logged yet. \
             Start logging defects on the diagram page!</p>\n",
        );
    }

    let mut body = String::new();
    let _ = writeln!(
        body,
        "<p class=\"notice ok\">Loaded {} records from the database</p>",
        rows.len()
    );
    body.push_str(
        "<p><a href=\"/export.csv\" download>Download all data (CSV)</a> | \
         <a href=\"/export.sql\">SQL INSERT export</a></p>\n",
    );
    body.push_str("<div class=\"table-wrap\"><table>\n<thead><tr><th>ID</th><th>TEST_ID</th>");
    for column in RECORD_COLUMNS {
        let _ = write!(body, "<th>{column}</th>");
    }
    body.push_str("<th>Created_At</th></tr></thead>\n<tbody>\n");
    for row in rows {
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td>",
            row.id,
            row.test_id.map(|id| id.to_string()).unwrap_or_default()
        );
        for value in row.record.values() {
            let _ = write!(body, "<td>{}</td>", escape_html(&value));
        }
        let _ = writeln!(
            body,
            "<td>{}</td></tr>",
            escape_html(row.created_at.as_deref().unwrap_or_default())
        );
    }
    body.push_str("</tbody>\n</table></div>\n");
    page(&body)
}

pub fn error_page(message: &str) -> String {
    page(&format!(
        "<p class=\"notice error\">Database error: {}</p>\n",
        escape_html(message)
    ))
}
