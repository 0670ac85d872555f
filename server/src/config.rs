use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use defectlog_shared::DiagramLayout;

pub const DEFAULT_EXPORT_TABLE: &str = "PA_InternalScrap";

pub const DEFAULT_PART_NUMBERS: [&str; 66] = [
    "19.A956.04", "18.A957.04", "18.N233.03", "18.N276.00_M", "18.N325.02",
    "18.N352.00_M", "18.N353.00_M", "19.9921.03", "19.9922.03", "19.9923.03",
    "19.9924.03", "19.9925.03", "19.A958.04", "19.A959.04", "19.A960.04",
    "19.A961.04", "19.D328.00", "19.D329.00", "19.N222.03", "19.N234.00_M",
    "19.N235.00_M", "19.N236.00_M", "19.N248.02", "19.N265.00_M", "19.N268.02",
    "19.N274.03", "19.N278.03", "19.N284.03", "19.N349.02", "19.N366.00",
    "19.N367.00", "19.N397.00", "19.N398.00", "19.N400.00", "19.N371.00",
    "19.N372.00", "19.N402.00", "19.N423.00", "19.N385.01", "19.N426.00",
    "19.N427.00", "19.N408.00", "19.N429.00", "19.N367.01", "18.N424.00",
    "19.N425.00", "19.N428.02", "19.N428.01", "XC1.A9.00", "19.N403.02",
    "19.E396.00", "18.N456.00", "19.E394.00", "19.E395.00", "19.N402.02",
    "19.N400.02", "19.N360.00", "19.N454.02", "19.N473.02", "19.N453.02",
    "19.N481.02", "18.N277.03", "19.N216.01", "XC5.94.00", "XC5.95.00",
    "XC5.96.00",
];

/// Everything a station serves to its diagram page.
#[derive(Clone, Debug)]
pub struct StationConfig {
    pub layout: DiagramLayout,
    pub part_numbers: Vec<String>,
    pub export_table: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            layout: DiagramLayout::standard(),
            part_numbers: DEFAULT_PART_NUMBERS.iter().map(|part| part.to_string()).collect(),
            export_table: DEFAULT_EXPORT_TABLE.to_string(),
        }
    }
}

impl StationConfig {
    pub fn load(
        layout_path: Option<&Path>,
        part_numbers_path: Option<&Path>,
        export_table: Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = layout_path {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read layout file {}", path.display()))?;
            config.layout = DiagramLayout::from_json(&text)
                .map_err(|err| anyhow!("invalid layout file {}: {err}", path.display()))?;
        }
        if let Some(path) = part_numbers_path {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read part numbers file {}", path.display()))?;
            config.part_numbers = parse_part_numbers(&text);
            if config.part_numbers.is_empty() {
                bail!("part numbers file {} lists no part numbers", path.display());
            }
        }
        if let Some(table) = export_table {
            config.export_table = validate_table_name(&table)?;
        }
        Ok(config)
    }
}

fn parse_part_numbers(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Accepts a plain or dotted table name such as `db.dbo.PA_InternalScrap`.
fn validate_table_name(name: &str) -> Result<String> {
    let name = name.trim();
    let valid = !name.is_empty()
        && name.split('.').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if !valid {
        bail!("invalid export table name '{name}'");
    }
    Ok(name.to_string())
}
