//! Data reading tool exposed to analysis agents over an SDK MCP server

use anyhow::{bail, Context, Result};
use claude_agent_sdk::mcp::{SdkMcpServer, SdkMcpTool, ToolResult};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

pub const DATA_SERVER_NAME: &str = "paper_tools";
pub const DATA_TOOL_NAME: &str = "read_data";

/// Rows included in a preview unless the caller asks otherwise
pub const DEFAULT_PREVIEW_ROWS: usize = 20;

/// Tabular view of a data file
#[derive(Debug, Clone, PartialEq)]
pub struct DataPreview {
    pub source: String,
    pub columns: Vec<String>,
    /// First rows of the table, one cell per column
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

impl DataPreview {
    /// Render as a markdown table followed by a row count
    pub fn to_markdown(&self) -> String {
        let mut out = format!("Data from `{}`\n\n", self.source);
        if self.columns.is_empty() {
            out.push_str("(no columns)\n");
            return out;
        }

        out.push_str(&table_row(&self.columns));
        out.push_str(&table_row(&vec!["---".to_string(); self.columns.len()]));
        for row in &self.rows {
            out.push_str(&table_row(row));
        }
        out.push_str(&format!(
            "\n({} columns, showing {} of {} rows)\n",
            self.columns.len(),
            self.rows.len(),
            self.total_rows
        ));
        out
    }
}

fn table_row(cells: &[String]) -> String {
    let cells: Vec<String> = cells
        .iter()
        .map(|c| c.replace('|', "\\|").replace('\n', " "))
        .collect();
    format!("| {} |\n", cells.join(" | "))
}

/// Load `path` as a table, keeping at most `max_rows` rows
pub fn read_data_file(path: &Path, max_rows: usize) -> Result<DataPreview> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let source = path.display().to_string();
    let (columns, rows, total_rows) = match extension.as_str() {
        "csv" => read_delimited(path, b',', max_rows)?,
        "tsv" => read_delimited(path, b'\t', max_rows)?,
        "json" => read_json(path, max_rows)?,
        other => bail!(
            "Unsupported file type '{}' for {}. Supported: csv, tsv, json",
            other,
            source
        ),
    };

    Ok(DataPreview {
        source,
        columns,
        rows,
        total_rows,
    })
}

type Table = (Vec<String>, Vec<Vec<String>>, usize);

fn read_delimited(path: &Path, delimiter: u8, max_rows: usize) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open data file: {}", path.display()))?;

    let mut columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    let mut total = 0;
    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed row in {}", path.display()))?;
        total += 1;
        if rows.len() < max_rows {
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }
    }

    // Rows wider than the header get unnamed columns instead of losing cells
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(columns.len());
    for extra in columns.len()..width {
        columns.push(format!("column_{}", extra + 1));
    }
    for row in &mut rows {
        row.resize(width, String::new());
    }
    Ok((columns, rows, total))
}

fn read_json(path: &Path, max_rows: usize) -> Result<Table> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data file: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    Ok(json_table(&value, max_rows))
}

/// Records (array of objects), a single object, or an array of scalars
fn json_table(value: &Value, max_rows: usize) -> Table {
    let records: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut columns: Vec<String> = Vec::new();
    for record in &records {
        if let Value::Object(map) = record {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }
    if columns.is_empty() {
        columns.push("value".to_string());
    }

    let rows = records
        .iter()
        .take(max_rows)
        .map(|record| match record {
            Value::Object(map) => columns
                .iter()
                .map(|c| map.get(c).map(cell_text).unwrap_or_default())
                .collect(),
            scalar => {
                let mut row = vec![String::new(); columns.len()];
                row[0] = cell_text(scalar);
                row
            }
        })
        .collect();

    (columns, rows, records.len())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn resolve(root: &Path, file_path: &str) -> PathBuf {
    let path = Path::new(file_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// MCP server offering `read_data`, resolving relative paths against `root`
pub fn data_read_server(root: PathBuf) -> SdkMcpServer {
    SdkMcpServer::new(DATA_SERVER_NAME)
        .version("1.0.0")
        .tool(read_data_tool(root))
}

/// Tool: read_data
fn read_data_tool(root: PathBuf) -> SdkMcpTool {
    SdkMcpTool::new(
        DATA_TOOL_NAME,
        "Load a CSV, TSV or JSON data file and return its columns and first rows as a markdown table",
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path of the data file, absolute or relative to the project root"
                },
                "max_rows": {
                    "type": "integer",
                    "description": "Maximum number of rows to include (default 20)"
                }
            },
            "required": ["file_path"]
        }),
        move |params| {
            let root = root.clone();
            Box::pin(async move { Ok(handle_read_data(&root, &params)) })
        },
    )
}

/// Failures become error results for the agent to read, never tool errors
fn handle_read_data(root: &Path, params: &Value) -> ToolResult {
    let Some(file_path) = params.get("file_path").and_then(|v| v.as_str()) else {
        return ToolResult::error("Missing required parameter: file_path");
    };
    let max_rows = params
        .get("max_rows")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .unwrap_or(DEFAULT_PREVIEW_ROWS);

    let path = resolve(root, file_path);
    tracing::debug!(path = %path.display(), max_rows, "reading data file");
    match read_data_file(&path, max_rows) {
        Ok(preview) => ToolResult::text(preview.to_markdown()),
        Err(e) => ToolResult::error(format!("{:#}", e)),
    }
}
