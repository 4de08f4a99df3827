//! Notebook converter: a pure function turning `.ipynb` JSON bytes into a
//! single Python-script-equivalent string.

use serde_json::Value;
use tracing::warn;

use crate::error::Error;

/// Converts notebook `bytes` to a script. `include_output` controls whether
/// code-cell outputs are appended as `# Output:` comment blocks.
pub fn convert(bytes: &[u8], include_output: bool) -> Result<String, Error> {
    let notebook: Value =
        serde_json::from_slice(bytes).map_err(|e| Error::InvalidNotebook(format!("invalid JSON: {e}")))?;

    let cells = collect_cells(&notebook)?;

    let mut parts = vec!["# Jupyter notebook converted to Python script.".to_string()];
    for cell in cells {
        if let Some(rendered) = process_cell(cell, include_output)? {
            parts.push(rendered);
        }
    }

    Ok(format!("{}\n", parts.join("\n\n")))
}

/// Flattens the legacy `worksheets` key's cells when present, warning once,
/// else returns the modern top-level `cells` array.
fn collect_cells(notebook: &Value) -> Result<Vec<&Value>, Error> {
    if let Some(worksheets) = notebook.get("worksheets").and_then(Value::as_array) {
        warn!("notebook uses deprecated worksheets; combining into a single script");
        if worksheets.len() > 1 {
            warn!("multiple worksheets detected, combining all into one script");
        }
        let mut cells = Vec::new();
        for ws in worksheets {
            let ws_cells = ws
                .get("cells")
                .and_then(Value::as_array)
                .ok_or_else(|| Error::InvalidNotebook("worksheet missing cells".to_string()))?;
            cells.extend(ws_cells.iter());
        }
        return Ok(cells);
    }

    notebook
        .get("cells")
        .and_then(Value::as_array)
        .map(|c| c.iter().collect())
        .ok_or_else(|| Error::InvalidNotebook("notebook has no cells".to_string()))
}

fn process_cell(cell: &Value, include_output: bool) -> Result<Option<String>, Error> {
    let cell_type = cell
        .get("cell_type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidNotebook("cell missing cell_type".to_string()))?;

    if !matches!(cell_type, "markdown" | "code" | "raw") {
        return Err(Error::InvalidNotebook(format!("unknown cell type: {cell_type}")));
    }

    let source = join_source(cell.get("source"));
    if source.is_empty() {
        return Ok(None);
    }

    if cell_type != "code" {
        return Ok(Some(format!("\"\"\"\n{source}\n\"\"\"")));
    }

    let mut body = source;
    if include_output
        && let Some(outputs) = cell.get("outputs").and_then(Value::as_array)
        && !outputs.is_empty()
    {
        let mut lines = Vec::new();
        for output in outputs {
            lines.extend(extract_output(output)?);
        }
        body.push_str("\n# Output:\n#   ");
        body.push_str(&lines.join("\n#   "));
    }

    Ok(Some(body))
}

fn extract_output(output: &Value) -> Result<Vec<String>, Error> {
    let output_type = output
        .get("output_type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidNotebook("output missing output_type".to_string()))?;

    match output_type {
        "stream" => Ok(lines_of(output.get("text"))),
        "execute_result" | "display_data" => {
            Ok(lines_of(output.get("data").and_then(|d| d.get("text/plain"))))
        }
        "error" => {
            let ename = output.get("ename").and_then(Value::as_str).unwrap_or_default();
            let evalue = output.get("evalue").and_then(Value::as_str).unwrap_or_default();
            Ok(vec![format!("Error: {ename}: {evalue}")])
        }
        other => Err(Error::InvalidNotebook(format!("unknown output type: {other}"))),
    }
}

/// A notebook `source`/`text` field is either a single string or an array of
/// line fragments; both shapes appear across nbformat versions.
fn join_source(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts.iter().filter_map(Value::as_str).collect::<String>(),
        _ => String::new(),
    }
}

fn lines_of(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s.lines().map(str::to_string).collect(),
        Some(Value::Array(parts)) => parts.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        _ => Vec::new(),
    }
}
