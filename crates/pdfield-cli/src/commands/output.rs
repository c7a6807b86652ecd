//! Rendering extraction results for the terminal or a file.

use pdfield_core::ExtractionResult;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON array, as returned by the HTTP service
    Json,
    /// One CSV row per document
    Csv,
    /// Plain text summary
    Text,
}

pub fn render(results: &[ExtractionResult], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(results)?),
        OutputFormat::Csv => render_csv(results),
        OutputFormat::Text => Ok(render_text(results)),
    }
}

/// Field columns in first-seen order across all results.
fn field_columns(results: &[ExtractionResult]) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    for field in results.iter().flat_map(|r| r.extraction_schema.fields()) {
        if !columns.contains(&field) {
            columns.push(field);
        }
    }
    columns
}

fn render_csv(results: &[ExtractionResult]) -> anyhow::Result<String> {
    let columns = field_columns(results);
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["label", "pdf_path", "extracao_com", "tempo_de_extracao"];
    header.extend(columns.iter().copied());
    wtr.write_record(&header)?;

    for result in results {
        let mut record = vec![
            result.label.as_str(),
            result.pdf_path.as_str(),
            result.extracao_com.as_str(),
            result.tempo_de_extracao.as_str(),
        ];
        record.extend(columns.iter().map(|c| result.extraction_schema.get(c).unwrap_or("")));
        wtr.write_record(&record)?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn render_text(results: &[ExtractionResult]) -> String {
    let mut output = String::new();

    for (i, result) in results.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format!("{} ({})\n", result.pdf_path, result.label));
        output.push_str(&format!(
            "  Method: {}  Time: {}\n",
            result.extracao_com, result.tempo_de_extracao
        ));
        for (field, value) in result.extraction_schema.iter() {
            output.push_str(&format!("  {}: {}\n", field, value.unwrap_or("-")));
        }
    }

    output
}
