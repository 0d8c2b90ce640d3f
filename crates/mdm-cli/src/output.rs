use mdm_core::orchestrator::OrchestrationReport;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// Step table followed by the overall message, or the whole report as JSON.
pub fn print_report(report: &OrchestrationReport, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(report);
    }

    if report.what_if {
        println!("(what-if: no jobs were started)");
    }
    if report.results.is_empty() {
        println!("No steps ran.");
    } else {
        let rows = report
            .results
            .iter()
            .map(|r| {
                vec![
                    r.step.clone(),
                    r.name.clone(),
                    r.process_type.clone(),
                    if r.error { "FAILED" } else { "ok" }.to_string(),
                    r.message.clone(),
                ]
            })
            .collect();
        print_table(&["STEP", "NAME", "TYPE", "RESULT", "MESSAGE"], rows);
    }
    for code in &report.skipped {
        println!("skipped: {code}");
    }
    println!("{}", report.message);
    Ok(())
}
