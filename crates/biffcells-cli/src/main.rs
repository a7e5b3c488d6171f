//! biffcells CLI - dump the cells of a legacy .xls workbook

use anyhow::{Context, Result};
use biffcells_core::{CellExtent, CellValue, FormulaKind};
use biffcells_xls::{CellValueEvent, ReadOptions, SheetEvent, WorkbookSummary, XlsReader};
use clap::{Parser, Subcommand};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "biffcells")]
#[command(author, version, about = "Decode cell records of BIFF5/BIFF8 .xls files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one line per decoded cell
    Dump {
        /// Input .xls file
        input: PathBuf,

        /// Only dump this sheet (0-based, BOUNDSHEET order)
        #[arg(short, long)]
        sheet: Option<usize>,

        /// Only dump cells inside this range (e.g. A1:C10)
        #[arg(short, long)]
        range: Option<String>,

        /// Skip blank (formatting-only) cells
        #[arg(long)]
        skip_blanks: bool,

        /// Emit JSON lines instead of text
        #[arg(long)]
        json: bool,

        /// Print workbook details to stderr
        #[arg(short, long)]
        verbose: bool,
    },

    /// List all sheets in a workbook
    Sheets {
        /// Input .xls file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump {
            input,
            sheet,
            range,
            skip_blanks,
            json,
            verbose,
        } => {
            let range = range
                .as_deref()
                .map(CellExtent::parse)
                .transpose()
                .context("Invalid --range")?;
            let options = ReadOptions { skip_blanks, sheet };
            dump(&input, options, range, json, verbose)
        }
        Commands::Sheets { input } => list_sheets(&input),
    }
}

fn read(input: &Path, options: ReadOptions) -> Result<(Vec<SheetEvent>, WorkbookSummary)> {
    let mut events = Vec::new();
    let summary = XlsReader::with_options(options)
        .read_file(input, &mut events)
        .with_context(|| format!("Failed to read '{}'", input.display()))?;
    Ok((events, summary))
}

fn dump(
    input: &Path,
    options: ReadOptions,
    range: Option<CellExtent>,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let (events, summary) = read(input, options)?;

    if verbose {
        eprintln!("File: {}", input.display());
        eprintln!("Format: {}", summary.version);
        eprintln!(
            "Date system: {}",
            if summary.date_1904 { "1904" } else { "1900" }
        );
        if let Some(cp) = summary.codepage {
            eprintln!("Code page: {cp}");
        }
        for name in &summary.names {
            let scope = match name.sheet_index {
                Some(i) => sheet_name(&summary, i as usize).to_string(),
                None => "workbook".to_string(),
            };
            eprintln!("Name: {} ({scope})", name.name);
        }
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut cells = 0usize;

    for event in &events {
        match event {
            SheetEvent::SessionStart { sheet } => {
                if !json {
                    writeln!(out, "== Sheet {sheet}: {}", sheet_name(&summary, *sheet))?;
                }
            }
            SheetEvent::CellValue(cell) => {
                if range.map_or(false, |r| !r.contains(cell.cell())) {
                    continue;
                }
                cells += 1;
                if json {
                    let line = serde_json::json!({
                        "sheet": cell.sheet,
                        "cell": cell.cell().to_string(),
                        "format_index": cell.format_index,
                        "value": &cell.value,
                    });
                    writeln!(out, "{line}")?;
                } else {
                    writeln!(out, "{}", text_line(cell))?;
                }
            }
        }
    }
    out.flush().context("Failed to write to stdout")?;

    if verbose {
        eprintln!("Cells: {cells}");
    }
    Ok(())
}

fn sheet_name(summary: &WorkbookSummary, index: usize) -> &str {
    summary
        .sheets
        .get(index)
        .map(|s| s.name.as_str())
        .unwrap_or("?")
}

fn text_line(cell: &CellValueEvent) -> String {
    let value = &cell.value;
    let mut line = format!("{}\t{}\t{}", cell.cell(), value.type_name(), value);
    if let CellValue::Formula(formula) = value {
        match &formula.kind {
            FormulaKind::Plain => {}
            FormulaKind::ArrayAnchor { extent } => line.push_str(&format!("\t[array {extent}]")),
            FormulaKind::ArrayMember { anchor, extent } => {
                line.push_str(&format!("\t[array {extent} @ {anchor}]"))
            }
            FormulaKind::Table { anchor, extent, .. } => {
                line.push_str(&format!("\t[table {extent} @ {anchor}]"))
            }
            FormulaKind::Unresolved { anchor } => line.push_str(&format!("\t[-> {anchor}]")),
        }
    }
    line
}

fn list_sheets(input: &Path) -> Result<()> {
    // Globals are all that's needed; skip every worksheet's events
    let options = ReadOptions {
        sheet: Some(usize::MAX),
        ..Default::default()
    };
    let (_, summary) = read(input, options)?;

    for (i, sheet) in summary.sheets.iter().enumerate() {
        println!("{}\t{}\t{}\t{}", i, sheet.name, sheet.kind, sheet.visibility);
    }

    Ok(())
}
