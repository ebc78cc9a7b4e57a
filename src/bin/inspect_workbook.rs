//! Inspect a guild workbook: print sheet names, the first rows of each guild sheet and any
//! rows the table parsers would skip.
//! Usage: cargo run --bin inspect_workbook -- path/to/guild.xlsx [rows]

use std::path::Path;

use calamine::Reader;
use datacron::data::unit::UnitKind;
use datacron::tables::workbook::{
    EVENTS_SHEET, EXCLUSIONS_SHEET, HEROES_SHEET, ROSTER_SHEET, SHIPS_SHEET,
};
use datacron::tables::{read_xlsx_grid, Grid, RosterTable, TableIssue, UnitTable, MAX_PLAYERS};

fn print_issues(sheet: &str, issues: &[TableIssue]) {
    for issue in issues {
        println!(
            "  ! {sheet} row {} col {}: {}",
            issue.row, issue.column, issue.message
        );
    }
}

fn print_head(grid: &Grid, rows: usize) {
    for (i, row) in grid.rows().iter().take(rows).enumerate() {
        let cells: Vec<String> = row.iter().map(|c| c.display()).collect();
        println!("  {}: {}", i, cells.join(" | "));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("Usage: inspect_workbook <path-to.xlsx> [rows]")?;
    let rows: usize = std::env::args()
        .nth(2)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(10);
    let path = Path::new(&path);
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }

    let wb = calamine::open_workbook_auto(path)?;
    let names = wb.sheet_names();
    println!("Sheets ({}): {}", names.len(), names.join(", "));

    for sheet in [ROSTER_SHEET, HEROES_SHEET, SHIPS_SHEET, EXCLUSIONS_SHEET, EVENTS_SHEET] {
        if !names.iter().any(|name| name == sheet) {
            println!("\n{sheet}: missing");
            continue;
        }
        let grid = read_xlsx_grid(path, sheet)?;
        println!("\n{sheet}: {} rows", grid.height());
        print_head(&grid, rows);

        match sheet {
            ROSTER_SHEET => print_issues(sheet, RosterTable::from_grid(&grid, MAX_PLAYERS).issues()),
            HEROES_SHEET => print_issues(sheet, UnitTable::from_grid(&grid, UnitKind::Hero).issues()),
            SHIPS_SHEET => print_issues(sheet, UnitTable::from_grid(&grid, UnitKind::Ship).issues()),
            _ => {}
        }
    }
    Ok(())
}
