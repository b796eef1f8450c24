//! Terminal front-end: prints state and turns keys into driver calls.

use anyhow::{Context, Result};
use clipcontrol_guard::model::{Employee, GuardStats};
use std::io::Write;

pub mod check_in;
pub mod sign_in;

/// Print `message` and read one line. `None` on end of input.
pub fn prompt(message: &str) -> Result<Option<String>> {
    print!("{}", message);
    std::io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    let read = std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_owned()))
}

pub fn print_employee(employee: &Employee) {
    println!("  RUT:      {}", employee.national_id);
    println!("  Name:     {}", employee.full_name);
    println!("  Contract: {}", employee.contract_type);
    println!("  Box:      {}", employee.box_type);
}

pub fn print_stats(stats: &GuardStats) {
    println!(
        "Deliveries today: {} (permanent {}, fixed-term {})",
        stats.total_today, stats.permanent, stats.fixed_term
    );
    match &stats.last_delivery {
        Some(last) => println!("Last delivery: {} min ago", last.minutes_ago.abs()),
        None if stats.total_today == 0 => println!("No deliveries yet today"),
        None => {}
    }
}
