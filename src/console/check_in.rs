use super::{print_employee, prompt};
use anyhow::Result;
use clipcontrol_guard::api::Backend;
use clipcontrol_guard::checkin::{CheckInDriver, CheckInState};

/// Interactive check-in loop. Returns when the guard quits, input ends, or
/// (with `once`) after the first recorded delivery.
pub fn run<B: Backend>(
    driver: &mut CheckInDriver<B>,
    preset_notes: Option<String>,
    once: bool,
) -> Result<()> {
    let context = driver.context();
    println!(
        "Guard: {} | Period: {} ({} to {}) | Benefit: {}",
        context.guard.full_name,
        context.period.name,
        context.period.starts_on,
        context.period.ends_on,
        context.benefit
    );

    loop {
        match driver.state().clone() {
            CheckInState::Idle => {
                let Some(input) = prompt("\n[Enter] scan QR, [q] quit: ")? else {
                    return Ok(());
                };
                if input.eq_ignore_ascii_case("q") {
                    return Ok(());
                }
                println!("Point the scanner at the employee's QR code (empty line cancels)");
                driver.start_scan();
            }
            CheckInState::Valid { check_in } => {
                println!("\nQR valid");
                print_employee(&check_in.employee);
                let Some(input) = prompt("[p] take photo, [c] cancel: ")? else {
                    return Ok(());
                };
                match input.as_str() {
                    "p" | "P" => take_photo(driver, &preset_notes),
                    "c" | "C" => {
                        driver.reset();
                    }
                    _ => {}
                }
            }
            CheckInState::ReadyToSubmit {
                check_in,
                photo,
                notes,
                last_error,
            } => {
                println!("\nEmployee: {}", check_in.employee.full_name);
                println!("Photo: {} bytes", photo.len());
                println!("Notes: {}", notes.as_deref().unwrap_or("(none)"));
                if let Some(message) = last_error {
                    println!("Error: {}", message);
                }
                let Some(input) =
                    prompt("[y] confirm delivery, [t] retake photo, [n] edit notes, [c] cancel: ")?
                else {
                    return Ok(());
                };
                match input.as_str() {
                    "y" | "Y" => {
                        println!("Registering...");
                        driver.confirm();
                    }
                    "t" | "T" => {
                        println!("Capturing photo...");
                        driver.retake();
                    }
                    "n" | "N" => {
                        let Some(notes) = prompt("Notes (empty to clear): ")? else {
                            return Ok(());
                        };
                        driver.set_notes(Some(notes));
                    }
                    "c" | "C" => {
                        driver.reset();
                    }
                    _ => {}
                }
            }
            CheckInState::Done {
                employee,
                confirmation,
            } => {
                println!("\nDelivery recorded!");
                print_employee(&employee);
                if let Some(message) = &confirmation.message {
                    println!("{}", message);
                }
                if once {
                    return Ok(());
                }
                while let Err(e) = driver.start_next() {
                    println!("Could not load the active period: {}", e.user_message());
                    let Some(input) = prompt("[Enter] retry, [q] quit: ")? else {
                        return Ok(());
                    };
                    if input.eq_ignore_ascii_case("q") {
                        return Ok(());
                    }
                }
            }
            CheckInState::Error { message, retained } => {
                println!("\nError: {}", message);
                let choices = if retained.is_some() {
                    "[p] retry photo, [r] start over: "
                } else {
                    "[r] start over: "
                };
                let Some(input) = prompt(choices)? else {
                    return Ok(());
                };
                match input.as_str() {
                    "p" | "P" if retained.is_some() => take_photo(driver, &preset_notes),
                    _ => {
                        driver.reset();
                    }
                }
            }
            // The driver only returns once outstanding calls resolve
            state @ (CheckInState::Scanning
            | CheckInState::Validating { .. }
            | CheckInState::CapturingPhoto { .. }
            | CheckInState::Submitting { .. }) => {
                tracing::warn!(state = %state, "driver returned while a call was outstanding");
                driver.reset();
            }
        }
    }
}

fn take_photo<B: Backend>(driver: &mut CheckInDriver<B>, preset_notes: &Option<String>) {
    println!("Capturing photo...");
    let state = driver.take_photo();
    let needs_notes = matches!(state, CheckInState::ReadyToSubmit { notes: None, .. });
    if needs_notes && preset_notes.is_some() {
        driver.set_notes(preset_notes.clone());
    }
}
