use chrono::NaiveDate;
use resource_capacity::report::{allocations_frame, availability_frame, render_text_table};
use resource_capacity::{
    AllocationBook, AllocationStatus, AllocationTarget, Clock, DateWindow, NewAllocation,
    SystemClock, WriteOutcome, load_allocations_from_csv, load_allocations_from_json, logging,
    save_allocations_to_csv, save_allocations_to_json, working_days,
};
use std::io::{self, Write};
use std::str::FromStr;

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// `kind:id`, e.g. `project:apollo`.
fn parse_target(s: &str) -> Option<AllocationTarget> {
    let (kind, id) = s.split_once(':')?;
    AllocationTarget::from_parts(kind, id).ok()
}

/// Either two explicit dates or nothing, in which case the current month applies.
fn parse_window<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<DateWindow, String> {
    match (parts.next(), parts.next()) {
        (None, _) => Ok(DateWindow::current_month(SystemClock.today())),
        (Some(start_s), Some(end_s)) => match (parse_date(start_s), parse_date(end_s)) {
            (Some(start), Some(end)) => Ok(DateWindow::new(start, end)),
            _ => Err("Invalid date (YYYY-MM-DD)".to_string()),
        },
        (Some(_), None) => Err("Provide both <start> and <end> or neither".to_string()),
    }
}

fn print_help() {
    println!(
        "Commands:\n  help                                       Show this help\n  add <subject> <kind:id> <start> <end|open> <pct> [hours_per_day] [status]\n                                             Create an allocation (kind: project|task|phase)\n  delete <id>                                Delete an allocation\n  status <id> <planned|active|completed|cancelled>\n                                             Change allocation status\n  confirm <id>                               Mark an allocation confirmed\n  list [subject]                             List allocations\n  days <start> <end>                         Count working days (Mon-Fri)\n  capacity <subject> [start end]             Capacity summary (default: current month)\n  availability <subject> [start end]         Per-day capacity\n  report [start end]                         Utilization for every subject\n  save <json|csv> <path>                     Persist allocations to disk\n  load <json|csv> <path>                     Load allocations from disk\n  quit|exit                                  Exit"
    );
}

fn print_outcome(action: &str, outcome: &WriteOutcome) {
    println!("Allocation {} {}.", outcome.allocation.id, action);
    for warning in &outcome.warnings {
        println!("Warning: {}", warning);
    }
}

fn print_allocations(book: &AllocationBook, subject: Option<&str>) {
    let allocations = match subject {
        Some(subject) => book.allocations_for(subject),
        None => book.allocations(),
    };
    match allocations_frame(&allocations) {
        Ok(df) => println!("{}", render_text_table(&df)),
        Err(e) => println!("Error rendering allocations: {}", e),
    }
}

fn main() {
    logging::init();
    let mut book = AllocationBook::new();

    println!("Resource Capacity (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "add" => {
                let args: Vec<&str> = parts.collect();
                if args.len() < 5 {
                    println!(
                        "Usage: add <subject> <kind:id> <start> <end|open> <pct> [hours_per_day] [status]"
                    );
                    continue;
                }
                let Some(target) = parse_target(args[1]) else {
                    println!("Invalid target (kind:id with kind project|task|phase)");
                    continue;
                };
                let Some(start) = parse_date(args[2]) else {
                    println!("Invalid start date (YYYY-MM-DD)");
                    continue;
                };
                let end = if args[3] == "open" {
                    None
                } else {
                    match parse_date(args[3]) {
                        Some(d) => Some(d),
                        None => {
                            println!("Invalid end date (YYYY-MM-DD or 'open')");
                            continue;
                        }
                    }
                };
                let pct: f64 = match args[4].parse() {
                    Ok(v) => v,
                    Err(_) => {
                        println!("Invalid percentage");
                        continue;
                    }
                };
                let mut new = NewAllocation::new(args[0], target, start, end).with_percentage(pct);
                if let Some(hours_s) = args.get(5) {
                    match hours_s.parse::<f64>() {
                        Ok(hours) => new = new.with_hours_per_day(hours),
                        Err(_) => {
                            println!("Invalid hours_per_day");
                            continue;
                        }
                    }
                }
                if let Some(status_s) = args.get(6) {
                    match AllocationStatus::from_str(status_s) {
                        Ok(status) => new = new.with_status(status),
                        Err(e) => {
                            println!("{}", e);
                            continue;
                        }
                    }
                }
                match book.create(new) {
                    Ok(outcome) => print_outcome("created", &outcome),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "delete" => match parts.next().map(str::parse::<i64>) {
                Some(Ok(id)) => match book.delete(id) {
                    Ok(_) => println!("Deleted allocation {id}."),
                    Err(e) => println!("Error: {}", e),
                },
                Some(Err(_)) => println!("Invalid id"),
                None => println!("Usage: delete <id>"),
            },
            "status" => {
                let id_s = parts.next();
                let status_s = parts.next();
                match (id_s, status_s) {
                    (Some(id_s), Some(status_s)) => {
                        let id: i64 = match id_s.parse() {
                            Ok(v) => v,
                            Err(_) => {
                                println!("Invalid id");
                                continue;
                            }
                        };
                        let status = match AllocationStatus::from_str(status_s) {
                            Ok(s) => s,
                            Err(e) => {
                                println!("{}", e);
                                continue;
                            }
                        };
                        match book.set_status(id, status) {
                            Ok(outcome) => print_outcome("updated", &outcome),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: status <id> <planned|active|completed|cancelled>"),
                }
            }
            "confirm" => match parts.next().map(str::parse::<i64>) {
                Some(Ok(id)) => match book.confirm(id) {
                    Ok(outcome) => print_outcome("confirmed", &outcome),
                    Err(e) => println!("Error: {}", e),
                },
                Some(Err(_)) => println!("Invalid id"),
                None => println!("Usage: confirm <id>"),
            },
            "list" => print_allocations(&book, parts.next()),
            "days" => {
                let start = parts.next().and_then(parse_date);
                let end = parts.next().and_then(parse_date);
                match (start, end) {
                    (Some(start), Some(end)) => {
                        println!("Working days {}..={}: {}", start, end, working_days(start, end))
                    }
                    _ => println!("Usage: days <YYYY-MM-DD> <YYYY-MM-DD>"),
                }
            }
            "capacity" => {
                let Some(subject) = parts.next() else {
                    println!("Usage: capacity <subject> [start end]");
                    continue;
                };
                match parse_window(&mut parts) {
                    Ok(window) => println!("{}", book.capacity(subject, &window).to_cli_summary()),
                    Err(e) => println!("{}", e),
                }
            }
            "availability" => {
                let Some(subject) = parts.next() else {
                    println!("Usage: availability <subject> [start end]");
                    continue;
                };
                match parse_window(&mut parts) {
                    Ok(window) => {
                        let records = book.cached_availability(subject, &window);
                        match availability_frame(&records) {
                            Ok(df) => println!("{}", render_text_table(&df)),
                            Err(e) => println!("Error rendering availability: {}", e),
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
            "report" => match parse_window(&mut parts) {
                Ok(window) => {
                    let report = book.report(&window);
                    println!("Report ({})", report.to_cli_summary());
                    match report.to_dataframe() {
                        Ok(df) => println!("{}", render_text_table(&df)),
                        Err(e) => println!("Error rendering report: {}", e),
                    }
                }
                Err(e) => println!("{}", e),
            },
            "save" => {
                let fmt = parts.next();
                let path = parts.next();
                let allocations = book.allocations();
                let result = match (fmt, path) {
                    (Some("json"), Some(path)) => Some((path, save_allocations_to_json(&allocations, path))),
                    (Some("csv"), Some(path)) => Some((path, save_allocations_to_csv(&allocations, path))),
                    _ => None,
                };
                match result {
                    Some((path, Ok(()))) => println!("Allocations saved to {}.", path),
                    Some((_, Err(e))) => println!("Error saving allocations: {}", e),
                    None => println!("Usage: save <json|csv> <path>"),
                }
            }
            "load" => {
                let fmt = parts.next();
                let path = parts.next();
                let loaded = match (fmt, path) {
                    (Some("json"), Some(path)) => Some((path, load_allocations_from_json(path))),
                    (Some("csv"), Some(path)) => Some((path, load_allocations_from_csv(path))),
                    _ => None,
                };
                match loaded {
                    Some((path, Ok(allocations))) => {
                        match AllocationBook::from_allocations(allocations) {
                            Ok(restored) => {
                                book = restored;
                                println!("Allocations loaded from {}.", path);
                                print_allocations(&book, None);
                            }
                            Err(e) => println!("Error loading allocations: {}", e),
                        }
                    }
                    Some((_, Err(e))) => println!("Error loading allocations: {}", e),
                    None => println!("Usage: load <json|csv> <path>"),
                }
            }
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
