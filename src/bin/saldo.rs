use clap::{clap_app, ArgMatches};
use saldo::Ledger;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn load(matches: &ArgMatches) -> Ledger {
    let root = matches.value_of("ROOT").unwrap();
    let entry = matches.value_of("ENTRY").unwrap();
    match Ledger::load(root, entry) {
        Ok(ledger) => ledger,
        Err(error) => {
            eprintln!("{}", error);
            std::process::exit(1);
        }
    }
}

fn check(matches: &ArgMatches) {
    let ledger = load(matches);
    println!(
        "OK: {} options, {} accounts, {} commodities, {} files",
        ledger.options().len(),
        ledger.accounts().len(),
        ledger.commodities().len(),
        ledger.files().len()
    );
}

fn print_table(header: &[&str], mut rows: Vec<Vec<String>>) {
    rows.sort();
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = std::cmp::max(widths[i], cell.len());
        }
    }
    let line: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", line.join("  "));
    for row in rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:width$}", cell, width = widths[i]))
            .collect();
        println!("{}", line.join("  "));
    }
    println!();
}

fn show(matches: &ArgMatches) {
    let ledger = load(matches);

    let options = ledger
        .options()
        .iter()
        .map(|(key, (value, _))| vec![key.clone(), value.clone()])
        .collect();
    print_table(&["option key", "option value"], options);

    let accounts = ledger
        .accounts()
        .values()
        .map(|account| {
            vec![
                account.name().to_string(),
                account.account_type().to_string(),
                account.status().to_string(),
                account.alias().clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["account name", "type", "status", "alias"], accounts);

    let commodities = ledger
        .commodities()
        .values()
        .map(|commodity| {
            vec![
                commodity.name().clone(),
                commodity.precision().to_string(),
                commodity.prefix().clone().unwrap_or_default(),
                commodity.suffix().clone().unwrap_or_default(),
                commodity.rounding().to_string(),
            ]
        })
        .collect();
    print_table(
        &["commodity", "precision", "prefix", "suffix", "rounding"],
        commodities,
    );
}

fn main() {
    let matches = clap_app!(saldo =>
        (version: VERSION)
        (about: "Parses a plain-text ledger and inspects its registry")
        (@subcommand check =>
            (about: "Loads a ledger and reports the first error, if any")
            (@arg ROOT: +required "Ledger root directory")
            (@arg ENTRY: +required "Entry file, relative to the root")
        )
        (@subcommand show =>
            (about: "Prints the options, accounts, and commodities")
            (@arg ROOT: +required "Ledger root directory")
            (@arg ENTRY: +required "Entry file, relative to the root")
        )
    )
    .get_matches();
    if let Some(matches) = matches.subcommand_matches("check") {
        check(matches);
    } else if let Some(matches) = matches.subcommand_matches("show") {
        show(matches);
    }
}
