//! Read-only queries: installed package lookup and stale package listing.

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use crate::common::package::{PackageProbe, SystemProbe};
use crate::common::time::{self, format_date, humanize_age, parse_time_value};
use crate::context::RunContext;
use crate::ui::prelude::*;

/// List installed packages, optionally only those matching any term.
pub fn lookup(probe: &SystemProbe, terms: &[String]) -> Result<()> {
    let lines = probe.installed_lines();

    if terms.is_empty() {
        if lines.is_empty() {
            emit(Level::Warn, "lookup.empty", "No packages installed", None);
        }
        for line in &lines {
            emit(Level::Info, "lookup.package", line, None);
        }
        return Ok(());
    }

    let found = matching_lines(&lines, terms);
    if found.is_empty() {
        let quoted = terms
            .iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(", ");
        emit(
            Level::Warn,
            "lookup.none",
            &format!("No installed packages matching: {}", quoted),
            None,
        );
        return Ok(());
    }

    let plural = if found.len() == 1 { "" } else { "s" };
    emit(
        Level::Success,
        "lookup.found",
        &format!("Found {} package{}:", found.len(), plural),
        Some(serde_json::json!({ "packages": found })),
    );
    for line in found {
        emit(Level::Info, "lookup.package", &format!("  {}", line), None);
    }
    Ok(())
}

/// `name version` lines whose name contains any term, case-insensitively.
pub fn matching_lines<'a>(lines: &'a [String], terms: &[String]) -> Vec<&'a str> {
    let terms: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
    lines
        .iter()
        .filter(|line| {
            let name = line.split_whitespace().next().unwrap_or("").to_lowercase();
            terms.iter().any(|t| name.contains(t.as_str()))
        })
        .map(String::as_str)
        .collect()
}

/// Show installed repo packages whose last build is older than the threshold.
pub fn outdated(ctx: &RunContext, probe: &SystemProbe) -> Result<()> {
    let days = parse_time_value(ctx.outdated_time());
    emit(
        Level::Info,
        "outdated.search",
        &format!("Finding packages not updated in {} days...", days),
        None,
    );

    let names = probe.installed_packages();
    let today = time::today();
    let stale = stale_packages(probe.repo_build_dates(&names), today, days);

    if stale.is_empty() {
        emit(Level::Success, "outdated.none", "No packages found", None);
        return Ok(());
    }

    emit(
        Level::Warn,
        "outdated.found",
        &format!("Found {} outdated packages:", stale.len()),
        Some(serde_json::json!({
            "packages": stale
                .iter()
                .map(|(name, date)| serde_json::json!({ "name": name, "built": date.to_string() }))
                .collect::<Vec<_>>()
        })),
    );
    if get_output_format() == OutputFormat::Text {
        println!("{}", stale_table(&stale, today));
    }
    Ok(())
}

/// Packages built strictly before `today - days`, oldest first.
pub fn stale_packages(
    dates: Vec<(String, Option<NaiveDate>)>,
    today: NaiveDate,
    days: i64,
) -> Vec<(String, NaiveDate)> {
    let threshold = today - Duration::days(days);
    let mut stale: Vec<(String, NaiveDate)> = dates
        .into_iter()
        .filter_map(|(name, date)| date.map(|d| (name, d)))
        .filter(|(_, date)| *date < threshold)
        .collect();
    stale.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    stale
}

fn stale_table(stale: &[(String, NaiveDate)], today: NaiveDate) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Package", "Last updated", "Age"]);
    for (name, date) in stale {
        table.add_row(vec![
            name.clone(),
            format_date(*date),
            humanize_age(*date, today),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn lookup_matches_names_case_insensitively() {
        let lines = strings(&["firefox 131.0-1", "htop 3.3.0-4", "Fira-Code 6.2-1"]);
        assert_eq!(
            matching_lines(&lines, &strings(&["FIR"])),
            vec!["firefox 131.0-1", "Fira-Code 6.2-1"]
        );
        assert_eq!(matching_lines(&lines, &strings(&["htop", "vim"])), vec!["htop 3.3.0-4"]);
    }

    #[test]
    fn lookup_ignores_versions() {
        let lines = strings(&["vim 9.1-1"]);
        assert!(matching_lines(&lines, &strings(&["9.1"])).is_empty());
    }

    #[test]
    fn stale_packages_respect_threshold() {
        let today = date(2025, 6, 1);
        let dates = vec![
            ("fresh".to_string(), Some(date(2025, 5, 1))),
            ("old".to_string(), Some(date(2024, 1, 1))),
            ("older".to_string(), Some(date(2023, 1, 1))),
            ("unknown".to_string(), None),
            ("edge".to_string(), Some(today - Duration::days(180))),
        ];
        assert_eq!(
            stale_packages(dates, today, 180),
            vec![
                ("older".to_string(), date(2023, 1, 1)),
                ("old".to_string(), date(2024, 1, 1)),
            ]
        );
    }

    #[test]
    fn table_lists_each_package() {
        let today = date(2025, 6, 1);
        let table = stale_table(&[("htop".to_string(), date(2024, 6, 1))], today);
        let rendered = table.to_string();
        assert!(rendered.contains("htop"));
        assert!(rendered.contains("01 June 2024"));
        assert!(rendered.contains("1 years ago"));
    }
}
