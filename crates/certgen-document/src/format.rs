// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Field value formatter — type-aware display strings for raw variables.
//
// Formatting never fails: a value that does not parse as the declared type is
// rendered in its plain form, which is what a reader of the certificate would
// expect to see rather than an aborted batch.

use std::sync::LazyLock;

use certgen_core::{FieldType, VariableMap, VariableValue};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;

/// `{{ name }}` tokens. Names are anything without braces or whitespace.
pub(crate) static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").expect("token pattern is valid"));

pub const DEFAULT_DATE_FORMAT: &str = "DD/MM/YYYY";

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Render `value` for a field of `field_type`. Missing values become "".
pub fn format_value(value: Option<&VariableValue>, field_type: FieldType, format: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    match field_type {
        FieldType::Date => format_date(value, format.unwrap_or(DEFAULT_DATE_FORMAT)),
        FieldType::Number => format_number(value, format),
        FieldType::Text | FieldType::Qrcode => value.as_display(),
    }
}

/// Replace every `{{name}}` in `pattern` with the variable's display form.
/// Unknown names resolve to "".
pub fn resolve_pattern(pattern: &str, variables: &VariableMap) -> String {
    TOKEN_RE
        .replace_all(pattern, |caps: &regex::Captures<'_>| {
            variables
                .get(&caps[1])
                .map(VariableValue::as_display)
                .unwrap_or_default()
        })
        .into_owned()
}

// -- Dates --------------------------------------------------------------------

fn parse_date(value: &VariableValue) -> Option<NaiveDateTime> {
    match value {
        VariableValue::Date(d) => Some(d.naive_local()),
        VariableValue::Text(s) => {
            let s = s.trim();
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return d.and_hms_opt(0, 0, 0);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.naive_local());
            }
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                .ok()
        }
        _ => None,
    }
}

/// Tokens: `YYYY YY MMMM MMM MM M DD D HH mm ss`; everything else is literal.
pub fn format_date(value: &VariableValue, pattern: &str) -> String {
    let Some(dt) = parse_date(value) else {
        return value.as_display();
    };

    const TOKENS: [&str; 11] = ["YYYY", "MMMM", "MMM", "YY", "MM", "DD", "HH", "mm", "ss", "M", "D"];

    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    'outer: while !rest.is_empty() {
        for token in TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                let month = dt.month() as usize;
                let piece = match token {
                    "YYYY" => format!("{:04}", dt.year()),
                    "YY" => format!("{:02}", dt.year().rem_euclid(100)),
                    "MMMM" => MONTHS[month - 1].to_string(),
                    "MMM" => MONTHS[month - 1][..3].to_string(),
                    "MM" => format!("{month:02}"),
                    "M" => month.to_string(),
                    "DD" => format!("{:02}", dt.day()),
                    "D" => dt.day().to_string(),
                    "HH" => format!("{:02}", dt.hour()),
                    "mm" => format!("{:02}", dt.minute()),
                    _ => format!("{:02}", dt.second()),
                };
                out.push_str(&piece);
                rest = after;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

// -- Numbers ------------------------------------------------------------------

fn parse_number(value: &VariableValue) -> Option<f64> {
    match value {
        VariableValue::Number(n) => Some(*n),
        VariableValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// `0.00` fixes two decimals, `#,##0` adds thousands grouping. Without a
/// pattern the shortest representation is used.
pub fn format_number(value: &VariableValue, pattern: Option<&str>) -> String {
    let Some(n) = parse_number(value) else {
        return value.as_display();
    };
    let Some(pattern) = pattern else {
        return VariableValue::Number(n).as_display();
    };

    let decimals = pattern
        .split_once('.')
        .map(|(_, frac)| frac.chars().filter(|c| *c == '0' || *c == '#').count())
        .unwrap_or(0);
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (fixed, None),
    };

    let int_part = if pattern.contains(',') {
        group_thousands(&int_part)
    } else {
        int_part
    };

    let mut out = String::new();
    if n < 0.0 && fixed_is_nonzero(&int_part, frac_part.as_deref()) {
        out.push('-');
    }
    out.push_str(&int_part);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(&frac);
    }
    out
}

fn fixed_is_nonzero(int_part: &str, frac: Option<&str>) -> bool {
    int_part.chars().chain(frac.unwrap_or("").chars()).any(|c| c.is_ascii_digit() && c != '0')
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
