//! Address list loading
//!
//! Accepts an IPLogger export (optional BOM, optional `sep=` line, tab or
//! comma delimited, `Ip` column) or a plain file with one address per line.

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::Path;
use tracing::{debug, info};

/// Header names recognised as the address column, compared case-insensitively.
const IP_COLUMNS: [&str; 4] = ["ip", "ip_address", "ip address", "address"];

/// Load, validate and de-duplicate the addresses in `path`.
///
/// Unreadable files and files without a single valid address are errors;
/// individual invalid values are skipped.
pub fn load_ips(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;

    let ips = parse_ips(&content)?;
    if ips.is_empty() {
        bail!("No valid IP addresses found in {}", path.display());
    }

    info!(path = %path.display(), count = ips.len(), "Loaded unique IP addresses");
    Ok(ips)
}

pub fn parse_ips(content: &str) -> Result<Vec<String>> {
    let content = content.trim_start_matches('\u{feff}');

    let mut lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.first().is_some_and(|l| l.trim_start().starts_with("sep=")) {
        lines.remove(0);
    }
    let Some(header) = lines.first() else {
        return Ok(Vec::new());
    };

    let delimiter = if header.contains('\t') {
        b'\t'
    } else if header.contains(',') {
        b','
    } else if header.contains(';') {
        b';'
    } else {
        b'\t'
    };

    let column = header
        .split(delimiter as char)
        .map(clean_field)
        .position(|field| IP_COLUMNS.iter().any(|c| field.eq_ignore_ascii_case(c)));

    let body = lines.join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(column.is_some())
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut ips = BTreeSet::new();
    for row in reader.records() {
        let row = row.context("Failed to parse input row")?;
        let candidates: Vec<&str> = match column {
            Some(idx) => row.get(idx).into_iter().collect(),
            // headerless list: take any field that parses
            None => row.iter().collect(),
        };

        for candidate in candidates {
            let value = clean_field(candidate);
            match value.parse::<IpAddr>() {
                Ok(addr) => {
                    ips.insert(addr.to_string());
                }
                Err(_) if !value.is_empty() => debug!(value = %value, "Skipping invalid IP value"),
                Err(_) => {}
            }
        }
    }

    Ok(ips.into_iter().collect())
}

fn clean_field(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_iplogger_export() {
        let content = "\u{feff}sep=\t\nDate\tIp\tCountry\n\
            \"2025-01-01 10:00\"\t\"203.0.113.5\"\t\"JP\"\n\
            \"2025-01-01 10:01\"\t\"198.51.100.7\"\t\"US\"\n\
            \"2025-01-01 10:02\"\t\"203.0.113.5\"\t\"JP\"\n\
            \"2025-01-01 10:03\"\t\"not-an-ip\"\t\"--\"\n";

        let ips = parse_ips(content).unwrap();
        assert_eq!(ips, vec!["198.51.100.7".to_string(), "203.0.113.5".to_string()]);
    }

    #[test]
    fn test_comma_separated_with_header() {
        let content = "id,ip_address\n1,192.0.2.1\n2,2001:db8::1\n3,999.1.1.1\n";
        let ips = parse_ips(content).unwrap();
        assert_eq!(ips, vec!["192.0.2.1".to_string(), "2001:db8::1".to_string()]);
    }

    #[test]
    fn test_plain_list() {
        let content = "192.0.2.9\n\n 192.0.2.3 \n192.0.2.9\n";
        let ips = parse_ips(content).unwrap();
        assert_eq!(ips, vec!["192.0.2.3".to_string(), "192.0.2.9".to_string()]);
    }

    #[test]
    fn test_empty_content() {
        assert!(parse_ips("").unwrap().is_empty());
        assert!(parse_ips("sep=,\n").unwrap().is_empty());
    }

    #[test]
    fn test_load_ips_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Ip").unwrap();
        writeln!(file, "192.0.2.44").unwrap();

        let ips = load_ips(file.path()).unwrap();
        assert_eq!(ips, vec!["192.0.2.44".to_string()]);
    }

    #[test]
    fn test_load_ips_errors() {
        assert!(load_ips(Path::new("/nonexistent/ips.csv")).is_err());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Ip\nnothing-here").unwrap();
        assert!(load_ips(file.path()).is_err());
    }
}
