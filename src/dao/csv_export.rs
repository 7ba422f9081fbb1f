//! CSV reports: per-IP detail rows, a metric/value summary and a country
//! breakdown. Files carry a UTF-8 BOM so spreadsheet tools pick the right
//! encoding.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::model::{IpRecord, Summary, UNKNOWN_COUNTRY};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetailRow<'a> {
    #[serde(rename = "IP")]
    ip: &'a str,
    country: &'a str,
    country_code: &'a str,
    region: &'a str,
    city: &'a str,
    #[serde(rename = "ISP")]
    isp: &'a str,
    organization: &'a str,
    #[serde(rename = "ASN")]
    asn: &'a str,
    detection: String,
    proxy: &'static str,
    #[serde(rename = "VPN")]
    vpn: &'static str,
    tor: &'static str,
    risk_score: u8,
    #[serde(rename = "Type")]
    network_type: &'a str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    timezone: &'a str,
    checked_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MetricRow {
    metric: &'static str,
    value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CountryRow<'a> {
    country: &'a str,
    count: usize,
    percentage: String,
}

/// Paths of the files written by `write_reports`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub details: PathBuf,
    pub summary: PathBuf,
    pub countries: PathBuf,
}

impl ReportPaths {
    /// `stats.csv` -> `stats.csv`, `stats_summary.csv`, `stats_countries.csv`
    pub fn for_output(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "proxycheck_stats".to_string());
        let sibling = |suffix: &str| path.with_file_name(format!("{}_{}.csv", stem, suffix));

        ReportPaths {
            details: path.to_path_buf(),
            summary: sibling("summary"),
            countries: sibling("countries"),
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn csv_writer(path: &Path) -> Result<csv::Writer<File>> {
    let mut file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(UTF8_BOM)?;
    Ok(csv::Writer::from_writer(file))
}

/// Write the detail, summary and country CSVs next to `output`.
///
/// Detail rows cover resolved records only; the summary and country files
/// are taken from `summary`.
pub fn write_reports(output: &Path, records: &[IpRecord], summary: &Summary) -> Result<ReportPaths> {
    let paths = ReportPaths::for_output(output);

    let mut writer = csv_writer(&paths.details)?;
    let mut written = 0usize;
    for record in records.iter().filter(|r| r.is_resolved()) {
        writer.serialize(DetailRow {
            ip: &record.ip,
            country: record.country.as_deref().unwrap_or(UNKNOWN_COUNTRY),
            country_code: record.country_code.as_deref().unwrap_or(""),
            region: record.region.as_deref().unwrap_or(""),
            city: record.city.as_deref().unwrap_or(""),
            isp: record.provider.as_deref().unwrap_or(""),
            organization: record.organisation.as_deref().unwrap_or(""),
            asn: record.asn.as_deref().unwrap_or(""),
            detection: record.detection.to_string(),
            proxy: yes_no(record.is_proxy),
            vpn: yes_no(record.is_vpn),
            tor: yes_no(record.is_tor),
            risk_score: record.risk,
            network_type: record.network_type.as_deref().unwrap_or(""),
            latitude: record.latitude,
            longitude: record.longitude,
            timezone: record.timezone.as_deref().unwrap_or(""),
            checked_at: record.checked_at.to_rfc3339(),
        })?;
        written += 1;
    }
    writer.flush()?;
    info!(path = %paths.details.display(), rows = written, "Detail CSV saved");

    let mut writer = csv_writer(&paths.summary)?;
    for row in summary_rows(summary) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(path = %paths.summary.display(), "Summary CSV saved");

    let mut writer = csv_writer(&paths.countries)?;
    for (country, count) in &summary.countries {
        writer.serialize(CountryRow {
            country: country.as_str(),
            count: *count,
            percentage: format!("{:.1}%", summary.percentage(*count)),
        })?;
    }
    writer.flush()?;
    info!(path = %paths.countries.display(), countries = summary.countries.len(), "Countries CSV saved");

    Ok(paths)
}

fn summary_rows(summary: &Summary) -> Vec<MetricRow> {
    let pct = |count| format!("{:.1}%", summary.percentage(count));
    let row = |metric, value: String| MetricRow { metric, value };

    vec![
        row("Total IPs", summary.total.to_string()),
        row("Resolved IPs", summary.resolved_count().to_string()),
        row("Unknown IPs", summary.unknown_count.to_string()),
        row("Proxy Count", summary.proxy_count.to_string()),
        row("Proxy Percentage", pct(summary.proxy_count)),
        row("Proxy Flag Count", summary.proxy_flag_count.to_string()),
        row("Proxy Flag Percentage", pct(summary.proxy_flag_count)),
        row("VPN Count", summary.vpn_count.to_string()),
        row("VPN Percentage", pct(summary.vpn_count)),
        row("Tor Count", summary.tor_count.to_string()),
        row("Tor Percentage", pct(summary.tor_count)),
        row("Average Risk Score", format!("{:.2}", summary.average_risk)),
        row("Min Risk Score", summary.min_risk.unwrap_or(0).to_string()),
        row("Max Risk Score", summary.max_risk.unwrap_or(0).to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::service::aggregate;
    use serde_json::json;
    use tempfile::tempdir;

    fn read_without_bom(path: &Path) -> String {
        let bytes = std::fs::read(path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap()
    }

    #[test]
    fn test_report_paths() {
        let paths = ReportPaths::for_output(Path::new("out/stats.csv"));
        assert_eq!(paths.details, PathBuf::from("out/stats.csv"));
        assert_eq!(paths.summary, PathBuf::from("out/stats_summary.csv"));
        assert_eq!(paths.countries, PathBuf::from("out/stats_countries.csv"));
    }

    #[test]
    fn test_write_reports() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("stats.csv");

        let records = vec![
            IpRecord::from_response(
                "192.0.2.1",
                json!({ "192.0.2.1": {
                    "detections": { "proxy": true, "risk": 70 },
                    "location": { "country_name": "Japan", "country_code": "JP" },
                    "network": { "provider": "ExampleNet", "asn": "AS64501" }
                } }),
            )
            .unwrap(),
            IpRecord::unknown("192.0.2.2", &LookupError::Timeout),
        ];
        let summary = aggregate(&records);

        let paths = write_reports(&output, &records, &summary).unwrap();

        let details = read_without_bom(&paths.details);
        let mut lines = details.lines();
        assert!(lines.next().unwrap().starts_with("IP,Country,CountryCode,Region,City,ISP"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("192.0.2.1,Japan,JP,,,ExampleNet,,AS64501,proxy,Yes,No,No,70"));
        assert!(lines.next().is_none());

        let summary_csv = read_without_bom(&paths.summary);
        assert!(summary_csv.starts_with("Metric,Value\n"));
        assert!(summary_csv.contains("Total IPs,2\n"));
        assert!(summary_csv.contains("Proxy Percentage,50.0%\n"));
        assert!(summary_csv.contains("Proxy Flag Count,1\n"));
        assert!(summary_csv.contains("Average Risk Score,70.00\n"));

        let countries = read_without_bom(&paths.countries);
        assert_eq!(countries, "Country,Count,Percentage\nJapan,1,50.0%\nUnknown,1,50.0%\n");
    }
}
