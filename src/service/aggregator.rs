use std::collections::HashMap;

use crate::model::{Detection, IpRecord, Summary, UNKNOWN_COUNTRY};

/// Fold a complete set of records into a `Summary`.
///
/// Order of `records` does not matter. Unknown records count towards the
/// total and the country histogram but not towards the risk statistics.
pub fn aggregate(records: &[IpRecord]) -> Summary {
    let mut proxy_count = 0;
    let mut vpn_count = 0;
    let mut none_count = 0;
    let mut unknown_count = 0;
    let mut tor_count = 0;
    let mut proxy_flag_count = 0;
    let mut risk_sum: u64 = 0;
    let mut min_risk: Option<u8> = None;
    let mut max_risk: Option<u8> = None;
    let mut countries: HashMap<&str, usize> = HashMap::new();

    for record in records {
        match record.detection {
            Detection::Proxy => proxy_count += 1,
            Detection::Vpn => vpn_count += 1,
            Detection::None => none_count += 1,
            Detection::Unknown => unknown_count += 1,
        }
        if record.is_tor {
            tor_count += 1;
        }
        if record.is_proxy {
            proxy_flag_count += 1;
        }

        if record.is_resolved() {
            risk_sum += u64::from(record.risk);
            min_risk = Some(min_risk.map_or(record.risk, |m| m.min(record.risk)));
            max_risk = Some(max_risk.map_or(record.risk, |m| m.max(record.risk)));
        }

        let country = record.country.as_deref().unwrap_or(UNKNOWN_COUNTRY);
        *countries.entry(country).or_insert(0) += 1;
    }

    let resolved = records.len() - unknown_count;
    let average_risk = if resolved > 0 {
        risk_sum as f64 / resolved as f64
    } else {
        0.0
    };

    let mut countries: Vec<(String, usize)> = countries
        .into_iter()
        .map(|(country, count)| (country.to_string(), count))
        .collect();
    countries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Summary {
        total: records.len(),
        proxy_count,
        vpn_count,
        none_count,
        unknown_count,
        tor_count,
        proxy_flag_count,
        average_risk,
        min_risk,
        max_risk,
        countries,
    }
}
