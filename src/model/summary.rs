/// Bucket for records that carry no country.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Aggregate view over a full set of IP records.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub proxy_count: usize,
    pub vpn_count: usize,
    pub none_count: usize,
    pub unknown_count: usize,
    pub tor_count: usize,
    /// Records with the proxy flag set, whatever their category
    pub proxy_flag_count: usize,
    /// Mean over resolved records only
    pub average_risk: f64,
    pub min_risk: Option<u8>,
    pub max_risk: Option<u8>,
    /// Sorted by count descending, then name ascending
    pub countries: Vec<(String, usize)>,
}

impl Summary {
    pub fn percentage(&self, count: usize) -> f64 {
        if self.total > 0 {
            count as f64 / self.total as f64 * 100.0
        } else {
            0.0
        }
    }

    pub fn proxy_rate(&self) -> f64 {
        self.percentage(self.proxy_count)
    }

    pub fn vpn_rate(&self) -> f64 {
        self.percentage(self.vpn_count)
    }

    pub fn tor_rate(&self) -> f64 {
        self.percentage(self.tor_count)
    }

    pub fn non_proxy_count(&self) -> usize {
        self.total - self.proxy_count
    }

    pub fn resolved_count(&self) -> usize {
        self.total - self.unknown_count
    }

    pub fn log(&self, top_countries: usize) {
        tracing::info!("=== Reputation Summary ===");
        tracing::info!("  Total IPs: {} ({} resolved, {} unknown)", self.total, self.resolved_count(), self.unknown_count);
        tracing::info!("  Proxy: {} ({:.1}%), non-proxy: {}", self.proxy_count, self.proxy_rate(), self.non_proxy_count());
        tracing::info!("  VPN: {} ({:.1}%)", self.vpn_count, self.vpn_rate());
        tracing::info!(
            "  Proxy flag set: {} ({:.1}%)",
            self.proxy_flag_count,
            self.percentage(self.proxy_flag_count)
        );
        tracing::info!("  Tor: {} ({:.1}%)", self.tor_count, self.tor_rate());
        tracing::info!(
            "  Risk score: avg {:.2}, min {}, max {}",
            self.average_risk,
            self.min_risk.unwrap_or(0),
            self.max_risk.unwrap_or(0)
        );
        if !self.countries.is_empty() {
            tracing::info!("Top {} countries:", top_countries);
            for (country, count) in self.countries.iter().take(top_countries) {
                tracing::info!("  {}: {} ({:.1}%)", country, count, self.percentage(*count));
            }
        }
    }
}
