use serde::Deserialize;

/// City of Hamilton ArcGIS address locator.
const DEFAULT_GEOCODER_URL: &str = "https://spatialsolutions.hamilton.ca/webgis/rest/services/Geocoders/Address_Locator/GeocodeServer/findAddressCandidates";
/// Ward layer of the political boundaries map service.
const DEFAULT_WARD_QUERY_URL: &str =
    "https://spatialsolutions.hamilton.ca/webgis/rest/services/General/Political/MapServer/15/query";
/// Dynamic-layer query endpoint of the zoning map service (zoning and
/// temporary-use layers both live here).
const DEFAULT_ZONING_QUERY_URL: &str =
    "https://spatialsolutions.hamilton.ca/webgis/rest/services/General/Zoning/MapServer/dynamicLayer/query";
/// Legacy property-inquiry application (roll search + tax detail pages).
const DEFAULT_TAX_INQUIRY_URL: &str = "http://oldproperty.hamilton.ca/property-inquiry_noborders";
/// EPlans permit portal session endpoint.
const DEFAULT_EPLANS_URL: &str = "https://eplans.hamilton.ca/EPlansPortal/sfjsp";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub geocoder_url: String,
    pub ward_query_url: String,
    pub zoning_query_url: String,
    /// Base URL; `/list.asp` and `/detail.asp` are appended per call.
    pub tax_inquiry_url: String,
    pub eplans_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Bounded retry on 429/500/502/503/504, on top of the first attempt.
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
            ward_query_url: DEFAULT_WARD_QUERY_URL.to_string(),
            zoning_query_url: DEFAULT_ZONING_QUERY_URL.to_string(),
            tax_inquiry_url: DEFAULT_TAX_INQUIRY_URL.to_string(),
            eplans_url: DEFAULT_EPLANS_URL.to_string(),
            request_timeout_secs: 5,
            max_retries: 1,
        }
    }
}

impl Config {
    /// Loads the configuration, letting environment variables override the
    /// compiled-in Hamilton endpoints. Every variable is optional.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let config = Self {
            geocoder_url: env_or("HAMILTON_GEOCODER_URL", defaults.geocoder_url),
            ward_query_url: env_or("HAMILTON_WARD_QUERY_URL", defaults.ward_query_url),
            zoning_query_url: env_or("HAMILTON_ZONING_QUERY_URL", defaults.zoning_query_url),
            tax_inquiry_url: env_or("HAMILTON_TAX_INQUIRY_URL", defaults.tax_inquiry_url),
            eplans_url: env_or("HAMILTON_EPLANS_URL", defaults.eplans_url),
            request_timeout_secs: std::env::var("HAMILTON_REQUEST_TIMEOUT_SECS")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .map_err(|_| anyhow::anyhow!("HAMILTON_REQUEST_TIMEOUT_SECS must be a number"))?
                .unwrap_or(defaults.request_timeout_secs),
            max_retries: std::env::var("HAMILTON_MAX_RETRIES")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .map_err(|_| anyhow::anyhow!("HAMILTON_MAX_RETRIES must be a number"))?
                .unwrap_or(defaults.max_retries),
        };

        tracing::debug!("Geocoder URL: {}", config.geocoder_url);
        tracing::debug!("Tax inquiry URL: {}", config.tax_inquiry_url);
        tracing::debug!(
            "Timeout: {}s, retries: {}",
            config.request_timeout_secs,
            config.max_retries
        );

        Ok(config)
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default)
}
