use crate::address::Address;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{BuildingPermit, Coordinates, Location};
use crate::scrape;
use crate::transport::HttpTransport;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;
use url::Url;

/// Attribute list the zoning fetch asks the dynamic layer for.
const ZONING_OUT_FIELDS: &str = "ZONING_CODE,ZONING_DESC,PARENT_BY_LAW_NUMBER,PARENT_BY_LAW_URL,BY_LAW_NUMBER,BY_LAW_URL,EXCEPTION1,EXCEPTION1_BYLAW,EXCEPTION1_URL,HOLDING1,HOLDING1_BYLAW,HOLDING1_URL,HOLDING2,HOLDING2_BYLAW,HOLDING2_URL,HOLDING3,HOLDING3_BYLAW,HOLDING3_URL,COMMUNITY,ZONING_MAP,COUNCIL_APP_DATE,ZONING_FILE,OMB_NUMBER,OMB_CASE_NUMBER,OPA_NUMBER,URBAN_RURAL_SETTLE,FINALBINDING_DATE,SHAPE.AREA,SHAPE.LEN";

/// Attribute list for the temporary-use layer.
const TEMP_USE_OUT_FIELDS: &str = "OBJECTID,ID,ZONING_CODE,ZONING_DESC,PARENT_BY_LAW_NUMBER,PARENT_BY_LAW_URL,BY_LAW_NUMBER,BY_LAW_URL,EXCEPTION1,EXCEPTION1_BYLAW,EXCEPTION1_URL,HOLDING1,HOLDING1_BYLAW,HOLDING1_URL,EXCEPTION2,EXCEPTION2_BYLAW,EXCEPTION2_URL,HOLDING2,HOLDING2_BYLAW,HOLDING2_URL,EXCEPTION3,EXCEPTION3_BYLAW,EXCEPTION3_URL,HOLDING3,HOLDING3_BYLAW,HOLDING3_URL,COMMUNITY,ZONING_MAP,COUNCIL_APP_DATE,ZONING_FILE,OMB_NUMBER,OMB_CASE_NUMBER,OPA_NUMBER,URBAN_RURAL_SETTLE,FINALBINDING_DATE,SHAPE.AREA,SHAPE.LEN";

/// Map layer ids inside the zoning map service.
const ZONING_LAYER: u32 = 9;
const TEMP_USE_LAYER: u32 = 20;

#[derive(Debug, Deserialize)]
struct CandidateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    location: Coordinates,
}

#[derive(Debug, Deserialize)]
struct ObjectIdsResponse {
    #[serde(rename = "objectIds")]
    object_ids: Option<Vec<i64>>,
}

/// Client for the city's ArcGIS address locator.
pub struct GeocoderService {
    transport: HttpTransport,
    url: String,
}

impl GeocoderService {
    pub fn new(config: &Config, transport: HttpTransport) -> Self {
        Self {
            transport,
            url: config.geocoder_url.clone(),
        }
    }

    /// Geocodes an address into both reference systems. An empty Location
    /// comes back when the locator has no candidate or the request fails;
    /// the two coordinate pairs are only ever set together.
    pub async fn geocode(&self, address: &Address) -> Location {
        let line = address.single_line();
        match self.fetch_location(&line).await {
            Ok(location) => {
                if location.is_empty() {
                    tracing::warn!("Can't find a location for {}", line);
                } else {
                    tracing::debug!("Found the location for {}", line);
                }
                location
            }
            Err(e) => {
                tracing::error!("Geocode failed for {}: {}", line, e);
                Location::default()
            }
        }
    }

    async fn fetch_location(&self, line: &str) -> Result<Location, AppError> {
        let first_4326 = self.fetch_candidate(line, 4326).await?;
        let Some(epsg_4326) = first_4326 else {
            return Ok(Location::default());
        };
        let Some(epsg_3857) = self.fetch_candidate(line, 3857).await? else {
            return Ok(Location::default());
        };
        Ok(Location {
            epsg_4326: Some(epsg_4326),
            epsg_3857: Some(epsg_3857),
        })
    }

    async fn fetch_candidate(
        &self,
        line: &str,
        wkid: u32,
    ) -> Result<Option<Coordinates>, AppError> {
        let url = Url::parse_with_params(
            &self.url,
            &[
                ("SingleLine", line),
                ("f", "json"),
                ("outSR", &format!("{{wkid: {}}}", wkid)),
                ("outFields", "*"),
                ("maxLocations", "1"),
            ],
        )
        .map_err(|e| AppError::InternalError(format!("Failed to build URL: {}", e)))?;

        let response = self.transport.get(url.as_str()).await?;
        let parsed: CandidateResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse geocoder response: {}", e))
        })?;
        Ok(parsed.candidates.into_iter().next().map(|c| c.location))
    }
}

/// Client for the ward and zoning map services. All queries are
/// point-in-polygon against the EPSG:4326 coordinate.
pub struct SpatialQueryService {
    transport: HttpTransport,
    ward_url: String,
    zoning_url: String,
}

impl SpatialQueryService {
    pub fn new(config: &Config, transport: HttpTransport) -> Self {
        Self {
            transport,
            ward_url: config.ward_query_url.clone(),
            zoning_url: config.zoning_query_url.clone(),
        }
    }

    /// The ward containing the location, as the layer's first object id.
    pub async fn lookup_ward(&self, location: &Location) -> Option<String> {
        let point = location.epsg_4326?;
        match self.fetch_ward(&point).await {
            Ok(Some(ward)) => {
                tracing::debug!("Found ward {}", ward);
                Some(ward)
            }
            Ok(None) => {
                tracing::warn!("Couldn't find the ward");
                None
            }
            Err(e) => {
                tracing::error!("Ward query failed: {}", e);
                None
            }
        }
    }

    /// Zoning attributes at the location, or an empty map.
    pub async fn lookup_zoning(&self, location: &Location) -> serde_json::Map<String, Value> {
        self.lookup_layer(location, ZONING_LAYER, ZONING_OUT_FIELDS, "zoning")
            .await
    }

    /// Temporary-use application attributes at the location, or an empty
    /// map.
    pub async fn lookup_temp_use(&self, location: &Location) -> serde_json::Map<String, Value> {
        self.lookup_layer(location, TEMP_USE_LAYER, TEMP_USE_OUT_FIELDS, "temp use")
            .await
    }

    async fn lookup_layer(
        &self,
        location: &Location,
        layer: u32,
        out_fields: &str,
        label: &str,
    ) -> serde_json::Map<String, Value> {
        let Some(point) = location.epsg_4326 else {
            return serde_json::Map::new();
        };
        match self.fetch_layer_attributes(&point, layer, out_fields).await {
            Ok(Some(attributes)) => {
                tracing::debug!("Found {} data", label);
                attributes
            }
            Ok(None) => {
                tracing::warn!("Could not find {} data", label);
                serde_json::Map::new()
            }
            Err(e) => {
                tracing::error!("{} query failed: {}", label, e);
                serde_json::Map::new()
            }
        }
    }

    async fn fetch_ward(&self, point: &Coordinates) -> Result<Option<String>, AppError> {
        let url = Url::parse_with_params(
            &self.ward_url,
            &[
                ("f", "json"),
                ("outSR", "{wkid:4326}"),
                ("geometryType", "esriGeometryPoint"),
                ("inSR", "{wkid:4326}"),
                ("geometry", &geometry_param(point)),
                ("returnIdsOnly", "true"),
            ],
        )
        .map_err(|e| AppError::InternalError(format!("Failed to build URL: {}", e)))?;

        let response = self.transport.get(url.as_str()).await?;
        let parsed: ObjectIdsResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse ward response: {}", e))
        })?;
        Ok(parsed
            .object_ids
            .and_then(|ids| ids.first().copied())
            .map(|id| id.to_string()))
    }

    /// Two-phase dynamic-layer query: a cheap `returnIdsOnly` existence
    /// check first, then the full attribute fetch only when the layer has
    /// something at the point.
    async fn fetch_layer_attributes(
        &self,
        point: &Coordinates,
        layer: u32,
        out_fields: &str,
    ) -> Result<Option<serde_json::Map<String, Value>>, AppError> {
        let layer_param = format!(
            "{{'source':{{'type':'mapLayer','mapLayerId': '{}'}}}}",
            layer
        );

        let check_url = Url::parse_with_params(
            &self.zoning_url,
            &[
                ("f", "json"),
                ("outSR", "{wkid:4326}"),
                ("geometryType", "esriGeometryPoint"),
                ("inSR", "{wkid:4326}"),
                ("geometry", &geometry_param(point)),
                ("returnIdsOnly", "true"),
                ("layer", &layer_param),
            ],
        )
        .map_err(|e| AppError::InternalError(format!("Failed to build URL: {}", e)))?;

        let check: ObjectIdsResponse = self
            .transport
            .get(check_url.as_str())
            .await?
            .json()
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to parse layer check: {}", e))
            })?;

        if check.object_ids.map_or(true, |ids| ids.is_empty()) {
            return Ok(None);
        }

        let fetch_url = Url::parse_with_params(
            &self.zoning_url,
            &[
                ("f", "json"),
                ("returnGeometry", "false"),
                ("outSR", "{wkid:4326}"),
                ("geometryType", "esriGeometryPoint"),
                ("inSR", "{wkid:4326}"),
                ("geometry", &geometry_param(point)),
                ("layer", &layer_param),
                ("outFields", out_fields),
            ],
        )
        .map_err(|e| AppError::InternalError(format!("Failed to build URL: {}", e)))?;

        let body: Value = self
            .transport
            .get(fetch_url.as_str())
            .await?
            .json()
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to parse layer fetch: {}", e))
            })?;

        let attributes = body
            .get("features")
            .and_then(|f| f.get(0))
            .and_then(|f| f.get("attributes"))
            .and_then(|a| a.as_object())
            .cloned();
        Ok(attributes)
    }
}

/// Point geometry in the exact string shape the map services accept.
fn geometry_param(point: &Coordinates) -> String {
    format!(
        "{{'x': {}, 'y': {}, 'spatialReference': '{{'wkid': '4326'}}'}}",
        point.x, point.y
    )
}

/// Client for the EPlans permit portal: a stateful form application that
/// needs a session cookie from a bootstrap page, an initialization click,
/// and then the actual search post. The session cookie is a per-call
/// value; nothing is shared between lookups.
pub struct PermitPortalService {
    transport: HttpTransport,
    base_url: String,
}

impl PermitPortalService {
    pub fn new(config: &Config, transport: HttpTransport) -> Self {
        Self {
            transport,
            base_url: config.eplans_url.clone(),
        }
    }

    /// Building-permit applications on file for an address. Any transport
    /// failure in the session sequence aborts the whole lookup and yields
    /// an empty list.
    pub async fn lookup_building_permits(&self, address: &Address) -> Vec<BuildingPermit> {
        let key = address.permit_search_key();
        match self.fetch_permits(&key).await {
            Ok(permits) => {
                if permits.is_empty() {
                    tracing::debug!("Could not find building permits for {}", key);
                } else {
                    tracing::debug!("Found building permits for {}", key);
                }
                permits
            }
            Err(e) => {
                tracing::error!("Building permit lookup failed for {}: {}", key, e);
                Vec::new()
            }
        }
    }

    async fn fetch_permits(&self, search_key: &str) -> Result<Vec<BuildingPermit>, AppError> {
        let welcome_url = format!("{}?interviewID=Welcome", self.base_url);
        let welcome = self.transport.get(&welcome_url).await?;
        let cookie = session_cookie(&welcome)?;

        let host = Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| AppError::InternalError("Invalid portal URL".to_string()))?;
        let headers = [("Cookie", cookie), ("Host", host)];

        // Welcome-page click that makes the session accept searches.
        self.transport
            .post_form(
                &self.base_url,
                &[("e_1482930323468", "onclick".to_string())],
                &headers,
            )
            .await?;

        let search_form = [
            (
                "d_1536239857790",
                "buildingnewconstructionpermit".to_string(),
            ),
            ("d_1537469348077", "address".to_string()),
            ("d_1536259115820", search_key.to_string()),
            ("e_1536239857797", "onclick".to_string()),
        ];
        let response = self
            .transport
            .post_form(&self.base_url, &search_form, &headers)
            .await?;
        let body = response.text().await?;
        Ok(parse_building_permits(&body))
    }
}

/// Pulls the JSESSIONID cookie out of the bootstrap response.
fn session_cookie(response: &reqwest::Response) -> Result<String, AppError> {
    for value in response.headers().get_all(reqwest::header::SET_COOKIE) {
        if let Ok(text) = value.to_str() {
            if text.starts_with("JSESSIONID=") {
                let cookie = text.split(';').next().unwrap_or(text);
                return Ok(cookie.to_string());
            }
        }
    }
    Err(AppError::ParseError(
        "Portal response carried no JSESSIONID cookie".to_string(),
    ))
}

fn panel_title_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("div.panel-title").unwrap())
}

/// Extracts permit rows from the portal's search result page. No
/// `panel-title` div means no records for the address.
pub fn parse_building_permits(html: &str) -> Vec<BuildingPermit> {
    let document = Html::parse_document(html);
    if document.select(panel_title_selector()).next().is_none() {
        return Vec::new();
    }

    let Some(table) = scrape::landmark_table(&document, "Application #") else {
        return Vec::new();
    };

    let mut permits = Vec::new();
    for row in scrape::table_rows(table) {
        if scrape::row_matches_any(row, &["Application #"]) {
            continue;
        }
        let cells = scrape::row_cells(row);
        if cells.len() >= 4 {
            permits.push(BuildingPermit {
                application_number: cells[0].replace(' ', ""),
                description: cells[1].clone(),
                status: cells[3].clone(),
            });
        }
    }
    permits
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERMIT_PAGE: &str = r#"<html><body>
        <div class="panel-title">Permit Applications</div>
        <table>
            <thead><tr>
                <th><span>Application #</span></th><th>Description</th>
                <th>Date</th><th>Status</th>
            </tr></thead>
            <tbody>
                <tr>
                    <td><div> 18 104074 00 BP </div></td>
                    <td><div>New single family dwelling</div></td>
                    <td><div>2018-06-01</div></td>
                    <td><div>Closed</div></td>
                </tr>
                <tr>
                    <td><div>20 200123 00 BP</div></td>
                    <td><div>Rear addition</div></td>
                    <td><div>2020-02-11</div></td>
                    <td><div>Issued</div></td>
                </tr>
            </tbody>
        </table>
    </body></html>"#;

    #[test]
    fn permit_rows_are_extracted() {
        let permits = parse_building_permits(PERMIT_PAGE);
        assert_eq!(permits.len(), 2);
        assert_eq!(permits[0].application_number, "1810407400BP");
        assert_eq!(permits[0].description, "New single family dwelling");
        assert_eq!(permits[0].status, "Closed");
        assert_eq!(permits[1].status, "Issued");
    }

    #[test]
    fn page_without_panel_yields_empty() {
        let html = "<html><body><p>Welcome</p><table><tr><td>x</td></tr></table></body></html>";
        assert!(parse_building_permits(html).is_empty());
    }

    #[test]
    fn panel_without_result_table_yields_empty() {
        let html = r#"<div class="panel-title">Permit Applications</div><p>No records</p>"#;
        assert!(parse_building_permits(html).is_empty());
    }

    #[test]
    fn geometry_param_shape() {
        let point = Coordinates {
            x: -79.865,
            y: 43.248,
        };
        assert_eq!(
            geometry_param(&point),
            "{'x': -79.865, 'y': 43.248, 'spatialReference': '{'wkid': '4326'}'}"
        );
    }
}
