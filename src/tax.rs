use crate::address::Address;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{AssessmentYear, Installment, LevyYear, RollNumber};
use crate::scrape;
use crate::transport::HttpTransport;
use chrono::NaiveDate;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Client for the legacy property-inquiry application. Roll-number search
/// posts against `list.asp`; everything else scrapes the `detail.asp` page
/// for one roll number. Each operation re-fetches the page; the pages are
/// small and the app sets no cache headers anyway.
///
/// All public methods degrade on failure: transport errors are logged at
/// error level, missing landmarks at warn, and the empty value for the
/// return type comes back either way.
pub struct TaxInquiryService {
    transport: HttpTransport,
    base_url: String,
}

impl TaxInquiryService {
    pub fn new(config: &Config, transport: HttpTransport) -> Self {
        Self {
            transport,
            base_url: config.tax_inquiry_url.clone(),
        }
    }

    /// Searches the inquiry app for the roll numbers at an address. An
    /// address can match zero, one, or many properties (multi-unit
    /// buildings or ambiguous street matches).
    pub async fn find_roll_numbers(&self, address: &Address) -> Vec<RollNumber> {
        match self.fetch_roll_numbers(address).await {
            Ok(rolls) => {
                if rolls.is_empty() {
                    tracing::warn!(
                        "No roll number for {} {}",
                        address.street_number,
                        address.tax_search_street()
                    );
                } else {
                    tracing::debug!(
                        "Found {} roll number(s) for {} {}",
                        rolls.len(),
                        address.street_number,
                        address.tax_search_street()
                    );
                }
                rolls
            }
            Err(e) => {
                tracing::error!("Roll number search failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_roll_numbers(&self, address: &Address) -> Result<Vec<RollNumber>, AppError> {
        let url = format!("{}/list.asp", self.base_url);
        let form = [
            ("stnum", address.street_number.clone()),
            ("address", address.tax_search_street()),
            ("community", address.city.community_code().to_string()),
            ("B1", "Search".to_string()),
        ];
        let response = self.transport.post_form(&url, &form, &[]).await?;
        let body = response.text().await?;
        Ok(parse_roll_numbers(&body))
    }

    /// Whether the detail page marks the property as exempt. `None` when
    /// the page could not be fetched.
    pub async fn is_tax_exempt(&self, roll_number: &RollNumber) -> Option<bool> {
        match self.detail_page(roll_number).await {
            Ok(body) => {
                let exempt = parse_is_exempt(&body);
                tracing::debug!(
                    "{} is {}tax exempt",
                    roll_number,
                    if exempt { "" } else { "not " }
                );
                Some(exempt)
            }
            Err(e) => {
                tracing::error!("Exempt check failed for {}: {}", roll_number, e);
                None
            }
        }
    }

    /// Assessment history rows from the "Current Year Assessment" table.
    pub async fn assessment_years(&self, roll_number: &RollNumber) -> Vec<AssessmentYear> {
        match self.detail_page(roll_number).await {
            Ok(body) => {
                let years = parse_assessment_years(&body);
                if years.is_empty() {
                    tracing::warn!("No assessment table for {}", roll_number);
                } else {
                    tracing::debug!("Found assessment years for {}", roll_number);
                }
                years
            }
            Err(e) => {
                tracing::error!("Assessment lookup failed for {}: {}", roll_number, e);
                Vec::new()
            }
        }
    }

    /// Levy history rows, with the current year's amount breakdown and
    /// instalment schedule merged into the first entry. Exempt properties
    /// get an explicit empty list.
    pub async fn levy_years(&self, roll_number: &RollNumber, exempt: bool) -> Vec<LevyYear> {
        if exempt {
            return Vec::new();
        }
        match self.detail_page(roll_number).await {
            Ok(body) => {
                let years = parse_levy_years(&body);
                if years.is_empty() {
                    tracing::warn!("No levy table for {}", roll_number);
                } else {
                    tracing::debug!("Found levy years for {}", roll_number);
                }
                years
            }
            Err(e) => {
                tracing::error!("Levy lookup failed for {}: {}", roll_number, e);
                Vec::new()
            }
        }
    }

    /// Validates a roll number by fetching its detail page and recovering
    /// the listed street address. `None` when the page is missing the
    /// property-detail heading (unknown roll number) or cannot be fetched.
    pub async fn lookup_address(&self, roll_number: &RollNumber) -> Option<Address> {
        match self.detail_page(roll_number).await {
            Ok(body) => {
                let address = parse_detail_address(&body);
                if address.is_none() {
                    tracing::warn!("Roll number {} did not validate", roll_number);
                }
                address
            }
            Err(e) => {
                tracing::error!("Detail fetch failed for {}: {}", roll_number, e);
                None
            }
        }
    }

    async fn detail_page(&self, roll_number: &RollNumber) -> Result<String, AppError> {
        let url = format!("{}/detail.asp?qryrollno={}", self.base_url, roll_number);
        let response = self.transport.get(&url).await?;
        Ok(response.text().await?)
    }
}

fn detail_link_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse(r#"a[href*="detail.asp"]"#).unwrap())
}

fn bodycopy_cell_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("td.bodycopy").unwrap())
}

/// Extracts roll numbers from a `list.asp` response. A multi-match page
/// carries a "Property List" caption and one `detail.asp` link per
/// property; a single match renders the detail view inline with the roll
/// number below its caption; anything else is a miss.
pub fn parse_roll_numbers(html: &str) -> Vec<RollNumber> {
    let document = Html::parse_document(html);

    if scrape::document_text(&document).contains("Property List") {
        return document
            .select(detail_link_selector())
            .map(|link| scrape::element_text(link))
            .filter(|text| !text.is_empty())
            .map(RollNumber)
            .collect();
    }

    scrape::value_below_label(&document, "Roll Number")
        .map(|roll| vec![RollNumber(roll)])
        .unwrap_or_default()
}

/// True iff a body cell of the detail page reads "Exempt".
pub fn parse_is_exempt(html: &str) -> bool {
    let document = Html::parse_document(html);
    document
        .select(bodycopy_cell_selector())
        .any(|cell| scrape::element_text(cell).contains("Exempt"))
}

/// Rows of the "Current Year Assessment" table, header and total rows
/// skipped, thousands separators stripped from the amount.
pub fn parse_assessment_years(html: &str) -> Vec<AssessmentYear> {
    let document = Html::parse_document(html);
    let Some(table) = scrape::landmark_table(&document, "Current Year Assessment") else {
        return Vec::new();
    };

    let mut years = Vec::new();
    for row in scrape::table_rows(table) {
        if scrape::row_matches_any(row, &["Year", "Total Assessment", "Current Year Assessment"]) {
            continue;
        }
        let cells = scrape::row_cells(row);
        if cells.len() >= 4 {
            years.push(AssessmentYear {
                year: cells[0].clone(),
                tax_class: cells[1].clone(),
                description: cells[2].clone(),
                amount: cells[3].replace(',', ""),
            });
        }
    }
    years
}

/// Levy history plus the current-year breakdown and instalments.
///
/// The app lists years newest-first, so the first row is the current year;
/// that is a page-ordering assumption, and when the totals table yields no
/// rows the breakdown and instalment scans are skipped rather than
/// indexed into.
pub fn parse_levy_years(html: &str) -> Vec<LevyYear> {
    let document = Html::parse_document(html);
    let mut years: Vec<LevyYear> = Vec::new();

    if let Some(table) = scrape::landmark_table(&document, "Tax Levy History") {
        for row in scrape::table_rows(table) {
            if scrape::row_matches_any(row, &["Tax Levy History", "Year"]) {
                continue;
            }
            let cells = scrape::row_cells(row);
            if cells.len() >= 3 && !cells[1].is_empty() {
                let mut amount = BTreeMap::new();
                amount.insert("total".to_string(), cells[2].replace(',', ""));
                years.push(LevyYear {
                    year: cells[1].clone(),
                    amount,
                    installments: Vec::new(),
                });
            }
        }
    }

    if years.is_empty() {
        return years;
    }

    // Breakdown and instalments only exist for the current (first) year.
    if let Some(table) = scrape::landmark_table(&document, "Breakdown") {
        for row in scrape::table_rows(table) {
            if scrape::row_matches_any(row, &["Breakdown", "Type", "Total"]) {
                continue;
            }
            let cells = scrape::row_cells(row);
            if cells.len() >= 2 && !cells[0].is_empty() {
                let key = cells[0].to_lowercase().replace(' ', "_");
                years[0].amount.insert(key, cells[1].replace(',', ""));
            }
        }
    }

    if let Some(table) = scrape::landmark_table(&document, "Instalments") {
        for row in scrape::table_rows(table) {
            if scrape::row_matches_any(row, &["Instalments", "Amount", "Total"]) {
                continue;
            }
            let cells = scrape::row_cells(row);
            if cells.len() >= 3 && !cells[1].is_empty() {
                years[0].installments.push(Installment {
                    date: reformat_instalment_date(&cells[1]),
                    amount: cells[2].replace(',', ""),
                });
            }
        }
    }

    years
}

/// "Month D, YYYY" to "MM/DD/YYYY". A date the page renders in some other
/// shape passes through unchanged.
fn reformat_instalment_date(date: &str) -> String {
    NaiveDate::parse_from_str(date.trim(), "%B %d, %Y")
        .map(|d| d.format("%m/%d/%Y").to_string())
        .unwrap_or_else(|_| date.trim().to_string())
}

/// Recovers a structured address from a detail page. Requires the
/// "Property Detail" heading (its absence means the roll number is
/// unknown), then splits the listed street line into number, name, short
/// type, short direction, and unit; the municipality cell beside the
/// street line supplies the city.
pub fn parse_detail_address(html: &str) -> Option<Address> {
    use crate::address::{City, DIRECTIONS, STREET_TYPES};

    let document = Html::parse_document(html);
    if !scrape::document_text(&document).contains("Property Detail") {
        return None;
    }

    let cells = scrape::cells_below_label(&document, "Address");
    let raw = cells.first().filter(|s| !s.is_empty())?;
    let city = cells
        .get(1)
        .map(|name| City::parse(name))
        .unwrap_or(City::Unknown);
    let mut tokens: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
    if tokens.len() < 2 {
        return None;
    }
    let street_number = tokens.remove(0);

    let mut unit = None;
    if tokens.len() >= 2 && tokens[tokens.len() - 2].eq_ignore_ascii_case("unit") {
        unit = tokens.pop();
        tokens.pop();
    }

    let mut street_direction_short = None;
    if let Some(last) = tokens.last() {
        if DIRECTIONS.iter().any(|(short, _)| *short == last.as_str()) {
            street_direction_short = tokens.pop();
        }
    }

    let mut street_type_short = None;
    if let Some(last) = tokens.last() {
        if STREET_TYPES.iter().any(|(short, _)| *short == last.as_str()) {
            street_type_short = tokens.pop();
        }
    }

    if tokens.is_empty() {
        return None;
    }

    Some(Address {
        street_number,
        street_name: tokens.join(" "),
        street_type_short,
        street_direction_short,
        city,
        unit,
        ..Default::default()
    })
}
