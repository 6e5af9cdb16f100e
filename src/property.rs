use crate::address::Address;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{PropertyRecord, RollNumber, Tax};
use crate::services::{GeocoderService, PermitPortalService, SpatialQueryService};
use crate::tax::TaxInquiryService;
use crate::transport::HttpTransport;

/// The two ways a property can be identified.
#[derive(Debug, Clone)]
pub enum PropertyQuery {
    ByAddress(Address),
    ByRollNumber(RollNumber),
}

/// Builds one complete [`PropertyRecord`] per query by orchestrating the
/// resolver clients and the tax-inquiry scraper. Lookups run strictly in
/// sequence; every sub-lookup degrades to an empty value on failure, so
/// the worst outcome is a record with many empty fields, never an error.
///
/// An assembler holds no per-query state and can be shared across
/// concurrent tasks; the services share one pooled HTTP client.
pub struct PropertyAssembler {
    geocoder: GeocoderService,
    spatial: SpatialQueryService,
    permits: PermitPortalService,
    tax: TaxInquiryService,
}

impl PropertyAssembler {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self {
            geocoder: GeocoderService::new(config, transport.clone()),
            spatial: SpatialQueryService::new(config, transport.clone()),
            permits: PermitPortalService::new(config, transport.clone()),
            tax: TaxInquiryService::new(config, transport),
        })
    }

    pub async fn assemble(&self, query: PropertyQuery) -> PropertyRecord {
        match query {
            PropertyQuery::ByAddress(address) => self.assemble_from(address, None).await,
            PropertyQuery::ByRollNumber(roll_number) => {
                match self.tax.lookup_address(&roll_number).await {
                    Some(address) => self.assemble_from(address, Some(roll_number)).await,
                    // A roll number that does not validate is a miss, not
                    // an error: the caller gets an empty record.
                    None => empty_record(),
                }
            }
        }
    }

    async fn assemble_from(
        &self,
        address: Address,
        validated_roll: Option<RollNumber>,
    ) -> PropertyRecord {
        let mut address = address.normalized();

        let mut roll_numbers = self.tax.find_roll_numbers(&address).await;
        if roll_numbers.is_empty() {
            // Entered by roll number and the recovered address did not
            // re-match the list search: keep the roll number we already
            // validated.
            if let Some(roll) = validated_roll {
                roll_numbers.push(roll);
            }
        }

        let location = self.geocoder.geocode(&address).await;
        address.validated = !location.is_empty();

        // The spatial and permit lookups all need coordinates; without a
        // location they are skipped, not attempted.
        let (ward, zoning, temp_use, building_permits) = if location.is_empty() {
            (
                None,
                serde_json::Map::new(),
                serde_json::Map::new(),
                Vec::new(),
            )
        } else {
            (
                self.spatial.lookup_ward(&location).await,
                self.spatial.lookup_zoning(&location).await,
                self.spatial.lookup_temp_use(&location).await,
                self.permits.lookup_building_permits(&address).await,
            )
        };

        let mut taxes = Vec::new();
        for roll_number in roll_numbers {
            let mut tax = Tax::new(roll_number.clone());
            tax.is_tax_exempt = self.tax.is_tax_exempt(&roll_number).await;
            tax.assessment_years = self.tax.assessment_years(&roll_number).await;
            tax.levy_years = self
                .tax
                .levy_years(&roll_number, tax.is_tax_exempt == Some(true))
                .await;
            taxes.push(tax);
        }

        PropertyRecord {
            address,
            location,
            ward,
            zoning,
            temp_use,
            building_permits,
            taxes,
        }
    }
}

fn empty_record() -> PropertyRecord {
    PropertyRecord {
        address: Address::default(),
        location: Default::default(),
        ward: None,
        zoning: serde_json::Map::new(),
        temp_use: serde_json::Map::new(),
        building_permits: Vec::new(),
        taxes: Vec::new(),
    }
}
