use hamilton_property::address::{Address, City};
use hamilton_property::config::Config;
use hamilton_property::models::RollNumber;
use hamilton_property::property::{PropertyAssembler, PropertyQuery};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Turns the command line into a query. With no arguments the driver looks
/// up a known downtown address as a smoke check.
///
/// - `roll <number>` queries by tax roll number;
/// - `<number> <road ...> [city]` queries by address. The road is the
///   long form ("Tisdale Street South"); when the trailing token(s) name
///   a recognized municipality they are split off as the city first.
fn parse_query(args: &[String]) -> PropertyQuery {
    if args.len() == 2 && args[0] == "roll" {
        return PropertyQuery::ByRollNumber(RollNumber(args[1].clone()));
    }

    if args.len() >= 2 {
        let mut road = &args[1..];
        let mut city = City::Unknown;
        // "Stoney Creek" is two tokens, so try the longer suffix first.
        if road.len() > 2 {
            let last_two = road[road.len() - 2..].join(" ");
            city = City::parse(&last_two);
            if city != City::Unknown {
                road = &road[..road.len() - 2];
            }
        }
        if city == City::Unknown && road.len() > 1 {
            city = City::parse(&road[road.len() - 1]);
            if city != City::Unknown {
                road = &road[..road.len() - 1];
            }
        }
        return PropertyQuery::ByAddress(Address::from_parts(
            &args[0],
            &road.join(" "),
            city,
        ));
    }

    PropertyQuery::ByAddress(Address::from_parts(
        "73",
        "Tisdale Street South",
        City::Hamilton,
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hamilton_property=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let query = parse_query(&args);

    let assembler = PropertyAssembler::new(&config)?;
    let record = assembler.assemble(query).await;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    fn by_address(line: &str) -> Address {
        match parse_query(&args(line)) {
            PropertyQuery::ByAddress(address) => address,
            PropertyQuery::ByRollNumber(_) => panic!("expected an address query"),
        }
    }

    #[test]
    fn roll_form() {
        match parse_query(&args("roll 2518106000000000")) {
            PropertyQuery::ByRollNumber(roll) => {
                assert_eq!(roll, RollNumber("2518106000000000".to_string()));
            }
            PropertyQuery::ByAddress(_) => panic!("expected a roll-number query"),
        }
    }

    #[test]
    fn address_form_splits_road_and_city() {
        let address = by_address("73 Tisdale Street South Hamilton");
        assert_eq!(address.street_number, "73");
        assert_eq!(address.street_name, "Tisdale");
        assert_eq!(address.street_type_long.as_deref(), Some("Street"));
        assert_eq!(address.street_direction_long.as_deref(), Some("South"));
        assert_eq!(address.city, City::Hamilton);
    }

    #[test]
    fn two_token_city_is_split_off_first() {
        let address = by_address("100 King Street East Stoney Creek");
        assert_eq!(address.street_name, "King");
        assert_eq!(address.street_direction_long.as_deref(), Some("East"));
        assert_eq!(address.city, City::StoneyCreek);
    }

    #[test]
    fn city_token_is_optional() {
        let address = by_address("689 West 5th Street");
        assert_eq!(address.street_name, "West 5th");
        assert_eq!(address.street_type_long.as_deref(), Some("Street"));
        assert_eq!(address.city, City::Unknown);
    }

    #[test]
    fn no_arguments_falls_back_to_smoke_address() {
        let address = by_address("");
        assert_eq!(address.street_number, "73");
        assert_eq!(address.city, City::Hamilton);
    }
}
