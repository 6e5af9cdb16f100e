/// Property-based tests for the address normalizer.
use hamilton_property::address::{
    self, Address, City, DIRECTIONS, STREET_TYPES,
};
use proptest::prelude::*;

fn arb_city() -> impl Strategy<Value = City> {
    prop_oneof![
        Just(City::Hamilton),
        Just(City::Ancaster),
        Just(City::Dundas),
        Just(City::Flamborough),
        Just(City::Glanbrook),
        Just(City::StoneyCreek),
        Just(City::Unknown),
    ]
}

fn arb_address() -> impl Strategy<Value = Address> {
    (
        "[0-9]{1,4}",
        "[A-Za-z][A-Za-z ]{0,15}",
        proptest::option::of(prop_oneof![
            proptest::sample::select(STREET_TYPES).prop_map(|(s, _)| s.to_string()),
            "[A-Z]{1,5}".prop_map(String::from),
        ]),
        proptest::option::of(
            proptest::sample::select(DIRECTIONS).prop_map(|(s, _)| s.to_string()),
        ),
        arb_city(),
    )
        .prop_map(|(number, name, type_short, direction_short, city)| Address {
            street_number: number,
            street_name: name,
            street_type_short: type_short,
            street_direction_short: direction_short,
            city,
            ..Default::default()
        })
}

proptest! {
    /// Token translation must never panic and must echo unknown tokens.
    #[test]
    fn translation_total_over_arbitrary_tokens(token in "\\PC{0,20}") {
        let expanded = address::expand_type(&token);
        let contracted = address::contract_type(&token);
        let known_short = STREET_TYPES.iter().any(|(s, _)| *s == token);
        let known_long = STREET_TYPES.iter().any(|(_, l)| *l == token);
        if !known_short {
            prop_assert_eq!(&expanded, &token);
        }
        if !known_long {
            prop_assert_eq!(&contracted, &token);
        }
        let _ = address::expand_direction(&token);
        let _ = address::contract_direction(&token);
    }

    /// Short forms survive an expand/contract round trip.
    #[test]
    fn type_round_trip(index in 0..STREET_TYPES.len()) {
        let (short, long) = STREET_TYPES[index];
        prop_assert_eq!(address::expand_type(short), long);
        prop_assert_eq!(address::contract_type(long), short);
        prop_assert_eq!(address::contract_type(&address::expand_type(short)), short);
    }

    #[test]
    fn direction_round_trip(index in 0..DIRECTIONS.len()) {
        let (short, long) = DIRECTIONS[index];
        prop_assert_eq!(address::expand_direction(short), long);
        prop_assert_eq!(address::contract_direction(long), short);
    }

    /// Normalization is idempotent: a second pass changes nothing.
    #[test]
    fn normalization_idempotent(address in arb_address()) {
        let once = address.normalized();
        let twice = once.normalized();
        prop_assert_eq!(
            serde_json::to_value(&once).unwrap(),
            serde_json::to_value(&twice).unwrap()
        );
    }

    /// Present halves are never modified, only missing halves filled in.
    #[test]
    fn normalization_preserves_present_halves(address in arb_address()) {
        let normalized = address.normalized();
        prop_assert_eq!(&normalized.street_type_short, &address.street_type_short);
        prop_assert_eq!(
            &normalized.street_direction_short,
            &address.street_direction_short
        );
        if address.street_direction_short.is_some() {
            prop_assert!(normalized.street_direction_long.is_some());
        }
    }

    /// Pairs with both halves set pass through normalization untouched,
    /// even when the halves disagree.
    #[test]
    fn complete_pairs_untouched(short in "[A-Z]{1,4}", long in "[A-Z]{5,10}") {
        let address = Address {
            street_number: "1".to_string(),
            street_name: "Main".to_string(),
            street_type_short: Some(short.clone()),
            street_type_long: Some(long.clone()),
            ..Default::default()
        };
        let normalized = address.normalized();
        prop_assert_eq!(normalized.street_type_short.as_deref(), Some(short.as_str()));
        prop_assert_eq!(normalized.street_type_long.as_deref(), Some(long.as_str()));
    }

    /// The permit search key always has the trailing separator and the
    /// city segment, whatever the input.
    #[test]
    fn permit_search_key_shape(address in arb_address()) {
        let key = address.normalized().permit_search_key();
        prop_assert!(key.ends_with(';'));
        let number_prefix = format!("{};", address.street_number);
        prop_assert!(key.starts_with(&number_prefix));
        if address.city == City::Unknown {
            prop_assert!(key.contains(";HAMILTON;"));
        }
    }
}
