//! Property-based tests for the aggregation, ranking and formatting invariants.
use proptest::prelude::*;
use shoptool::aggregate::{Dimension, COUNT, DELIVERY, REVENUE, REVIEW};
use shoptool::rank::{self, Direction, Extreme};
use shoptool::record::Record;
use shoptool::view::{Event, ViewState};

fn record(state: &str, payment_value: f64, review_score: f64) -> Record {
    Record {
        price: payment_value,
        freight_value: 0.0,
        payment_value,
        review_score,
        purchased_at: None,
        delivered_at: None,
        customer_state: state.into(),
        payment_type: "credit_card".into(),
        product_category: "pet_shop".into(),
        product_category_english: None,
        order_status: "delivered".into(),
    }
}

fn records_strategy() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["SP", "RJ", "MG", "BA", "PR"]),
            prop_oneof![
                4 => 0.0..5000.0f64,
                1 => Just(f64::NAN),
            ],
            prop_oneof![
                4 => (1..=5u8).prop_map(f64::from),
                1 => Just(f64::NAN),
            ],
        )
            .prop_map(|(state, payment, review)| record(state, payment, review)),
        1..60,
    )
}

proptest! {
    #[test]
    fn group_revenues_add_up_to_the_total(records in records_strategy()) {
        let groups = shoptool::summarize(&records, Dimension::State);
        let partitioned: f64 = groups
            .column(REVENUE)
            .unwrap()
            .into_iter()
            .filter_map(|(_, revenue)| revenue)
            .sum();
        let total = shoptool::overall(&records).total_revenue.unwrap_or_default();
        prop_assert!((partitioned - total).abs() <= 1e-6 * total.max(1.0));

        let counted: usize = groups.groups.values().map(|g| g.count).sum();
        prop_assert_eq!(counted, records.len());
    }

    #[test]
    fn share_of_total_grows_with_n(records in records_strategy()) {
        let groups = shoptool::summarize(&records, Dimension::State);
        let with_revenue = rank::sorted(&groups, REVENUE, Direction::Descending).unwrap().len();
        prop_assume!(with_revenue > 0);

        let mut previous = 0.0;
        for n in 1..=with_revenue {
            let Some(share) = rank::share_of_total(&groups, REVENUE, n).unwrap() else {
                return Ok(());
            };
            prop_assert!(share + 1e-9 >= previous, "{} < {}", share, previous);
            previous = share;
        }
        prop_assert!((previous - 100.0).abs() < 1e-9);
    }

    #[test]
    fn order_of_records_does_not_matter(records in records_strategy()) {
        let forward = shoptool::summarize(&records, Dimension::State);
        let backward = shoptool::summarize(records.iter().rev(), Dimension::State);
        prop_assert_eq!(forward.keys().collect::<Vec<_>>(), backward.keys().collect::<Vec<_>>());
        prop_assert_eq!(forward.column(COUNT), backward.column(COUNT));
        prop_assert_eq!(
            shoptool::summarize(&records, Dimension::State),
            forward,
            "the same input always yields the same groups"
        );
    }

    #[test]
    fn extremum_is_part_of_the_ranking(records in records_strategy()) {
        let groups = shoptool::summarize(&records, Dimension::State);
        match rank::extremum(&groups, REVIEW, Extreme::Max) {
            Ok(best) => {
                let ranked = rank::sorted(&groups, REVIEW, Direction::Descending).unwrap();
                prop_assert_eq!(ranked.first().map(|r| r.value), Some(best.value));
                prop_assert_eq!(&ranked[0].key, &best.key, "ties go to the first key");
            }
            Err(rank::Error::InsufficientData { .. }) => {
                prop_assert!(records.iter().all(|r| r.review_score.is_nan()));
            }
            Err(err) => {
                prop_assert!(false, "unexpected error: {}", err);
            }
        }
    }

    #[test]
    fn toggling_twice_removes_the_highlight(key in "[A-Z]{2}", filter in proptest::option::of("[A-Z]{2}")) {
        let state = ViewState::new(Dimension::State).apply(Event::Filter(filter.clone()));
        let state = state.apply(Event::Toggle(key.clone()));
        prop_assert_eq!(state.highlight.as_deref(), Some(key.as_str()));
        let state = state.apply(Event::Toggle(key));
        prop_assert_eq!(state.highlight, None);
        prop_assert_eq!(state.filter, filter);
    }

    #[test]
    fn formatted_amounts_can_be_read_back(cents in -10_000_000_000i64..10_000_000_000) {
        let value = cents as f64 / 100.0;
        let formatted = shoptool::format_brl(Some(value));
        let number = formatted
            .strip_prefix("R$ ")
            .unwrap()
            .replace('.', "")
            .replace(',', ".");
        prop_assert!((shoptool::parse_number(&number) - value).abs() < 0.005, "{}", formatted);
    }

    #[test]
    fn numbers_survive_parsing(
        value in proptest::num::f64::POSITIVE
            | proptest::num::f64::NEGATIVE
            | proptest::num::f64::NORMAL
            | proptest::num::f64::ZERO
    ) {
        prop_assert_eq!(shoptool::parse_number(&format!(" {value} ")), value);
    }
}

#[test]
fn top_two_of_three() {
    let records = [
        record("SP", 50.0, 5.0),
        record("RJ", 30.0, 5.0),
        record("MG", 20.0, 5.0),
    ];
    let groups = shoptool::summarize(&records, Dimension::State);
    let share = rank::share_of_total(&groups, REVENUE, 2).unwrap().unwrap();
    assert!((share - 80.0).abs() < 1e-9);
}

#[test]
fn unanimous_reviews() {
    let records = [record("SP", 10.0, 5.0), record("SP", 20.0, 5.0)];
    let groups = shoptool::summarize(&records, Dimension::State);
    let best = rank::extremum(&groups, REVIEW, Extreme::Max).unwrap();
    assert_eq!((best.key.as_str(), best.value), ("SP", 5.0));
}

#[test]
fn no_valid_timestamps_means_no_delivery_data() {
    let records = [record("AC", 10.0, 3.0)];
    let groups = shoptool::summarize(&records, Dimension::State);
    assert_eq!(groups.value("AC", DELIVERY), None);
    assert!(matches!(
        rank::extremum(&groups, DELIVERY, Extreme::Min),
        Err(rank::Error::InsufficientData { .. })
    ));
}
