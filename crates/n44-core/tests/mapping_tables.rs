use std::collections::HashSet;

use n44_core::{area, areas, exchange_loads, flip_link, Country};

#[test]
fn area_links_touch_their_area() {
    for record in areas() {
        for link in record.positive.iter().chain(record.negative) {
            let (from, to) = link.split_once('_').unwrap();
            assert!(
                from == record.name || to == record.name,
                "{} listed for {}",
                link,
                record.name
            );
        }
    }
}

#[test]
fn outgoing_links_are_negative_incoming_positive() {
    for record in areas() {
        for link in record.negative {
            assert!(link.starts_with(&format!("{}_", record.name)), "{}", link);
        }
        for link in record.positive {
            assert!(link.ends_with(&format!("_{}", record.name)), "{}", link);
        }
    }
}

#[test]
fn area_numbers_and_buses_are_unique() {
    let numbers: HashSet<u32> = areas().iter().map(|a| a.number).collect();
    let buses: HashSet<u32> = areas().iter().map(|a| a.bus).collect();
    assert_eq!(numbers.len(), areas().len());
    assert_eq!(buses.len(), areas().len());
}

#[test]
fn report_order_is_stable() {
    let names: Vec<&str> = areas().iter().map(|a| a.name).collect();
    assert_eq!(
        names,
        vec!["NO1", "NO2", "NO3", "NO4", "NO5", "SE1", "SE2", "SE3", "SE4", "FI"]
    );
    assert_eq!(exchange_loads()[0].bus, 3020);
    assert_eq!(exchange_loads()[12].bus, 8700);
}

#[test]
fn exchange_loads_belong_to_known_areas() {
    for entry in exchange_loads() {
        let owner = area(entry.consumption_area()).unwrap();
        assert_eq!(owner.country(), entry.country());
        assert!(Country::of_area(entry.link).is_ok());
    }
}

#[test]
fn flip_is_an_involution_on_all_links() {
    let links = areas()
        .iter()
        .flat_map(|a| a.positive.iter().chain(a.negative))
        .copied()
        .chain(exchange_loads().iter().map(|e| e.link));
    for link in links {
        assert_eq!(flip_link(&flip_link(link)), link);
        assert_ne!(flip_link(link), link);
    }
}
