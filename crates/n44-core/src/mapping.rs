//! Static mapping between Nordic market areas and the N44 grid model.
//!
//! Two frozen tables describe how market quantities land on the model:
//!
//! - [`exchange_loads`]: interconnections modelled as controllable loads at a
//!   single bus (mostly HVDC links leaving the synchronous area).
//! - [`areas`]: the ten control areas with their representative bus and the
//!   links counted positively or negatively toward net interchange.
//!
//! Market sources publish a link either as `"AAA_BBB"` or from the opposite
//! side as `"BBB_AAA"` with inverted sign, and one source uses the area code
//! instead of the country code as link prefix. Both quirks are resolved by
//! [`TieredLookup`], an ordered list of `(key, sign)` candidates.

use serde::Serialize;

use crate::dataset::{Country, SeriesMap};

/// Power factor assumed for areas and most exchange loads.
pub const DEFAULT_POWER_FACTOR: f64 = 0.95;

/// Interconnection represented as a load at one bus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExchangeLoad {
    pub bus: u32,
    /// Load identifier at the bus
    pub device_id: &'static str,
    /// Owning market area (e.g. `SE3`)
    pub area: &'static str,
    /// Link id in the owning country's exchange table
    pub link: &'static str,
    pub power_factor: f64,
    pub kind: LinkKind,
}

/// How an interconnection is described in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkKind {
    Hvdc,
    /// Scheduled exchange with a neighbouring system
    Exchange,
    Ac,
}

impl LinkKind {
    pub fn label(&self) -> &'static str {
        match self {
            LinkKind::Hvdc => "HVDC link",
            LinkKind::Exchange => "exchange",
            LinkKind::Ac => "link",
        }
    }
}

impl ExchangeLoad {
    pub fn country(&self) -> Country {
        // Area names in the static table always carry a valid prefix.
        Country::of_area(self.area).unwrap_or(Country::Norway)
    }

    /// Consumption series the exchange is netted against. Finland publishes
    /// a single consumption area `FI`.
    pub fn consumption_area(&self) -> &'static str {
        match self.country() {
            Country::Finland => "FI",
            _ => self.area,
        }
    }

    /// Candidates for the exchange value: the link itself, then the link
    /// re-prefixed with the owning area (`SE_DE` -> `SE4_DE`).
    pub fn lookup(&self) -> TieredLookup {
        let lookup = TieredLookup::new().then(self.link, 1.0);
        match area_prefixed_link(self.area, self.link) {
            Some(alternate) => lookup.then(alternate, 1.0),
            None => lookup,
        }
    }

    pub fn label(&self) -> String {
        format!(
            "Bus {}, area {}, {} {}",
            self.bus,
            self.area,
            self.kind.label(),
            self.link.replace('_', "-")
        )
    }
}

/// Control area of the N44 model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AreaRecord {
    /// Market area name used for lookups (`NO1`, ..., `FI`)
    pub name: &'static str,
    /// Label in reports
    pub label: &'static str,
    pub number: u32,
    /// Representative (swing) bus of the area
    pub bus: u32,
    pub power_factor: f64,
    pub positive: &'static [&'static str],
    pub negative: &'static [&'static str],
}

impl AreaRecord {
    pub fn country(&self) -> Country {
        Country::of_area(self.name).unwrap_or(Country::Norway)
    }
}

static EXCHANGE_LOADS: [ExchangeLoad; 13] = [
    exchange_load(3020, "1", "SE3", "SE3_FI", DEFAULT_POWER_FACTOR, LinkKind::Hvdc),
    exchange_load(3360, "1", "SE3", "SE3_DK1", DEFAULT_POWER_FACTOR, LinkKind::Hvdc),
    exchange_load(5610, "1", "NO2", "NO_DK", 0.99, LinkKind::Hvdc),
    exchange_load(5620, "1", "NO2", "NO_NL", DEFAULT_POWER_FACTOR, LinkKind::Hvdc),
    exchange_load(6701, "1", "NO4", "NO_FI", DEFAULT_POWER_FACTOR, LinkKind::Exchange),
    exchange_load(6701, "3", "NO4", "NO_RU", DEFAULT_POWER_FACTOR, LinkKind::Exchange),
    exchange_load(7000, "6", "FI1", "FI_SE3", DEFAULT_POWER_FACTOR, LinkKind::Hvdc),
    exchange_load(7010, "1", "FI1", "FI_RU", DEFAULT_POWER_FACTOR, LinkKind::Hvdc),
    exchange_load(7020, "1", "FI1", "FI_EE", DEFAULT_POWER_FACTOR, LinkKind::Hvdc),
    exchange_load(7100, "3", "FI1", "FI_NO", DEFAULT_POWER_FACTOR, LinkKind::Exchange),
    exchange_load(8500, "4", "SE4", "SE4_DK2", DEFAULT_POWER_FACTOR, LinkKind::Ac),
    exchange_load(8600, "1", "SE4", "SE_DE", DEFAULT_POWER_FACTOR, LinkKind::Hvdc),
    exchange_load(8700, "1", "SE4", "SE_PL", DEFAULT_POWER_FACTOR, LinkKind::Hvdc),
];

static AREAS: [AreaRecord; 10] = [
    area_record("NO1", "NO1", 11, 5500, &[], &["NO1_SE3", "NO1_NO2", "NO1_NO5", "NO1_NO3"]),
    area_record("NO2", "NO2", 12, 5600, &["NO1_NO2"], &["NO2_NO5"]),
    area_record("NO3", "NO3", 13, 6500, &["NO1_NO3"], &["NO3_SE2", "NO3_NO4"]),
    area_record("NO4", "NO4", 14, 6700, &["NO3_NO4"], &["NO4_SE1", "NO4_SE2"]),
    area_record("NO5", "NO5", 15, 5300, &["NO1_NO5", "NO2_NO5"], &[]),
    area_record("SE1", "SE1", 21, 3115, &[], &["SE1_FI", "SE1_NO4", "SE1_SE2"]),
    area_record("SE2", "SE2", 22, 3249, &["SE1_SE2"], &["SE2_NO3", "SE2_NO4", "SE2_SE3"]),
    area_record("SE3", "SE3", 23, 3500, &["SE2_SE3"], &["SE3_NO1", "SE3_SE4"]),
    area_record("SE4", "SE4", 24, 8500, &["SE3_SE4"], &[]),
    area_record("FI", "FI1", 31, 7000, &[], &["FI_SE1"]),
];

const fn exchange_load(
    bus: u32,
    device_id: &'static str,
    area: &'static str,
    link: &'static str,
    power_factor: f64,
    kind: LinkKind,
) -> ExchangeLoad {
    ExchangeLoad {
        bus,
        device_id,
        area,
        link,
        power_factor,
        kind,
    }
}

const fn area_record(
    name: &'static str,
    label: &'static str,
    number: u32,
    bus: u32,
    positive: &'static [&'static str],
    negative: &'static [&'static str],
) -> AreaRecord {
    AreaRecord {
        name,
        label,
        number,
        bus,
        power_factor: DEFAULT_POWER_FACTOR,
        positive,
        negative,
    }
}

/// All exchanges modelled as loads, in report order.
pub fn exchange_loads() -> &'static [ExchangeLoad] {
    &EXCHANGE_LOADS
}

/// All control areas, in report order.
pub fn areas() -> &'static [AreaRecord] {
    &AREAS
}

pub fn area(name: &str) -> Option<&'static AreaRecord> {
    AREAS.iter().find(|area| area.name == name)
}

/// View a link from the opposite side: `"AAA_BBB"` -> `"BBB_AAA"`.
///
/// Ids without an underscore are returned unchanged.
pub fn flip_link(link: &str) -> String {
    match link.split_once('_') {
        Some((from, to)) => format!("{}_{}", to, from),
        None => link.to_string(),
    }
}

/// Replace a two-letter country prefix by the owning area
/// (`("SE4", "SE_DE")` -> `"SE4_DE"`). `None` if the link already carries an
/// area prefix.
pub fn area_prefixed_link(area: &str, link: &str) -> Option<String> {
    match link.split_once('_') {
        Some((prefix, rest)) if prefix.len() == 2 && prefix != area => {
            Some(format!("{}_{}", area, rest))
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub key: String,
    pub sign: f64,
}

/// Value found by [`TieredLookup::resolve`], already multiplied by the sign
/// of the matching candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub key: String,
    pub value: f64,
    /// Index of the candidate that matched (0 = canonical)
    pub tier: usize,
}

/// Ordered `(key, sign)` candidates tried against a series table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TieredLookup {
    candidates: Vec<Candidate>,
}

impl TieredLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, key: impl Into<String>, sign: f64) -> Self {
        self.candidates.push(Candidate {
            key: key.into(),
            sign,
        });
        self
    }

    /// The link as published, then the flipped link with inverted sign.
    pub fn canonical_or_flipped(link: &str) -> Self {
        Self::new().then(link, 1.0).then(flip_link(link), -1.0)
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Primary key, used when reporting a miss.
    pub fn primary(&self) -> &str {
        self.candidates
            .first()
            .map(|c| c.key.as_str())
            .unwrap_or("")
    }

    pub fn resolve(&self, series: &SeriesMap, hour: usize) -> Option<Resolved> {
        self.candidates
            .iter()
            .enumerate()
            .find_map(|(tier, candidate)| {
                series
                    .get(&candidate.key)
                    .and_then(|values| values.get(hour))
                    .map(|value| Resolved {
                        key: candidate.key.clone(),
                        value: value * candidate.sign,
                        tier,
                    })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::HOURS;

    fn table(entries: &[(&str, f64)]) -> SeriesMap {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), [*value; HOURS]))
            .collect()
    }

    #[test]
    fn flip_swaps_both_sides() {
        assert_eq!(flip_link("NO1_SE3"), "SE3_NO1");
        assert_eq!(flip_link("SE_DE"), "DE_SE");
        assert_eq!(flip_link(&flip_link("FI_SE1")), "FI_SE1");
        assert_eq!(flip_link("FI"), "FI");
    }

    #[test]
    fn area_prefix_only_replaces_country_codes() {
        assert_eq!(area_prefixed_link("SE4", "SE_DE").as_deref(), Some("SE4_DE"));
        assert_eq!(area_prefixed_link("NO2", "NO_NL").as_deref(), Some("NO2_NL"));
        assert_eq!(area_prefixed_link("SE3", "SE3_FI"), None);
    }

    #[test]
    fn canonical_key_wins_over_flipped() {
        let series = table(&[("NO1_SE3", 40.0), ("SE3_NO1", -35.0)]);
        let hit = TieredLookup::canonical_or_flipped("NO1_SE3")
            .resolve(&series, 0)
            .unwrap();
        assert_eq!(hit.key, "NO1_SE3");
        assert_eq!(hit.value, 40.0);
        assert_eq!(hit.tier, 0);
    }

    #[test]
    fn flipped_key_inverts_sign() {
        let series = table(&[("SE3_NO1", 35.0)]);
        let hit = TieredLookup::canonical_or_flipped("NO1_SE3")
            .resolve(&series, 12)
            .unwrap();
        assert_eq!(hit.key, "SE3_NO1");
        assert_eq!(hit.value, -35.0);
        assert_eq!(hit.tier, 1);
    }

    #[test]
    fn miss_returns_none() {
        let series = table(&[("NO2_NO5", 1.0)]);
        assert!(TieredLookup::canonical_or_flipped("NO1_SE3")
            .resolve(&series, 0)
            .is_none());
        assert!(TieredLookup::canonical_or_flipped("NO2_NO5")
            .resolve(&series, HOURS)
            .is_none());
    }

    #[test]
    fn exchange_load_falls_back_to_area_prefix() {
        let entry = exchange_loads()
            .iter()
            .find(|e| e.link == "SE_DE")
            .unwrap();
        let series = table(&[("SE4_DE", 300.0)]);
        let hit = entry.lookup().resolve(&series, 3).unwrap();
        assert_eq!(hit.key, "SE4_DE");
        assert_eq!(hit.value, 300.0);
    }

    #[test]
    fn resolved_outlives_its_lookup() {
        let series = table(&[("SE3_FI", 100.0)]);
        let hits: Vec<Resolved> = exchange_loads()
            .iter()
            .filter_map(|entry| entry.lookup().resolve(&series, 0))
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "SE3_FI");
    }

    #[test]
    fn tables_are_complete() {
        assert_eq!(exchange_loads().len(), 13);
        assert_eq!(areas().len(), 10);
        assert_eq!(area("FI").unwrap().number, 31);
        assert_eq!(area("FI").unwrap().label, "FI1");
        assert!(area("DK1").is_none());
    }

    #[test]
    fn finnish_exchange_loads_net_against_fi() {
        let fi = exchange_loads().iter().find(|e| e.bus == 7010).unwrap();
        assert_eq!(fi.country(), Country::Finland);
        assert_eq!(fi.consumption_area(), "FI");
        let se = exchange_loads().iter().find(|e| e.bus == 3020).unwrap();
        assert_eq!(se.consumption_area(), "SE3");
        assert_eq!(se.label(), "Bus 3020, area SE3, HVDC link SE3-FI");
        let ac = exchange_loads().iter().find(|e| e.bus == 8500).unwrap();
        assert_eq!(ac.label(), "Bus 8500, area SE4, link SE4-DK2");
    }
}
