//! Provider mapping
//!
//! Converts ingested CSV rows into [`ProviderRecord`]s. Display fields the
//! export does not carry (rating, review count, hours, subsidy, features)
//! are derived from a hash of the provider name so they stay the same across
//! reloads without being stored.
//!
//! Hash contract: the hash is the 32-bit signed `h = h * 31 + unit` rolling
//! hash over UTF-16 code units, absolute value taken. `hours_type` and the
//! "Outdoor Play" feature both read `hash % 3`, so every extended-hours
//! provider lists Outdoor Play and no other provider does. That correlation
//! is part of the contract; changing it changes every derived listing.

use crate::ingest::CsvRow;
use serde::Serialize;

/// CSV column names
pub mod columns {
    pub const NAME: &str = "entries_name";
    pub const ADDRESS: &str = "entries_address";
    pub const PHONE: &str = "entries_phone";
    pub const AGES_OF_CARE: &str = "entries_agesOfCare";
    pub const VACANCIES_0_TO_2: &str = "entries_vacancies0to2";
    pub const VACANCIES_2_TO_6: &str = "entries_vacancies2to6";
    pub const VACANCIES_6_TO_12: &str = "entries_vacancies6to12";
}

pub const UNKNOWN_PROVIDER: &str = "Unknown Provider";
pub const DISTANCE_PLACEHOLDER: &str = "—";
pub const TUITION_RANGE: &str = "$600-1200/month";
pub const DESCRIPTION: &str =
    "Trusted childcare provider offering quality care and early learning.";
pub const DEFAULT_AGE_GROUP: &str = "Preschool";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FacilityType {
    #[serde(rename = "Home-based")]
    HomeBased,
    #[serde(rename = "Center-based")]
    CenterBased,
    #[serde(rename = "Nursery School")]
    NurserySchool,
    #[serde(rename = "Co-op Center")]
    CoopCenter,
}

impl FacilityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacilityType::HomeBased => "Home-based",
            FacilityType::CenterBased => "Center-based",
            FacilityType::NurserySchool => "Nursery School",
            FacilityType::CoopCenter => "Co-op Center",
        }
    }

    /// Classify by keywords in `text`; the first matching rule wins
    pub fn classify(text: &str) -> Self {
        let text = text.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| text.contains(w));

        if has(&["home", "family"]) {
            FacilityType::HomeBased
        } else if has(&["co-op", "coop", "cooperative"]) {
            FacilityType::CoopCenter
        } else if has(&["nursery", "preschool"]) {
            FacilityType::NurserySchool
        } else {
            FacilityType::CenterBased
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Availability {
    Immediate,
    #[serde(rename = "1-3 months")]
    OneToThreeMonths,
    #[serde(rename = "3+ months")]
    ThreePlusMonths,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Immediate => "Immediate",
            Availability::OneToThreeMonths => "1-3 months",
            Availability::ThreePlusMonths => "3+ months",
        }
    }

    /// CSV data only ever yields `Immediate` or `3+ months`
    pub fn from_open_spots(open_spots: u32) -> Self {
        if open_spots > 0 {
            Availability::Immediate
        } else {
            Availability::ThreePlusMonths
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HoursType {
    Standard,
    Extended,
    HalfDay,
}

impl HoursType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoursType::Standard => "standard",
            HoursType::Extended => "extended",
            HoursType::HalfDay => "half-day",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Feature {
    Licensed,
    Inclusive,
    #[serde(rename = "Outdoor Play")]
    OutdoorPlay,
}

/// One provider listing as presented to parents
///
/// Ids are 1-based row positions and only mean something within one load.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecord {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub facility_type: FacilityType,
    pub rating: f64,
    pub review_count: u32,
    pub distance: String,
    pub address: String,
    pub phone: String,
    pub age_groups: Vec<String>,
    pub tuition_range: String,
    pub availability: Availability,
    pub features: Vec<Feature>,
    pub description: String,
    pub open_spots: u32,
    pub is_favorite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    pub hours_type: HoursType,
    pub subsidy_accepted: bool,
}

/// 32-bit rolling hash of `s` over UTF-16 code units, absolute value
pub fn name_hash(s: &str) -> u32 {
    let mut h: i32 = 0;
    for unit in s.encode_utf16() {
        h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit));
    }
    h.unsigned_abs()
}

/// Values derived from the name hash
#[derive(Debug, Clone, PartialEq)]
pub struct HashDerived {
    pub rating: f64,
    pub review_count: u32,
    pub hours_type: HoursType,
    pub features: Vec<Feature>,
    pub subsidy_accepted: bool,
}

impl HashDerived {
    pub fn from_hash(h: u32) -> Self {
        let rating = 4.0 + f64::from(h % 95) / 100.0;

        let mut features = vec![Feature::Licensed];
        if h % 2 == 0 {
            features.push(Feature::Inclusive);
        }
        if h % 3 == 0 {
            features.push(Feature::OutdoorPlay);
        }

        let hours_type = match h % 3 {
            0 => HoursType::Extended,
            1 => HoursType::Standard,
            _ => HoursType::HalfDay,
        };

        Self {
            rating: (rating * 10.0).round() / 10.0,
            review_count: 5 + h % 80,
            hours_type,
            features,
            subsidy_accepted: h % 4 == 0,
        }
    }
}

/// Leading base-10 integer of `s`, or 0; negatives count as 0
fn parse_count(s: &str) -> u32 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if negative {
        return 0;
    }
    digits[..end].parse::<u64>().map_or(0, |n| n.min(u64::from(u32::MAX)) as u32)
}

/// `(204) 555-0123` becomes `+1 204 555 0123`; anything else is kept
pub fn normalize_phone(raw: &str) -> String {
    fn digits(s: &str, n: usize) -> Option<&str> {
        (s.len() == n && s.bytes().all(|b| b.is_ascii_digit())).then_some(s)
    }

    let parsed = (|| {
        let rest = raw.strip_prefix('(')?;
        let (area, rest) = rest.split_once(')')?;
        let rest = rest.trim_start();
        let (exchange, line) = rest.split_once('-')?;
        Some((digits(area, 3)?, digits(exchange, 3)?, digits(line, 4)?))
    })();

    match parsed {
        Some((area, exchange, line)) => format!("+1 {} {} {}", area, exchange, line),
        None => raw.to_string(),
    }
}

/// Split the ages-of-care cell into display labels
pub fn age_groups(raw: &str) -> Vec<String> {
    let groups: Vec<String> = raw
        .split([',', ';'])
        .map(str::trim)
        .map(|a| a.replacen("Nursery/Preschool", DEFAULT_AGE_GROUP, 1))
        .filter(|a| !a.is_empty())
        .collect();

    if groups.is_empty() {
        vec![DEFAULT_AGE_GROUP.to_string()]
    } else {
        groups
    }
}

/// Map one CSV row; missing or malformed cells fall back to defaults
pub fn map_row(row: &CsvRow, id: u32) -> ProviderRecord {
    let name = row.non_empty(columns::NAME).unwrap_or(UNKNOWN_PROVIDER).to_string();
    let address = row.get(columns::ADDRESS).replace('\n', ", ");
    let phone = normalize_phone(row.get(columns::PHONE));

    let open_spots = [
        columns::VACANCIES_0_TO_2,
        columns::VACANCIES_2_TO_6,
        columns::VACANCIES_6_TO_12,
    ]
    .iter()
    .map(|col| parse_count(row.get(col)))
    .fold(0u32, u32::saturating_add);

    let derived = HashDerived::from_hash(name_hash(&name));
    let facility_type = FacilityType::classify(&format!("{}{}", name, address));

    ProviderRecord {
        id,
        facility_type,
        rating: derived.rating,
        review_count: derived.review_count,
        distance: DISTANCE_PLACEHOLDER.to_string(),
        phone,
        age_groups: age_groups(row.get(columns::AGES_OF_CARE)),
        tuition_range: TUITION_RANGE.to_string(),
        availability: Availability::from_open_spots(open_spots),
        features: derived.features,
        description: DESCRIPTION.to_string(),
        open_spots,
        is_favorite: false,
        lat: None,
        lng: None,
        hours_type: derived.hours_type,
        subsidy_accepted: derived.subsidy_accepted,
        name,
        address,
    }
}

/// Map every row, numbering from 1
pub fn map_rows(rows: &[CsvRow]) -> Vec<ProviderRecord> {
    rows.iter()
        .zip(1u32..)
        .map(|(row, id)| map_row(row, id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> CsvRow {
        CsvRow::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_name_hash_matches_reference_values() {
        assert_eq!(name_hash(""), 0);
        assert_eq!(name_hash("a"), 97);
        assert_eq!(name_hash("ab"), 97 * 31 + 98);
        // wraps past i32::MAX
        let long = "Little Explorers Early Learning Centre";
        let mut h: i64 = 0;
        for unit in long.encode_utf16() {
            h = ((h * 31 + i64::from(unit)) as i32) as i64;
        }
        assert_eq!(name_hash(long), h.unsigned_abs() as u32);
    }

    #[test]
    fn test_hash_uses_utf16_units() {
        // U+1F600 is two UTF-16 units
        let mut h: i32 = 0;
        for unit in [0xD83Du16, 0xDE00u16] {
            h = h.wrapping_mul(31).wrapping_add(i32::from(unit));
        }
        assert_eq!(name_hash("\u{1F600}"), h.unsigned_abs());
    }

    #[test]
    fn test_hash_derived_values() {
        let d = HashDerived::from_hash(0);
        assert_eq!(d.rating, 4.0);
        assert_eq!(d.review_count, 5);
        assert_eq!(d.hours_type, HoursType::Extended);
        assert_eq!(
            d.features,
            vec![Feature::Licensed, Feature::Inclusive, Feature::OutdoorPlay]
        );
        assert!(d.subsidy_accepted);

        let d = HashDerived::from_hash(94);
        assert_eq!(d.rating, 4.9);
        assert_eq!(d.review_count, 5 + 14);
        assert_eq!(d.hours_type, HoursType::Standard);

        let d = HashDerived::from_hash(5);
        assert_eq!(d.hours_type, HoursType::HalfDay);
        assert_eq!(d.features, vec![Feature::Licensed]);
        assert!(!d.subsidy_accepted);
    }

    #[test]
    fn test_rating_range() {
        for h in 0..500u32 {
            let rating = HashDerived::from_hash(h).rating;
            assert!((4.0..=5.0).contains(&rating), "rating {} for {}", rating, h);
            assert_eq!((rating * 10.0).round() / 10.0, rating);
        }
    }

    #[test]
    fn test_extended_hours_and_outdoor_play_coincide() {
        for h in 0..300u32 {
            let d = HashDerived::from_hash(h);
            assert_eq!(
                d.hours_type == HoursType::Extended,
                d.features.contains(&Feature::OutdoorPlay)
            );
        }
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let r = row(&[(columns::NAME, "Maple Leaf Child Care"), (columns::ADDRESS, "1 Main St")]);
        let a = map_row(&r, 1);
        let b = map_row(&r, 1);
        assert_eq!(a.rating, b.rating);
        assert_eq!(a.review_count, b.review_count);
        assert_eq!(a.hours_type, b.hours_type);
        assert_eq!(a.features, b.features);
        assert_eq!(a.subsidy_accepted, b.subsidy_accepted);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_availability_from_vacancies() {
        let r = row(&[
            (columns::VACANCIES_0_TO_2, "2"),
            (columns::VACANCIES_2_TO_6, "0"),
            (columns::VACANCIES_6_TO_12, "1"),
        ]);
        let p = map_row(&r, 1);
        assert_eq!(p.open_spots, 3);
        assert_eq!(p.availability, Availability::Immediate);

        let r = row(&[
            (columns::VACANCIES_0_TO_2, "0"),
            (columns::VACANCIES_2_TO_6, "0"),
            (columns::VACANCIES_6_TO_12, "0"),
        ]);
        let p = map_row(&r, 1);
        assert_eq!(p.open_spots, 0);
        assert_eq!(p.availability, Availability::ThreePlusMonths);
    }

    #[test]
    fn test_vacancy_parsing_tolerates_junk() {
        assert_eq!(parse_count("4 spots"), 4);
        assert_eq!(parse_count("  7"), 7);
        assert_eq!(parse_count("2.9"), 2);
        assert_eq!(parse_count("n/a"), 0);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("-3"), 0);
    }

    #[test]
    fn test_type_precedence() {
        assert_eq!(
            FacilityType::classify("Home Co-op Kids"),
            FacilityType::HomeBased
        );
        assert_eq!(
            FacilityType::classify("Riverside Cooperative Nursery"),
            FacilityType::CoopCenter
        );
        assert_eq!(
            FacilityType::classify("Westview COOP"),
            FacilityType::CoopCenter
        );
        assert_eq!(
            FacilityType::classify("St. Mary's Preschool"),
            FacilityType::NurserySchool
        );
        assert_eq!(
            FacilityType::classify("Kids Kingdom Daycare"),
            FacilityType::CenterBased
        );
        // address participates
        assert_eq!(
            FacilityType::classify("Kids Kingdom12 Family Way"),
            FacilityType::HomeBased
        );
    }

    #[test]
    fn test_phone_normalization() {
        assert_eq!(normalize_phone("(204) 555-0123"), "+1 204 555 0123");
        assert_eq!(normalize_phone("(204)555-0123"), "+1 204 555 0123");
        assert_eq!(normalize_phone("204-555-0123"), "204-555-0123");
        assert_eq!(normalize_phone("(204) 555-01234"), "(204) 555-01234");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn test_age_groups() {
        assert_eq!(age_groups("Infant, Nursery/Preschool"), vec!["Infant", "Preschool"]);
        assert_eq!(age_groups("Toddler;School Age"), vec!["Toddler", "School Age"]);
        assert_eq!(age_groups(" , "), vec!["Preschool"]);
        assert_eq!(age_groups(""), vec!["Preschool"]);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let p = map_row(&CsvRow::default(), 7);
        assert_eq!(p.id, 7);
        assert_eq!(p.name, UNKNOWN_PROVIDER);
        assert_eq!(p.distance, DISTANCE_PLACEHOLDER);
        assert_eq!(p.tuition_range, TUITION_RANGE);
        assert_eq!(p.age_groups, vec!["Preschool"]);
        assert!(!p.is_favorite);
        assert!(p.lat.is_none());
        assert!(p.features.contains(&Feature::Licensed));
    }

    #[test]
    fn test_address_newlines_flattened() {
        let r = row(&[(columns::ADDRESS, "12 Oak St\nWinnipeg MB")]);
        assert_eq!(map_row(&r, 1).address, "12 Oak St, Winnipeg MB");
    }

    #[test]
    fn test_serialized_shape() {
        let r = row(&[(columns::NAME, "Sunny Home Daycare")]);
        let json = serde_json::to_value(map_row(&r, 1)).unwrap();
        assert_eq!(json["type"], "Home-based");
        assert_eq!(json["availability"], "3+ months");
        assert!(json["hoursType"].is_string());
        assert!(json.get("lat").is_none());
        assert!(json["reviewCount"].is_number());
    }
}
