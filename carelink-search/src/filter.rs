//! Provider filtering
//!
//! Every active selection must match (logical AND). Output keeps input
//! order. Selections are plain strings as sent by the search form; `all`,
//! `any` or an empty value disables that filter.

use crate::mapper::ProviderRecord;

/// Subsidy selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubsidyFilter {
    #[default]
    Any,
    Yes,
    No,
}

impl SubsidyFilter {
    /// `any` (or nothing) disables the filter, `yes` requires subsidy,
    /// anything else requires no subsidy
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "any" | "all" => SubsidyFilter::Any,
            "yes" => SubsidyFilter::Yes,
            _ => SubsidyFilter::No,
        }
    }

    fn matches(&self, accepted: bool) -> bool {
        match self {
            SubsidyFilter::Any => true,
            SubsidyFilter::Yes => accepted,
            SubsidyFilter::No => !accepted,
        }
    }
}

/// Raw search-form selections
#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
    /// Free-text query matched against name and address
    pub q: Option<String>,
    pub age: Option<String>,
    pub facility_type: Option<String>,
    pub availability: Option<String>,
    pub radius: Option<String>,
    pub hours: Option<String>,
    pub subsidy: Option<String>,
}

fn active(selection: &Option<String>) -> Option<&str> {
    selection
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "all" && *s != "any")
}

/// Leading decimal number of `s` (after leading whitespace), if any
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut digits = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return None;
    }

    // optional exponent, only if it has digits
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

/// Distance check; unparsable distance or radius never excludes
fn within_radius(distance: &str, radius: &str) -> bool {
    let numeric: String = distance
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    match (parse_float_prefix(&numeric), parse_float_prefix(radius)) {
        (Some(km), Some(limit)) => km <= limit,
        _ => true,
    }
}

impl FilterSelection {
    /// Whether one provider satisfies every active selection
    pub fn matches(&self, provider: &ProviderRecord) -> bool {
        let query = self.q.as_deref().unwrap_or("").to_lowercase();
        let matches_query = query.is_empty()
            || provider.name.to_lowercase().contains(&query)
            || provider.address.to_lowercase().contains(&query);

        let matches_age = active(&self.age)
            .map_or(true, |age| provider.age_groups.iter().any(|g| g == age));
        let matches_type = active(&self.facility_type)
            .map_or(true, |t| provider.facility_type.as_str() == t);
        let matches_availability = active(&self.availability)
            .map_or(true, |a| provider.availability.as_str() == a);
        let matches_hours = active(&self.hours)
            .map_or(true, |h| provider.hours_type.as_str() == h);
        let matches_radius = active(&self.radius)
            .map_or(true, |r| within_radius(&provider.distance, r));
        let matches_subsidy = SubsidyFilter::parse(self.subsidy.as_deref().unwrap_or(""))
            .matches(provider.subsidy_accepted);

        matches_query
            && matches_age
            && matches_type
            && matches_availability
            && matches_hours
            && matches_subsidy
            && matches_radius
    }

    /// Matching providers, in input order
    pub fn apply<'a>(&self, providers: &'a [ProviderRecord]) -> Vec<&'a ProviderRecord> {
        providers.iter().filter(|p| self.matches(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::CsvRow;
    use crate::mapper::{columns, map_row, Availability, FacilityType};

    fn provider(id: u32, name: &str, address: &str, ages: &str, vacancies: &str) -> ProviderRecord {
        let row = CsvRow::from_pairs([
            (columns::NAME, name),
            (columns::ADDRESS, address),
            (columns::AGES_OF_CARE, ages),
            (columns::VACANCIES_0_TO_2, vacancies),
        ]);
        map_row(&row, id)
    }

    fn selection() -> FilterSelection {
        FilterSelection::default()
    }

    #[test]
    fn test_no_selection_matches_everything() {
        let providers = vec![
            provider(1, "A Daycare", "1 St", "Infant", "0"),
            provider(2, "B Daycare", "2 St", "Toddler", "3"),
        ];
        assert_eq!(selection().apply(&providers).len(), 2);

        let all = FilterSelection {
            age: Some("all".into()),
            facility_type: Some("all".into()),
            availability: Some("all".into()),
            radius: Some("all".into()),
            hours: Some("any".into()),
            subsidy: Some("any".into()),
            q: Some(String::new()),
        };
        assert_eq!(all.apply(&providers).len(), 2);
    }

    #[test]
    fn test_text_query_matches_name_or_address() {
        let providers = vec![
            provider(1, "Maple Kids", "10 Elm St", "Infant", "0"),
            provider(2, "Oak Tree", "5 Maple Ave", "Infant", "0"),
            provider(3, "Birch Care", "7 Pine Rd", "Infant", "0"),
        ];
        let s = FilterSelection {
            q: Some("MAPLE".into()),
            ..selection()
        };
        let ids: Vec<u32> = s.apply(&providers).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_filter_conjunction() {
        // p1 matches age, fails type; p2 matches both
        let p1 = provider(1, "Downtown Daycare", "1 Main St", "Infant", "1");
        let p2 = provider(2, "Sunny Home Daycare", "12 Oak St", "Infant", "1");
        assert_eq!(p1.facility_type, FacilityType::CenterBased);
        assert_eq!(p2.facility_type, FacilityType::HomeBased);

        let providers = vec![p1, p2];
        let s = FilterSelection {
            age: Some("Infant".into()),
            facility_type: Some("Home-based".into()),
            ..selection()
        };
        let out = s.apply(&providers);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 2);
    }

    #[test]
    fn test_age_requires_exact_label() {
        let providers = vec![provider(1, "A", "", "Infant, Nursery/Preschool", "0")];
        let hit = FilterSelection {
            age: Some("Preschool".into()),
            ..selection()
        };
        let miss = FilterSelection {
            age: Some("Pre".into()),
            ..selection()
        };
        assert_eq!(hit.apply(&providers).len(), 1);
        assert!(miss.apply(&providers).is_empty());
    }

    #[test]
    fn test_availability_filter() {
        let providers = vec![
            provider(1, "A", "", "", "2"),
            provider(2, "B", "", "", "0"),
        ];
        assert_eq!(providers[0].availability, Availability::Immediate);

        let s = FilterSelection {
            availability: Some("3+ months".into()),
            ..selection()
        };
        let ids: Vec<u32> = s.apply(&providers).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2]);

        let s = FilterSelection {
            availability: Some("1-3 months".into()),
            ..selection()
        };
        assert!(s.apply(&providers).is_empty());
    }

    #[test]
    fn test_subsidy_and_hours_filters() {
        let providers: Vec<ProviderRecord> = (1..=40)
            .map(|i| provider(i, &format!("Provider {}", i), "", "", "0"))
            .collect();

        let yes = FilterSelection {
            subsidy: Some("yes".into()),
            ..selection()
        };
        let no = FilterSelection {
            subsidy: Some("no".into()),
            ..selection()
        };
        let with = yes.apply(&providers);
        let without = no.apply(&providers);
        assert!(with.iter().all(|p| p.subsidy_accepted));
        assert!(without.iter().all(|p| !p.subsidy_accepted));
        assert_eq!(with.len() + without.len(), providers.len());

        let extended = FilterSelection {
            hours: Some("extended".into()),
            ..selection()
        };
        assert!(extended
            .apply(&providers)
            .iter()
            .all(|p| p.hours_type.as_str() == "extended"));
    }

    #[test]
    fn test_unknown_subsidy_value_means_no() {
        assert_eq!(SubsidyFilter::parse("maybe"), SubsidyFilter::No);
        assert_eq!(SubsidyFilter::parse("any"), SubsidyFilter::Any);
        assert_eq!(SubsidyFilter::parse("yes"), SubsidyFilter::Yes);
    }

    #[test]
    fn test_radius_is_noop_for_placeholder_distance() {
        let providers = vec![provider(1, "A", "", "", "0")];
        let s = FilterSelection {
            radius: Some("5".into()),
            ..selection()
        };
        assert_eq!(s.apply(&providers).len(), 1);
    }

    #[test]
    fn test_radius_with_numeric_distance() {
        let mut near = provider(1, "Near", "", "", "0");
        near.distance = "2.5 km".into();
        let mut far = provider(2, "Far", "", "", "0");
        far.distance = "12 km".into();
        let providers = vec![near, far];

        let s = FilterSelection {
            radius: Some("10".into()),
            ..selection()
        };
        let ids: Vec<u32> = s.apply(&providers).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1]);

        let bad = FilterSelection {
            radius: Some("far".into()),
            ..selection()
        };
        assert_eq!(bad.apply(&providers).len(), 2);
    }

    #[test]
    fn test_parse_float_prefix() {
        assert_eq!(parse_float_prefix("2.5"), Some(2.5));
        assert_eq!(parse_float_prefix(" 10km"), Some(10.0));
        assert_eq!(parse_float_prefix("1.2.3"), Some(1.2));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("1e2x"), Some(100.0));
        assert_eq!(parse_float_prefix("3e"), Some(3.0));
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix(""), None);
        assert_eq!(parse_float_prefix("—"), None);
    }

    #[test]
    fn test_output_preserves_input_order() {
        let providers: Vec<ProviderRecord> = [5, 3, 9, 1]
            .iter()
            .map(|&i| provider(i, "Same Name", "", "", "1"))
            .collect();
        let ids: Vec<u32> = selection().apply(&providers).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![5, 3, 9, 1]);
    }
}
