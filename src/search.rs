//! Search/Filter Engine
//!
//! Narrows the property list by the query-string filters, orders it and cuts
//! one page out of it. Filtering happens after the store has applied the
//! location text search.

use crate::db::Store;
use crate::models::Property;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, error};

/// Sentinel meaning "no region/type/status/location constraint"
pub const ALL: &str = "all";

/// Sentinel meaning "no bedroom/bathroom constraint"
pub const ANY: &str = "any";

pub const GRID_PAGE_SIZE: usize = 9;
pub const LIST_PAGE_SIZE: usize = 5;

/// Search parameters as they arrive on the query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub region: Option<String>,
    /// Repeatable; any member matching is enough
    #[serde(default, rename = "type")]
    pub types: Vec<String>,
    /// Repeatable; checked against primary and secondary status
    #[serde(default)]
    pub status: Vec<String>,
    /// Kept as text so a malformed bound reads as unset instead of failing the query
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
    /// Free-text location, pushed down to the store
    pub location: Option<String>,
    pub sort: Option<String>,
    pub view: Option<String>,
    /// 1-indexed; malformed values read as the first page
    pub page: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

impl SortOrder {
    /// Unknown values fall back to newest first
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("price-asc") => SortOrder::PriceAsc,
            Some("price-desc") => SortOrder::PriceDesc,
            _ => SortOrder::Newest,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("list") => ViewMode::List,
            _ => ViewMode::Grid,
        }
    }

    pub fn page_size(&self) -> usize {
        match self {
            ViewMode::Grid => GRID_PAGE_SIZE,
            ViewMode::List => LIST_PAGE_SIZE,
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub items: Vec<Property>,
    /// Number of records matching the filters, across all pages
    pub total: usize,
    pub page: i64,
    pub page_size: usize,
    pub total_pages: usize,
}

fn is_set(value: Option<&str>, sentinel: &str) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != sentinel)
        .map(str::to_string)
}

/// Exact-count filter; unparseable values are treated as unset
fn count_filter(value: Option<&str>) -> Option<i32> {
    is_set(value, ANY).and_then(|v| v.parse().ok())
}

/// A price bound only counts when it parses to a positive finite number
fn price_bound(value: Option<&str>) -> Option<f64> {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}

impl SearchFilters {
    /// Location term for the store, if any
    pub fn location_term(&self) -> Option<String> {
        is_set(self.location.as_deref(), ALL)
    }

    pub fn sort_order(&self) -> SortOrder {
        SortOrder::parse(self.sort.as_deref())
    }

    pub fn view_mode(&self) -> ViewMode {
        ViewMode::parse(self.view.as_deref())
    }

    pub fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(1)
    }

    /// True when every active predicate holds for `property`
    pub fn matches(&self, property: &Property) -> bool {
        let region_match = match is_set(self.region.as_deref(), ALL) {
            Some(region) => property.region.as_str() == region,
            None => true,
        };

        let type_match = self.types.is_empty()
            || self.types.iter().any(|t| t == ALL || *t == property.property_type);

        let status_match = self.status.is_empty()
            || self.status.iter().any(|s| {
                s == ALL || *s == property.status || property.dubai_status.as_deref() == Some(s.as_str())
            });

        let min_price_match = price_bound(self.min_price.as_deref()).map_or(true, |min| property.price >= min);
        let max_price_match = price_bound(self.max_price.as_deref()).map_or(true, |max| property.price <= max);

        let bedrooms_match =
            count_filter(self.bedrooms.as_deref()).map_or(true, |n| property.bedrooms == n);
        let bathrooms_match =
            count_filter(self.bathrooms.as_deref()).map_or(true, |n| property.bathrooms == n);

        region_match
            && type_match
            && status_match
            && min_price_match
            && max_price_match
            && bedrooms_match
            && bathrooms_match
    }
}

/// Order properties in place. Stable for every order.
pub fn sort_properties(properties: &mut [Property], order: SortOrder) {
    match order {
        SortOrder::PriceAsc => properties.sort_by(|a, b| a.price.total_cmp(&b.price)),
        SortOrder::PriceDesc => properties.sort_by(|a, b| b.price.total_cmp(&a.price)),
        SortOrder::Newest => sort_newest_first(properties),
    }
}

/// Records without a creation time stay in their slot; the timestamped ones
/// are reordered newest first among the remaining slots.
fn sort_newest_first(properties: &mut [Property]) {
    let slots: Vec<usize> = properties
        .iter()
        .enumerate()
        .filter(|(_, p)| p.created_at.is_some())
        .map(|(i, _)| i)
        .collect();

    let mut dated: Vec<Property> = slots.iter().map(|&i| properties[i].clone()).collect();
    dated.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        _ => Ordering::Equal,
    });

    for (slot, property) in slots.into_iter().zip(dated) {
        properties[slot] = property;
    }
}

/// Number of pages needed for `total` records
pub fn total_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Slice `[(page-1)*size, page*size)`; empty for pages out of range
pub fn paginate(items: &[Property], page: i64, page_size: usize) -> Vec<Property> {
    if page < 1 || page_size == 0 {
        return Vec::new();
    }
    let Ok(index) = usize::try_from(page - 1) else {
        return Vec::new();
    };
    let start = index.saturating_mul(page_size);
    if start >= items.len() {
        return Vec::new();
    }
    let end = start.saturating_add(page_size).min(items.len());
    items[start..end].to_vec()
}

/// Filter, sort and paginate an already loaded list
pub fn search(properties: Vec<Property>, filters: &SearchFilters) -> SearchPage {
    let mut matched: Vec<Property> = properties.into_iter().filter(|p| filters.matches(p)).collect();
    sort_properties(&mut matched, filters.sort_order());

    let page_size = filters.view_mode().page_size();
    let page = filters.page();
    SearchPage {
        items: paginate(&matched, page, page_size),
        total: matched.len(),
        page,
        page_size,
        total_pages: total_pages(matched.len(), page_size),
    }
}

/// Load from the store and run the search. A load failure is logged and
/// yields an empty page.
pub async fn run_search(store: &dyn Store, filters: &SearchFilters) -> SearchPage {
    let location = filters.location_term();
    let properties = match store.list_properties(location.as_deref()).await {
        Ok(properties) => properties,
        Err(e) => {
            error!("Failed to load properties for search: {}", e);
            Vec::new()
        }
    };

    let page = search(properties, filters);
    debug!(
        "Search matched {} properties (page {} of {})",
        page.total, page.page, page.total_pages
    );
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::fixtures::new_property;
    use crate::models::Region;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn listing(
        title: &str,
        region: Region,
        kind: &str,
        status: &str,
        dubai_status: Option<&str>,
        price: f64,
        bedrooms: i32,
    ) -> Property {
        let mut new = new_property(title, "Somewhere", region);
        new.property_type = kind.to_string();
        new.status = status.to_string();
        new.dubai_status = dubai_status.map(str::to_string);
        new.price = price;
        new.bedrooms = bedrooms;
        new.into_property(Uuid::new_v4(), None)
    }

    fn catalogue() -> Vec<Property> {
        vec![
            listing("Marina flat", Region::Dubai, "Apartment", "Buy", Some("Off-plan"), 1_200_000.0, 2),
            listing("Palm villa", Region::Dubai, "Villa", "Buy", Some("Ready"), 9_000_000.0, 5),
            listing("JBR rental", Region::Dubai, "Apartment", "Rent", None, 120_000.0, 1),
            listing("Chelsea house", Region::London, "Townhouse", "Buy", None, 3_500_000.0, 4),
            listing("Soho studio", Region::London, "Apartment", "Rent", None, 30_000.0, 1),
        ]
    }

    fn titles(items: &[Property]) -> Vec<&str> {
        items.iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn test_no_filters_match_everything() {
        let filters = SearchFilters::default();
        assert!(catalogue().iter().all(|p| filters.matches(p)));

        let sentinels = SearchFilters {
            region: Some("all".into()),
            types: vec!["all".into()],
            status: vec!["all".into()],
            bedrooms: Some("any".into()),
            bathrooms: Some("any".into()),
            min_price: Some("0".into()),
            max_price: Some("-5".into()),
            ..Default::default()
        };
        assert!(catalogue().iter().all(|p| sentinels.matches(p)));
    }

    #[test]
    fn test_filtered_set_is_subset_with_all_predicates() {
        let filters = SearchFilters {
            region: Some("Dubai".into()),
            types: vec!["Apartment".into(), "Villa".into()],
            min_price: Some("500000".into()),
            ..Default::default()
        };
        let all = catalogue();
        let page = search(all.clone(), &filters);

        assert_eq!(titles(&page.items), vec!["Marina flat", "Palm villa"]);
        for property in &all {
            let expected = property.region == Region::Dubai
                && (property.property_type == "Apartment" || property.property_type == "Villa")
                && property.price >= 500_000.0;
            assert_eq!(filters.matches(property), expected, "{}", property.title);
        }
    }

    #[test]
    fn test_status_matches_secondary_status() {
        let filters = SearchFilters {
            status: vec!["Off-plan".into()],
            ..Default::default()
        };
        let page = search(catalogue(), &filters);
        assert_eq!(titles(&page.items), vec!["Marina flat"]);

        let filters = SearchFilters {
            status: vec!["Rent".into(), "Ready".into()],
            ..Default::default()
        };
        assert_eq!(search(catalogue(), &filters).total, 3);
    }

    #[test]
    fn test_bedroom_count_is_exact() {
        let filters = SearchFilters {
            bedrooms: Some("1".into()),
            ..Default::default()
        };
        let page = search(catalogue(), &filters);
        assert_eq!(titles(&page.items), vec!["JBR rental", "Soho studio"]);
    }

    #[test]
    fn test_max_price_is_inclusive() {
        let filters = SearchFilters {
            max_price: Some("1200000".into()),
            ..Default::default()
        };
        let page = search(catalogue(), &filters);
        assert_eq!(titles(&page.items), vec!["Marina flat", "JBR rental", "Soho studio"]);

        let between = SearchFilters {
            min_price: Some("1200000".into()),
            max_price: Some("3500000".into()),
            ..Default::default()
        };
        let page = search(catalogue(), &between);
        assert_eq!(titles(&page.items), vec!["Marina flat", "Chelsea house"]);
    }

    #[test]
    fn test_bathroom_count_is_exact() {
        let mut items = catalogue();
        items[2].bathrooms = 1;
        items[4].bathrooms = 3;

        let filters = SearchFilters {
            bathrooms: Some("2".into()),
            ..Default::default()
        };
        let page = search(items, &filters);
        assert_eq!(titles(&page.items), vec!["Marina flat", "Palm villa", "Chelsea house"]);
    }

    #[test]
    fn test_malformed_numbers_read_as_unset() {
        let filters: SearchFilters =
            serde_html_form::from_str("minPrice=abc&maxPrice=1e3x&page=x&bedrooms=two").unwrap();
        assert_eq!(filters.page(), 1);

        let page = search(catalogue(), &filters);
        assert_eq!(page.page, 1);
        assert_eq!(page.total, 5);

        let nan = SearchFilters {
            min_price: Some("NaN".into()),
            max_price: Some("inf".into()),
            ..Default::default()
        };
        assert_eq!(search(catalogue(), &nan).total, 5);
    }

    #[test]
    fn test_price_sorts_are_ordered() {
        let asc = search(
            catalogue(),
            &SearchFilters {
                sort: Some("price-asc".into()),
                ..Default::default()
            },
        );
        assert!(asc.items.windows(2).all(|w| w[0].price <= w[1].price));

        let desc = search(
            catalogue(),
            &SearchFilters {
                sort: Some("price-desc".into()),
                ..Default::default()
            },
        );
        assert!(desc.items.windows(2).all(|w| w[0].price >= w[1].price));
    }

    #[test]
    fn test_newest_keeps_undated_records_in_place() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut items = catalogue();
        items[0].created_at = Some(base);
        items[1].created_at = None;
        items[2].created_at = Some(base + Duration::days(2));
        items[3].created_at = Some(base + Duration::days(1));
        items[4].created_at = None;

        sort_properties(&mut items, SortOrder::Newest);
        assert_eq!(
            titles(&items),
            vec!["JBR rental", "Palm villa", "Chelsea house", "Marina flat", "Soho studio"]
        );
    }

    #[test]
    fn test_pages_partition_the_filtered_list() {
        let mut all = Vec::new();
        for i in 0..23 {
            all.push(listing(&format!("Listing {}", i), Region::London, "Apartment", "Buy", None, 1000.0 + i as f64, 1));
        }

        for (view, size) in [("grid", GRID_PAGE_SIZE), ("list", LIST_PAGE_SIZE)] {
            let first = search(
                all.clone(),
                &SearchFilters {
                    view: Some(view.into()),
                    sort: Some("price-asc".into()),
                    ..Default::default()
                },
            );
            assert_eq!(first.page_size, size);
            assert_eq!(first.total_pages, 23usize.div_ceil(size));

            let mut seen = Vec::new();
            for page in 1..=first.total_pages as i64 {
                let result = search(
                    all.clone(),
                    &SearchFilters {
                        view: Some(view.into()),
                        sort: Some("price-asc".into()),
                        page: Some(page.to_string()),
                        ..Default::default()
                    },
                );
                assert!(result.items.len() <= size);
                seen.extend(result.items);
            }
            assert_eq!(seen.len(), 23);
            assert!(seen.windows(2).all(|w| w[0].price < w[1].price));
        }
    }

    #[test]
    fn test_out_of_range_pages_are_empty() {
        let items = catalogue();
        assert!(paginate(&items, 2, GRID_PAGE_SIZE).is_empty());
        assert!(paginate(&items, 0, GRID_PAGE_SIZE).is_empty());
        assert!(paginate(&items, -3, GRID_PAGE_SIZE).is_empty());

        let page = search(
            items,
            &SearchFilters {
                page: Some("7".into()),
                ..Default::default()
            },
        );
        assert_eq!(page.page, 7);
        assert_eq!(page.total, 5);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_query_string_decodes_repeated_keys() {
        let filters: SearchFilters = serde_html_form::from_str(
            "region=Dubai&type=Villa&type=Apartment&status=Buy&minPrice=&bedrooms=any&view=list&page=2",
        )
        .unwrap();
        assert_eq!(filters.types, vec!["Villa".to_string(), "Apartment".to_string()]);
        assert_eq!(filters.status, vec!["Buy".to_string()]);
        assert_eq!(price_bound(filters.min_price.as_deref()), None);
        assert_eq!(filters.view_mode(), ViewMode::List);
        assert_eq!(filters.page(), 2);
    }

    #[tokio::test]
    async fn test_location_is_pushed_down_to_store() {
        let store = MemoryStore::new();
        store
            .insert_property(&new_property("Marina flat", "Dubai Marina", Region::Dubai))
            .await
            .unwrap();
        store
            .insert_property(&new_property("Kensington flat", "Kensington", Region::London))
            .await
            .unwrap();

        let filters = SearchFilters {
            location: Some("marina".into()),
            ..Default::default()
        };
        let page = run_search(&store, &filters).await;
        assert_eq!(titles(&page.items), vec!["Marina flat"]);

        let filters = SearchFilters {
            location: Some("all".into()),
            ..Default::default()
        };
        assert_eq!(run_search(&store, &filters).await.total, 2);
    }

    #[tokio::test]
    async fn test_load_failure_is_empty_result() {
        let store = MemoryStore::new();
        store
            .insert_property(&new_property("Marina flat", "Dubai Marina", Region::Dubai))
            .await
            .unwrap();
        store.set_unavailable(true);

        let page = run_search(&store, &SearchFilters::default()).await;
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
    }
}
