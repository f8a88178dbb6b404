//! Browse-side derivations over the listing collection: filtering, display order,
//! paging, facets and summary statistics. Everything here is pure.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use foodshare_core::{
    effective_status, Coordinates, DonorType, FoodCategory, Listing, ListingStatus,
    ParseEnumError,
};
use serde::{Deserialize, Serialize};

/// How a distance criterion treats listings that carry no distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingDistance {
    /// Fail any active distance threshold.
    #[default]
    Exclude,
    /// Pass any threshold, as if the listing were at distance zero.
    Include,
}

impl FromStr for MissingDistance {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclude" => Ok(MissingDistance::Exclude),
            "include" => Ok(MissingDistance::Include),
            _ => Err(ParseEnumError {
                kind: "missing distance policy",
                value: s.to_string(),
            }),
        }
    }
}

/// User-selected constraints. `None` on any field means "any"/"all".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub search_text: Option<String>,
    #[serde(default)]
    pub category: Option<FoodCategory>,
    #[serde(default)]
    pub max_distance_km: Option<f64>,
    #[serde(default)]
    pub donor_type: Option<DonorType>,
    #[serde(default)]
    pub missing_distance: MissingDistance,
}

impl FilterCriteria {
    fn search_needle(&self) -> Option<String> {
        self.search_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn is_unconstrained(&self) -> bool {
        self.search_needle().is_none()
            && self.category.is_none()
            && self.max_distance_km.is_none()
            && self.donor_type.is_none()
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        self.matches_with_needle(listing, self.search_needle().as_deref())
    }

    fn matches_with_needle(&self, listing: &Listing, needle: Option<&str>) -> bool {
        if let Some(needle) = needle {
            if !matches_text(listing, needle) {
                return false;
            }
        }
        if let Some(category) = self.category {
            if !listing.has_category(category) {
                return false;
            }
        }
        if let Some(max) = self.max_distance_km {
            let within = match listing.location.distance_km {
                Some(distance) => distance <= max,
                None => self.missing_distance == MissingDistance::Include,
            };
            if !within {
                return false;
            }
        }
        if let Some(donor_type) = self.donor_type {
            if listing.donor.donor_type != donor_type {
                return false;
            }
        }
        true
    }
}

// `needle` is already lowercased.
fn matches_text(listing: &Listing, needle: &str) -> bool {
    listing.title.to_lowercase().contains(needle)
        || listing.description.to_lowercase().contains(needle)
        || listing.donor.name.to_lowercase().contains(needle)
        || listing
            .items
            .iter()
            .any(|item| item.name.to_lowercase().contains(needle))
}

/// Listings matching every active criterion, in input order.
pub fn filter_listings<'a>(listings: &'a [Listing], criteria: &FilterCriteria) -> Vec<&'a Listing> {
    let needle = criteria.search_needle();
    listings
        .iter()
        .filter(|l| criteria.matches_with_needle(l, needle.as_deref()))
        .collect()
}

/// Listings whose effective status at `now` is available.
pub fn available_view(listings: &[Listing], now: DateTime<Utc>) -> Vec<&Listing> {
    listings
        .iter()
        .filter(|l| effective_status(l, now) == ListingStatus::Available)
        .collect()
}

/// Nearest first, listings without a distance last; ties go to the newest listing.
pub fn display_order(a: &Listing, b: &Listing) -> Ordering {
    let by_distance = match (a.location.distance_km, b.location.distance_km) {
        (Some(da), Some(db)) => da.total_cmp(&db),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_distance.then_with(|| b.created_at.cmp(&a.created_at))
}

pub fn sort_for_display(listings: &mut [&Listing]) {
    listings.sort_by(|a, b| display_order(a, b));
}

/// The default listing query: available view, filtered, in display order.
pub fn browse<'a>(
    listings: &'a [Listing],
    criteria: &FilterCriteria,
    now: DateTime<Utc>,
) -> Vec<&'a Listing> {
    let needle = criteria.search_needle();
    let mut out = listings
        .iter()
        .filter(|l| effective_status(l, now) == ListingStatus::Available)
        .filter(|l| criteria.matches_with_needle(l, needle.as_deref()))
        .collect::<Vec<_>>();
    sort_for_display(&mut out);
    out
}

/// Fills `distance_km` relative to `origin`, rounded to 0.1 km.
pub fn with_viewer_distances(mut listings: Vec<Listing>, origin: &Coordinates) -> Vec<Listing> {
    for listing in &mut listings {
        let km = origin.distance_km(&listing.location.coordinates);
        listing.location.distance_km = Some((km * 10.0).round() / 10.0);
    }
    listings
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// 1-based paging; the requested page is clamped into range.
pub fn paginate<T>(items: Vec<T>, page: Option<usize>, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.max(1).div_ceil(per_page);
    let page = page.unwrap_or(1).clamp(1, total_pages);
    let start = (page - 1) * per_page;
    let items = items.into_iter().skip(start).take(per_page).collect();
    Page {
        items,
        page,
        per_page,
        total_items,
        total_pages,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub category: FoodCategory,
    pub count: usize,
}

/// Listings per category; a listing counts once for each distinct category it carries.
pub fn category_facets(listings: &[&Listing]) -> Vec<FacetCount> {
    FoodCategory::ALL
        .into_iter()
        .map(|category| FacetCount {
            category,
            count: listings.iter().filter(|l| l.has_category(category)).count(),
        })
        .filter(|f| f.count > 0)
        .collect()
}

pub fn time_remaining_label(until: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let total_minutes = (until - now).num_minutes();
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 24 {
        let days = hours / 24;
        format!("{days} day{} left", if days > 1 { "s" } else { "" })
    } else if hours > 0 {
        format!("{hours}h {minutes}m left")
    } else if minutes > 0 {
        format!("{minutes}m left")
    } else {
        "Expired".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketStats {
    pub total_listings: usize,
    pub available: usize,
    pub claimed: usize,
    pub expired: usize,
    pub total_meals: u64,
    pub co2_saved_kg: u64,
    pub active_today: usize,
    pub partners: usize,
}

impl MarketStats {
    const CO2_KG_PER_MEAL: f64 = 2.3;

    pub fn compute(listings: &[Listing], partners: usize, now: DateTime<Utc>) -> Self {
        let mut stats = MarketStats {
            total_listings: listings.len(),
            available: 0,
            claimed: 0,
            expired: 0,
            total_meals: 0,
            co2_saved_kg: 0,
            active_today: 0,
            partners,
        };
        let day_ago = now - Duration::hours(24);
        for listing in listings {
            match effective_status(listing, now) {
                ListingStatus::Available => stats.available += 1,
                ListingStatus::Claimed => stats.claimed += 1,
                ListingStatus::Expired => stats.expired += 1,
            }
            stats.total_meals += listing.total_quantity();
            if listing.created_at > day_ago {
                stats.active_today += 1;
            }
        }
        stats.co2_saved_kg = (stats.total_meals as f64 * Self::CO2_KG_PER_MEAL).floor() as u64;
        stats
    }
}
