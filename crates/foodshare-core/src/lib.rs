//! Core domain model for the FoodShare marketplace: listings, donors, partners and
//! notifications, plus the validation rules every submission passes through.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Opaque listing identifier, immutable once assigned by the store.
    ListingId
);
string_id!(
    /// User identifier handed in by the auth layer. Never interpreted here.
    UserId
);
string_id!(PartnerId);
string_id!(NotificationId);

/// Source of the current time. Everything that derives expiry takes its `now` from here.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn normalize_token(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FoodCategory {
    #[serde(rename = "Fresh Produce")]
    FreshProduce,
    #[serde(rename = "Dairy Products")]
    DairyProducts,
    #[serde(rename = "Baked Goods")]
    BakedGoods,
    #[serde(rename = "Prepared Meals")]
    PreparedMeals,
    #[serde(rename = "Canned Goods")]
    CannedGoods,
    #[serde(rename = "Frozen Items")]
    FrozenItems,
    #[serde(rename = "Beverages")]
    Beverages,
    #[serde(rename = "Snacks")]
    Snacks,
    #[serde(rename = "Other")]
    Other,
}

impl FoodCategory {
    pub const ALL: [FoodCategory; 9] = [
        FoodCategory::FreshProduce,
        FoodCategory::DairyProducts,
        FoodCategory::BakedGoods,
        FoodCategory::PreparedMeals,
        FoodCategory::CannedGoods,
        FoodCategory::FrozenItems,
        FoodCategory::Beverages,
        FoodCategory::Snacks,
        FoodCategory::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FoodCategory::FreshProduce => "Fresh Produce",
            FoodCategory::DairyProducts => "Dairy Products",
            FoodCategory::BakedGoods => "Baked Goods",
            FoodCategory::PreparedMeals => "Prepared Meals",
            FoodCategory::CannedGoods => "Canned Goods",
            FoodCategory::FrozenItems => "Frozen Items",
            FoodCategory::Beverages => "Beverages",
            FoodCategory::Snacks => "Snacks",
            FoodCategory::Other => "Other",
        }
    }
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts the display label in any case and with any separators ("Baked Goods",
/// "baked-goods", "baked_goods").
impl FromStr for FoodCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_token(s);
        FoodCategory::ALL
            .into_iter()
            .find(|c| normalize_token(c.label()) == wanted)
            .ok_or_else(|| ParseEnumError {
                kind: "food category",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonorType {
    Individual,
    Family,
    Business,
    Organization,
}

impl DonorType {
    pub const ALL: [DonorType; 4] = [
        DonorType::Individual,
        DonorType::Family,
        DonorType::Business,
        DonorType::Organization,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DonorType::Individual => "individual",
            DonorType::Family => "family",
            DonorType::Business => "business",
            DonorType::Organization => "organization",
        }
    }
}

impl fmt::Display for DonorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DonorType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_token(s);
        DonorType::ALL
            .into_iter()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| ParseEnumError {
                kind: "donor type",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCondition {
    Excellent,
    Good,
    Fair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Available,
    Claimed,
    Expired,
}

impl ListingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingStatus::Available => "available",
            ListingStatus::Claimed => "claimed",
            ListingStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored lifecycle state. The claimant and claim time only exist on `Claimed`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ListingState {
    #[default]
    Available,
    Claimed {
        claimed_by: UserId,
        claimed_at: DateTime<Utc>,
    },
    Expired,
}

impl ListingState {
    pub fn status(&self) -> ListingStatus {
        match self {
            ListingState::Available => ListingStatus::Available,
            ListingState::Claimed { .. } => ListingStatus::Claimed,
            ListingState::Expired => ListingStatus::Expired,
        }
    }
}

/// Denormalized copy of the donor taken when the listing was submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorSnapshot {
    pub id: UserId,
    pub name: String,
    pub donor_type: DonorType,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    pub category: FoodCategory,
    pub quantity: u32,
    pub unit: String,
    pub condition: ItemCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Great-circle distance (haversine) in kilometres.
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * Self::EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub coordinates: Coordinates,
    /// Distance from the current viewer, filled in per query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Canonical listing as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    pub donor: DonorSnapshot,
    pub items: Vec<FoodItem>,
    pub location: Location,
    pub available_from: DateTime<Utc>,
    pub available_until: DateTime<Utc>,
    pub contact_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub state: ListingState,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Listing {
    pub fn status(&self) -> ListingStatus {
        self.state.status()
    }

    pub fn claimed_by(&self) -> Option<&UserId> {
        match &self.state {
            ListingState::Claimed { claimed_by, .. } => Some(claimed_by),
            _ => None,
        }
    }

    pub fn claimed_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            ListingState::Claimed { claimed_at, .. } => Some(*claimed_at),
            _ => None,
        }
    }

    pub fn effective_status(&self, now: DateTime<Utc>) -> ListingStatus {
        effective_status(self, now)
    }

    pub fn has_category(&self, category: FoodCategory) -> bool {
        self.items.iter().any(|item| item.category == category)
    }

    /// Sum of item quantities regardless of unit.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_listing_fields(
            &self.title,
            &self.donor,
            &self.items,
            &self.location,
            self.available_from,
            self.available_until,
        )
    }
}

/// The one place listing expiry is derived. A stored `Available` listing whose window
/// has closed reads as `Expired`.
pub fn effective_status(listing: &Listing, now: DateTime<Utc>) -> ListingStatus {
    match listing.state {
        ListingState::Available if now > listing.available_until => ListingStatus::Expired,
        ref state => state.status(),
    }
}

/// Donor submission payload: everything but the store-assigned id, creation time and
/// state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub donor: DonorSnapshot,
    pub items: Vec<FoodItem>,
    pub location: Location,
    pub available_from: DateTime<Utc>,
    pub available_until: DateTime<Utc>,
    pub contact_method: String,
    #[serde(default)]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl ListingDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_listing_fields(
            &self.title,
            &self.donor,
            &self.items,
            &self.location,
            self.available_from,
            self.available_until,
        )
    }

    pub fn into_listing(self, id: ListingId, created_at: DateTime<Utc>) -> Listing {
        Listing {
            id,
            title: self.title,
            description: self.description,
            donor: self.donor,
            items: self.items,
            location: self.location,
            available_from: self.available_from,
            available_until: self.available_until,
            contact_method: self.contact_method,
            special_instructions: self.special_instructions,
            image_url: self.image_url,
            state: ListingState::Available,
            created_at,
            tags: self
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("donor name must not be empty")]
    EmptyDonorName,
    #[error("donor rating {0} is outside 0..=5")]
    DonorRating(f64),
    #[error("a listing needs at least one food item")]
    NoItems,
    #[error("item #{index} has an empty name")]
    EmptyItemName { index: usize },
    #[error("item #{index} has zero quantity")]
    ZeroQuantity { index: usize },
    #[error("item #{index} has an empty unit")]
    EmptyUnit { index: usize },
    #[error("availability window is empty: from {from} is not before until {until}")]
    AvailabilityWindow {
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    },
    #[error("coordinates out of range: lat {lat}, lng {lng}")]
    Coordinates { lat: f64, lng: f64 },
    #[error("pickup address must not be empty")]
    EmptyAddress,
    #[error("partner name must not be empty")]
    EmptyPartnerName,
    #[error("invalid contact email: {0}")]
    InvalidEmail(String),
    #[error("contact phone must not be empty")]
    EmptyPhone,
}

fn validate_listing_fields(
    title: &str,
    donor: &DonorSnapshot,
    items: &[FoodItem],
    location: &Location,
    available_from: DateTime<Utc>,
    available_until: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if donor.name.trim().is_empty() {
        return Err(ValidationError::EmptyDonorName);
    }
    if !(0.0..=5.0).contains(&donor.rating) {
        return Err(ValidationError::DonorRating(donor.rating));
    }
    if items.is_empty() {
        return Err(ValidationError::NoItems);
    }
    for (index, item) in items.iter().enumerate() {
        if item.name.trim().is_empty() {
            return Err(ValidationError::EmptyItemName { index });
        }
        if item.quantity == 0 {
            return Err(ValidationError::ZeroQuantity { index });
        }
        if item.unit.trim().is_empty() {
            return Err(ValidationError::EmptyUnit { index });
        }
    }
    if available_from >= available_until {
        return Err(ValidationError::AvailabilityWindow {
            from: available_from,
            until: available_until,
        });
    }
    if location.address.trim().is_empty() {
        return Err(ValidationError::EmptyAddress);
    }
    if !location.coordinates.is_valid() {
        return Err(ValidationError::Coordinates {
            lat: location.coordinates.lat,
            lng: location.coordinates.lng,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerType {
    Restaurant,
    Grocery,
    Bakery,
    Farm,
    Catering,
    Nonprofit,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerLocation {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerContact {
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub name: String,
    pub partner_type: PartnerType,
    pub description: String,
    pub location: PartnerLocation,
    pub contact: PartnerContact,
    pub business_hours: String,
    pub verified: bool,
    pub joined_at: DateTime<Utc>,
    pub total_donations: u32,
    pub rating: f64,
    pub status: PartnerStatus,
}

/// Partner registration form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerApplication {
    pub name: String,
    pub partner_type: PartnerType,
    #[serde(default)]
    pub description: String,
    pub location: PartnerLocation,
    pub contact: PartnerContact,
    #[serde(default)]
    pub business_hours: String,
}

impl PartnerApplication {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyPartnerName);
        }
        let email = self.contact.email.trim();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
        if !well_formed {
            return Err(ValidationError::InvalidEmail(self.contact.email.clone()));
        }
        if self.contact.phone.trim().is_empty() {
            return Err(ValidationError::EmptyPhone);
        }
        if self.location.address.trim().is_empty() {
            return Err(ValidationError::EmptyAddress);
        }
        Ok(())
    }

    /// New partners start active and unverified, with no donations and a 5.0 rating.
    pub fn into_partner(self, id: PartnerId, joined_at: DateTime<Utc>) -> Partner {
        Partner {
            id,
            name: self.name,
            partner_type: self.partner_type,
            description: self.description,
            location: self.location,
            contact: self.contact,
            business_hours: self.business_hours,
            verified: false,
            joined_at,
            total_donations: 0,
            rating: 5.0,
            status: PartnerStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 8, h, 0, 0).single().unwrap()
    }

    fn draft() -> ListingDraft {
        ListingDraft {
            title: "Fresh Bakery Items".into(),
            description: "Bread and pastries".into(),
            donor: DonorSnapshot {
                id: "2".into(),
                name: "Green Leaf Cafe".into(),
                donor_type: DonorType::Business,
                rating: 4.8,
            },
            items: vec![FoodItem {
                name: "Sourdough Bread".into(),
                category: FoodCategory::BakedGoods,
                quantity: 6,
                unit: "loaves".into(),
                condition: ItemCondition::Excellent,
                expiry_date: None,
            }],
            location: Location {
                address: "123 Main St, Downtown".into(),
                coordinates: Coordinates { lat: 40.7128, lng: -74.006 },
                distance_km: Some(0.8),
            },
            available_from: ts(18),
            available_until: ts(21),
            contact_method: "phone".into(),
            special_instructions: None,
            image_url: None,
            tags: ["bakery".to_string(), " ".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn effective_status_derives_expiry_from_window() {
        let listing = draft().into_listing(ListingId::new("1"), ts(17));
        assert_eq!(listing.effective_status(ts(19)), ListingStatus::Available);
        assert_eq!(listing.effective_status(ts(21)), ListingStatus::Available);
        assert_eq!(
            listing.effective_status(ts(21) + Duration::seconds(1)),
            ListingStatus::Expired
        );
    }

    #[test]
    fn claimed_state_stays_claimed_after_window() {
        let mut listing = draft().into_listing(ListingId::new("1"), ts(17));
        listing.state = ListingState::Claimed {
            claimed_by: "u1".into(),
            claimed_at: ts(19),
        };
        assert_eq!(listing.effective_status(ts(23)), ListingStatus::Claimed);
        assert_eq!(listing.claimed_by(), Some(&UserId::new("u1")));
        assert_eq!(listing.claimed_at(), Some(ts(19)));
    }

    #[test]
    fn validation_rejects_empty_items_and_inverted_window() {
        let mut d = draft();
        d.items.clear();
        assert_eq!(d.validate(), Err(ValidationError::NoItems));

        let mut d = draft();
        d.available_until = d.available_from;
        assert!(matches!(
            d.validate(),
            Err(ValidationError::AvailabilityWindow { .. })
        ));

        let mut d = draft();
        d.items[0].quantity = 0;
        assert_eq!(d.validate(), Err(ValidationError::ZeroQuantity { index: 0 }));

        assert_eq!(draft().validate(), Ok(()));
    }

    #[test]
    fn blank_tags_are_dropped_on_conversion() {
        let listing = draft().into_listing(ListingId::new("1"), ts(17));
        assert_eq!(listing.tags.len(), 1);
        assert!(listing.tags.contains("bakery"));
    }

    #[test]
    fn category_parses_from_loose_spellings() {
        assert_eq!("Baked Goods".parse::<FoodCategory>(), Ok(FoodCategory::BakedGoods));
        assert_eq!("baked-goods".parse::<FoodCategory>(), Ok(FoodCategory::BakedGoods));
        assert_eq!("FRESH_PRODUCE".parse::<FoodCategory>(), Ok(FoodCategory::FreshProduce));
        assert!("candy".parse::<FoodCategory>().is_err());
        assert_eq!("Business".parse::<DonorType>(), Ok(DonorType::Business));
    }

    #[test]
    fn haversine_distance_is_plausible() {
        let downtown = Coordinates { lat: 40.7128, lng: -74.006 };
        let midtown = Coordinates { lat: 40.7589, lng: -73.9851 };
        let d = downtown.distance_km(&midtown);
        assert!((5.0..5.6).contains(&d), "distance was {d}");
        assert_eq!(downtown.distance_km(&downtown), 0.0);
    }

    #[test]
    fn state_serializes_with_status_tag() {
        let state = ListingState::Claimed {
            claimed_by: "u1".into(),
            claimed_at: ts(19),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "claimed");
        assert_eq!(json["claimed_by"], "u1");
        let available = serde_json::to_value(ListingState::Available).unwrap();
        assert_eq!(available, serde_json::json!({ "status": "available" }));
    }

    #[test]
    fn partner_application_checks_contact_details() {
        let mut app = PartnerApplication {
            name: "City Food Rescue".into(),
            partner_type: PartnerType::Nonprofit,
            description: String::new(),
            location: PartnerLocation {
                address: "555 Community Blvd".into(),
                city: "Central".into(),
                state: "NY".into(),
                zip_code: "10003".into(),
            },
            contact: PartnerContact {
                email: "info@cityfoodrescue.org".into(),
                phone: "+1-555-0456".into(),
                website: None,
            },
            business_hours: String::new(),
        };
        assert_eq!(app.validate(), Ok(()));
        app.contact.email = "nope".into();
        assert!(matches!(app.validate(), Err(ValidationError::InvalidEmail(_))));

        app.contact.email = "info@cityfoodrescue.org".into();
        let partner = app.into_partner(PartnerId::new("p1"), ts(9));
        assert_eq!(partner.status, PartnerStatus::Active);
        assert_eq!(partner.total_donations, 0);
        assert_eq!(partner.rating, 5.0);
        assert!(!partner.verified);
    }
}
