//! Marketplace service: configuration, seed loading, notification hooks and the
//! claim flow that sits in front of the listing store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use foodshare_catalog::{
    available_view, browse, category_facets, paginate, with_viewer_distances, FacetCount,
    FilterCriteria, MarketStats, MissingDistance, Page,
};
use foodshare_core::{
    Clock, Coordinates, DonorSnapshot, FoodItem, Listing, ListingDraft, ListingId, ListingState,
    Location, Notification, NotificationId, NotificationKind, Partner, PartnerApplication,
    PartnerId, SystemClock, UserId,
};
use foodshare_store::{ListingStore, PartnerRegistry, StoreError};
use serde::Deserialize;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, info_span, warn, Instrument};

#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub seed_path: PathBuf,
    pub web_port: u16,
    pub claim_latency: Duration,
    pub missing_distance: MissingDistance,
    pub page_size: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            seed_path: PathBuf::from("./seed.yaml"),
            web_port: 8000,
            claim_latency: Duration::ZERO,
            missing_distance: MissingDistance::Exclude,
            page_size: 20,
        }
    }
}

impl MarketConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; missing or unparsable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            seed_path: lookup("FOODSHARE_SEED_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.seed_path),
            web_port: lookup("FOODSHARE_WEB_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.web_port),
            claim_latency: lookup("FOODSHARE_CLAIM_LATENCY_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.claim_latency),
            missing_distance: lookup("FOODSHARE_MISSING_DISTANCE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.missing_distance),
            page_size: lookup("FOODSHARE_PAGE_SIZE")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.page_size),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub listings: Vec<SeedListing>,
    #[serde(default)]
    pub partners: Vec<SeedPartner>,
}

/// Seed listing with its availability window expressed relative to load time, so a
/// freshly started marketplace always has live listings.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedListing {
    #[serde(default)]
    pub id: Option<ListingId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub donor: DonorSnapshot,
    pub items: Vec<FoodItem>,
    pub location: Location,
    #[serde(default = "default_contact_method")]
    pub contact_method: String,
    #[serde(default)]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub opens_in_minutes: i64,
    pub closes_in_minutes: i64,
    #[serde(default)]
    pub created_minutes_ago: i64,
    #[serde(default)]
    pub claimed_by: Option<UserId>,
}

fn default_contact_method() -> String {
    "phone".to_string()
}

fn default_rating() -> f64 {
    5.0
}

impl SeedListing {
    fn into_listing(self, index: usize, now: DateTime<Utc>) -> Result<Listing> {
        let created_at = minutes_before(now, self.created_minutes_ago)
            .with_context(|| format!("seed listing #{} created_minutes_ago out of range", index + 1))?;
        let available_from = minutes_after(now, self.opens_in_minutes)
            .with_context(|| format!("seed listing #{} window out of range", index + 1))?;
        let available_until = minutes_after(now, self.closes_in_minutes)
            .with_context(|| format!("seed listing #{} window out of range", index + 1))?;
        let draft = ListingDraft {
            title: self.title,
            description: self.description,
            donor: self.donor,
            items: self.items,
            location: self.location,
            available_from,
            available_until,
            contact_method: self.contact_method,
            special_instructions: self.special_instructions,
            image_url: self.image_url,
            tags: self.tags.into_iter().collect(),
        };
        let id = self
            .id
            .unwrap_or_else(|| ListingId::new((index + 1).to_string()));
        let mut listing = draft.into_listing(id, created_at);
        if let Some(claimed_by) = self.claimed_by {
            listing.state = ListingState::Claimed {
                claimed_by,
                claimed_at: created_at,
            };
        }
        Ok(listing)
    }
}

fn minutes_after(now: DateTime<Utc>, minutes: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_minutes(minutes).and_then(|delta| now.checked_add_signed(delta))
}

fn minutes_before(now: DateTime<Utc>, minutes: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_minutes(minutes).and_then(|delta| now.checked_sub_signed(delta))
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedPartner {
    #[serde(default)]
    pub id: Option<PartnerId>,
    #[serde(flatten)]
    pub application: PartnerApplication,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub joined_days_ago: i64,
    #[serde(default)]
    pub total_donations: u32,
    #[serde(default = "default_rating")]
    pub rating: f64,
}

impl SeedFile {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing seed yaml")
    }

    pub fn build(self, now: DateTime<Utc>) -> Result<(ListingStore, PartnerRegistry)> {
        let listings = self
            .listings
            .into_iter()
            .enumerate()
            .map(|(index, seed)| seed.into_listing(index, now))
            .collect::<Result<Vec<_>>>()?;
        let store = ListingStore::from_listings(listings).context("building listing store from seed")?;

        let mut partners = Vec::with_capacity(self.partners.len());
        for (index, seed) in self.partners.into_iter().enumerate() {
            seed.application
                .validate()
                .with_context(|| format!("validating seed partner #{}", index + 1))?;
            let id = seed
                .id
                .unwrap_or_else(|| PartnerId::new((index + 1).to_string()));
            let joined_at = TimeDelta::try_days(seed.joined_days_ago)
                .and_then(|delta| now.checked_sub_signed(delta))
                .with_context(|| format!("seed partner #{} joined_days_ago out of range", index + 1))?;
            let mut partner = seed.application.into_partner(id, joined_at);
            partner.verified = seed.verified;
            partner.total_donations = seed.total_donations;
            partner.rating = seed.rating;
            partners.push(partner);
        }
        let registry =
            PartnerRegistry::from_partners(partners).context("building partner registry from seed")?;
        Ok((store, registry))
    }
}

pub async fn load_seed(path: &Path) -> Result<SeedFile> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    SeedFile::from_yaml(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Things the notification subsystem is told about. It is never queried by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketEvent {
    ListingCreated {
        listing_id: ListingId,
        title: String,
        donor_name: String,
    },
    ListingClaimed {
        listing_id: ListingId,
        title: String,
        claimant: UserId,
    },
    PartnerRegistered {
        partner_id: PartnerId,
        name: String,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &MarketEvent) -> Result<()>;
}

#[derive(Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _event: &MarketEvent) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
    pub action_label: Option<String>,
}

impl NotificationDraft {
    pub fn for_event(event: &MarketEvent) -> Self {
        match event {
            MarketEvent::ListingCreated {
                title, donor_name, ..
            } => Self {
                kind: NotificationKind::Info,
                title: "New Food Available Nearby".into(),
                message: format!("{donor_name} just posted '{title}'."),
                action_url: Some("/listings".into()),
                action_label: Some("View Listing".into()),
            },
            MarketEvent::ListingClaimed { listing_id, title, .. } => Self {
                kind: NotificationKind::Success,
                title: "Food Claimed Successfully".into(),
                message: format!(
                    "Your claim for '{title}' has been confirmed. The donor will contact you soon."
                ),
                action_url: Some(format!("/listings/{listing_id}")),
                action_label: Some("View Details".into()),
            },
            MarketEvent::PartnerRegistered { name, .. } => Self {
                kind: NotificationKind::Success,
                title: "Partner Application Received".into(),
                message: format!("Welcome to the network, {name}!"),
                action_url: Some("/partners".into()),
                action_label: Some("View Partners".into()),
            },
        }
    }
}

/// Newest-first notification inbox with read bookkeeping.
pub struct NotificationCenter {
    entries: RwLock<Vec<Notification>>,
    clock: Arc<dyn Clock>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            clock,
        }
    }

    pub async fn add(&self, draft: NotificationDraft) -> Notification {
        let notification = Notification {
            id: NotificationId::generate(),
            kind: draft.kind,
            title: draft.title,
            message: draft.message,
            timestamp: self.clock.now(),
            read: false,
            action_url: draft.action_url,
            action_label: draft.action_label,
        };
        self.entries.write().await.insert(0, notification.clone());
        notification
    }

    pub async fn list(&self) -> Vec<Notification> {
        self.entries.read().await.clone()
    }

    pub async fn unread_count(&self) -> usize {
        self.entries.read().await.iter().filter(|n| !n.read).count()
    }

    pub async fn mark_as_read(&self, id: &NotificationId) -> bool {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|n| &n.id == id) {
            Some(n) => {
                n.read = true;
                true
            }
            None => false,
        }
    }

    /// Returns how many notifications changed.
    pub async fn mark_all_as_read(&self) -> usize {
        let mut entries = self.entries.write().await;
        let mut changed = 0;
        for n in entries.iter_mut().filter(|n| !n.read) {
            n.read = true;
            changed += 1;
        }
        changed
    }

    pub async fn remove(&self, id: &NotificationId) -> bool {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|n| &n.id != id);
        entries.len() != before
    }

    pub async fn clear_all(&self) -> usize {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        removed
    }
}

#[async_trait]
impl Notifier for NotificationCenter {
    async fn notify(&self, event: &MarketEvent) -> Result<()> {
        self.add(NotificationDraft::for_event(event)).await;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BrowseQuery {
    pub criteria: FilterCriteria,
    pub viewer: Option<Coordinates>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

pub struct MarketService {
    config: MarketConfig,
    store: Arc<ListingStore>,
    partners: Arc<PartnerRegistry>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    claims_in_flight: Mutex<HashMap<ListingId, Arc<Mutex<()>>>>,
}

impl MarketService {
    pub fn new(config: MarketConfig, store: ListingStore, partners: PartnerRegistry) -> Self {
        Self {
            config,
            store: Arc::new(store),
            partners: Arc::new(partners),
            notifier: Arc::new(NoopNotifier),
            clock: Arc::new(SystemClock),
            claims_in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Seeds from `config.seed_path` when the file exists, otherwise starts empty.
    pub async fn from_config(config: MarketConfig) -> Result<Self> {
        let seed_exists = fs::try_exists(&config.seed_path)
            .await
            .with_context(|| format!("checking seed path {}", config.seed_path.display()))?;
        let (store, partners) = if seed_exists {
            load_seed(&config.seed_path).await?.build(Utc::now())?
        } else {
            warn!(
                path = %config.seed_path.display(),
                "seed file missing; starting with an empty marketplace"
            );
            (ListingStore::new(), PartnerRegistry::new())
        };
        info!(listings = store.len().await, "marketplace ready");
        Ok(Self::new(config, store, partners))
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn browse(&self, query: &BrowseQuery) -> Page<Listing> {
        let listings = self.snapshot(query.viewer.as_ref()).await;
        let criteria = FilterCriteria {
            missing_distance: self.config.missing_distance,
            ..query.criteria.clone()
        };
        let visible = browse(&listings, &criteria, self.now())
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        paginate(
            visible,
            query.page,
            query.per_page.unwrap_or(self.config.page_size),
        )
    }

    /// Category counts over the listings currently available.
    pub async fn facets(&self) -> Vec<FacetCount> {
        let listings = self.store.get_all().await;
        category_facets(&available_view(&listings, self.now()))
    }

    pub async fn get(&self, id: &ListingId, viewer: Option<&Coordinates>) -> Result<Listing, StoreError> {
        let listing = self.store.get_by_id(id).await?;
        Ok(match viewer {
            Some(origin) => with_viewer_distances(vec![listing.clone()], origin)
                .pop()
                .unwrap_or(listing),
            None => listing,
        })
    }

    pub async fn submit(&self, draft: ListingDraft) -> Result<Listing, StoreError> {
        let listing = self.store.add(draft, self.now()).await?;
        self.publish(MarketEvent::ListingCreated {
            listing_id: listing.id.clone(),
            title: listing.title.clone(),
            donor_name: listing.donor.name.clone(),
        })
        .await;
        Ok(listing)
    }

    /// Claims a listing for `claimant`.
    ///
    /// At most one claim per listing id is in flight; concurrent callers wait for it
    /// and then see the listing as unavailable.
    pub async fn claim(&self, id: &ListingId, claimant: &UserId) -> Result<Listing, StoreError> {
        let guard = self.claim_guard(id).await;
        let result = {
            let _in_flight = guard.lock().await;
            let span = info_span!("claim", listing_id = %id, claimant = %claimant);
            async {
                if !self.config.claim_latency.is_zero() {
                    tokio::time::sleep(self.config.claim_latency).await;
                }
                let listing = self.store.claim(id, claimant, self.now()).await?;
                self.publish(MarketEvent::ListingClaimed {
                    listing_id: listing.id.clone(),
                    title: listing.title.clone(),
                    claimant: claimant.clone(),
                })
                .await;
                Ok::<_, StoreError>(listing)
            }
            .instrument(span)
            .await
        };
        self.release_claim_guard(id, guard).await;
        result
    }

    pub async fn register_partner(&self, application: PartnerApplication) -> Result<Partner, StoreError> {
        let partner = self.partners.register(application, self.now()).await?;
        self.publish(MarketEvent::PartnerRegistered {
            partner_id: partner.id.clone(),
            name: partner.name.clone(),
        })
        .await;
        Ok(partner)
    }

    pub async fn partners(&self) -> Vec<Partner> {
        self.partners.list_active().await
    }

    pub async fn stats(&self) -> MarketStats {
        let listings = self.store.get_all().await;
        MarketStats::compute(&listings, self.partners.len().await, self.now())
    }

    pub async fn expire_stale(&self) -> usize {
        self.store.sweep_expired(self.now()).await
    }

    async fn snapshot(&self, viewer: Option<&Coordinates>) -> Vec<Listing> {
        let listings = self.store.get_all().await;
        match viewer {
            Some(origin) => with_viewer_distances(listings, origin),
            None => listings,
        }
    }

    async fn claim_guard(&self, id: &ListingId) -> Arc<Mutex<()>> {
        let mut map = self.claims_in_flight.lock().await;
        map.entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // Drops the map entry once no other claimant holds or waits on it.
    async fn release_claim_guard(&self, id: &ListingId, guard: Arc<Mutex<()>>) {
        let mut map = self.claims_in_flight.lock().await;
        if Arc::strong_count(&guard) == 2 {
            map.remove(id);
        }
    }

    async fn publish(&self, event: MarketEvent) {
        if let Err(err) = self.notifier.notify(&event).await {
            warn!(error = %err, ?event, "notifier failed");
        }
    }
}
