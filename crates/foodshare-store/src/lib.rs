//! In-memory listing store with the claim state machine, plus the partner registry.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use foodshare_core::{
    effective_status, Listing, ListingDraft, ListingId, ListingState, ListingStatus, Partner,
    PartnerApplication, PartnerId, PartnerStatus, UserId, ValidationError,
};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("listing {0} not found")]
    NotFound(ListingId),
    #[error("listing {id} is already {status}")]
    AlreadyUnavailable { id: ListingId, status: ListingStatus },
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),
    #[error("duplicate listing id {0}")]
    DuplicateId(ListingId),
    #[error("duplicate partner id {0}")]
    DuplicatePartnerId(PartnerId),
}

/// Single owner of the canonical listing collection.
///
/// Listings are kept newest-first. Every mutation happens under one write guard, so
/// the claim check-then-set cannot interleave with another claim.
#[derive(Debug, Default)]
pub struct ListingStore {
    listings: RwLock<Vec<Listing>>,
}

impl ListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from existing listings, keeping their order.
    pub fn from_listings(listings: Vec<Listing>) -> Result<Self, StoreError> {
        let mut seen = HashSet::with_capacity(listings.len());
        for listing in &listings {
            listing.validate()?;
            if !seen.insert(listing.id.clone()) {
                return Err(StoreError::DuplicateId(listing.id.clone()));
            }
        }
        Ok(Self {
            listings: RwLock::new(listings),
        })
    }

    pub async fn len(&self) -> usize {
        self.listings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.listings.read().await.is_empty()
    }

    pub async fn get_all(&self) -> Vec<Listing> {
        self.listings.read().await.clone()
    }

    pub async fn get_by_id(&self, id: &ListingId) -> Result<Listing, StoreError> {
        self.listings
            .read()
            .await
            .iter()
            .find(|l| &l.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Validates the draft, assigns a fresh id and `created_at = now`, and puts the
    /// listing at the front.
    pub async fn add(&self, draft: ListingDraft, now: DateTime<Utc>) -> Result<Listing, StoreError> {
        draft.validate()?;
        let mut listings = self.listings.write().await;
        let mut id = ListingId::generate();
        while listings.iter().any(|l| l.id == id) {
            id = ListingId::generate();
        }
        let listing = draft.into_listing(id, now);
        listings.insert(0, listing.clone());
        info!(listing_id = %listing.id, donor = %listing.donor.name, "listing added");
        Ok(listing)
    }

    /// Moves an available listing to claimed.
    ///
    /// Fails with `AlreadyUnavailable` when the listing is claimed or its window has
    /// closed, leaving it untouched.
    pub async fn claim(
        &self,
        id: &ListingId,
        claimant: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Listing, StoreError> {
        let mut listings = self.listings.write().await;
        let listing = listings
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let status = effective_status(listing, now);
        if status != ListingStatus::Available {
            debug!(listing_id = %id, %status, "claim rejected");
            return Err(StoreError::AlreadyUnavailable {
                id: id.clone(),
                status,
            });
        }

        set_state(
            listing,
            ListingState::Claimed {
                claimed_by: claimant.clone(),
                claimed_at: now,
            },
        );
        info!(listing_id = %id, claimant = %claimant, "listing claimed");
        Ok(listing.clone())
    }

    /// Persists `Expired` on every available listing whose window has closed.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut listings = self.listings.write().await;
        let mut expired = 0usize;
        for listing in listings.iter_mut() {
            if listing.state == ListingState::Available
                && effective_status(listing, now) == ListingStatus::Expired
            {
                set_state(listing, ListingState::Expired);
                expired += 1;
            }
        }
        if expired > 0 {
            info!(expired, "expired listings swept");
        }
        expired
    }
}

// Only available listings ever change state.
fn set_state(listing: &mut Listing, state: ListingState) {
    debug_assert_eq!(listing.state, ListingState::Available);
    listing.state = state;
}

#[derive(Debug, Default)]
pub struct PartnerRegistry {
    partners: RwLock<Vec<Partner>>,
}

impl PartnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_partners(partners: Vec<Partner>) -> Result<Self, StoreError> {
        let mut seen = HashSet::with_capacity(partners.len());
        for partner in &partners {
            if !seen.insert(partner.id.clone()) {
                return Err(StoreError::DuplicatePartnerId(partner.id.clone()));
            }
        }
        Ok(Self {
            partners: RwLock::new(partners),
        })
    }

    pub async fn register(
        &self,
        application: PartnerApplication,
        now: DateTime<Utc>,
    ) -> Result<Partner, StoreError> {
        application.validate()?;
        let mut partners = self.partners.write().await;
        let mut id = PartnerId::generate();
        while partners.iter().any(|p| p.id == id) {
            id = PartnerId::generate();
        }
        let partner = application.into_partner(id, now);
        partners.push(partner.clone());
        info!(partner_id = %partner.id, name = %partner.name, "partner registered");
        Ok(partner)
    }

    pub async fn list_active(&self) -> Vec<Partner> {
        self.partners
            .read()
            .await
            .iter()
            .filter(|p| p.status == PartnerStatus::Active)
            .cloned()
            .collect()
    }

    /// Every registered partner, including inactive ones.
    pub async fn len(&self) -> usize {
        self.partners.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.partners.read().await.is_empty()
    }

    pub async fn active_count(&self) -> usize {
        self.partners
            .read()
            .await
            .iter()
            .filter(|p| p.status == PartnerStatus::Active)
            .count()
    }
}
