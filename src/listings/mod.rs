//! # Listings
//!
//! Everything the marketplace pages do with listings short of rendering them:
//!
//! - decoding listing records and the bundled catalog ([`Listing`], [`ListingCatalog`]);
//! - the results page filters and sort orders ([`SearchCriteria`], [`search`]);
//! - the detail page gallery, overview tiles and tour request ([`DetailPage`], [`Gallery`]);
//! - the "sell" form and publishing ([`ListingDraft`], [`ListingPublisher`]);
//! - the seller dashboard ([`MyListings`]);
//! - the `listings` collection, in memory or over Firestore REST ([`FirestoreListingStore`]);
//! - display formatting ([`format`]).
//!
//! ## Example
//!
//! ```
//! use veritybridge::listings::{ListingCatalog, ListingMode, SearchCriteria, SortOrder};
//!
//! let catalog = ListingCatalog::from_json_str(
//!     r#"[{"id":"l-1","mode":"buy","city":"Austin","price":500000},
//!         {"id":"l-2","mode":"buy","city":"Austin","price":350000}]"#,
//! )
//! .unwrap();
//!
//! let mut criteria = SearchCriteria::for_mode(ListingMode::Buy);
//! criteria.sort = SortOrder::PriceAsc;
//! let ids: Vec<_> = catalog.search(&criteria).iter().map(|l| l.id.clone()).collect();
//! assert_eq!(ids, ["l-2", "l-1"]);
//! ```

mod catalog;
mod detail;
mod draft;
mod error;
mod firestore;
pub mod format;
mod model;
mod owner;
mod publish;
mod search;
mod store;

#[doc(inline)]
pub use catalog::ListingCatalog;

#[doc(inline)]
pub use detail::{
    listing_id_from_query, placeholder_photo, DetailPage, Gallery, ListingDetail, OverviewTile,
    TourRequest, NOT_FOUND_TITLE, NO_DESCRIPTION, PHOTO_UNAVAILABLE,
};

#[doc(inline)]
pub use draft::{generate_listing_id, parse_photo_urls, ListingDraft, ACTIVE_STATUS, MAX_PHOTOS};

#[doc(inline)]
pub use error::{ListingsError, ListingsResult};

#[doc(inline)]
pub use firestore::{FirestoreListingStore, FirestoreListingStoreBuilder};

#[doc(inline)]
pub use model::{listing_href, Fee, Listing, ListingMode, LISTING_PAGE};

#[doc(inline)]
pub use owner::{MyListings, MY_LISTINGS_PAGE};

#[doc(inline)]
pub use publish::{ListingPublisher, PublishedListing};

#[doc(inline)]
pub use search::{search, SearchCriteria, SortOrder};

#[doc(inline)]
pub use store::{ListingStore, MemoryListingStore};
