//! # Geocoding
//!
//! Address lookup used when a seller publishes a listing, so that the listing
//! page can place it on a map. Lookups are best effort: callers treat any
//! [`GeocodeError`] as "no coordinates".

mod api;
mod error;
mod nominatim;

#[doc(inline)]
pub use api::{Coordinates, Geocoder};

#[doc(inline)]
pub use error::{GeocodeError, GeocodeResult};

#[doc(inline)]
pub use nominatim::NominatimGeocoder;
