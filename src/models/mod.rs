//! Wire models
//!
//! Calendar DTOs exchanged with the remote API, plus the request and response
//! bodies of the sidecar's own `/_flix` endpoints.

pub mod calendar;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use calendar::{
    entries_from_month, CalendarEntry, CalendarEntryDto, SaveEntryRequest, SelectedMovie,
};
pub use requests::{AuthStatusRequest, CalendarQuery, DateQuery, ListQuery};
pub use responses::{
    AuthStatusResponse, BucketResponse, ErrorResponse, HealthResponse, MessageResponse,
    StatsResponse,
};
