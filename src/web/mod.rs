pub mod account;
pub mod circles;
pub mod comments;
pub mod error;
pub mod index;
pub mod likes;
pub mod members;
pub mod notes;
pub mod stocks;
pub mod topics;

use crate::relation::RelationError;
use serde::{Deserialize, Serialize};

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Descending order. Order is important.
    // Route resolution will stop at the first match.
    index::configure(conf);
    account::configure(conf);
    circles::configure(conf);
    comments::configure(conf);
    likes::configure(conf);
    members::configure(conf);
    notes::configure(conf);
    stocks::configure(conf);
    topics::configure(conf);
}

/// Query parameters for paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PageQuery {
    /// Clamp to sane bounds: page >= 1, per_page in [1, max].
    pub fn clamp(&self, default_per_page: u64, max_per_page: u64) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(default_per_page)
            .clamp(1, max_per_page);
        (page, per_page)
    }
}

/// Standard paginated JSON envelope.
#[derive(Debug, Serialize)]
pub struct PageOf<T: Serialize> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

pub(crate) fn offset_for(page: u64, per_page: u64) -> u64 {
    (page - 1) * per_page
}

pub(crate) fn storage_error<E: std::fmt::Debug>(err: E) -> actix_web::Error {
    log::error!("error {:?}", err);
    actix_web::error::ErrorInternalServerError("Storage error")
}

/// Resolve a note token and enforce the viewer's read access.
/// Hidden notes 404 rather than 403 so their existence does not leak.
pub(crate) async fn require_visible_note(
    client: &crate::middleware::ClientCtx,
    token: &str,
) -> Result<crate::orm::notes::Model, actix_web::Error> {
    let db = crate::db::get_db_pool();

    let note = crate::notes::find_by_token(db, token)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| actix_web::error::ErrorNotFound("Note not found."))?;

    if !crate::notes::can_view(db, &note, client.get_id())
        .await
        .map_err(storage_error)?
    {
        return Err(actix_web::error::ErrorNotFound("Note not found."));
    }

    Ok(note)
}

/// Map a relation service error onto an HTTP error.
pub(crate) fn relation_error(err: RelationError) -> actix_web::Error {
    match err {
        RelationError::Validation(msg) => actix_web::error::ErrorBadRequest(msg),
        RelationError::Conflict => {
            actix_web::error::ErrorConflict("Concurrent update, try again")
        }
        RelationError::Storage(e) => {
            log::error!("relation storage error: {:?}", e);
            actix_web::error::ErrorInternalServerError("Storage error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_defaults() {
        let query = PageQuery::default();
        assert_eq!(query.clamp(20, 100), (1, 20));
    }

    #[test]
    fn page_query_clamps_out_of_range_values() {
        let query = PageQuery {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(query.clamp(20, 100), (1, 100));

        let query = PageQuery {
            page: Some(3),
            per_page: Some(0),
        };
        assert_eq!(query.clamp(20, 100), (3, 1));
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(offset_for(1, 20), 0);
        assert_eq!(offset_for(3, 20), 40);
    }
}
