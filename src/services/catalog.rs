use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::CatalogEntry;

/// Snapshot of every bookable service, ordered by id so the prompt is stable
/// for an unchanged catalog.
pub fn read_catalog(conn: &Connection) -> Result<Vec<CatalogEntry>, AppError> {
    let mut catalog = queries::list_services(conn).map_err(AppError::storage)?;
    catalog.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::queries::fixtures;

    #[test]
    fn test_read_catalog_is_sorted() {
        let conn = db::init_db(":memory:").unwrap();
        fixtures::provider(&conn, "p1", None);
        fixtures::service(&conn, "b", "p1", "Gutter Cleaning", "exteriorcleaning");
        fixtures::service(&conn, "a", "p1", "Deep Cleaning", "housecleaning");

        let catalog = read_catalog(&conn).unwrap();
        assert_eq!(catalog[0].id, "a");
        assert_eq!(catalog[1].id, "b");
    }

    #[test]
    fn test_missing_table_is_storage_unavailable() {
        let conn = Connection::open_in_memory().unwrap();
        let result = read_catalog(&conn);
        assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
    }
}
