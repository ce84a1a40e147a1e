// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Food record CRUD operations.

use chrono::{DateTime, Utc};
use larder_core::{FoodRecord, FoodSource, ImageStatus, LarderError, NutritionFacts};
use rusqlite::types::Type;
use rusqlite::{ErrorCode, OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};

const SELECT_FOOD: &str = "SELECT id, source, external_id, barcode, name, brands, image_url,
        kcal_100g, protein_g_100g, carbs_g_100g, fat_g_100g, sugars_g_100g,
        fiber_g_100g, salt_g_100g, serving_size_g,
        raw_source_json, nutriments_json, content_hash, image_signature,
        image_large_source_url, image_small_source_url, image_large, image_small,
        image_downloaded_at, image_status
     FROM foods";

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn food_from_row(row: &Row<'_>) -> rusqlite::Result<FoodRecord> {
    let source: String = row.get(1)?;
    let raw_source_json: String = row.get(15)?;
    let nutriments_json: Option<String> = row.get(16)?;
    let downloaded_at: Option<String> = row.get(23)?;
    let status: String = row.get(24)?;

    Ok(FoodRecord {
        id: row.get(0)?,
        source: source
            .parse::<FoodSource>()
            .map_err(|e| conversion_error(1, e))?,
        external_id: row.get(2)?,
        barcode: row.get(3)?,
        name: row.get(4)?,
        brands: row.get(5)?,
        image_url: row.get(6)?,
        nutrition: NutritionFacts {
            kcal_100g: row.get(7)?,
            protein_g_100g: row.get(8)?,
            carbs_g_100g: row.get(9)?,
            fat_g_100g: row.get(10)?,
            sugars_g_100g: row.get(11)?,
            fiber_g_100g: row.get(12)?,
            salt_g_100g: row.get(13)?,
            serving_size_g: row.get(14)?,
        },
        raw_source_json: serde_json::from_str(&raw_source_json)
            .map_err(|e| conversion_error(15, e))?,
        nutriments_json: nutriments_json
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| conversion_error(16, e))?,
        content_hash: row.get(17)?,
        image_signature: row.get(18)?,
        image_large_source_url: row.get(19)?,
        image_small_source_url: row.get(20)?,
        image_large: row.get(21)?,
        image_small: row.get(22)?,
        image_downloaded_at: downloaded_at
            .map(|s| DateTime::parse_from_rfc3339(&s).map(|t| t.with_timezone(&Utc)))
            .transpose()
            .map_err(|e| conversion_error(23, e))?,
        image_status: status
            .parse::<ImageStatus>()
            .map_err(|e| conversion_error(24, e))?,
    })
}

fn timestamp(t: &Option<DateTime<Utc>>) -> Option<String> {
    t.map(|t| t.to_rfc3339())
}

/// A unique-constraint violation becomes `Conflict`; everything else is storage.
fn map_write_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> LarderError {
    if let tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(failure, message)) = &e {
        if failure.code == ErrorCode::ConstraintViolation {
            return LarderError::Conflict(
                message
                    .clone()
                    .unwrap_or_else(|| "unique constraint violated".to_string()),
            );
        }
    }
    map_tr_err(e)
}

fn not_found_unless_changed(changed: usize, id: i64) -> Result<(), LarderError> {
    if changed == 0 {
        Err(LarderError::NotFound(format!("food record {id}")))
    } else {
        Ok(())
    }
}

/// Get a record by row id.
pub async fn get_food(db: &Database, id: i64) -> Result<Option<FoodRecord>, LarderError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(&format!("{SELECT_FOOD} WHERE id = ?1"), params![id], food_from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Get a record by barcode.
pub async fn find_by_barcode(
    db: &Database,
    barcode: &str,
) -> Result<Option<FoodRecord>, LarderError> {
    let barcode = barcode.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("{SELECT_FOOD} WHERE barcode = ?1"),
                params![barcode],
                food_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Get a record by its upstream identity.
pub async fn find_by_external_id(
    db: &Database,
    source: FoodSource,
    external_id: &str,
) -> Result<Option<FoodRecord>, LarderError> {
    let source = source.to_string();
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("{SELECT_FOOD} WHERE source = ?1 AND external_id = ?2"),
                params![source, external_id],
                food_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a new record and return its row id.
pub async fn insert_food(db: &Database, record: &FoodRecord) -> Result<i64, LarderError> {
    let r = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO foods (source, external_id, barcode, name, brands, image_url,
                    kcal_100g, protein_g_100g, carbs_g_100g, fat_g_100g, sugars_g_100g,
                    fiber_g_100g, salt_g_100g, serving_size_g,
                    raw_source_json, nutriments_json, content_hash, image_signature,
                    image_large_source_url, image_small_source_url, image_large, image_small,
                    image_downloaded_at, image_status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                    ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
                params![
                    r.source.to_string(),
                    r.external_id,
                    r.barcode,
                    r.name,
                    r.brands,
                    r.image_url,
                    r.nutrition.kcal_100g,
                    r.nutrition.protein_g_100g,
                    r.nutrition.carbs_g_100g,
                    r.nutrition.fat_g_100g,
                    r.nutrition.sugars_g_100g,
                    r.nutrition.fiber_g_100g,
                    r.nutrition.salt_g_100g,
                    r.nutrition.serving_size_g,
                    r.raw_source_json.to_string(),
                    r.nutriments_json.as_ref().map(|v| v.to_string()),
                    r.content_hash,
                    r.image_signature,
                    r.image_large_source_url,
                    r.image_small_source_url,
                    r.image_large,
                    r.image_small,
                    timestamp(&r.image_downloaded_at),
                    r.image_status.to_string(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_write_err)
}

/// Overwrite identity, nutrition, provenance, signature and source URLs.
pub async fn update_catalog(db: &Database, record: &FoodRecord) -> Result<(), LarderError> {
    let r = record.clone();
    let id = r.id;
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE foods SET source = ?1, external_id = ?2, barcode = ?3, name = ?4,
                    brands = ?5, image_url = ?6,
                    kcal_100g = ?7, protein_g_100g = ?8, carbs_g_100g = ?9, fat_g_100g = ?10,
                    sugars_g_100g = ?11, fiber_g_100g = ?12, salt_g_100g = ?13,
                    serving_size_g = ?14, raw_source_json = ?15, nutriments_json = ?16,
                    content_hash = ?17, image_signature = ?18,
                    image_large_source_url = ?19, image_small_source_url = ?20,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?21",
                params![
                    r.source.to_string(),
                    r.external_id,
                    r.barcode,
                    r.name,
                    r.brands,
                    r.image_url,
                    r.nutrition.kcal_100g,
                    r.nutrition.protein_g_100g,
                    r.nutrition.carbs_g_100g,
                    r.nutrition.fat_g_100g,
                    r.nutrition.sugars_g_100g,
                    r.nutrition.fiber_g_100g,
                    r.nutrition.salt_g_100g,
                    r.nutrition.serving_size_g,
                    r.raw_source_json.to_string(),
                    r.nutriments_json.as_ref().map(|v| v.to_string()),
                    r.content_hash,
                    r.image_signature,
                    r.image_large_source_url,
                    r.image_small_source_url,
                    r.id,
                ],
            )
        })
        .await
        .map_err(map_write_err)?;
    not_found_unless_changed(changed, id)
}

/// Overwrite every image field in one statement.
pub async fn save_image_state(db: &Database, record: &FoodRecord) -> Result<(), LarderError> {
    let r = record.clone();
    let id = r.id;
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE foods SET image_signature = ?1,
                    image_large_source_url = ?2, image_small_source_url = ?3,
                    image_large = ?4, image_small = ?5,
                    image_downloaded_at = ?6, image_status = ?7,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?8",
                params![
                    r.image_signature,
                    r.image_large_source_url,
                    r.image_small_source_url,
                    r.image_large,
                    r.image_small,
                    timestamp(&r.image_downloaded_at),
                    r.image_status.to_string(),
                    r.id,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    not_found_unless_changed(changed, id)
}

/// Update only image status and download timestamp.
pub async fn mark_image_status(
    db: &Database,
    id: i64,
    status: ImageStatus,
    downloaded_at: DateTime<Utc>,
) -> Result<(), LarderError> {
    let status = status.to_string();
    let downloaded_at = downloaded_at.to_rfc3339();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE foods SET image_status = ?1, image_downloaded_at = ?2,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![status, downloaded_at, id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    not_found_unless_changed(changed, id)
}

/// Count records per image status, for diagnostics.
pub async fn count_by_image_status(db: &Database) -> Result<Vec<(String, i64)>, LarderError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT image_status, COUNT(*) FROM foods GROUP BY image_status ORDER BY image_status",
            )?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            let mut counts = Vec::new();
            for row in rows {
                counts.push(row?);
            }
            Ok(counts)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(barcode: &str, external_id: &str) -> FoodRecord {
        let mut r = FoodRecord::new(FoodSource::OpenFoodFacts, external_id, barcode, "Hazelnut spread");
        r.brands = "Acme".into();
        r.nutrition.kcal_100g = Some(539.0);
        r.nutrition.fat_g_100g = Some(30.9);
        r.raw_source_json = json!({"code": barcode});
        r.nutriments_json = Some(json!({"energy-kcal_100g": 539}));
        r.content_hash = Some("abc".into());
        r
    }

    #[tokio::test]
    async fn insert_then_lookup_by_every_key() {
        let db = Database::open_in_memory().await.unwrap();
        let id = insert_food(&db, &sample("3017620422003", "3017620422003")).await.unwrap();
        assert!(id > 0);

        let by_id = get_food(&db, id).await.unwrap().unwrap();
        assert_eq!(by_id.id, id);
        assert_eq!(by_id.brands, "Acme");
        assert_eq!(by_id.nutrition.fat_g_100g, Some(30.9));
        assert_eq!(by_id.raw_source_json, json!({"code": "3017620422003"}));
        assert_eq!(by_id.image_status, ImageStatus::None);

        let by_barcode = find_by_barcode(&db, "3017620422003").await.unwrap().unwrap();
        assert_eq!(by_barcode.id, id);

        let by_ext = find_by_external_id(&db, FoodSource::OpenFoodFacts, "3017620422003")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_ext.id, id);

        assert!(get_food(&db, id + 100).await.unwrap().is_none());
        assert!(find_by_barcode(&db, "000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_barcode_is_conflict() {
        let db = Database::open_in_memory().await.unwrap();
        insert_food(&db, &sample("111", "a")).await.unwrap();
        let err = insert_food(&db, &sample("111", "b")).await.unwrap_err();
        assert!(matches!(err, LarderError::Conflict(_)), "{err:?}");
    }

    #[tokio::test]
    async fn image_state_round_trips_timestamp() {
        let db = Database::open_in_memory().await.unwrap();
        let id = insert_food(&db, &sample("222", "222")).await.unwrap();
        let mut r = get_food(&db, id).await.unwrap().unwrap();

        let now = Utc::now();
        r.image_large = Some("foods/222/sig_large.jpg".into());
        r.image_small = Some("foods/222/sig_small.jpg".into());
        r.image_status = ImageStatus::Ok;
        r.image_downloaded_at = Some(now);
        r.image_signature = Some("sig".into());
        save_image_state(&db, &r).await.unwrap();

        let stored = get_food(&db, id).await.unwrap().unwrap();
        assert_eq!(stored.image_status, ImageStatus::Ok);
        assert_eq!(stored.image_large.as_deref(), Some("foods/222/sig_large.jpg"));
        assert_eq!(stored.image_signature.as_deref(), Some("sig"));
        assert_eq!(
            stored.image_downloaded_at.map(|t| t.timestamp_micros()),
            Some(now.timestamp_micros())
        );
    }

    #[tokio::test]
    async fn mark_status_leaves_assets_alone() {
        let db = Database::open_in_memory().await.unwrap();
        let mut r = sample("333", "333");
        r.image_large = Some("foods/333/a_large.jpg".into());
        r.image_small = Some("foods/333/a_small.jpg".into());
        r.image_status = ImageStatus::Ok;
        let id = insert_food(&db, &r).await.unwrap();

        mark_image_status(&db, id, ImageStatus::Failed, Utc::now())
            .await
            .unwrap();
        let stored = get_food(&db, id).await.unwrap().unwrap();
        assert_eq!(stored.image_status, ImageStatus::Failed);
        assert_eq!(stored.image_large.as_deref(), Some("foods/333/a_large.jpg"));
        assert!(stored.image_downloaded_at.is_some());
    }

    #[tokio::test]
    async fn updates_on_missing_row_are_not_found() {
        let db = Database::open_in_memory().await.unwrap();
        let mut r = sample("444", "444");
        r.id = 999;
        assert!(matches!(
            update_catalog(&db, &r).await,
            Err(LarderError::NotFound(_))
        ));
        assert!(matches!(
            mark_image_status(&db, 999, ImageStatus::None, Utc::now()).await,
            Err(LarderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn counts_group_by_status() {
        let db = Database::open_in_memory().await.unwrap();
        let a = insert_food(&db, &sample("1", "1")).await.unwrap();
        insert_food(&db, &sample("2", "2")).await.unwrap();
        mark_image_status(&db, a, ImageStatus::Failed, Utc::now())
            .await
            .unwrap();
        let counts = count_by_image_status(&db).await.unwrap();
        assert_eq!(
            counts,
            vec![("failed".to_string(), 1), ("none".to_string(), 1)]
        );
    }
}
