//! Bootcamp persistence.

use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use super::{now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::{new_id, Bootcamp, Career, Location, NewBootcamp, DEFAULT_PHOTO};
use crate::query::{FieldKind, FieldSpec, ListQuery, ResourceSchema};

const BOOTCAMP_COLUMNS: &str = "id, user_id, name, slug, description, website, phone, email, \
    lng, lat, formatted_address, street, city, state, zipcode, country, careers, average_rating, \
    average_cost, photo, housing, job_assistance, job_guarantee, accept_gi, created_at";

/// Fields of a bootcamp that list requests may filter and sort on.
pub static BOOTCAMP_SCHEMA: ResourceSchema = ResourceSchema {
    table: "bootcamps",
    fields: &[
        FieldSpec { name: "name", column: "name", kind: FieldKind::Text },
        FieldSpec { name: "slug", column: "slug", kind: FieldKind::Text },
        FieldSpec { name: "description", column: "description", kind: FieldKind::Text },
        FieldSpec { name: "website", column: "website", kind: FieldKind::Text },
        FieldSpec { name: "phone", column: "phone", kind: FieldKind::Text },
        FieldSpec { name: "email", column: "email", kind: FieldKind::Text },
        FieldSpec { name: "careers", column: "careers", kind: FieldKind::TextList },
        FieldSpec { name: "averageRating", column: "average_rating", kind: FieldKind::Number },
        FieldSpec { name: "averageCost", column: "average_cost", kind: FieldKind::Number },
        FieldSpec { name: "photo", column: "photo", kind: FieldKind::Text },
        FieldSpec { name: "housing", column: "housing", kind: FieldKind::Bool },
        FieldSpec { name: "jobAssistance", column: "job_assistance", kind: FieldKind::Bool },
        FieldSpec { name: "jobGuarantee", column: "job_guarantee", kind: FieldKind::Bool },
        FieldSpec { name: "acceptGi", column: "accept_gi", kind: FieldKind::Bool },
        FieldSpec { name: "user", column: "user_id", kind: FieldKind::Text },
        FieldSpec { name: "createdAt", column: "created_at", kind: FieldKind::Timestamp },
        FieldSpec { name: "location.city", column: "city", kind: FieldKind::Text },
        FieldSpec { name: "location.state", column: "state", kind: FieldKind::Text },
        FieldSpec { name: "location.zipcode", column: "zipcode", kind: FieldKind::Text },
        FieldSpec { name: "location.country", column: "country", kind: FieldKind::Text },
    ],
    default_sort: "createdAt",
};

impl Repository {
    // ==================== BOOTCAMP OPERATIONS ====================

    /// Insert a bootcamp.
    pub async fn insert_bootcamp(&self, bootcamp: &NewBootcamp) -> Result<Bootcamp, AppError> {
        let id = new_id();
        let now = now_timestamp();
        let careers_json = serde_json::to_string(&bootcamp.careers)?;
        let location = &bootcamp.location;

        sqlx::query(
            "INSERT INTO bootcamps (id, user_id, name, slug, description, website, phone, email, \
             lng, lat, formatted_address, street, city, state, zipcode, country, careers, \
             average_rating, photo, housing, job_assistance, job_guarantee, accept_gi, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&bootcamp.user)
        .bind(&bootcamp.name)
        .bind(&bootcamp.slug)
        .bind(&bootcamp.description)
        .bind(&bootcamp.website)
        .bind(&bootcamp.phone)
        .bind(&bootcamp.email)
        .bind(location.longitude())
        .bind(location.latitude())
        .bind(&location.formatted_address)
        .bind(&location.street)
        .bind(&location.city)
        .bind(&location.state)
        .bind(&location.zipcode)
        .bind(&location.country)
        .bind(&careers_json)
        .bind(bootcamp.average_rating)
        .bind(DEFAULT_PHOTO)
        .bind(bootcamp.housing as i32)
        .bind(bootcamp.job_assistance as i32)
        .bind(bootcamp.job_guarantee as i32)
        .bind(bootcamp.accept_gi as i32)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Bootcamp {
            id,
            name: bootcamp.name.clone(),
            slug: bootcamp.slug.clone(),
            description: bootcamp.description.clone(),
            website: bootcamp.website.clone(),
            phone: bootcamp.phone.clone(),
            email: bootcamp.email.clone(),
            location: Some(bootcamp.location.clone()),
            careers: bootcamp.careers.clone(),
            average_rating: bootcamp.average_rating,
            average_cost: None,
            photo: DEFAULT_PHOTO.to_string(),
            housing: bootcamp.housing,
            job_assistance: bootcamp.job_assistance,
            job_guarantee: bootcamp.job_guarantee,
            accept_gi: bootcamp.accept_gi,
            user: bootcamp.user.clone(),
            created_at: now,
            courses: None,
        })
    }

    /// Get a bootcamp by ID, without its courses.
    pub async fn get_bootcamp(&self, id: &str) -> Result<Option<Bootcamp>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {BOOTCAMP_COLUMNS} FROM bootcamps WHERE bootcamps.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(bootcamp_from_row))
    }

    /// ID of a bootcamp owned by `user_id`, if there is one.
    pub async fn bootcamp_owned_by(&self, user_id: &str) -> Result<Option<String>, AppError> {
        let id = sqlx::query_scalar("SELECT id FROM bootcamps WHERE user_id = ? LIMIT 1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    /// One page of bootcamps matching `query`, plus the total number of matches.
    pub async fn list_bootcamps(&self, query: &ListQuery) -> Result<(Vec<Bootcamp>, i64), AppError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM bootcamps");
        query.push_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Sqlite>::new(format!("SELECT {BOOTCAMP_COLUMNS} FROM bootcamps"));
        query.push_where(&mut select);
        query.push_order_and_window(&mut select);
        let rows = select.build().fetch_all(&self.pool).await?;

        Ok((rows.iter().map(bootcamp_from_row).collect(), total))
    }

    /// Bootcamps whose latitude falls in `[min_lat, max_lat]`.
    pub async fn bootcamps_in_latitude_band(
        &self,
        min_lat: f64,
        max_lat: f64,
    ) -> Result<Vec<Bootcamp>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOTCAMP_COLUMNS} FROM bootcamps \
             WHERE bootcamps.lat BETWEEN ? AND ? AND bootcamps.lng IS NOT NULL \
             ORDER BY bootcamps.created_at DESC"
        ))
        .bind(min_lat)
        .bind(max_lat)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(bootcamp_from_row).collect())
    }

    /// Write back every client-mutable field of a merged bootcamp.
    pub async fn update_bootcamp(&self, bootcamp: &Bootcamp) -> Result<(), AppError> {
        let careers_json = serde_json::to_string(&bootcamp.careers)?;
        let location = bootcamp.location.as_ref();

        sqlx::query(
            "UPDATE bootcamps SET name = ?, slug = ?, description = ?, website = ?, phone = ?, \
             email = ?, lng = ?, lat = ?, formatted_address = ?, street = ?, city = ?, state = ?, \
             zipcode = ?, country = ?, careers = ?, average_rating = ?, housing = ?, \
             job_assistance = ?, job_guarantee = ?, accept_gi = ? WHERE id = ?",
        )
        .bind(&bootcamp.name)
        .bind(&bootcamp.slug)
        .bind(&bootcamp.description)
        .bind(&bootcamp.website)
        .bind(&bootcamp.phone)
        .bind(&bootcamp.email)
        .bind(location.map(Location::longitude))
        .bind(location.map(Location::latitude))
        .bind(location.and_then(|l| l.formatted_address.clone()))
        .bind(location.and_then(|l| l.street.clone()))
        .bind(location.and_then(|l| l.city.clone()))
        .bind(location.and_then(|l| l.state.clone()))
        .bind(location.and_then(|l| l.zipcode.clone()))
        .bind(location.and_then(|l| l.country.clone()))
        .bind(&careers_json)
        .bind(bootcamp.average_rating)
        .bind(bootcamp.housing as i32)
        .bind(bootcamp.job_assistance as i32)
        .bind(bootcamp.job_guarantee as i32)
        .bind(bootcamp.accept_gi as i32)
        .bind(&bootcamp.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_bootcamp_photo(&self, id: &str, photo: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE bootcamps SET photo = ? WHERE id = ?")
            .bind(photo)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_average_cost(&self, id: &str, cost: Option<i64>) -> Result<(), AppError> {
        sqlx::query("UPDATE bootcamps SET average_cost = ? WHERE id = ?")
            .bind(cost)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a bootcamp and all of its courses in one transaction.
    ///
    /// Returns the number of courses removed, or `None` if the bootcamp did not exist.
    pub async fn delete_bootcamp(&self, id: &str) -> Result<Option<u64>, AppError> {
        let mut tx = self.pool.begin().await?;

        let courses = sqlx::query("DELETE FROM courses WHERE bootcamp_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM bootcamps WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(courses))
    }
}

// ==================== ROW CONVERSION HELPERS ====================

fn bootcamp_from_row(row: &SqliteRow) -> Bootcamp {
    let careers: String = row.get("careers");
    let lng: Option<f64> = row.get("lng");
    let lat: Option<f64> = row.get("lat");

    let location = match (lng, lat) {
        (Some(lng), Some(lat)) => Some(Location {
            kind: "Point".to_string(),
            coordinates: [lng, lat],
            formatted_address: row.get("formatted_address"),
            street: row.get("street"),
            city: row.get("city"),
            state: row.get("state"),
            zipcode: row.get("zipcode"),
            country: row.get("country"),
        }),
        _ => None,
    };

    Bootcamp {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
        website: row.get("website"),
        phone: row.get("phone"),
        email: row.get("email"),
        location,
        careers: serde_json::from_str::<Vec<Career>>(&careers).unwrap_or_default(),
        average_rating: row.get("average_rating"),
        average_cost: row.get("average_cost"),
        photo: row.get("photo"),
        housing: row.get::<i32, _>("housing") != 0,
        job_assistance: row.get::<i32, _>("job_assistance") != 0,
        job_guarantee: row.get::<i32, _>("job_guarantee") != 0,
        accept_gi: row.get::<i32, _>("accept_gi") != 0,
        user: row.get("user_id"),
        created_at: row.get("created_at"),
        courses: None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::repository::tests::{insert_user, test_repo};
    use crate::models::{Role, User};

    pub(crate) fn new_bootcamp(owner: &User, name: &str, lat: f64, lng: f64) -> NewBootcamp {
        NewBootcamp {
            user: owner.id.clone(),
            name: name.to_string(),
            slug: crate::models::slugify(name),
            description: "A bootcamp".to_string(),
            website: None,
            phone: None,
            email: None,
            location: Location {
                kind: "Point".to_string(),
                coordinates: [lng, lat],
                formatted_address: Some("Somewhere".to_string()),
                street: None,
                city: Some("Boston".to_string()),
                state: Some("MA".to_string()),
                zipcode: Some("02215".to_string()),
                country: Some("US".to_string()),
            },
            careers: vec![Career::WebDevelopment, Career::Business],
            average_rating: None,
            housing: false,
            job_assistance: false,
            job_guarantee: false,
            accept_gi: false,
        }
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_insert_and_get_bootcamp() {
        let (repo, _dir) = test_repo().await;
        let owner = insert_user(&repo, "Pub", Role::Publisher).await;
        let created = repo
            .insert_bootcamp(&new_bootcamp(&owner, "Devworks Bootcamp", 42.35, -71.10))
            .await
            .unwrap();

        let fetched = repo.get_bootcamp(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.slug, "devworks-bootcamp");
        assert_eq!(fetched.photo, DEFAULT_PHOTO);
        assert_eq!(fetched.careers, vec![Career::WebDevelopment, Career::Business]);
        assert_eq!(fetched.location.unwrap().coordinates, [-71.10, 42.35]);
        assert_eq!(
            repo.bootcamp_owned_by(&owner.id).await.unwrap(),
            Some(created.id)
        );
    }

    #[tokio::test]
    async fn test_list_filters_on_careers_and_city() {
        let (repo, _dir) = test_repo().await;
        let owner = insert_user(&repo, "Pub", Role::Publisher).await;
        repo.insert_bootcamp(&new_bootcamp(&owner, "One", 42.35, -71.10))
            .await
            .unwrap();
        let mut other = new_bootcamp(&owner, "Two", 42.35, -71.10);
        other.careers = vec![Career::UiUx];
        other.housing = true;
        repo.insert_bootcamp(&other).await.unwrap();

        let query = ListQuery::parse(
            &BOOTCAMP_SCHEMA,
            &params(&[("careers[in]", "UI/UX,Data Science"), ("limit", "10")]),
        )
        .unwrap();
        let (items, total) = repo.list_bootcamps(&query).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].name, "Two");

        let query = ListQuery::parse(
            &BOOTCAMP_SCHEMA,
            &params(&[("housing", "false"), ("location.city", "Boston")]),
        )
        .unwrap();
        let (items, total) = repo.list_bootcamps(&query).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].name, "One");
    }

    #[tokio::test]
    async fn test_delete_missing_bootcamp() {
        let (repo, _dir) = test_repo().await;
        assert_eq!(repo.delete_bootcamp(&new_id()).await.unwrap(), None);
    }
}
