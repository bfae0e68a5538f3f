//! Bootcamp operations.

use std::path::Path;

use rand::RngCore;
use validator::Validate;

use crate::auth::{authorize, ensure_owner, PUBLISHERS};
use crate::db::BOOTCAMP_SCHEMA;
use crate::errors::AppError;
use crate::geocoder::{central_angle, latitude_band, radius_radians};
use crate::models::{
    parse_id, slugify, Bootcamp, CreateBootcampRequest, Location, NewBootcamp, Role,
    UpdateBootcampRequest, User, DEFAULT_PHOTO,
};
use crate::query::{ListQuery, Listing};
use crate::AppState;

/// Content types accepted for bootcamp photos.
pub const PHOTO_CONTENT_TYPES: [&str; 3] = ["image/png", "image/jpg", "image/jpeg"];

/// An uploaded photo, already read from the request.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub async fn create(
    state: &AppState,
    user: &User,
    mut request: CreateBootcampRequest,
) -> Result<Bootcamp, AppError> {
    authorize(user, PUBLISHERS)?;

    if user.role != Role::Admin && state.repo.bootcamp_owned_by(&user.id).await?.is_some() {
        return Err(AppError::Forbidden(format!(
            "The user with ID {} has already published a bootcamp",
            user.id
        )));
    }

    request.normalize();
    request.validate()?;

    let location = geocode_address(state, &request.address).await?;
    let bootcamp = state
        .repo
        .insert_bootcamp(&NewBootcamp {
            user: user.id.clone(),
            slug: slugify(&request.name),
            name: request.name,
            description: request.description,
            website: request.website,
            phone: request.phone,
            email: request.email,
            location,
            careers: request.careers,
            average_rating: request.average_rating,
            housing: request.housing,
            job_assistance: request.job_assistance,
            job_guarantee: request.job_guarantee,
            accept_gi: request.accept_gi,
        })
        .await?;

    tracing::info!("User {} created bootcamp {} ({})", user.id, bootcamp.id, bootcamp.name);
    Ok(bootcamp)
}

/// A single bootcamp with its courses.
pub async fn get(state: &AppState, raw_id: &str) -> Result<Bootcamp, AppError> {
    let mut bootcamp = fetch(state, raw_id).await?;
    let mut courses = state
        .repo
        .courses_for_bootcamps(std::slice::from_ref(&bootcamp.id))
        .await?;
    bootcamp.courses = Some(courses.remove(&bootcamp.id).unwrap_or_default());
    Ok(bootcamp)
}

pub async fn list(state: &AppState, params: &[(String, String)]) -> Result<Listing, AppError> {
    let query = ListQuery::parse(&BOOTCAMP_SCHEMA, params)?;
    let (mut bootcamps, total) = state.repo.list_bootcamps(&query).await?;
    populate_courses(state, &mut bootcamps).await?;
    query.listing(&bootcamps, total)
}

pub async fn update(
    state: &AppState,
    user: &User,
    raw_id: &str,
    mut request: UpdateBootcampRequest,
) -> Result<Bootcamp, AppError> {
    authorize(user, PUBLISHERS)?;
    let mut bootcamp = fetch(state, raw_id).await?;
    ensure_owner(user, &bootcamp.user, "update this bootcamp")?;

    request.normalize();
    request.validate()?;

    if let Some(name) = request.name {
        bootcamp.slug = slugify(&name);
        bootcamp.name = name;
    }
    if let Some(address) = request.address {
        bootcamp.location = Some(geocode_address(state, &address).await?);
    }
    if let Some(description) = request.description {
        bootcamp.description = description;
    }
    if request.website.is_some() {
        bootcamp.website = request.website;
    }
    if request.phone.is_some() {
        bootcamp.phone = request.phone;
    }
    if request.email.is_some() {
        bootcamp.email = request.email;
    }
    if let Some(careers) = request.careers {
        bootcamp.careers = careers;
    }
    if request.average_rating.is_some() {
        bootcamp.average_rating = request.average_rating;
    }
    if let Some(housing) = request.housing {
        bootcamp.housing = housing;
    }
    if let Some(job_assistance) = request.job_assistance {
        bootcamp.job_assistance = job_assistance;
    }
    if let Some(job_guarantee) = request.job_guarantee {
        bootcamp.job_guarantee = job_guarantee;
    }
    if let Some(accept_gi) = request.accept_gi {
        bootcamp.accept_gi = accept_gi;
    }

    state.repo.update_bootcamp(&bootcamp).await?;
    tracing::info!("User {} updated bootcamp {}", user.id, bootcamp.id);

    get(state, &bootcamp.id).await
}

/// Delete a bootcamp and its courses. The photo file is removed in the background.
pub async fn delete(state: &AppState, user: &User, raw_id: &str) -> Result<(), AppError> {
    authorize(user, PUBLISHERS)?;
    let bootcamp = fetch(state, raw_id).await?;
    ensure_owner(user, &bootcamp.user, "delete this bootcamp")?;

    let Some(courses) = state.repo.delete_bootcamp(&bootcamp.id).await? else {
        return Err(not_found(&bootcamp.id));
    };
    tracing::info!(
        "User {} deleted bootcamp {} and {} course(s)",
        user.id,
        bootcamp.id,
        courses
    );

    remove_photo_later(state, &bootcamp.photo);
    Ok(())
}

/// Store a new photo for a bootcamp and return its file name.
pub async fn upload_photo(
    state: &AppState,
    user: &User,
    raw_id: &str,
    upload: PhotoUpload,
) -> Result<String, AppError> {
    authorize(user, PUBLISHERS)?;
    let bootcamp = fetch(state, raw_id).await?;
    ensure_owner(user, &bootcamp.user, "upload a photo for this bootcamp")?;

    if upload.bytes.is_empty() {
        return Err(AppError::BadRequest("Please upload a file".to_string()));
    }
    if !PHOTO_CONTENT_TYPES.contains(&upload.content_type.as_str()) {
        return Err(AppError::BadRequest(
            "Please upload an image file (png, jpg or jpeg)".to_string(),
        ));
    }
    if upload.bytes.len() > state.config.max_upload_bytes {
        return Err(AppError::BadRequest(format!(
            "Please upload an image less than {} bytes",
            state.config.max_upload_bytes
        )));
    }

    let file_name = stored_photo_name(&upload.file_name);
    let image_dir = state.config.image_dir();
    tokio::fs::create_dir_all(&image_dir).await?;
    tokio::fs::write(image_dir.join(&file_name), &upload.bytes).await?;

    state.repo.set_bootcamp_photo(&bootcamp.id, &file_name).await?;
    tracing::info!("Stored photo {} for bootcamp {}", file_name, bootcamp.id);

    remove_photo_later(state, &bootcamp.photo);
    Ok(file_name)
}

/// Bootcamps within `distance` miles of a postal code.
pub async fn within_radius(
    state: &AppState,
    zipcode: &str,
    distance: &str,
) -> Result<Vec<Bootcamp>, AppError> {
    let miles: f64 = distance
        .trim()
        .parse()
        .ok()
        .filter(|d: &f64| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| {
            AppError::validation(format!("Distance must be a non-negative number, got {:?}", distance))
        })?;

    let origin = state
        .geocoder
        .geocode(zipcode.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Could not locate zipcode {}", zipcode)))?;

    let radius = radius_radians(miles);
    let (min_lat, max_lat) = latitude_band(origin.latitude, radius);
    let candidates = state.repo.bootcamps_in_latitude_band(min_lat, max_lat).await?;

    let mut bootcamps: Vec<Bootcamp> = candidates
        .into_iter()
        .filter(|b| {
            b.location.as_ref().is_some_and(|l| {
                central_angle(origin.latitude, origin.longitude, l.latitude(), l.longitude())
                    <= radius
            })
        })
        .collect();

    populate_courses(state, &mut bootcamps).await?;
    Ok(bootcamps)
}

async fn fetch(state: &AppState, raw_id: &str) -> Result<Bootcamp, AppError> {
    let id = parse_id(raw_id)?;
    state
        .repo
        .get_bootcamp(&id)
        .await?
        .ok_or_else(|| not_found(&id))
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Bootcamp not found with id of {}", id))
}

async fn populate_courses(state: &AppState, bootcamps: &mut [Bootcamp]) -> Result<(), AppError> {
    let ids: Vec<String> = bootcamps.iter().map(|b| b.id.clone()).collect();
    let mut courses = state.repo.courses_for_bootcamps(&ids).await?;
    for bootcamp in bootcamps.iter_mut() {
        bootcamp.courses = Some(courses.remove(&bootcamp.id).unwrap_or_default());
    }
    Ok(())
}

async fn geocode_address(state: &AppState, address: &str) -> Result<Location, AppError> {
    let place = state
        .geocoder
        .geocode(address)
        .await?
        .ok_or_else(|| AppError::validation(format!("Could not geocode address {:?}", address)))?;

    Ok(Location {
        kind: "Point".to_string(),
        coordinates: [place.longitude, place.latitude],
        formatted_address: Some(place.formatted_address),
        street: place.street,
        city: place.city,
        state: place.state_code,
        zipcode: place.zipcode,
        country: place.country_code,
    })
}

/// `<10 hex chars><sanitized original name>`.
fn stored_photo_name(original: &str) -> String {
    let mut prefix = [0u8; 5];
    rand::thread_rng().fill_bytes(&mut prefix);

    let base = Path::new(original)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("photo");
    let sanitized: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    format!("{}{}", hex::encode(prefix), sanitized)
}

/// Remove a replaced or orphaned photo without holding up the request.
fn remove_photo_later(state: &AppState, photo: &str) {
    if photo == DEFAULT_PHOTO || photo.is_empty() {
        return;
    }
    let path = state.config.image_dir().join(photo);
    tokio::spawn(async move {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("Failed to remove photo {:?}: {}", path, e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_photo_name() {
        let name = stored_photo_name("../../etc/my photo.png");
        assert_eq!(name.len(), 10 + "my_photo.png".len());
        assert!(name.ends_with("my_photo.png"));
        assert!(name[..10].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(stored_photo_name("a.png"), stored_photo_name("a.png"));
    }
}
