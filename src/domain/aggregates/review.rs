//! Review Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::Slug;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    id: Uuid,
    product_slug: Slug,
    name: String,
    rating: u8,
    comment: String,
    approved: bool,
    created_at: DateTime<Utc>,
}

impl Review {
    /// New reviews start unapproved and do not count towards the rating.
    pub fn submit(product_slug: Slug, name: &str, rating: u8, comment: &str) -> Result<Self, ReviewError> {
        if name.trim().is_empty() { return Err(ReviewError::MissingName); }
        if comment.trim().is_empty() { return Err(ReviewError::MissingComment); }
        if !(1..=5).contains(&rating) { return Err(ReviewError::InvalidRating); }
        Ok(Self {
            id: Uuid::now_v7(), product_slug, name: name.trim().to_string(), rating,
            comment: comment.trim().to_string(), approved: false, created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn product_slug(&self) -> &Slug { &self.product_slug }
    pub fn rating(&self) -> u8 { self.rating }
    pub fn is_approved(&self) -> bool { self.approved }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn approve(&mut self) { self.approved = true; }
}

/// Aggregate over approved reviews only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary { pub count: usize, pub average: f64 }

impl RatingSummary {
    pub fn of<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let (count, sum) = reviews.into_iter()
            .filter(|r| r.approved)
            .fold((0usize, 0u32), |(n, s), r| (n + 1, s + u32::from(r.rating)));
        if count == 0 { return Self::default(); }
        let average = f64::from(sum) / count as f64;
        Self { count, average: (average * 10.0).round() / 10.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ReviewError { MissingName, MissingComment, InvalidRating }
impl std::error::Error for ReviewError {}
impl std::fmt::Display for ReviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Missing required field: name"),
            Self::MissingComment => write!(f, "Missing required field: comment"),
            Self::InvalidRating => write!(f, "Rating must be between 1 and 5"),
        }
    }
}
