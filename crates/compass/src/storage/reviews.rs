use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::{now, time_at, time_text, uuid_at, Storage};
use crate::error::{Error, Result};
use crate::model::{Review, ReviewStatus};

const REVIEW_COLUMNS: &str =
    "id, goal_id, reviewee_id, reviewer_id, performance_rating, comments, status, submitted_at";

impl Storage {
    /// Insert a submitted review.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced row is missing or the query fails.
    pub fn insert_review(
        &self,
        goal_id: Uuid,
        reviewee_id: Uuid,
        reviewer_id: Uuid,
        performance_rating: Option<f64>,
        comments: Option<&str>,
    ) -> Result<Review> {
        insert_review(
            &*self.conn()?,
            goal_id,
            reviewee_id,
            reviewer_id,
            performance_rating,
            comments,
        )
    }

    /// Get a review by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_review(&self, id: Uuid) -> Result<Option<Review>> {
        fetch_review(&*self.conn()?, id)
    }

    /// Reviews written about `reviewee_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_reviews_for_reviewee(&self, reviewee_id: Uuid) -> Result<Vec<Review>> {
        self.query_reviews("reviewee_id", reviewee_id)
    }

    /// Reviews of one goal, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_reviews_for_goal(&self, goal_id: Uuid) -> Result<Vec<Review>> {
        self.query_reviews("goal_id", goal_id)
    }

    fn query_reviews(&self, column: &str, id: Uuid) -> Result<Vec<Review>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE {column} = ?1 ORDER BY submitted_at DESC"
        ))?;
        let reviews = stmt
            .query_map([id.to_string()], row_to_review)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    /// Move a review to `status`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the review does not exist.
    pub fn set_review_status(&self, id: Uuid, status: ReviewStatus) -> Result<Review> {
        set_review_status(&*self.conn()?, id, status)
    }
}

pub(crate) fn insert_review(
    conn: &Connection,
    goal_id: Uuid,
    reviewee_id: Uuid,
    reviewer_id: Uuid,
    performance_rating: Option<f64>,
    comments: Option<&str>,
) -> Result<Review> {
    let review = Review {
        id: Uuid::new_v4(),
        goal_id,
        reviewee_id,
        reviewer_id,
        performance_rating,
        comments: comments.map(str::to_string),
        status: ReviewStatus::Submitted,
        submitted_at: now(),
    };
    conn.execute(
        &format!("INSERT INTO reviews ({REVIEW_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        params![
            review.id.to_string(),
            goal_id.to_string(),
            reviewee_id.to_string(),
            reviewer_id.to_string(),
            performance_rating,
            review.comments,
            review.status,
            time_text(review.submitted_at),
        ],
    )?;
    debug!("Inserted review {} of goal {}", review.id, goal_id);
    Ok(review)
}

pub(crate) fn set_review_status(
    conn: &Connection,
    id: Uuid,
    status: ReviewStatus,
) -> Result<Review> {
    let affected = conn.execute(
        "UPDATE reviews SET status = ?2 WHERE id = ?1",
        params![id.to_string(), status],
    )?;
    if affected == 0 {
        return Err(Error::not_found("reviews", id));
    }
    fetch_review(conn, id)?.ok_or_else(|| Error::not_found("reviews", id))
}

fn fetch_review(conn: &Connection, id: Uuid) -> Result<Option<Review>> {
    let review = conn
        .query_row(
            &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?1"),
            [id.to_string()],
            row_to_review,
        )
        .optional()?;
    Ok(review)
}

fn row_to_review(row: &Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: uuid_at(row, 0)?,
        goal_id: uuid_at(row, 1)?,
        reviewee_id: uuid_at(row, 2)?,
        reviewer_id: uuid_at(row, 3)?,
        performance_rating: row.get(4)?,
        comments: row.get(5)?,
        status: row.get(6)?,
        submitted_at: time_at(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewGoal, UserRole};
    use crate::storage::test_support;

    #[test]
    fn test_insert_and_list_reviews() {
        let storage = test_support::storage();
        let ada = test_support::profile(&storage, "Ada", UserRole::Manager);
        let boss = test_support::profile(&storage, "Boss", UserRole::Owner);
        let goal = storage
            .insert_goal(
                ada.uid,
                &NewGoal {
                    title: "Ship".to_string(),
                    ..NewGoal::default()
                },
            )
            .unwrap();

        let review = storage
            .insert_review(goal.id, ada.uid, boss.uid, Some(4.0), Some("Solid"))
            .unwrap();
        assert_eq!(review.status, ReviewStatus::Submitted);

        let by_reviewee = storage.list_reviews_for_reviewee(ada.uid).unwrap();
        assert_eq!(by_reviewee, vec![review.clone()]);
        assert_eq!(storage.list_reviews_for_goal(goal.id).unwrap().len(), 1);
        assert!(storage.list_reviews_for_reviewee(boss.uid).unwrap().is_empty());

        let acknowledged = storage
            .set_review_status(review.id, ReviewStatus::Acknowledged)
            .unwrap();
        assert_eq!(acknowledged.status, ReviewStatus::Acknowledged);
        assert_eq!(acknowledged.performance_rating, Some(4.0));
    }

    #[test]
    fn test_set_review_status_missing() {
        let storage = test_support::storage();
        let err = storage
            .set_review_status(Uuid::new_v4(), ReviewStatus::Acknowledged)
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
