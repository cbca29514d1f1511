use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::{deny, ensure_active, Services};
use crate::access;
use crate::error::{Error, Result};
use crate::model::{Review, ReviewStatus, UserProfile};
use crate::storage::reviews;

/// Lowest accepted performance rating.
const MIN_RATING: f64 = 1.0;
/// Highest accepted performance rating.
const MAX_RATING: f64 = 5.0;

impl Services {
    /// Review someone else's goal.
    ///
    /// Directors, owners and administrators may review any goal they can
    /// reach; a manager needs access to the goal's division.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for a self-review or a rating outside
    /// 1 to 5, `Error::NotFound` for an unknown goal and
    /// `Error::AccessDenied` when the reviewer has no standing.
    pub fn submit_review(
        &self,
        actor: &UserProfile,
        goal_id: Uuid,
        rating: Option<f64>,
        comments: Option<&str>,
    ) -> Result<Review> {
        const ACTION: &str = "review.submit";
        ensure_active(actor, ACTION)?;
        let goal = self.goal(goal_id)?;

        if goal.user_id == actor.uid {
            return Err(Error::invalid_input("cannot review your own goal"));
        }
        if let Some(rating) = rating {
            if !(MIN_RATING..=MAX_RATING).contains(&rating) {
                return Err(Error::invalid_input(format!(
                    "rating must be between {MIN_RATING} and {MAX_RATING}"
                )));
            }
        }

        let division_access = match goal.related_division_id {
            Some(division_id) => access::can_access_division(actor, &self.scope(division_id)?),
            None => false,
        };
        if !(access::is_director_or_above(actor) || division_access) {
            return Err(deny(actor, ACTION));
        }

        let comments = comments.map(str::trim).filter(|c| !c.is_empty());
        let review = self.record(
            actor,
            ACTION,
            |conn| reviews::insert_review(conn, goal_id, goal.user_id, actor.uid, rating, comments),
            |review| {
                json!({ "review_id": review.id, "goal_id": goal_id, "reviewee_id": goal.user_id })
            },
        )?;
        info!("Review {} submitted for goal {}", review.id, goal_id);
        Ok(review)
    }

    /// Acknowledge a review. Only the reviewee may, and only once.
    ///
    /// # Errors
    ///
    /// Returns `Error::AccessDenied` for anyone but the reviewee and
    /// `Error::InvalidInput` if the review is already acknowledged.
    pub fn acknowledge_review(&self, actor: &UserProfile, review_id: Uuid) -> Result<Review> {
        const ACTION: &str = "review.acknowledge";
        ensure_active(actor, ACTION)?;
        let review = self
            .storage
            .get_review(review_id)?
            .ok_or_else(|| Error::not_found("reviews", review_id))?;

        if review.reviewee_id != actor.uid {
            return Err(deny(actor, ACTION));
        }
        if review.status == ReviewStatus::Acknowledged {
            return Err(Error::invalid_input("review already acknowledged"));
        }

        self.record(
            actor,
            ACTION,
            |conn| reviews::set_review_status(conn, review_id, ReviewStatus::Acknowledged),
            |_| json!({ "review_id": review_id }),
        )
    }

    /// Reviews the actor has received, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_received_reviews(&self, actor: &UserProfile) -> Result<Vec<Review>> {
        self.storage.list_reviews_for_reviewee(actor.uid)
    }

    /// Reviews of one goal. Visible to the goal's owner and to anyone who
    /// may review it.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown goal and
    /// `Error::AccessDenied` for anyone else.
    pub fn list_goal_reviews(&self, actor: &UserProfile, goal_id: Uuid) -> Result<Vec<Review>> {
        const ACTION: &str = "review.list";
        let goal = self.goal(goal_id)?;
        let division_access = match goal.related_division_id {
            Some(division_id) => access::can_access_division(actor, &self.scope(division_id)?),
            None => false,
        };
        if goal.user_id != actor.uid
            && !(access::is_director_or_above(actor) || division_access)
        {
            return Err(deny(actor, ACTION));
        }
        self.storage.list_reviews_for_goal(goal_id)
    }
}
