//! Volunteer leadership workflow
//!
//! Team members volunteer to lead a project and take leadership on the spot;
//! requests raised through the admin path wait in `pending` until an admin
//! accepts or rejects them. Recording the outcome of an accepted leadership
//! closes the request and moves the leader's points ledger.
//!
//! Every state transition is a conditional update: the filter carries the
//! expected status (or "leader unset"), so two racing writers cannot both
//! win. The filters and update documents are built by pure functions below
//! so the guards can be tested without a database. Where a transition spans
//! two documents, the second write failing unwinds the first with a
//! compensating update.

use std::collections::HashMap;

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::{FindOptions, UpdateOptions};
use tracing::{info, warn};

use crate::db::schemas::{
    PointsDoc, PointsTransaction, ProjectDoc, ProjectStatus, UserDoc, VolunteerOutcome,
    VolunteerRequestDoc, VolunteerStatus, POINTS_COLLECTION, PROJECT_COLLECTION, USER_COLLECTION,
    VOLUNTEER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::points;
use crate::types::{ForemanError, Result};

/// A granted leadership: the request plus the project it now leads
#[derive(Debug, Clone)]
pub struct VolunteerGrant {
    pub request: VolunteerRequestDoc,
    pub project: ProjectDoc,
}

/// A recorded outcome: the closed request plus the ledger it moved
#[derive(Debug, Clone)]
pub struct CompletionRecord {
    pub request: VolunteerRequestDoc,
    pub ledger: PointsDoc,
}

/// A request joined with its referents for listing
#[derive(Debug, Clone)]
pub struct RequestWithRefs {
    pub request: VolunteerRequestDoc,
    pub user: Option<UserDoc>,
    pub project: Option<ProjectDoc>,
}

/// A project a user could volunteer for, annotated with their standing
#[derive(Debug, Clone)]
pub struct AvailableProject {
    pub project: ProjectDoc,
    pub has_volunteered: bool,
    pub volunteer_status: Option<VolunteerStatus>,
    pub has_leader: bool,
    pub leader: Option<UserDoc>,
}

// =============================================================================
// Guards and conditional-update builders
// =============================================================================

/// Check that a user may volunteer for a project.
///
/// Forbidden when they are not on the team, Conflict when they already have
/// a request or the project is already led. Nothing is written when this
/// fails, so a second volunteer leaves exactly one request behind.
fn volunteer_eligibility(
    project: &ProjectDoc,
    user_id: &ObjectId,
    existing: Option<&VolunteerRequestDoc>,
) -> Result<()> {
    if !project.is_team_member(user_id) {
        return Err(ForemanError::Forbidden(
            "You must be part of the project team to volunteer as leader".into(),
        ));
    }
    if existing.is_some() {
        return Err(ForemanError::Conflict(
            "You have already volunteered for this project".into(),
        ));
    }
    if project.has_leader() {
        return Err(ForemanError::Conflict("Project already has a leader".into()));
    }
    Ok(())
}

/// Check that an admin decision (accept/reject) is still possible.
/// A processed request stays exactly as it is.
fn ensure_pending(request: &VolunteerRequestDoc) -> Result<()> {
    if request.status.is_pending() {
        Ok(())
    } else {
        Err(ForemanError::Conflict(
            "Request has already been processed".into(),
        ))
    }
}

/// Check that an outcome can be recorded for a request
fn ensure_accepted(request: &VolunteerRequestDoc) -> Result<()> {
    if request.status.is_accepted() {
        Ok(())
    } else {
        Err(ForemanError::Conflict("Request must be accepted first".into()))
    }
}

/// Compute the ledger entry for a recorded outcome.
///
/// Conflict when the request is not accepted: no transaction exists, so no
/// ledger document can be built, let alone written.
fn completion_award(
    request: &VolunteerRequestDoc,
    project: &ProjectDoc,
    outcome: VolunteerOutcome,
) -> Result<PointsTransaction> {
    ensure_accepted(request)?;
    Ok(points::transaction_for(project, outcome))
}

/// Filter matching a request only while it holds the expected status
fn decision_filter(request_id: ObjectId, expected: VolunteerStatus) -> Document {
    doc! { "_id": request_id, "status": expected.as_str() }
}

/// Filter matching a project only while nobody leads it
fn leader_claim_filter(project_id: ObjectId) -> Document {
    doc! { "_id": project_id, "project_leader": null }
}

fn leader_claim_update(user_id: ObjectId) -> Document {
    doc! { "$set": {
        "project_leader": user_id,
        "metadata.updated_at": DateTime::now(),
    } }
}

/// Hand back leadership taken by an accept that then lost the request race
fn leader_release_filter(project_id: ObjectId, user_id: ObjectId) -> Document {
    doc! { "_id": project_id, "project_leader": user_id }
}

fn leader_release_update() -> Document {
    doc! {
        "$unset": { "project_leader": "" },
        "$set": { "metadata.updated_at": DateTime::now() },
    }
}

fn accept_update() -> Document {
    doc! { "$set": {
        "status": VolunteerStatus::Accepted.as_str(),
        "metadata.updated_at": DateTime::now(),
    } }
}

fn reject_update(notes: Option<String>) -> Document {
    let mut set = doc! {
        "status": VolunteerStatus::Rejected.as_str(),
        "metadata.updated_at": DateTime::now(),
    };
    if let Some(notes) = notes {
        set.insert("notes", notes);
    }
    doc! { "$set": set }
}

fn completion_update(
    outcome: VolunteerOutcome,
    points: i64,
    notes: Option<String>,
) -> Document {
    let mut set = doc! {
        "status": VolunteerStatus::Completed.as_str(),
        "outcome": outcome.as_str(),
        "points_awarded": points,
        "completed_at": DateTime::now(),
        "metadata.updated_at": DateTime::now(),
    };
    if let Some(notes) = notes {
        set.insert("notes", notes);
    }
    doc! { "$set": set }
}

/// Step a completion whose ledger write failed back to accepted so the
/// award can be retried
fn reopen_update() -> Document {
    doc! {
        "$set": {
            "status": VolunteerStatus::Accepted.as_str(),
            "metadata.updated_at": DateTime::now(),
        },
        "$unset": { "outcome": "", "points_awarded": "", "completed_at": "" },
    }
}

/// The workflow service. Cheap to clone; collections are opened per call.
#[derive(Clone)]
pub struct VolunteerWorkflow {
    mongo: MongoClient,
}

impl VolunteerWorkflow {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    async fn projects(&self) -> Result<MongoCollection<ProjectDoc>> {
        self.mongo.collection(PROJECT_COLLECTION).await
    }

    async fn requests(&self) -> Result<MongoCollection<VolunteerRequestDoc>> {
        self.mongo.collection(VOLUNTEER_COLLECTION).await
    }

    async fn users(&self) -> Result<MongoCollection<UserDoc>> {
        self.mongo.collection(USER_COLLECTION).await
    }

    async fn ledgers(&self) -> Result<MongoCollection<PointsDoc>> {
        self.mongo.collection(POINTS_COLLECTION).await
    }

    /// Volunteer to lead a project.
    ///
    /// The caller must be on the project team and must not have volunteered
    /// before. Self-volunteering bypasses the pending flow: the request is
    /// recorded already accepted and the caller becomes leader immediately,
    /// provided nobody holds leadership yet.
    pub async fn volunteer(&self, project_id: ObjectId, user_id: ObjectId) -> Result<VolunteerGrant> {
        let projects = self.projects().await?;
        let mut project = projects
            .find_one(doc! { "_id": project_id })
            .await?
            .ok_or_else(|| ForemanError::NotFound("Project not found".into()))?;

        let requests = self.requests().await?;
        let existing = requests
            .find_one(doc! { "project_id": project_id, "user_id": user_id })
            .await?;

        volunteer_eligibility(&project, &user_id, existing.as_ref())?;

        let mut request =
            VolunteerRequestDoc::new(project_id, user_id, VolunteerStatus::Accepted);
        // The unique (project_id, user_id) index backstops the duplicate
        // check above; a race surfaces here as a Duplicate error.
        let request_id = requests.insert_one(request.clone()).await?;
        request._id = Some(request_id);

        // Take leadership only if it is still unclaimed
        let claimed = projects
            .update_one(leader_claim_filter(project_id), leader_claim_update(user_id))
            .await?;

        if claimed.matched_count == 0 {
            // Someone else took leadership between our read and write;
            // the request we just recorded is void.
            if let Err(e) = requests.delete_one(doc! { "_id": request_id }).await {
                warn!(
                    "Failed to remove void volunteer request {}: {}",
                    request_id, e
                );
            }
            return Err(ForemanError::Conflict("Project already has a leader".into()));
        }

        project.project_leader = Some(user_id);

        info!(
            "User {} volunteered and now leads project {} ({})",
            user_id, project_id, project.title
        );

        Ok(VolunteerGrant { request, project })
    }

    /// All requests, newest first, joined with user and project summaries
    pub async fn list_requests(&self) -> Result<Vec<RequestWithRefs>> {
        let requests = self.find_requests_sorted(doc! {}).await?;

        let user_ids: Vec<ObjectId> = requests.iter().map(|r| r.user_id).collect();
        let project_ids: Vec<ObjectId> = requests.iter().map(|r| r.project_id).collect();

        let users = self.fetch_users_by_id(user_ids).await?;
        let projects = self.fetch_projects_by_id(project_ids).await?;

        Ok(attach_refs(requests, &users, &projects))
    }

    /// The caller's requests, newest first, joined with project summaries
    pub async fn my_requests(&self, user_id: ObjectId) -> Result<Vec<RequestWithRefs>> {
        let requests = self.find_requests_sorted(doc! { "user_id": user_id }).await?;

        let project_ids: Vec<ObjectId> = requests.iter().map(|r| r.project_id).collect();
        let projects = self.fetch_projects_by_id(project_ids).await?;

        Ok(attach_refs(requests, &HashMap::new(), &projects))
    }

    /// Accept a pending request, assigning leadership to the volunteer.
    ///
    /// Fails when the request is no longer pending or the project already
    /// has a leader; a rejected accept leaves the request pending.
    pub async fn accept(&self, request_id: ObjectId) -> Result<VolunteerGrant> {
        let requests = self.requests().await?;
        let request = requests
            .find_one(doc! { "_id": request_id })
            .await?
            .ok_or_else(|| ForemanError::NotFound("Volunteer request not found".into()))?;

        ensure_pending(&request)?;

        let projects = self.projects().await?;
        let mut project = projects
            .find_one(doc! { "_id": request.project_id })
            .await?
            .ok_or_else(|| ForemanError::NotFound("Project not found".into()))?;

        if project.has_leader() {
            return Err(ForemanError::Conflict("Project already has a leader".into()));
        }

        // Leadership first: if another accept wins this write, the request
        // stays pending and nothing needs unwinding.
        let claimed = projects
            .update_one(
                leader_claim_filter(request.project_id),
                leader_claim_update(request.user_id),
            )
            .await?;

        if claimed.matched_count == 0 {
            return Err(ForemanError::Conflict("Project already has a leader".into()));
        }

        let updated = requests
            .find_one_and_update(
                decision_filter(request_id, VolunteerStatus::Pending),
                accept_update(),
            )
            .await?;

        let request = match updated {
            Some(r) => r,
            None => {
                // A concurrent decision beat us to the request; hand the
                // leadership we just took back.
                let release = projects
                    .update_one(
                        leader_release_filter(request.project_id, request.user_id),
                        leader_release_update(),
                    )
                    .await;
                if let Err(e) = release {
                    warn!(
                        "Failed to release leadership of project {} after lost accept race: {}",
                        request.project_id, e
                    );
                }
                return Err(ForemanError::Conflict(
                    "Request has already been processed".into(),
                ));
            }
        };

        project.project_leader = Some(request.user_id);

        info!(
            "Volunteer request {} accepted, user {} now leads project {}",
            request_id, request.user_id, request.project_id
        );

        Ok(VolunteerGrant { request, project })
    }

    /// Reject a pending request, recording optional notes
    pub async fn reject(
        &self,
        request_id: ObjectId,
        notes: Option<String>,
    ) -> Result<VolunteerRequestDoc> {
        let requests = self.requests().await?;
        let request = requests
            .find_one(doc! { "_id": request_id })
            .await?
            .ok_or_else(|| ForemanError::NotFound("Volunteer request not found".into()))?;

        ensure_pending(&request)?;

        let updated = requests
            .find_one_and_update(
                decision_filter(request_id, VolunteerStatus::Pending),
                reject_update(notes),
            )
            .await?
            .ok_or_else(|| ForemanError::Conflict("Request has already been processed".into()))?;

        info!("Volunteer request {} rejected", request_id);

        Ok(updated)
    }

    /// Record the outcome of an accepted leadership and move the ledger.
    ///
    /// The request flips to completed before the award is applied, so
    /// concurrent completions award at most once. No ledger write happens
    /// when the request is not accepted.
    pub async fn complete(
        &self,
        request_id: ObjectId,
        outcome: VolunteerOutcome,
        notes: Option<String>,
    ) -> Result<CompletionRecord> {
        let requests = self.requests().await?;
        let request = requests
            .find_one(doc! { "_id": request_id })
            .await?
            .ok_or_else(|| ForemanError::NotFound("Volunteer request not found".into()))?;

        ensure_accepted(&request)?;

        let projects = self.projects().await?;
        let project = projects
            .find_one(doc! { "_id": request.project_id })
            .await?
            .ok_or_else(|| ForemanError::NotFound("Project not found".into()))?;

        let transaction = completion_award(&request, &project, outcome)?;

        let request = requests
            .find_one_and_update(
                decision_filter(request_id, VolunteerStatus::Accepted),
                completion_update(outcome, transaction.points, notes),
            )
            .await?
            .ok_or_else(|| ForemanError::Conflict("Request has already been processed".into()))?;

        let ledgers = self.ledgers().await?;
        let update = points::ledger_award_update(&transaction)?;
        let options = UpdateOptions::builder().upsert(true).build();
        let award = ledgers
            .inner()
            .update_one(doc! { "employee_id": request.user_id }, update)
            .with_options(options)
            .await;

        if let Err(e) = award {
            // Reopen the request so the award can be retried; a completed
            // request with no ledger movement would be unrecoverable.
            let reopen = requests
                .update_one(
                    decision_filter(request_id, VolunteerStatus::Completed),
                    reopen_update(),
                )
                .await;
            if let Err(reopen_err) = reopen {
                warn!(
                    "Failed to reopen request {} after ledger failure: {}",
                    request_id, reopen_err
                );
            }
            return Err(ForemanError::Database(format!("Ledger update failed: {}", e)));
        }

        let ledger = ledgers
            .find_one(doc! { "employee_id": request.user_id })
            .await?
            .ok_or_else(|| ForemanError::Database("Ledger missing after award".into()))?;

        info!(
            "Outcome {} recorded for request {}: {} points to user {}",
            outcome, request_id, transaction.points, request.user_id
        );

        Ok(CompletionRecord { request, ledger })
    }

    /// Projects the user could lead: planning or active, user on the team,
    /// annotated with their volunteering standing and the current leader.
    pub async fn available_projects(&self, user_id: ObjectId) -> Result<Vec<AvailableProject>> {
        let projects = self.projects().await?;
        let open: Vec<bson::Bson> = ProjectStatus::open_for_volunteering()
            .iter()
            .map(|s| bson::Bson::String(s.to_string()))
            .collect();

        let candidates = projects
            .find_many(doc! {
                "status": { "$in": open },
                "$or": [
                    { "coders": user_id },
                    { "freelancers": user_id },
                    { "lead_assignee": user_id },
                ],
            })
            .await?;

        let project_ids: Vec<ObjectId> = candidates.iter().filter_map(|p| p._id).collect();

        let requests = self.requests().await?;
        let mine = if project_ids.is_empty() {
            Vec::new()
        } else {
            requests
                .find_many(doc! {
                    "user_id": user_id,
                    "project_id": { "$in": project_ids },
                })
                .await?
        };

        let leader_ids: Vec<ObjectId> = candidates.iter().filter_map(|p| p.project_leader).collect();
        let leaders = self.fetch_users_by_id(leader_ids).await?;

        Ok(annotate_available(candidates, &mine, &leaders))
    }

    /// Requests matching a filter, newest first
    async fn find_requests_sorted(&self, filter: Document) -> Result<Vec<VolunteerRequestDoc>> {
        use futures::stream::StreamExt;

        let requests = self.requests().await?;

        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let options = FindOptions::builder()
            .sort(doc! { "metadata.created_at": -1 })
            .build();

        let mut cursor = requests
            .inner()
            .find(full_filter)
            .with_options(options)
            .await
            .map_err(|e| ForemanError::Database(format!("Find failed: {}", e)))?;

        let mut results = Vec::new();
        while let Some(doc) = cursor.next().await {
            match doc {
                Ok(d) => results.push(d),
                Err(e) => warn!("Error reading volunteer request: {}", e),
            }
        }

        Ok(results)
    }

    async fn fetch_users_by_id(&self, ids: Vec<ObjectId>) -> Result<HashMap<ObjectId, UserDoc>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = self.users().await?;
        let docs = users.find_many(doc! { "_id": { "$in": ids } }).await?;

        Ok(docs.into_iter().filter_map(|u| u._id.map(|id| (id, u))).collect())
    }

    async fn fetch_projects_by_id(
        &self,
        ids: Vec<ObjectId>,
    ) -> Result<HashMap<ObjectId, ProjectDoc>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let projects = self.projects().await?;
        let docs = projects.find_many(doc! { "_id": { "$in": ids } }).await?;

        Ok(docs.into_iter().filter_map(|p| p._id.map(|id| (id, p))).collect())
    }
}

/// Join requests with whatever referents were found. A missing user or
/// project (deleted since) leaves the slot empty rather than dropping the
/// request from the listing.
fn attach_refs(
    requests: Vec<VolunteerRequestDoc>,
    users: &HashMap<ObjectId, UserDoc>,
    projects: &HashMap<ObjectId, ProjectDoc>,
) -> Vec<RequestWithRefs> {
    requests
        .into_iter()
        .map(|request| RequestWithRefs {
            user: users.get(&request.user_id).cloned(),
            project: projects.get(&request.project_id).cloned(),
            request,
        })
        .collect()
}

/// Annotate candidate projects with the caller's standing and leader info
fn annotate_available(
    projects: Vec<ProjectDoc>,
    requests: &[VolunteerRequestDoc],
    leaders: &HashMap<ObjectId, UserDoc>,
) -> Vec<AvailableProject> {
    projects
        .into_iter()
        .map(|project| {
            let request = project
                ._id
                .and_then(|pid| requests.iter().find(|r| r.project_id == pid));
            let leader = project
                .project_leader
                .and_then(|lid| leaders.get(&lid).cloned());

            AvailableProject {
                has_volunteered: request.is_some(),
                volunteer_status: request.map(|r| r.status),
                has_leader: project.has_leader(),
                leader,
                project,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{Metadata, ProjectPriority};

    fn request_for(project_id: ObjectId, user_id: ObjectId, status: VolunteerStatus) -> VolunteerRequestDoc {
        VolunteerRequestDoc::new(project_id, user_id, status)
    }

    fn project_named(id: ObjectId, title: &str) -> ProjectDoc {
        ProjectDoc {
            _id: Some(id),
            metadata: Metadata::new(),
            title: title.to_string(),
            description: String::new(),
            priority: ProjectPriority::Medium,
            status: ProjectStatus::Active,
            ..Default::default()
        }
    }

    fn user_named(id: ObjectId, first: &str, last: &str) -> UserDoc {
        UserDoc {
            _id: Some(id),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            ..Default::default()
        }
    }

    #[test]
    fn test_outsider_cannot_volunteer() {
        let project = project_named(ObjectId::new(), "Skunkworks");
        let outsider = ObjectId::new();

        let err = volunteer_eligibility(&project, &outsider, None).unwrap_err();
        assert!(matches!(err, ForemanError::Forbidden(_)));
    }

    #[test]
    fn test_second_volunteer_is_a_conflict() {
        let user_id = ObjectId::new();
        let mut project = project_named(ObjectId::new(), "Skunkworks");
        project.coders.push(user_id);

        let first = request_for(project._id.unwrap(), user_id, VolunteerStatus::Accepted);
        let err = volunteer_eligibility(&project, &user_id, Some(&first)).unwrap_err();
        assert!(matches!(err, ForemanError::Conflict(_)));

        // Without a prior request the same caller is eligible
        assert!(volunteer_eligibility(&project, &user_id, None).is_ok());
    }

    #[test]
    fn test_cannot_volunteer_for_led_project() {
        let user_id = ObjectId::new();
        let mut project = project_named(ObjectId::new(), "Skunkworks");
        project.coders.push(user_id);
        project.project_leader = Some(ObjectId::new());

        let err = volunteer_eligibility(&project, &user_id, None).unwrap_err();
        assert!(matches!(err, ForemanError::Conflict(_)));
    }

    #[test]
    fn test_processed_request_blocks_decisions() {
        let pending = request_for(ObjectId::new(), ObjectId::new(), VolunteerStatus::Pending);
        assert!(ensure_pending(&pending).is_ok());

        for status in [
            VolunteerStatus::Accepted,
            VolunteerStatus::Rejected,
            VolunteerStatus::Completed,
        ] {
            let request = request_for(ObjectId::new(), ObjectId::new(), status);
            let err = ensure_pending(&request).unwrap_err();
            assert!(matches!(err, ForemanError::Conflict(_)), "{:?}", status);
            // The guard fires before any update document is built, so the
            // stored request keeps its status.
            assert_eq!(request.status, status);
        }
    }

    #[test]
    fn test_no_award_for_unaccepted_request() {
        let project = project_named(ObjectId::new(), "Skunkworks");

        for status in [
            VolunteerStatus::Pending,
            VolunteerStatus::Rejected,
            VolunteerStatus::Completed,
        ] {
            let request = request_for(project._id.unwrap(), ObjectId::new(), status);
            let err = completion_award(&request, &project, VolunteerOutcome::Success).unwrap_err();
            assert!(matches!(err, ForemanError::Conflict(_)), "{:?}", status);
        }

        // Only an accepted request yields a transaction to apply
        let accepted = request_for(
            project._id.unwrap(),
            ObjectId::new(),
            VolunteerStatus::Accepted,
        );
        let tx = completion_award(&accepted, &project, VolunteerOutcome::Success).unwrap();
        assert_eq!(tx.points, 60);
    }

    #[test]
    fn test_decision_filter_guards_on_expected_status() {
        let request_id = ObjectId::new();
        let filter = decision_filter(request_id, VolunteerStatus::Pending);

        assert_eq!(filter.get_object_id("_id").unwrap(), request_id);
        assert_eq!(filter.get_str("status").unwrap(), "pending");

        let filter = decision_filter(request_id, VolunteerStatus::Accepted);
        assert_eq!(filter.get_str("status").unwrap(), "accepted");
    }

    #[test]
    fn test_leader_claim_requires_unset_leader() {
        let project_id = ObjectId::new();
        let user_id = ObjectId::new();

        let filter = leader_claim_filter(project_id);
        assert_eq!(filter.get_object_id("_id").unwrap(), project_id);
        assert!(matches!(
            filter.get("project_leader"),
            Some(bson::Bson::Null)
        ));

        let update = leader_claim_update(user_id);
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_object_id("project_leader").unwrap(), user_id);
    }

    #[test]
    fn test_leader_release_only_unsets_own_claim() {
        let project_id = ObjectId::new();
        let user_id = ObjectId::new();

        let filter = leader_release_filter(project_id, user_id);
        assert_eq!(filter.get_object_id("project_leader").unwrap(), user_id);

        let update = leader_release_update();
        assert!(update.get_document("$unset").unwrap().contains_key("project_leader"));
    }

    #[test]
    fn test_reject_update_records_notes_only_when_given() {
        let update = reject_update(Some("Not enough capacity".to_string()));
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "rejected");
        assert_eq!(set.get_str("notes").unwrap(), "Not enough capacity");

        let update = reject_update(None);
        let set = update.get_document("$set").unwrap();
        assert!(!set.contains_key("notes"));
    }

    #[test]
    fn test_completion_update_carries_outcome_fields() {
        let update = completion_update(VolunteerOutcome::Failure, -100, None);
        let set = update.get_document("$set").unwrap();

        assert_eq!(set.get_str("status").unwrap(), "completed");
        assert_eq!(set.get_str("outcome").unwrap(), "failure");
        assert_eq!(set.get_i64("points_awarded").unwrap(), -100);
        assert!(set.contains_key("completed_at"));
    }

    #[test]
    fn test_reopen_clears_completion_fields() {
        let update = reopen_update();

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "accepted");

        let unset = update.get_document("$unset").unwrap();
        for field in ["outcome", "points_awarded", "completed_at"] {
            assert!(unset.contains_key(field), "{} not cleared", field);
        }
    }

    #[test]
    fn test_attach_refs_joins_both_sides() {
        let user_id = ObjectId::new();
        let project_id = ObjectId::new();

        let mut users = HashMap::new();
        users.insert(user_id, user_named(user_id, "Grace", "Hopper"));
        let mut projects = HashMap::new();
        projects.insert(project_id, project_named(project_id, "Compiler port"));

        let joined = attach_refs(
            vec![request_for(project_id, user_id, VolunteerStatus::Pending)],
            &users,
            &projects,
        );

        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].user.as_ref().unwrap().first_name, "Grace");
        assert_eq!(joined[0].project.as_ref().unwrap().title, "Compiler port");
    }

    #[test]
    fn test_attach_refs_tolerates_missing_referents() {
        let joined = attach_refs(
            vec![request_for(ObjectId::new(), ObjectId::new(), VolunteerStatus::Rejected)],
            &HashMap::new(),
            &HashMap::new(),
        );

        assert_eq!(joined.len(), 1);
        assert!(joined[0].user.is_none());
        assert!(joined[0].project.is_none());
        assert_eq!(joined[0].request.status, VolunteerStatus::Rejected);
    }

    #[test]
    fn test_annotate_available_marks_volunteered_projects() {
        let user_id = ObjectId::new();
        let volunteered_id = ObjectId::new();
        let fresh_id = ObjectId::new();

        let annotated = annotate_available(
            vec![
                project_named(volunteered_id, "Mobile app"),
                project_named(fresh_id, "Design system"),
            ],
            &[request_for(volunteered_id, user_id, VolunteerStatus::Pending)],
            &HashMap::new(),
        );

        let by_title = |t: &str| annotated.iter().find(|a| a.project.title == t).unwrap();

        let volunteered = by_title("Mobile app");
        assert!(volunteered.has_volunteered);
        assert_eq!(volunteered.volunteer_status, Some(VolunteerStatus::Pending));

        let fresh = by_title("Design system");
        assert!(!fresh.has_volunteered);
        assert!(fresh.volunteer_status.is_none());
        assert!(!fresh.has_leader);
    }

    #[test]
    fn test_annotate_available_resolves_leader() {
        let leader_id = ObjectId::new();
        let project_id = ObjectId::new();

        let mut project = project_named(project_id, "Launch site");
        project.project_leader = Some(leader_id);

        let mut leaders = HashMap::new();
        leaders.insert(leader_id, user_named(leader_id, "Margaret", "Hamilton"));

        let annotated = annotate_available(vec![project], &[], &leaders);

        assert!(annotated[0].has_leader);
        assert_eq!(
            annotated[0].leader.as_ref().unwrap().full_name(),
            "Margaret Hamilton"
        );
    }
}
