//! [`Workflow`]: the operations the outside world calls.
//!
//! Every operation follows the same shape: load the review, open a [`Unit`],
//! run the engine steps against it, apply the changeset in one transaction,
//! and only then release the outbound jobs.

use std::{collections::HashMap, sync::Arc};

use demotime_core::{
  changeset::{ApplyOutcome, Changeset, Mutation},
  comment::{Comment, Issue},
  event::{Event, EventCode},
  message::MessageTemplate,
  outbound::{OutboundJob, OutboundQueue},
  review::{Creator, Review, ReviewSnapshot, Revision},
  settings::{self, REMINDER_DAYS},
  state::{DemoState, ReviewerState},
  store::ReviewStore,
  time::{BusinessCalendar, Clock, SystemClock, WeekdayCalendar},
  user::User,
  webhook::Trigger,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  EngineConfig,
  Error,
  Result,
  consensus,
  demo_machine,
  events,
  fanout,
  notify::{self, Notice},
  participants,
  reminders,
  unit::Unit,
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input for [`Workflow::create_review`]. The acting user becomes the first
/// owner.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
  pub project_id:  Uuid,
  pub title:       String,
  pub description: String,
  #[serde(default)]
  pub case_link:   String,
  #[serde(default)]
  pub is_public:   bool,
  #[serde(default)]
  pub reviewers:   Vec<Uuid>,
  #[serde(default)]
  pub followers:   Vec<Uuid>,
  /// A second owner besides the actor.
  #[serde(default)]
  pub co_owner:    Option<Uuid>,
  /// Leave the review in `draft` instead of opening it.
  #[serde(default)]
  pub draft:       bool,
}

/// Input for [`Workflow::update_review`]. `None` participant lists are left
/// as they are.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewUpdate {
  pub title:       String,
  pub description: String,
  #[serde(default)]
  pub case_link:   String,
  #[serde(default)]
  pub reviewers:   Option<Vec<Uuid>>,
  #[serde(default)]
  pub followers:   Option<Vec<Uuid>>,
}

// ─── Workflow ────────────────────────────────────────────────────────────────

/// The review workflow engine over a store and an outbound queue.
pub struct Workflow<S, Q> {
  store:    S,
  queue:    Q,
  clock:    Arc<dyn Clock>,
  calendar: Arc<dyn BusinessCalendar>,
  config:   EngineConfig,
}

impl<S: ReviewStore, Q: OutboundQueue> Workflow<S, Q> {
  pub fn new(store: S, queue: Q, config: EngineConfig) -> Self {
    Self {
      store,
      queue,
      clock: Arc::new(SystemClock),
      calendar: Arc::new(WeekdayCalendar),
      config,
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_calendar(mut self, calendar: Arc<dyn BusinessCalendar>) -> Self {
    self.calendar = calendar;
    self
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn queue(&self) -> &Q { &self.queue }

  pub fn config(&self) -> &EngineConfig { &self.config }

  // ── Plumbing ──────────────────────────────────────────────────────────────

  async fn load(&self, review_id: Uuid) -> Result<ReviewSnapshot> {
    self
      .store
      .load_review(review_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ReviewNotFound(review_id))
  }

  async fn user(&self, user_id: Uuid) -> Result<User> {
    self
      .store
      .get_user(user_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::UserNotFound(user_id))
  }

  /// Make sure the snapshot carries the user record for each of `ids`.
  async fn load_users(
    &self,
    snap: &mut ReviewSnapshot,
    ids: impl IntoIterator<Item = Uuid>,
  ) -> Result<()> {
    for id in ids {
      if !snap.users.contains_key(&id) {
        let user = self.user(id).await?;
        snap.users.insert(id, user);
      }
    }
    Ok(())
  }

  async fn reminder_days(&self, project_id: Uuid) -> Result<u32> {
    let setting = self
      .store
      .get_setting(project_id, REMINDER_DAYS)
      .await
      .map_err(Error::store)?;
    Ok(settings::reminder_days(
      setting.as_ref(),
      self.config.default_reminder_days,
    ))
  }

  async fn begin(&self, snap: ReviewSnapshot, actor: Uuid) -> Result<Unit<'_>> {
    let days = self.reminder_days(snap.review.project_id).await?;
    Ok(Unit::new(
      snap,
      actor,
      self.clock.now(),
      days,
      &self.config,
      self.calendar.as_ref(),
    ))
  }

  /// Apply the unit's changeset, then release its jobs.
  async fn commit(&self, unit: Unit<'_>) -> Result<ReviewSnapshot> {
    let review_id = unit.review_id();
    let (snap, changes, jobs) = unit.into_parts();
    if !changes.is_empty() {
      let count = changes.len();
      match self.store.apply(changes).await.map_err(Error::store)? {
        ApplyOutcome::Committed => {
          debug!(%review_id, mutations = count, "changeset committed");
        }
        ApplyOutcome::Conflict => {
          warn!(%review_id, "changeset rejected by a compare-and-set guard");
          return Err(Error::ConcurrentModification(review_id));
        }
      }
    }
    self.release(jobs)?;
    Ok(snap)
  }

  fn release(&self, jobs: Vec<OutboundJob>) -> Result<()> {
    for job in jobs {
      if let Err(err) = self.queue.enqueue(job) {
        if self.config.strict_delivery {
          return Err(Error::Delivery(err.to_string()));
        }
        warn!(error = %err, "dropping outbound job");
      }
    }
    Ok(())
  }

  fn authorize(
    &self,
    snap: &ReviewSnapshot,
    actor: Uuid,
    action: &'static str,
  ) -> Result<()> {
    if actor == self.config.system_actor || snap.is_creator(actor) {
      Ok(())
    } else {
      Err(Error::PermissionDenied { user_id: actor, action })
    }
  }

  /// Owners manage everyone; anyone else may only add or drop themselves.
  fn authorize_for(
    &self,
    snap: &ReviewSnapshot,
    actor: Uuid,
    user_id: Uuid,
    action: &'static str,
  ) -> Result<()> {
    if actor == user_id {
      return Ok(());
    }
    self.authorize(snap, actor, action)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn review(&self, review_id: Uuid) -> Result<ReviewSnapshot> {
    self.load(review_id).await
  }

  pub async fn events(&self, review_id: Uuid) -> Result<Vec<Event>> {
    self.load(review_id).await?;
    self.store.events(review_id).await.map_err(Error::store)
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  /// Create a review with revision 1. Unless `input.draft` is set the review
  /// is opened straight away, which notifies every participant.
  pub async fn create_review(
    &self,
    input: NewReview,
    actor: Uuid,
  ) -> Result<ReviewSnapshot> {
    let project = self
      .store
      .get_project(input.project_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ProjectNotFound(input.project_id))?;
    if input.title.trim().is_empty() {
      return Err(Error::Validation("a review needs a title".to_owned()));
    }
    let webhooks = self
      .store
      .webhooks(project.project_id)
      .await
      .map_err(Error::store)?;

    let mut owners = vec![actor];
    if let Some(co_owner) = input.co_owner.filter(|id| *id != actor) {
      owners.push(co_owner);
    }

    let now = self.clock.now();
    let review_id = Uuid::new_v4();
    let review = Review {
      review_id,
      project_id: project.project_id,
      title: input.title,
      description: input.description.clone(),
      case_link: input.case_link,
      demo_state: DemoState::Draft,
      reviewer_state: ReviewerState::Reviewing,
      is_public: input.is_public,
      created_at: now,
      modified_at: now,
    };
    let revision = Revision {
      revision_id: Uuid::new_v4(),
      review_id,
      number: 1,
      description: input.description,
      created_at: now,
    };
    let mut snap = ReviewSnapshot {
      review: review.clone(),
      project,
      revision: revision.clone(),
      reviewers: Vec::new(),
      followers: Vec::new(),
      creators: Vec::new(),
      webhooks,
      users: Default::default(),
    };
    let everyone = owners
      .iter()
      .chain(&input.reviewers)
      .chain(&input.followers)
      .copied()
      .collect::<Vec<_>>();
    self.load_users(&mut snap, everyone).await?;

    let mut unit = self.begin(snap, actor).await?;
    unit.push(Mutation::InsertReview(review));
    unit.push(Mutation::InsertRevision(revision));
    for owner in owners {
      let row = Creator::new(review_id, owner, now);
      unit.snap.creators.push(row.clone());
      unit.push(Mutation::UpsertCreator(row));
      unit.push(Mutation::EnsureReadStatus {
        review_id,
        user_id: owner,
        at: now,
      });
    }
    for reviewer in input.reviewers {
      if !unit.snap.is_creator(reviewer) {
        participants::add_reviewer(&mut unit, reviewer);
      }
    }
    for follower in input.followers {
      if !unit.snap.is_creator(follower) {
        participants::add_follower(&mut unit, follower);
      }
    }
    if !input.draft {
      demo_machine::transition(&mut unit, DemoState::Open)?;
    }

    let snap = self.commit(unit).await?;
    info!(%review_id, %actor, state = %snap.review.demo_state, "review created");
    Ok(snap)
  }

  /// Publish a new revision, optionally replacing the reviewer and follower
  /// sets.
  pub async fn update_review(
    &self,
    review_id: Uuid,
    update: ReviewUpdate,
    actor: Uuid,
  ) -> Result<ReviewSnapshot> {
    let mut snap = self.load(review_id).await?;
    self.authorize(&snap, actor, "update the review")?;
    if snap.review.demo_state.is_terminal() {
      return Err(Error::Validation(
        "a cancelled review cannot be updated".to_owned(),
      ));
    }
    if update.title.trim().is_empty() {
      return Err(Error::Validation("a review needs a title".to_owned()));
    }
    let wanted = update
      .reviewers
      .iter()
      .flatten()
      .chain(update.followers.iter().flatten())
      .copied()
      .collect::<Vec<_>>();
    self.load_users(&mut snap, wanted).await?;

    let mut unit = self.begin(snap, actor).await?;
    let now = unit.now;
    unit.push(Mutation::UpdateReviewDetails {
      review_id,
      title: update.title.clone(),
      description: update.description.clone(),
      case_link: update.case_link.clone(),
      at: now,
    });
    unit.snap.review.title = update.title;
    unit.snap.review.description = update.description.clone();
    unit.snap.review.case_link = update.case_link;
    unit.touch();

    let revision = Revision {
      revision_id: Uuid::new_v4(),
      review_id,
      number: unit.snap.revision.number + 1,
      description: update.description,
      created_at: now,
    };
    unit.push(Mutation::InsertRevision(revision.clone()));
    unit.snap.revision = revision.clone();

    if let Some(wanted) = update.reviewers {
      let current: Vec<Uuid> = unit.snap.active_reviewers().map(|r| r.user_id).collect();
      for user_id in current.iter().filter(|id| !wanted.contains(id)) {
        participants::drop_reviewer(&mut unit, *user_id)?;
      }
      for user_id in wanted {
        if !unit.snap.is_creator(user_id) {
          participants::add_reviewer(&mut unit, user_id);
        }
      }
    }
    if let Some(wanted) = update.followers {
      let current: Vec<Uuid> = unit.snap.active_followers().map(|f| f.user_id).collect();
      for user_id in current.iter().filter(|id| !wanted.contains(id)) {
        participants::drop_follower(&mut unit, *user_id);
      }
      for user_id in wanted {
        if !unit.snap.is_creator(user_id) {
          participants::add_follower(&mut unit, user_id);
        }
      }
    }

    if !unit.is_draft() {
      events::record(&mut unit, EventCode::RevisionAdded, &revision);
      let subject = format!("Update on Review: {}", unit.snap.review.title);
      let context = json!({ "review_id": review_id, "revision": revision.number });
      let audience = unit.snap.audience();
      notify::send_all(&mut unit, audience, |to| {
        Notice::new(to, subject.clone(), MessageTemplate::Review).with_context(context.clone())
      });
      if unit.snap.review.demo_state == DemoState::Open {
        reminders::set_active_for_review(&mut unit, true);
      }
      fanout::demo_state(&mut unit, Trigger::Updated, None);
    }
    consensus::recompute(&mut unit);

    let snap = self.commit(unit).await?;
    info!(%review_id, %actor, revision = revision.number, "review updated");
    Ok(snap)
  }

  // ── Demo state ────────────────────────────────────────────────────────────

  /// [`transition`](Self::transition) by state name.
  pub async fn change_state(
    &self,
    review_id: Uuid,
    state: &str,
    actor: Uuid,
  ) -> Result<bool> {
    let target = DemoState::from_name(state)
      .map_err(|_| Error::InvalidState(state.to_owned()))?;
    self.transition(review_id, target, actor).await
  }

  /// Move the review to `target` and run its entry action. Returns `false`
  /// when the review was already in `target`.
  pub async fn transition(
    &self,
    review_id: Uuid,
    target: DemoState,
    actor: Uuid,
  ) -> Result<bool> {
    let snap = self.load(review_id).await?;
    self.authorize(&snap, actor, "change the demo state")?;
    let mut unit = self.begin(snap, actor).await?;
    let changed = demo_machine::transition(&mut unit, target)?;
    self.commit(unit).await?;
    Ok(changed)
  }

  // ── Votes ─────────────────────────────────────────────────────────────────

  /// Re-derive the consensus. Returns the new state when it changed.
  pub async fn recompute(
    &self,
    review_id: Uuid,
    actor: Uuid,
  ) -> Result<Option<ReviewerState>> {
    let snap = self.load(review_id).await?;
    let mut unit = self.begin(snap, actor).await?;
    let changed = consensus::recompute(&mut unit);
    self.commit(unit).await?;
    Ok(changed)
  }

  /// Record `voter`'s vote and recompute the consensus. Returns the new
  /// consensus when the vote moved it.
  pub async fn cast_vote(
    &self,
    review_id: Uuid,
    voter: Uuid,
    status: ReviewerState,
  ) -> Result<Option<ReviewerState>> {
    let snap = self.load(review_id).await?;
    let previous = snap
      .reviewer(voter)
      .filter(|r| r.is_active)
      .map(|r| r.status)
      .ok_or(Error::ReviewerNotFound { review_id, user_id: voter })?;
    if snap.review.demo_state != DemoState::Open {
      return Err(Error::Validation(format!(
        "votes are only accepted while the demo is open, not {}",
        snap.review.demo_state
      )));
    }

    let mut unit = self.begin(snap, voter).await?;
    let now = unit.now;
    unit.push(Mutation::SetReviewerStatus {
      review_id,
      user_id: voter,
      status,
      at: now,
    });
    let mut row = None;
    if let Some(reviewer) = unit.snap.reviewer_mut(voter) {
      reviewer.status = status;
      reviewer.modified_at = now;
      row = Some(reviewer.clone());
    }
    let code = match status {
      ReviewerState::Approved => EventCode::ReviewerApproved,
      ReviewerState::Rejected => EventCode::ReviewerRejected,
      ReviewerState::Reviewing => EventCode::ReviewerReset,
    };
    if let Some(row) = &row {
      events::record(&mut unit, code, row);
    }

    // A consensus change sets the voter's reminder itself.
    let consensus = consensus::recompute(&mut unit);
    if consensus.is_none() {
      reminders::set_active(&mut unit, voter, status == ReviewerState::Reviewing);
    }
    if consensus.is_none() && status != previous {
      let name = unit.snap.user_name(voter);
      let verb = match status {
        ReviewerState::Reviewing => "resumed reviewing",
        ReviewerState::Approved => "has approved",
        ReviewerState::Rejected => "has rejected",
      };
      let subject = format!("{name} {verb} your review: {}", unit.snap.review.title);
      let context = json!({ "review_id": review_id, "name": name, "status": status.title() });
      let creators = unit.snap.creator_ids();
      notify::send_all(&mut unit, creators, |to| {
        Notice::new(to, subject.clone(), MessageTemplate::ReviewerStatusChange)
          .with_context(context.clone())
      });
    }

    self.commit(unit).await?;
    info!(%review_id, %voter, vote = %status, ?consensus, "vote cast");
    Ok(consensus)
  }

  // ── Participants ──────────────────────────────────────────────────────────

  /// Returns `false` when the user was already an active reviewer.
  pub async fn add_reviewer(
    &self,
    review_id: Uuid,
    user_id: Uuid,
    actor: Uuid,
  ) -> Result<bool> {
    let mut snap = self.load(review_id).await?;
    self.authorize_for(&snap, actor, user_id, "add a reviewer")?;
    if snap.is_reviewer(user_id) {
      return Ok(false);
    }
    self.load_users(&mut snap, [user_id]).await?;
    let mut unit = self.begin(snap, actor).await?;
    participants::add_reviewer(&mut unit, user_id);
    consensus::recompute(&mut unit);
    self.commit(unit).await?;
    Ok(true)
  }

  pub async fn drop_reviewer(
    &self,
    review_id: Uuid,
    user_id: Uuid,
    actor: Uuid,
  ) -> Result<()> {
    let snap = self.load(review_id).await?;
    self.authorize_for(&snap, actor, user_id, "drop a reviewer")?;
    let mut unit = self.begin(snap, actor).await?;
    participants::drop_reviewer(&mut unit, user_id)?;
    consensus::recompute(&mut unit);
    self.commit(unit).await?;
    Ok(())
  }

  /// Returns `false` when the user already follows or reviews the demo.
  pub async fn add_follower(
    &self,
    review_id: Uuid,
    user_id: Uuid,
    actor: Uuid,
  ) -> Result<bool> {
    let mut snap = self.load(review_id).await?;
    self.authorize_for(&snap, actor, user_id, "add a follower")?;
    if snap.is_reviewer(user_id) || snap.is_follower(user_id) {
      return Ok(false);
    }
    self.load_users(&mut snap, [user_id]).await?;
    let mut unit = self.begin(snap, actor).await?;
    let added = participants::add_follower(&mut unit, user_id);
    self.commit(unit).await?;
    Ok(added)
  }

  /// Returns `false` when the user was not following.
  pub async fn drop_follower(
    &self,
    review_id: Uuid,
    user_id: Uuid,
    actor: Uuid,
  ) -> Result<bool> {
    let snap = self.load(review_id).await?;
    self.authorize_for(&snap, actor, user_id, "drop a follower")?;
    let mut unit = self.begin(snap, actor).await?;
    let dropped = participants::drop_follower(&mut unit, user_id);
    self.commit(unit).await?;
    Ok(dropped)
  }

  /// Returns `false` when the user was already an owner.
  pub async fn add_creator(
    &self,
    review_id: Uuid,
    user_id: Uuid,
    actor: Uuid,
  ) -> Result<bool> {
    let mut snap = self.load(review_id).await?;
    self.authorize(&snap, actor, "add an owner")?;
    self.load_users(&mut snap, [user_id]).await?;
    let mut unit = self.begin(snap, actor).await?;
    let added = participants::add_creator(&mut unit, user_id)?;
    self.commit(unit).await?;
    Ok(added)
  }

  /// Returns `false` when the user was not an owner.
  pub async fn drop_creator(
    &self,
    review_id: Uuid,
    user_id: Uuid,
    actor: Uuid,
  ) -> Result<bool> {
    let snap = self.load(review_id).await?;
    self.authorize(&snap, actor, "drop an owner")?;
    let mut unit = self.begin(snap, actor).await?;
    let dropped = participants::drop_creator(&mut unit, user_id)?;
    self.commit(unit).await?;
    Ok(dropped)
  }

  // ── Comments and issues ───────────────────────────────────────────────────

  /// Post a comment on the latest revision. A `thread_id` continues an
  /// existing thread; without one the comment starts its own.
  pub async fn add_comment(
    &self,
    review_id: Uuid,
    commenter: Uuid,
    body: String,
    thread_id: Option<Uuid>,
  ) -> Result<Comment> {
    if body.trim().is_empty() {
      return Err(Error::Validation("a comment needs a body".to_owned()));
    }
    let mut snap = self.load(review_id).await?;
    self.load_users(&mut snap, [commenter]).await?;
    let mut unit = self.begin(snap, commenter).await?;

    let comment_id = Uuid::new_v4();
    let comment = Comment {
      comment_id,
      review_id,
      revision_id: unit.snap.revision.revision_id,
      thread_id: thread_id.unwrap_or(comment_id),
      commenter_id: commenter,
      body,
      created_at: unit.now,
    };
    unit.push(Mutation::InsertComment(comment.clone()));
    events::record(&mut unit, EventCode::CommentAdded, &comment);

    let name = unit.snap.user_name(commenter);
    let subject = format!("New Comment on {}", unit.snap.review.title);
    let context = json!({ "review_id": review_id, "name": name, "comment": comment.body });
    let recipients: Vec<Uuid> = unit
      .snap
      .participants()
      .into_iter()
      .filter(|id| *id != commenter)
      .collect();
    notify::send_all(&mut unit, recipients, |to| {
      Notice::new(to, subject.clone(), MessageTemplate::NewComment)
        .with_context(context.clone())
        .in_thread(comment.thread_id)
    });

    let extra = json!({ "comment": comment });
    fanout::demo_state(&mut unit, Trigger::Comment, Some(&extra));

    self.commit(unit).await?;
    debug!(%review_id, %commenter, %comment_id, "comment added");
    Ok(comment)
  }

  /// Raise an issue on a comment. A comment carries at most one unresolved
  /// issue.
  pub async fn create_issue(
    &self,
    review_id: Uuid,
    comment_id: Uuid,
    actor: Uuid,
  ) -> Result<Issue> {
    let snap = self.load(review_id).await?;
    self
      .store
      .get_comment(comment_id)
      .await
      .map_err(Error::store)?
      .filter(|c| c.review_id == review_id)
      .ok_or(Error::CommentNotFound(comment_id))?;
    let open = self
      .store
      .issues(review_id)
      .await
      .map_err(Error::store)?
      .into_iter()
      .any(|i| i.comment_id == comment_id && !i.is_resolved());
    if open {
      return Err(Error::Validation(
        "the comment already has an open issue".to_owned(),
      ));
    }

    let mut unit = self.begin(snap, actor).await?;
    let issue = Issue {
      issue_id: Uuid::new_v4(),
      review_id,
      comment_id,
      created_by: actor,
      resolved_by: None,
      created_at: unit.now,
      modified_at: unit.now,
    };
    unit.push(Mutation::InsertIssue(issue.clone()));
    events::record(&mut unit, EventCode::IssueCreated, &issue);
    self.commit(unit).await?;
    Ok(issue)
  }

  pub async fn resolve_issue(&self, issue_id: Uuid, actor: Uuid) -> Result<Issue> {
    let mut issue = self
      .store
      .get_issue(issue_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::IssueNotFound(issue_id))?;
    if issue.is_resolved() {
      return Err(Error::Validation("the issue is already resolved".to_owned()));
    }

    let snap = self.load(issue.review_id).await?;
    let mut unit = self.begin(snap, actor).await?;
    unit.push(Mutation::ResolveIssue {
      issue_id,
      resolved_by: actor,
      at: unit.now,
    });
    issue.resolved_by = Some(actor);
    issue.modified_at = unit.now;
    events::record(&mut unit, EventCode::IssueResolved, &issue);
    self.commit(unit).await?;
    Ok(issue)
  }

  // ── Read tracking ─────────────────────────────────────────────────────────

  /// Mark the review read for `user_id`, stamping `last_viewed` when they
  /// review it.
  pub async fn mark_viewed(&self, review_id: Uuid, user_id: Uuid) -> Result<()> {
    let snap = self.load(review_id).await?;
    let mut unit = self.begin(snap, user_id).await?;
    let now = unit.now;
    unit.push(Mutation::SetReadStatus {
      review_id,
      user_id,
      read: true,
      at: now,
    });
    if unit.snap.is_reviewer(user_id) {
      unit.push(Mutation::StampReviewerViewed { review_id, user_id, at: now });
    }
    self.commit(unit).await?;
    Ok(())
  }

  pub async fn set_bundle_flags(
    &self,
    bundle_id: Uuid,
    read: bool,
    deleted: bool,
  ) -> Result<()> {
    let found = self
      .store
      .set_bundle_flags(bundle_id, read, deleted)
      .await
      .map_err(Error::store)?;
    if found { Ok(()) } else { Err(Error::BundleNotFound(bundle_id)) }
  }

  // ── Reminders ─────────────────────────────────────────────────────────────

  /// Send every due reminder and push it out by the project's reminder
  /// interval. A reminder another poller already handled is skipped. Returns
  /// the number sent.
  pub async fn fire_due_reminders(&self) -> Result<usize> {
    let now = self.clock.now();
    let due = self.store.due_reminders(now).await.map_err(Error::store)?;
    let mut days_by_project: HashMap<Uuid, u32> = HashMap::new();
    let mut sent = 0;

    for item in due {
      let days = match days_by_project.get(&item.project_id) {
        Some(days) => *days,
        None => {
          let days = self.reminder_days(item.project_id).await?;
          days_by_project.insert(item.project_id, days);
          days
        }
      };

      let reminder = &item.reminder;
      let notice = Notice::new(
        reminder.user_id,
        format!("Reminder: {}", item.review_title),
        MessageTemplate::Reminder,
      )
      .with_context(json!({
        "review_id": reminder.review_id,
        "kind": reminder.kind.name(),
      }))
      .without_revision();
      let (message, job) = notify::compose(
        &self.config,
        notice,
        None,
        &item.review_title,
        item.recipient_email.clone(),
        now,
      );

      let mut changes = Changeset::new();
      changes.push(Mutation::AppendMessage(message));
      changes.push(Mutation::RescheduleReminder {
        reminder_id: reminder.reminder_id,
        expected:    reminder.remind_at,
        remind_at:   self.calendar.add_business_days(now, days),
        at:          now,
      });

      match self.store.apply(changes).await.map_err(Error::store)? {
        ApplyOutcome::Committed => {
          sent += 1;
          if let Some(job) = job {
            self.release(vec![OutboundJob::Email(job)])?;
          }
        }
        ApplyOutcome::Conflict => {
          debug!(reminder_id = %reminder.reminder_id, "reminder already handled");
        }
      }
    }

    info!(sent, "due reminders fired");
    Ok(sent)
  }
}
