use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::error::{PortalError, PortalResult};
use crate::models::{Comment, ExperienceDraft, InterviewExperience, Round, User};
use crate::policy::{authorize, Action};

#[derive(Debug, Clone, Default)]
pub struct ExperienceRepository {
    experiences: Vec<InterviewExperience>,
    last_id: i64,
}

impl ExperienceRepository {
    pub fn new(seed: Vec<InterviewExperience>) -> Self {
        let last_id = seed.iter().map(|e| e.id).max().unwrap_or(0);
        Self {
            experiences: seed,
            last_id,
        }
    }

    pub fn all(&self) -> &[InterviewExperience] {
        &self.experiences
    }

    pub fn get(&self, id: i64) -> Option<&InterviewExperience> {
        self.experiences.iter().find(|e| e.id == id)
    }

    pub fn for_company<'a>(
        &'a self,
        company_name: &'a str,
    ) -> impl Iterator<Item = &'a InterviewExperience> + 'a {
        self.experiences
            .iter()
            .filter(move |e| e.company_name == company_name)
    }

    fn get_mut(&mut self, id: i64) -> PortalResult<&mut InterviewExperience> {
        self.experiences
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(PortalError::ExperienceNotFound(id))
    }

    // Ids are time based (milliseconds) but never repeat within a session.
    fn next_id(&mut self) -> PortalResult<i64> {
        let floor = self.last_id.checked_add(1).ok_or_else(|| {
            PortalError::Validation("No experience ids left to assign.".to_string())
        })?;
        let id = Utc::now().timestamp_millis().max(floor);
        self.last_id = id;
        Ok(id)
    }

    pub fn submit(
        &mut self,
        draft: ExperienceDraft,
        actor: Option<&User>,
    ) -> PortalResult<&InterviewExperience> {
        authorize(Action::SubmitExperience, actor)?;
        let author = actor.ok_or(PortalError::Unauthorized)?;

        if draft.company_name.trim().is_empty() || draft.role.trim().is_empty() {
            return Err(PortalError::Validation(
                "Company name and role are required.".to_string(),
            ));
        }

        if let Some(claimed) = draft.student_name.as_deref() {
            debug!(claimed, author = %author.username, "ignoring student name on draft");
        }

        let rounds = vec![Round {
            kind: "Summary".to_string(),
            description: draft.rounds,
        }];

        let experience = InterviewExperience {
            id: self.next_id()?,
            student_name: Some(author.username.clone()),
            company_name: draft.company_name.trim().to_string(),
            role: draft.role.trim().to_string(),
            interview_date: draft.interview_date.unwrap_or_else(today),
            rounds,
            questions: draft.questions,
            tips: draft.tips,
            difficulty: draft.difficulty,
            likes: 0,
            comments: Vec::new(),
        };

        info!(
            id = experience.id,
            author = %author.username,
            company = %experience.company_name,
            "experience submitted"
        );
        self.experiences.insert(0, experience);
        Ok(&self.experiences[0])
    }

    pub fn delete(&mut self, id: i64, actor: Option<&User>) -> PortalResult<()> {
        if let Err(e) = authorize(Action::DeleteExperience, actor) {
            warn!(id, "experience delete refused");
            return Err(match e {
                PortalError::Unauthorized => PortalError::Forbidden,
                other => other,
            });
        }

        let before = self.experiences.len();
        self.experiences.retain(|e| e.id != id);
        if self.experiences.len() == before {
            return Err(PortalError::ExperienceNotFound(id));
        }
        info!(id, "experience deleted");
        Ok(())
    }

    pub fn like(&mut self, id: i64, actor: Option<&User>) -> PortalResult<u32> {
        authorize(Action::Like, actor)?;
        let experience = self.get_mut(id)?;
        experience.likes = experience.likes.saturating_add(1);
        debug!(id, likes = experience.likes, "experience liked");
        Ok(experience.likes)
    }

    pub fn add_comment(&mut self, id: i64, text: &str, actor: Option<&User>) -> PortalResult<()> {
        self.add_comment_on(id, text, actor, today())
    }

    pub fn add_comment_on(
        &mut self,
        id: i64,
        text: &str,
        actor: Option<&User>,
        date: NaiveDate,
    ) -> PortalResult<()> {
        authorize(Action::AddComment, actor)?;
        let author = actor.ok_or(PortalError::Unauthorized)?;
        if text.trim().is_empty() {
            return Err(PortalError::Validation("Comment must not be empty.".to_string()));
        }

        let experience = self.get_mut(id)?;
        experience.comments.push(Comment {
            user: author.username.clone(),
            text: text.to_string(),
            date,
        });
        debug!(id, user = %author.username, "comment added");
        Ok(())
    }

    /// Removes every comment on `id` posted by `comment_user` on `date`.
    /// Comments have no identity of their own, so same-day comments by one
    /// user go together.
    pub fn delete_comment(
        &mut self,
        id: i64,
        date: NaiveDate,
        comment_user: &str,
        actor: Option<&User>,
    ) -> PortalResult<usize> {
        let Some(acting) = actor else {
            return Err(PortalError::Unauthorized);
        };
        if let Err(e) = authorize(Action::DeleteComment { author: comment_user }, actor) {
            warn!(id, user = %acting.username, target = %comment_user, "comment delete refused");
            return Err(e);
        }

        let experience = self.get_mut(id)?;
        let before = experience.comments.len();
        experience.comments.retain(|c| {
            let matches = c.date == date && c.user == comment_user;
            !matches || (!acting.is_admin() && acting.username != c.user)
        });
        let removed = before - experience.comments.len();
        info!(id, removed, target = %comment_user, "comments deleted");
        Ok(removed)
    }
}

// UTC calendar day.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, Role};

    fn user(name: &str, role: Role) -> User {
        User {
            username: name.to_string(),
            password: "secret".to_string(),
            role,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn seed_experience(id: i64, company: &str) -> InterviewExperience {
        InterviewExperience {
            id,
            student_name: None,
            company_name: company.to_string(),
            role: "SDE".to_string(),
            interview_date: date("2024-01-01"),
            rounds: Vec::new(),
            questions: String::new(),
            tips: String::new(),
            difficulty: Difficulty::Medium,
            likes: 0,
            comments: Vec::new(),
        }
    }

    fn draft(company: &str, role: &str) -> ExperienceDraft {
        ExperienceDraft {
            company_name: company.to_string(),
            role: role.to_string(),
            interview_date: Some(date("2024-03-01")),
            rounds: "OA then two technical rounds".to_string(),
            ..Default::default()
        }
    }

    fn repo() -> ExperienceRepository {
        ExperienceRepository::new(vec![seed_experience(1, "Acme"), seed_experience(2, "Globex")])
    }

    #[test]
    fn test_submit_attributes_to_actor_not_draft() {
        let mut repo = repo();
        let alice = user("alice", Role::User);
        let mut d = draft("Initech", "Analyst");
        d.student_name = Some("mallory".to_string());

        let exp = repo.submit(d, Some(&alice)).unwrap();
        assert_eq!(exp.student_name.as_deref(), Some("alice"));
        assert_eq!(exp.likes, 0);
        assert!(exp.comments.is_empty());
        assert_eq!(exp.rounds.len(), 1);
        assert_eq!(exp.rounds[0].kind, "Summary");
    }

    #[test]
    fn test_blank_rounds_still_get_summary_round() {
        let mut repo = repo();
        let alice = user("alice", Role::User);
        let mut d = draft("Initech", "Analyst");
        d.rounds = String::new();

        let exp = repo.submit(d, Some(&alice)).unwrap();
        assert_eq!(exp.rounds.len(), 1);
        assert_eq!(exp.rounds[0].kind, "Summary");
        assert!(exp.rounds[0].description.is_empty());
    }

    #[test]
    fn test_submit_rejected_when_ids_exhausted() {
        let mut repo = ExperienceRepository::new(vec![seed_experience(i64::MAX, "Acme")]);
        let alice = user("alice", Role::User);

        let err = repo.submit(draft("Initech", "Analyst"), Some(&alice)).unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));
        assert_eq!(repo.all().len(), 1);
    }

    #[test]
    fn test_today_is_utc_day() {
        let before = Utc::now().date_naive();
        let day = today();
        let after = Utc::now().date_naive();
        assert!(day == before || day == after);
    }

    #[test]
    fn test_submit_prepends_with_fresh_ids() {
        let mut repo = repo();
        let alice = user("alice", Role::User);
        let first = repo.submit(draft("Initech", "Analyst"), Some(&alice)).unwrap().id;
        let second = repo.submit(draft("Hooli", "SRE"), Some(&alice)).unwrap().id;

        assert!(second > first);
        assert!(first > 2);
        let ids: Vec<i64> = repo.all().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second, first, 1, 2]);
    }

    #[test]
    fn test_submit_requires_user_and_fields() {
        let mut repo = repo();
        assert_eq!(
            repo.submit(draft("Initech", "Analyst"), None).unwrap_err(),
            PortalError::Unauthorized
        );
        let alice = user("alice", Role::User);
        assert!(matches!(
            repo.submit(draft("  ", "Analyst"), Some(&alice)),
            Err(PortalError::Validation(_))
        ));
        assert_eq!(repo.all().len(), 2);
    }

    #[test]
    fn test_delete_requires_admin() {
        let mut repo = repo();
        let alice = user("alice", Role::User);
        let admin = user("admin", Role::Admin);

        assert_eq!(repo.delete(1, Some(&alice)), Err(PortalError::Forbidden));
        assert_eq!(repo.delete(1, None), Err(PortalError::Forbidden));
        assert_eq!(repo.all().len(), 2);

        repo.delete(1, Some(&admin)).unwrap();
        let ids: Vec<i64> = repo.all().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2]);

        assert_eq!(repo.delete(1, Some(&admin)), Err(PortalError::ExperienceNotFound(1)));
    }

    #[test]
    fn test_like_is_repeatable() {
        let mut repo = repo();
        let alice = user("alice", Role::User);
        repo.like(1, Some(&alice)).unwrap();
        assert_eq!(repo.like(1, Some(&alice)).unwrap(), 2);
        assert_eq!(repo.get(1).unwrap().likes, 2);
    }

    #[test]
    fn test_like_requires_user() {
        let mut repo = repo();
        assert_eq!(repo.like(1, None), Err(PortalError::Unauthorized));
        assert_eq!(repo.get(1).unwrap().likes, 0);
    }

    #[test]
    fn test_add_comment_appends_in_order() {
        let mut repo = repo();
        let alice = user("alice", Role::User);
        let bob = user("bob", Role::User);
        let day = date("2024-05-05");

        repo.add_comment_on(1, "first", Some(&alice), day).unwrap();
        repo.add_comment_on(1, "second", Some(&bob), day).unwrap();

        let comments = &repo.get(1).unwrap().comments;
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "first");
        assert_eq!(comments[0].user, "alice");
        assert_eq!(comments[1].user, "bob");
        assert_eq!(comments[1].date, day);

        assert_eq!(repo.add_comment(1, "hi", None), Err(PortalError::Unauthorized));
    }

    #[test]
    fn test_delete_comment_by_stranger_leaves_comments() {
        let mut repo = repo();
        let alice = user("alice", Role::User);
        let carol = user("carol", Role::User);
        let day = date("2024-05-05");
        repo.add_comment_on(1, "mine", Some(&alice), day).unwrap();

        let result = repo.delete_comment(1, day, "alice", Some(&carol));
        assert_eq!(result, Err(PortalError::Forbidden));
        assert_eq!(repo.get(1).unwrap().comments.len(), 1);

        assert_eq!(
            repo.delete_comment(1, day, "alice", None),
            Err(PortalError::Unauthorized)
        );
    }

    #[test]
    fn test_delete_comment_by_author_removes_all_same_day() {
        let mut repo = repo();
        let alice = user("alice", Role::User);
        let bob = user("bob", Role::User);
        let day = date("2024-05-05");
        let other_day = date("2024-05-06");
        repo.add_comment_on(1, "one", Some(&alice), day).unwrap();
        repo.add_comment_on(1, "from bob", Some(&bob), day).unwrap();
        repo.add_comment_on(1, "two", Some(&alice), day).unwrap();
        repo.add_comment_on(1, "later", Some(&alice), other_day).unwrap();

        let removed = repo.delete_comment(1, day, "alice", Some(&alice)).unwrap();
        assert_eq!(removed, 2);

        let texts: Vec<&str> = repo.get(1).unwrap().comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["from bob", "later"]);
    }

    #[test]
    fn test_admin_deletes_any_comment() {
        let mut repo = repo();
        let admin = user("admin", Role::Admin);
        let bob = user("bob", Role::User);
        let day = date("2024-05-05");
        repo.add_comment_on(2, "spam", Some(&bob), day).unwrap();

        assert_eq!(repo.delete_comment(2, day, "bob", Some(&admin)).unwrap(), 1);
        assert!(repo.get(2).unwrap().comments.is_empty());
    }

    #[test]
    fn test_for_company_is_exact_match() {
        let repo = repo();
        assert_eq!(repo.for_company("Acme").count(), 1);
        assert_eq!(repo.for_company("acme").count(), 0);
    }
}
