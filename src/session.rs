use chrono::NaiveDate;
use tracing::{debug, info};

use crate::accounts::{validate_login_form, validate_signup_form, AccountRegistry};
use crate::directory::{CompanyKey, Directory, Seed};
use crate::error::PortalResult;
use crate::models::{Company, Difficulty, ExperienceDraft, InterviewExperience, User};
use crate::policy::{can_perform, Action};
use crate::query::{DirectoryFilter, DirectoryQuery, ExperienceFilter, ExperienceSort, Page};
use crate::repository::ExperienceRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Auth,
    Companies,
    Experiences,
    SubmitExperience,
    AdminDashboard,
    CompanyDetail { company: CompanyKey },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Companies,
    Experiences,
    SubmitExperience,
    AdminDashboard,
    Company(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    Search(String),
    Kind(Option<String>),
    Category(Option<String>),
    Criterion(Option<String>),
    Difficulty(Option<Difficulty>),
    Sort(ExperienceSort),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMove {
    Next,
    Prev,
    To(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Login { username: String, password: String },
    Signup { username: String, password: String, confirm: String },
    Logout,
    Navigate(Destination),
    Submit(ExperienceDraft),
    DeleteExperience(i64),
    Like(i64),
    Comment { id: i64, text: String },
    DeleteComment { id: i64, date: NaiveDate, user: String },
    Filter(FilterChange),
    Page(PageMove),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    LoggedIn(String),
    SignedUp(String),
    LoggedOut,
    Navigated(View),
    Submitted(i64),
    Deleted(i64),
    Liked { id: i64, likes: u32 },
    Commented(i64),
    CommentsRemoved { id: i64, removed: usize },
    Updated,
}

/// Application state for one user's session. All mutations go through
/// [`Session::dispatch`].
pub struct Session {
    accounts: AccountRegistry,
    directory: Directory,
    experiences: ExperienceRepository,
    current_user: Option<User>,
    view: View,
    directory_query: DirectoryQuery,
    experience_filter: ExperienceFilter,
}

impl Session {
    pub fn new(seed: Seed) -> Self {
        Self {
            accounts: AccountRegistry::new(),
            directory: Directory::new(seed.companies),
            experiences: ExperienceRepository::new(seed.experiences),
            current_user: None,
            view: View::Auth,
            directory_query: DirectoryQuery::default(),
            experience_filter: ExperienceFilter::default(),
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn experiences(&self) -> &ExperienceRepository {
        &self.experiences
    }

    pub fn directory_filter(&self) -> &DirectoryFilter {
        self.directory_query.filter()
    }

    pub fn experience_filter(&self) -> &ExperienceFilter {
        &self.experience_filter
    }

    pub fn company_page(&self) -> Page<&Company> {
        self.directory_query.run(self.directory.companies())
    }

    pub fn experience_listing(&self) -> Vec<&InterviewExperience> {
        self.experience_filter.apply(self.experiences.all())
    }

    pub fn company_experiences(&self, key: CompanyKey) -> Vec<&InterviewExperience> {
        let name = &self.directory.get(key).company_name;
        self.experiences.for_company(name).collect()
    }

    pub fn dispatch(&mut self, intent: Intent) -> PortalResult<Outcome> {
        match intent {
            Intent::Login { username, password } => {
                validate_login_form(&username, &password)?;
                let user = self.accounts.authenticate(&username, &password)?;
                let name = user.username.clone();
                self.sign_in(user);
                Ok(Outcome::LoggedIn(name))
            }

            Intent::Signup {
                username,
                password,
                confirm,
            } => {
                validate_signup_form(&username, &password, &confirm)?;
                let user = self.accounts.register(&username, &password)?;
                info!(accounts = self.accounts.user_count(), "signup complete");
                let name = user.username.clone();
                self.sign_in(user);
                Ok(Outcome::SignedUp(name))
            }

            Intent::Logout => {
                if let Some(user) = self.current_user.take() {
                    info!(username = %user.username, "logged out");
                }
                self.view = View::Auth;
                Ok(Outcome::LoggedOut)
            }

            Intent::Navigate(destination) => {
                let requested = match destination {
                    Destination::Companies => View::Companies,
                    Destination::Experiences => View::Experiences,
                    Destination::SubmitExperience => View::SubmitExperience,
                    Destination::AdminDashboard => View::AdminDashboard,
                    Destination::Company(name) => View::CompanyDetail {
                        company: self.directory.resolve(&name)?,
                    },
                };
                self.view = self.route(requested);
                Ok(Outcome::Navigated(self.view))
            }

            Intent::Submit(draft) => {
                let id = self.experiences.submit(draft, self.current_user.as_ref())?.id;
                self.view = self.route(View::Experiences);
                Ok(Outcome::Submitted(id))
            }

            Intent::DeleteExperience(id) => {
                self.experiences.delete(id, self.current_user.as_ref())?;
                Ok(Outcome::Deleted(id))
            }

            Intent::Like(id) => {
                let likes = self.experiences.like(id, self.current_user.as_ref())?;
                Ok(Outcome::Liked { id, likes })
            }

            Intent::Comment { id, text } => {
                self.experiences
                    .add_comment(id, &text, self.current_user.as_ref())?;
                Ok(Outcome::Commented(id))
            }

            Intent::DeleteComment { id, date, user } => {
                let removed =
                    self.experiences
                        .delete_comment(id, date, &user, self.current_user.as_ref())?;
                Ok(Outcome::CommentsRemoved { id, removed })
            }

            Intent::Filter(change) => {
                debug!(?change, "filter changed");
                self.apply_filter(change);
                Ok(Outcome::Updated)
            }

            Intent::Page(step) => {
                let companies = self.directory.companies();
                match step {
                    PageMove::Next => self.directory_query.next_page(companies),
                    PageMove::Prev => self.directory_query.prev_page(companies),
                    PageMove::To(page) => self.directory_query.set_page(page),
                }
                Ok(Outcome::Updated)
            }
        }
    }

    fn sign_in(&mut self, user: User) {
        info!(username = %user.username, role = ?user.role, "logged in");
        self.current_user = Some(user);
        let current = if self.view == View::Auth {
            View::Companies
        } else {
            self.view
        };
        self.view = self.route(current);
    }

    fn route(&self, requested: View) -> View {
        let Some(user) = self.current_user.as_ref() else {
            return View::Auth;
        };
        match requested {
            View::Auth => View::Companies,
            View::AdminDashboard if !can_perform(Action::ViewAdminDashboard, Some(user)) => {
                View::Companies
            }
            other => other,
        }
    }

    fn apply_filter(&mut self, change: FilterChange) {
        match change {
            FilterChange::Search(text) => {
                if self.view == View::Companies {
                    self.directory_query.set_search(&text);
                } else {
                    self.experience_filter.search = text;
                }
            }
            FilterChange::Kind(kind) => self.directory_query.set_kind(kind),
            FilterChange::Category(category) => self.directory_query.set_category(category),
            FilterChange::Criterion(criterion) => self.directory_query.set_criterion(criterion),
            FilterChange::Difficulty(difficulty) => self.experience_filter.difficulty = difficulty,
            FilterChange::Sort(sort) => self.experience_filter.sort = sort,
        }
    }
}
