use chrono::NaiveDate;
use std::str::FromStr;

use crate::models::{Company, Difficulty, InterviewExperience};

pub const PAGE_SIZE: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

// total_pages may be 0; page is still at least 1
pub fn paginate<T: Clone>(items: &[T], requested: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(page_size);
    let page = requested.min(total_pages).max(1);
    let start = (page - 1) * page_size;
    let items = items.iter().skip(start).take(page_size).cloned().collect();

    Page {
        items,
        page,
        total_pages,
        total,
    }
}

// --- Directory ---

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryFilter {
    pub search: String,
    pub kind: Option<String>,      // None = all
    pub category: Option<String>,  // None = all
    pub criterion: Option<String>, // None = all
}

impl DirectoryFilter {
    pub fn matches(&self, company: &Company) -> bool {
        let search_match = company
            .company_name
            .to_lowercase()
            .contains(&self.search.to_lowercase());
        let kind_match = self
            .kind
            .as_ref()
            .is_none_or(|k| company.kind.to_lowercase().contains(&k.to_lowercase()));
        let category_match = self.category.as_ref().is_none_or(|c| company.category == *c);
        let criterion_match = self
            .criterion
            .as_ref()
            .is_none_or(|c| company.criteria.iter().any(|x| x == c));

        search_match && kind_match && category_match && criterion_match
    }

    pub fn apply<'a>(&self, companies: &'a [Company]) -> Vec<&'a Company> {
        let mut matched: Vec<&Company> = companies.iter().filter(|c| self.matches(c)).collect();
        matched.sort_by(|a, b| b.registration_date.cmp(&a.registration_date));
        matched
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryQuery {
    filter: DirectoryFilter,
    page: usize,
}

impl Default for DirectoryQuery {
    fn default() -> Self {
        Self {
            filter: DirectoryFilter::default(),
            page: 1,
        }
    }
}

impl DirectoryQuery {
    pub fn filter(&self) -> &DirectoryFilter {
        &self.filter
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_search(&mut self, search: &str) {
        self.filter.search = search.to_string();
        self.page = 1;
    }

    pub fn set_kind(&mut self, kind: Option<String>) {
        self.filter.kind = kind;
        self.page = 1;
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.filter.category = category;
        self.page = 1;
    }

    pub fn set_criterion(&mut self, criterion: Option<String>) {
        self.filter.criterion = criterion;
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn next_page(&mut self, companies: &[Company]) {
        let current = self.run(companies);
        self.page = (current.page + 1).min(current.total_pages.max(1));
    }

    pub fn prev_page(&mut self, companies: &[Company]) {
        let current = self.run(companies);
        self.page = current.page.saturating_sub(1).max(1);
    }

    pub fn run<'a>(&self, companies: &'a [Company]) -> Page<&'a Company> {
        paginate(&self.filter.apply(companies), self.page, PAGE_SIZE)
    }
}

// --- Experiences ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExperienceSort {
    #[default]
    Likes,
    Date,
}

impl ExperienceSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceSort::Likes => "likes",
            ExperienceSort::Date => "date",
        }
    }
}

impl FromStr for ExperienceSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "likes" | "popularity" => Ok(ExperienceSort::Likes),
            "date" | "recent" => Ok(ExperienceSort::Date),
            other => Err(format!("Unknown sort '{}'. Available: likes, date", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperienceFilter {
    pub search: String,                 // company name or role
    pub difficulty: Option<Difficulty>, // None = all
    pub sort: ExperienceSort,
}

impl ExperienceFilter {
    pub fn matches(&self, exp: &InterviewExperience) -> bool {
        let needle = self.search.to_lowercase();
        let text_match = exp.company_name.to_lowercase().contains(&needle)
            || exp.role.to_lowercase().contains(&needle);
        let difficulty_match = self.difficulty.is_none_or(|d| exp.difficulty == d);
        text_match && difficulty_match
    }

    pub fn apply<'a, I>(&self, experiences: I) -> Vec<&'a InterviewExperience>
    where
        I: IntoIterator<Item = &'a InterviewExperience>,
    {
        let mut matched: Vec<&InterviewExperience> =
            experiences.into_iter().filter(|e| self.matches(e)).collect();
        match self.sort {
            ExperienceSort::Likes => matched.sort_by(|a, b| b.likes.cmp(&a.likes)),
            ExperienceSort::Date => matched.sort_by(|a, b| b.interview_date.cmp(&a.interview_date)),
        }
        matched
    }
}

// --- Registration status ---

/// Registration is open from `registration_date` until the earlier of
/// `placement_open` and the effective end (`end_date`, else `start_date`),
/// both inclusive. No registration date means never open.
pub fn is_registration_open(company: &Company, today: NaiveDate) -> bool {
    let Some(registration) = company.registration_date else {
        return false;
    };
    if let Some(placement_open) = company.placement_open {
        if today > placement_open {
            return false;
        }
    }
    if let Some(end) = company.end_date.or(company.start_date) {
        if today > end {
            return false;
        }
    }
    today >= registration
}
