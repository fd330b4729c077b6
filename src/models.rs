use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password: String, // plaintext, in-memory simulation only
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub company_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String, // "A1", "A", "B", ...
    #[serde(default)]
    pub criteria: Vec<String>,
    pub placement_open: Option<NaiveDate>,
    pub registration_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    #[serde(rename = "Very Hard")]
    VeryHard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::VeryHard,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::VeryHard => "Very Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "very hard" | "veryhard" | "very-hard" => Ok(Difficulty::VeryHard),
            other => Err(format!(
                "Unknown difficulty '{}'. Available: Easy, Medium, Hard, Very Hard",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub user: String,
    pub text: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewExperience {
    pub id: i64,
    pub student_name: Option<String>, // None for anonymous seed entries
    pub company_name: String,
    pub role: String,
    pub interview_date: NaiveDate,
    #[serde(default)]
    pub rounds: Vec<Round>,
    #[serde(default)]
    pub questions: String,
    #[serde(default)]
    pub tips: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl InterviewExperience {
    pub fn author(&self) -> &str {
        self.student_name.as_deref().unwrap_or("Anonymous")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExperienceDraft {
    pub company_name: String,
    pub role: String,
    pub interview_date: Option<NaiveDate>,
    #[serde(default)]
    pub difficulty: Difficulty,
    // stored as a single "Summary" round
    #[serde(default)]
    pub rounds: String,
    #[serde(default)]
    pub questions: String,
    #[serde(default)]
    pub tips: String,
    // ignored; the acting user is the author
    #[serde(default)]
    pub student_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parse_and_display() {
        assert_eq!("very hard".parse::<Difficulty>().unwrap(), Difficulty::VeryHard);
        assert_eq!("VeryHard".parse::<Difficulty>().unwrap(), Difficulty::VeryHard);
        assert_eq!(" EASY ".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert!("impossible".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::VeryHard.to_string(), "Very Hard");
    }

    #[test]
    fn test_company_deserializes_type_and_null_dates() {
        let json = r#"{
            "company_name": "Acme",
            "type": "Product",
            "category": "A1",
            "criteria": ["CSE", "IT"],
            "placement_open": null,
            "registration_date": "2024-01-01",
            "start_date": null,
            "end_date": "2024-01-10"
        }"#;
        let company: Company = serde_json::from_str(json).unwrap();
        assert_eq!(company.kind, "Product");
        assert_eq!(company.placement_open, None);
        assert_eq!(
            company.registration_date,
            Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
    }

    #[test]
    fn test_experience_author_falls_back_to_anonymous() {
        let json = r#"{
            "id": 1,
            "student_name": null,
            "company_name": "Acme",
            "role": "SDE",
            "interview_date": "2024-02-01",
            "difficulty": "Very Hard"
        }"#;
        let exp: InterviewExperience = serde_json::from_str(json).unwrap();
        assert_eq!(exp.author(), "Anonymous");
        assert_eq!(exp.difficulty, Difficulty::VeryHard);
        assert_eq!(exp.likes, 0);
        assert!(exp.comments.is_empty());
    }
}
