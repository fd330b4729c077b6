use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ai::{fragment_to_text, TipAdvisor};
use crate::directory::Seed;
use crate::models::{Company, Difficulty, ExperienceDraft, InterviewExperience};
use crate::query::{is_registration_open, ExperienceSort};
use crate::repository::today;
use crate::session::{Destination, FilterChange, Intent, Outcome, PageMove, Session, View};
use crate::truncate;

const WIDTH: usize = 80;

const HELP: &str = "\
Commands:
  login <user> <password>              signup <user> <password> <confirm>
  logout                               go companies|experiences|submit|admin
  company <name>                       show | help | quit
  search [text]                        type|category|criteria <value|all>
  difficulty <easy|medium|hard|very hard|all>
  sort likes|date                      page <n> | next | prev
  like <id>                            comment <id> <text>
  uncomment <id> <yyyy-mm-dd> <user>   delete <id>
  submit <company> | <role> | <date> | <difficulty> | <rounds> | <questions> | <tips>
  tips <id>                            tips <company> | <role>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Intent(Intent),
    Tips(TipsTarget),
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TipsTarget {
    Experience(i64),
    Pair { company: String, role: String },
}

struct TipsReady {
    company: String,
    role: String,
    fragment: String,
}

pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match word.to_lowercase().as_str() {
        "quit" | "exit" => Command::Quit,
        "help" | "?" => Command::Help,
        "show" | "ls" => Command::Show,

        "login" => match args.as_slice() {
            [username, password] => Command::Intent(Intent::Login {
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => bail!("Usage: login <user> <password>"),
        },
        "signup" => match args.as_slice() {
            [username, password, confirm] => Command::Intent(Intent::Signup {
                username: username.to_string(),
                password: password.to_string(),
                confirm: confirm.to_string(),
            }),
            _ => bail!("Usage: signup <user> <password> <confirm>"),
        },
        "logout" => Command::Intent(Intent::Logout),

        "go" => {
            let destination = match rest.to_lowercase().as_str() {
                "companies" => Destination::Companies,
                "experiences" => Destination::Experiences,
                "submit" => Destination::SubmitExperience,
                "admin" => Destination::AdminDashboard,
                _ => bail!("Usage: go companies|experiences|submit|admin"),
            };
            Command::Intent(Intent::Navigate(destination))
        }
        "company" => {
            if rest.is_empty() {
                bail!("Usage: company <name>");
            }
            Command::Intent(Intent::Navigate(Destination::Company(rest.to_string())))
        }

        "search" => filter(FilterChange::Search(rest.to_string())),
        "type" => filter(FilterChange::Kind(choice(rest))),
        "category" => filter(FilterChange::Category(choice(rest))),
        "criteria" => filter(FilterChange::Criterion(choice(rest))),
        "difficulty" => {
            let difficulty = match choice(rest) {
                None => None,
                Some(label) => Some(label.parse::<Difficulty>().map_err(|e| anyhow!(e))?),
            };
            filter(FilterChange::Difficulty(difficulty))
        }
        "sort" => {
            let sort = rest.parse::<ExperienceSort>().map_err(|e| anyhow!(e))?;
            filter(FilterChange::Sort(sort))
        }

        "next" => Command::Intent(Intent::Page(PageMove::Next)),
        "prev" => Command::Intent(Intent::Page(PageMove::Prev)),
        "page" => {
            let page = rest
                .parse::<usize>()
                .with_context(|| format!("Invalid page number '{}'", rest))?;
            Command::Intent(Intent::Page(PageMove::To(page)))
        }

        "like" => match args.as_slice() {
            [id] => Command::Intent(Intent::Like(parse_id(id)?)),
            _ => bail!("Usage: like <id>"),
        },
        "delete" => match args.as_slice() {
            [id] => Command::Intent(Intent::DeleteExperience(parse_id(id)?)),
            _ => bail!("Usage: delete <id>"),
        },
        "comment" => {
            let Some((id, text)) = rest.split_once(char::is_whitespace) else {
                bail!("Usage: comment <id> <text>");
            };
            Command::Intent(Intent::Comment {
                id: parse_id(id)?,
                text: text.trim().to_string(),
            })
        }
        "uncomment" => match args.as_slice() {
            [id, date, user] => Command::Intent(Intent::DeleteComment {
                id: parse_id(id)?,
                date: parse_date(date)?,
                user: user.to_string(),
            }),
            _ => bail!("Usage: uncomment <id> <yyyy-mm-dd> <user>"),
        },
        "submit" => Command::Intent(Intent::Submit(parse_draft(rest)?)),

        "tips" => match rest.split_once('|') {
            Some((company, role)) => Command::Tips(TipsTarget::Pair {
                company: company.trim().to_string(),
                role: role.trim().to_string(),
            }),
            None if !rest.is_empty() => Command::Tips(TipsTarget::Experience(parse_id(rest)?)),
            None => bail!("Usage: tips <id> | tips <company> | <role>"),
        },

        other => bail!("Unknown command '{}'. Type 'help' for a list.", other),
    };
    Ok(Some(command))
}

fn filter(change: FilterChange) -> Command {
    Command::Intent(Intent::Filter(change))
}

// "all" or nothing clears the filter
fn choice(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid experience id '{}'", raw.trim()))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", raw.trim()))
}

// Pipe-separated; trailing fields may be omitted.
fn parse_draft(rest: &str) -> Result<ExperienceDraft> {
    let fields: Vec<&str> = rest.split('|').map(str::trim).collect();
    let field = |i: usize| fields.get(i).copied().unwrap_or("");

    let interview_date = match field(2) {
        "" => None,
        raw => Some(parse_date(raw)?),
    };
    let difficulty = match field(3) {
        "" => Difficulty::default(),
        raw => raw.parse::<Difficulty>().map_err(|e| anyhow!(e))?,
    };

    Ok(ExperienceDraft {
        company_name: field(0).to_string(),
        role: field(1).to_string(),
        interview_date,
        difficulty,
        rounds: field(4).to_string(),
        questions: field(5).to_string(),
        tips: field(6).to_string(),
        student_name: None,
    })
}

pub async fn run_session(seed: Seed, advisor: TipAdvisor) -> Result<()> {
    let mut session = Session::new(seed);
    let advisor = Arc::new(advisor);
    let (tx, mut rx) = mpsc::unbounded_channel::<TipsReady>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}\n", HELP);
    if !advisor.is_enabled() {
        println!("(Interview tips are disabled: no model configured.)\n");
    }
    println!("{}", render_view(&session));

    loop {
        prompt(&session)?;
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                match parse_line(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(Command::Help)) => println!("{}", HELP),
                    Ok(Some(Command::Show)) => println!("{}", render_view(&session)),
                    Ok(Some(Command::Tips(target))) => {
                        request_tips(&session, target, &advisor, &tx);
                    }
                    Ok(Some(Command::Intent(intent))) => match session.dispatch(intent) {
                        Ok(outcome) => {
                            if let Some(message) = describe(&outcome) {
                                println!("{}", message);
                            }
                            println!("{}", render_view(&session));
                        }
                        Err(e) => println!("{}", e),
                    },
                    Err(e) => println!("{}", e),
                }
            }
            Some(ready) = rx.recv() => {
                println!("\n{}", render_tips(&ready.company, &ready.role, &ready.fragment));
            }
        }
    }
    Ok(())
}

fn prompt(session: &Session) -> Result<()> {
    let who = session
        .current_user()
        .map(|u| u.username.as_str())
        .unwrap_or("guest");
    print!("{}> ", who);
    std::io::stdout().flush()?;
    Ok(())
}

fn request_tips(
    session: &Session,
    target: TipsTarget,
    advisor: &Arc<TipAdvisor>,
    tx: &mpsc::UnboundedSender<TipsReady>,
) {
    let (company, role) = match target {
        TipsTarget::Pair { company, role } => (company, role),
        TipsTarget::Experience(id) => match session.experiences().get(id) {
            Some(exp) => (exp.company_name.clone(), exp.role.clone()),
            None => {
                println!("Experience #{} not found.", id);
                return;
            }
        },
    };

    println!("Generating tips for {} at {}...", role, company);
    let advisor = Arc::clone(advisor);
    let tx = tx.clone();
    tokio::spawn(async move {
        let fragment = advisor.generate_tips(&company, &role).await;
        if tx
            .send(TipsReady {
                company,
                role,
                fragment,
            })
            .is_err()
        {
            debug!("session ended before tips arrived");
        }
    });
}

fn describe(outcome: &Outcome) -> Option<String> {
    let message = match outcome {
        Outcome::LoggedIn(name) => format!("Welcome back, {}.", name),
        Outcome::SignedUp(name) => format!("Account created. Welcome, {}.", name),
        Outcome::LoggedOut => "Logged out.".to_string(),
        Outcome::Submitted(id) => format!("Experience #{} submitted.", id),
        Outcome::Deleted(id) => format!("Experience #{} deleted.", id),
        Outcome::Liked { id, likes } => format!("Liked #{} ({} likes).", id, likes),
        Outcome::Commented(id) => format!("Comment added to #{}.", id),
        Outcome::CommentsRemoved { id, removed } => {
            if *removed == 0 {
                warn!(id, "no comments matched");
            }
            format!("Removed {} comment(s) from #{}.", removed, id)
        }
        Outcome::Navigated(_) | Outcome::Updated => return None,
    };
    Some(message)
}

pub fn render_view(session: &Session) -> String {
    match session.view() {
        View::Auth => "Please log in or sign up (try: login admin admin).".to_string(),
        View::Companies => render_companies(session),
        View::Experiences => {
            let filter = session.experience_filter();
            let difficulty = filter.difficulty.map(|d| d.label()).unwrap_or("all");
            let mut out = format!(
                "Interview Experiences (search: '{}', difficulty: {}, sort: {})\n",
                filter.search,
                difficulty,
                filter.sort.as_str()
            );
            out.push_str(&render_experience_list(&session.experience_listing()));
            out
        }
        View::SubmitExperience => {
            let difficulties: Vec<&str> = Difficulty::ALL.iter().map(|d| d.label()).collect();
            format!(
                "Share your interview experience:\n  \
                 submit <company> | <role> | <date> | <difficulty> | <rounds> | <questions> | <tips>\n  \
                 Leave the date empty for today. Difficulty ({}) defaults to {}.",
                difficulties.join(", "),
                Difficulty::default()
            )
        }
        View::AdminDashboard => {
            let all: Vec<&InterviewExperience> = session.experiences().all().iter().collect();
            let mut out = format!("Admin Dashboard: {} experience(s)\n", all.len());
            out.push_str(&"=".repeat(WIDTH));
            out.push('\n');
            out.push_str(&format!(
                "{:<16} {:<18} {:<20} {:<12} {:<10} {:>5}\n",
                "ID", "COMPANY", "ROLE", "AUTHOR", "DATE", "LIKES"
            ));
            for exp in all {
                out.push_str(&admin_row(exp));
                out.push('\n');
            }
            out.push_str("Use 'delete <id>' to remove an experience.");
            out
        }
        View::CompanyDetail { company } => {
            let mut out = render_company(session.directory().get(company), today());
            out.push('\n');
            out.push_str(&render_experience_list(&session.company_experiences(company)));
            out
        }
    }
}

fn admin_row(exp: &InterviewExperience) -> String {
    format!(
        "#{:<15} {:<18} {:<20} {:<12} {:<10} {:>5}",
        exp.id,
        truncate(&exp.company_name, 18),
        truncate(&exp.role, 20),
        truncate(exp.author(), 12),
        exp.interview_date.format("%Y-%m-%d"),
        exp.likes
    )
}

fn render_companies(session: &Session) -> String {
    let page = session.company_page();
    let filter = session.directory_filter();
    let mut out = format!(
        "Companies (page {} of {}, {} match)\n",
        page.page, page.total_pages, page.total
    );
    out.push_str(&format!(
        "search: '{}'  type: {}  category: {}  criteria: {}\n",
        filter.search,
        filter.kind.as_deref().unwrap_or("all"),
        filter.category.as_deref().unwrap_or("all"),
        filter.criterion.as_deref().unwrap_or("all")
    ));
    out.push_str(&company_table(&page.items, today()));
    out
}

pub fn company_table(companies: &[&Company], today: NaiveDate) -> String {
    if companies.is_empty() {
        return "No companies found.".to_string();
    }
    let mut out = format!(
        "{:<26} {:<12} {:<8} {:<12} {:<6}\n",
        "NAME", "TYPE", "CATEGORY", "REGISTER BY", "STATUS"
    );
    out.push_str(&"-".repeat(68));
    for company in companies {
        out.push_str(&format!(
            "\n{:<26} {:<12} {:<8} {:<12} {:<6}",
            truncate(&company.company_name, 24),
            truncate(&company.kind, 10),
            company.category,
            format_date(company.registration_date),
            open_label(company, today)
        ));
    }
    out
}

pub fn open_label(company: &Company, today: NaiveDate) -> &'static str {
    if is_registration_open(company, today) {
        "Open"
    } else {
        "Closed"
    }
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn render_company(company: &Company, today: NaiveDate) -> String {
    let mut out = format!("{}\n", company.company_name);
    out.push_str(&format!("Type: {}\n", company.kind));
    out.push_str(&format!("Category: {}\n", company.category));
    if !company.criteria.is_empty() {
        out.push_str(&format!("Criteria: {}\n", company.criteria.join(", ")));
    }
    out.push_str(&format!("Placement opens: {}\n", format_date(company.placement_open)));
    out.push_str(&format!(
        "Registration: {} ({})\n",
        format_date(company.registration_date),
        open_label(company, today)
    ));
    out.push_str(&format!(
        "Drive: {} to {}\n",
        format_date(company.start_date),
        format_date(company.end_date)
    ));
    out
}

pub fn render_experience_list(experiences: &[&InterviewExperience]) -> String {
    if experiences.is_empty() {
        return "No experiences found.".to_string();
    }
    experiences
        .iter()
        .map(|exp| render_experience(exp, WIDTH))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_experience(exp: &InterviewExperience, width: usize) -> String {
    let mut out = format!(
        "#{} {} at {} [{}]\n",
        exp.id, exp.role, exp.company_name, exp.difficulty
    );
    out.push_str(&format!(
        "by {} on {} | {} likes | {} comment(s)\n",
        exp.author(),
        exp.interview_date,
        exp.likes,
        exp.comments.len()
    ));
    for round in &exp.rounds {
        push_section(&mut out, &round.kind, &round.description, width);
    }
    push_section(&mut out, "Questions", &exp.questions, width);
    push_section(&mut out, "Tips", &exp.tips, width);
    for comment in &exp.comments {
        out.push_str(&format!("  > {} ({}): {}\n", comment.user, comment.date, comment.text));
    }
    out
}

fn push_section(out: &mut String, title: &str, body: &str, width: usize) {
    if body.trim().is_empty() {
        return;
    }
    out.push_str(&format!("  {}:\n", title));
    let options = textwrap::Options::new(width)
        .initial_indent("    ")
        .subsequent_indent("    ");
    for line in textwrap::wrap(body.trim(), options) {
        out.push_str(&line);
        out.push('\n');
    }
}

pub fn render_tips(company: &str, role: &str, fragment: &str) -> String {
    let title = format!("Interview tips: {} at {}", role, company);
    format!(
        "{}\n{}\n{}",
        title,
        "=".repeat(title.chars().count()),
        fragment_to_text(fragment, WIDTH)
    )
}
