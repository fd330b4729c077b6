mod accounts;
mod ai;
mod config;
mod directory;
mod error;
mod models;
mod policy;
mod query;
mod repository;
mod session;
mod shell;
mod tui;

use ai::TipAdvisor;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use config::Config;
use directory::{Directory, Seed};
use models::Difficulty;
use query::{DirectoryFilter, DirectoryQuery, ExperienceFilter, ExperienceSort};
use repository::{today, ExperienceRepository};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "placement")]
#[command(about = "Campus placement portal - companies, interview experiences and tips")]
struct Cli {
    /// Directory with companies.json / experiences.json overriding the bundled seed
    #[arg(long, global = true, env = "PLACEMENT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Model for interview tips (gemini-flash, gemini-pro, haiku, sonnet, gpt-4o-mini, gpt-4o)
    #[arg(long, global = true, env = "PLACEMENT_TIPS_MODEL")]
    tips_model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List one page of the company directory
    Companies {
        /// Search company names
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by company type
        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        /// Filter by category (A1, A, B, ...)
        #[arg(short, long)]
        category: Option<String>,

        /// Filter by eligible branch
        #[arg(long)]
        criteria: Option<String>,

        /// Page number
        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// List interview experiences
    Experiences {
        /// Search company name or role
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by difficulty (easy, medium, hard, very hard)
        #[arg(short, long)]
        difficulty: Option<String>,

        /// Sort order (likes, date)
        #[arg(long, default_value = "likes")]
        sort: String,

        /// Only experiences for this company
        #[arg(long)]
        company: Option<String>,
    },

    /// Generate interview tips for a company and role
    Tips {
        company: String,
        role: String,
    },

    /// Start an interactive portal session
    Session,

    /// Browse companies in a full-screen view
    Browse,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = Config::resolve(cli.data_dir, cli.tips_model);
    let seed = Seed::load(config.data_dir())?;

    match cli.command {
        Commands::Companies {
            search,
            kind,
            category,
            criteria,
            page,
        } => {
            let directory = Directory::new(seed.companies);
            let mut query = DirectoryQuery::default();
            query.set_search(search.as_deref().unwrap_or(""));
            query.set_kind(kind);
            query.set_category(category);
            query.set_criterion(criteria);
            query.set_page(page);

            let result = query.run(directory.companies());
            if result.total == 0 {
                println!("No companies found.");
                print_options(&directory, query.filter());
            } else {
                println!(
                    "Page {} of {} ({} companies)\n",
                    result.page, result.total_pages, result.total
                );
                println!("{}", shell::company_table(&result.items, today()));
            }
        }

        Commands::Experiences {
            search,
            difficulty,
            sort,
            company,
        } => {
            let filter = ExperienceFilter {
                search: search.unwrap_or_default(),
                difficulty: difficulty
                    .map(|d| d.parse::<Difficulty>())
                    .transpose()
                    .map_err(|e| anyhow!(e))?,
                sort: sort.parse::<ExperienceSort>().map_err(|e| anyhow!(e))?,
            };

            let directory = Directory::new(seed.companies);
            let repository = ExperienceRepository::new(seed.experiences);
            let experiences = match company {
                Some(name) => {
                    let key = directory.resolve(&name)?;
                    filter.apply(repository.for_company(&directory.get(key).company_name))
                }
                None => filter.apply(repository.all()),
            };
            println!("{}", shell::render_experience_list(&experiences));
        }

        Commands::Tips { company, role } => {
            let advisor = TipAdvisor::from_model(config.tips_model());
            let fragment = advisor.generate_tips(&company, &role).await;
            println!("{}", shell::render_tips(&company, &role, &fragment));
        }

        Commands::Session => {
            let advisor = TipAdvisor::from_model(config.tips_model());
            shell::run_session(seed, advisor).await?;
        }

        Commands::Browse => {
            tui::run_browse(Directory::new(seed.companies))?;
        }
    }

    Ok(())
}

fn print_options(directory: &Directory, filter: &DirectoryFilter) {
    if filter.kind.is_some() {
        println!("Types: {}", directory.unique_kinds().join(", "));
    }
    if filter.category.is_some() {
        println!("Categories: {}", directory.unique_categories().join(", "));
    }
    if filter.criterion.is_some() {
        println!("Criteria: {}", directory.unique_criteria().join(", "));
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Google", 10), "Google");
        assert_eq!(truncate("Texas Instruments", 10), "Texas I...");
        assert_eq!(truncate("Société Générale", 8), "Socié...");
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "placement",
            "companies",
            "--type",
            "Product",
            "--page",
            "2",
            "--data-dir",
            "/tmp/seed",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/seed")));
        match cli.command {
            Commands::Companies { kind, page, .. } => {
                assert_eq!(kind.as_deref(), Some("Product"));
                assert_eq!(page, 2);
            }
            _ => panic!("expected companies command"),
        }
    }
}
