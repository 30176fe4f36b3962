//! `contacts` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration (file, environment, flags) and bootstrap logging.
//! - Expose contact CRUD and CSV import/export over a SQLite database.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use contacts_core::db::Connection;
use contacts_core::{
    init_logging, open_db, AppConfig, Contact, ContactPage, ContactService, CsvService,
    PageRequest, SqliteContactRepository,
};
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Contact manager with CSV import and export.
#[derive(Debug, Parser)]
#[command(name = "contacts")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path, overrides configuration
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error), overrides configuration
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List active contacts, sorted by last name
    List {
        /// Case-insensitive match on first name, last name or email
        #[arg(long)]
        search: Option<String>,
        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = contacts_core::service::contact_service::DEFAULT_PAGE_SIZE)]
        size: u32,
    },
    /// Show one contact
    Show { id: i64 },
    /// Create a contact
    Add(AddArgs),
    /// Soft-delete a contact
    Delete { id: i64 },
    /// Import contacts from a CSV file
    Import { file: PathBuf },
    /// Export active contacts as CSV (stdout when no output is given)
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the resolved configuration as TOML
    Config,
}

#[derive(Debug, Args)]
struct AddArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    /// International format, e.g. +212612345678
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    postal_code: Option<String>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    job_title: Option<String>,
    /// YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    birthday: Option<NaiveDate>,
    #[arg(long)]
    website: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

impl AddArgs {
    fn into_contact(self) -> Contact {
        let mut contact = Contact::new(self.first_name, self.last_name, self.email);
        contact.phone = self.phone;
        contact.address = self.address;
        contact.city = self.city;
        contact.postal_code = self.postal_code;
        contact.country = self.country;
        contact.company = self.company;
        contact.job_title = self.job_title;
        contact.birthday = self.birthday;
        contact.website = self.website;
        contact.notes = self.notes;
        contact
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|err| format!("invalid date `{value}`: {err}; use YYYY-MM-DD"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    init_logging(&config.logging).context("failed to initialize logging")?;
    info!(
        "event=cli_start module=cli status=ok command={}",
        command_name(&cli.command)
    );

    if matches!(cli.command, Commands::Config) {
        print!("{}", render_config(&config)?);
        return Ok(());
    }

    let conn = open_db(&config.database.path).with_context(|| {
        format!(
            "failed to open database `{}`",
            config.database.path.display()
        )
    })?;

    match cli.command {
        Commands::List { search, page, size } => {
            let service = ContactService::new(SqliteContactRepository::new(&conn));
            let page = service.find_page(search.as_deref(), PageRequest::new(page, size))?;
            print_page(&page);
        }
        Commands::Show { id } => {
            let service = ContactService::new(SqliteContactRepository::new(&conn));
            print_contact(&service.find_by_id(id)?);
        }
        Commands::Add(args) => {
            let service = ContactService::new(SqliteContactRepository::new(&conn));
            let created = service.create_contact(&args.into_contact())?;
            println!("created contact {}", created.id.unwrap_or_default());
        }
        Commands::Delete { id } => {
            let service = ContactService::new(SqliteContactRepository::new(&conn));
            service.delete_contact(id)?;
            println!("deleted contact {id}");
        }
        Commands::Import { file } => import_file(&conn, &file)?,
        Commands::Export { output } => export_file(&conn, output.as_deref())?,
        Commands::Config => {}
    }

    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    Ok(config)
}

fn render_config(config: &AppConfig) -> Result<String> {
    config
        .to_toml_string()
        .context("failed to render configuration")
}

fn import_file(conn: &Connection, file: &Path) -> Result<()> {
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let upload =
        File::open(file).with_context(|| format!("failed to open `{}`", file.display()))?;

    let service = CsvService::new(SqliteContactRepository::new(conn));
    let report = service.import_upload(&file_name, upload)?;

    println!(
        "imported {} contact(s), rejected {}",
        report.imported,
        report.rejected()
    );
    for rejection in &report.rejections {
        println!("  line {}: {}", rejection.line, rejection.reason);
    }
    Ok(())
}

fn export_file(conn: &Connection, output: Option<&Path>) -> Result<()> {
    let service = CsvService::new(SqliteContactRepository::new(conn));
    let download = service.export_download()?;

    match output {
        Some(path) => {
            std::fs::write(path, &download.body)
                .with_context(|| format!("failed to write `{}`", path.display()))?;
            println!("exported to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&download.body)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn print_page(page: &ContactPage) {
    for contact in &page.items {
        println!(
            "{:>6}  {} {}  <{}>",
            contact.id.unwrap_or_default(),
            contact.first_name,
            contact.last_name,
            contact.email
        );
    }
    println!(
        "page {}/{} ({} contact(s))",
        page.page.saturating_add(1),
        page.total_pages.max(1),
        page.total_items
    );
}

fn print_contact(contact: &Contact) {
    let optional = |value: &Option<String>| value.clone().unwrap_or_default();
    println!("id:          {}", contact.id.unwrap_or_default());
    println!("first name:  {}", contact.first_name);
    println!("last name:   {}", contact.last_name);
    println!("email:       {}", contact.email);
    println!("phone:       {}", optional(&contact.phone));
    println!("company:     {}", optional(&contact.company));
    println!("job title:   {}", optional(&contact.job_title));
    println!("address:     {}", optional(&contact.address));
    println!("city:        {}", optional(&contact.city));
    println!("postal code: {}", optional(&contact.postal_code));
    println!("country:     {}", optional(&contact.country));
    println!(
        "birthday:    {}",
        contact
            .birthday
            .map(|date| date.to_string())
            .unwrap_or_default()
    );
    println!("website:     {}", optional(&contact.website));
    println!("notes:       {}", optional(&contact.notes));
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::List { .. } => "list",
        Commands::Show { .. } => "show",
        Commands::Add(_) => "add",
        Commands::Delete { .. } => "delete",
        Commands::Import { .. } => "import",
        Commands::Export { .. } => "export",
        Commands::Config => "config",
    }
}
