//! `pubman` command-line entry point.
//!
//! # Responsibility
//! - Load configuration, start logging and open the database.
//! - Authenticate the acting user and dispatch subcommands to core services.

mod cli;
mod prompt;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command, CreateProjectArgs, MarkArgs, ProjectCommand, UserCommand};
use log::{info, warn};
use prompt::StdinResolver;
use pubman_core::config::{default_config_path, AppConfig};
use pubman_core::repo::attribute_repo::SqliteAttributeCacheRepository;
use pubman_core::repo::project_repo::{Project, SqliteProjectRepository};
use pubman_core::repo::user_repo::{SqliteUserRepository, User};
use pubman_core::scaffold::create_production_structure;
use pubman_core::sidecar::is_sidecar;
use pubman_core::{
    init_logging, open_db, relative_to_master, AlwaysClear, AttributeKind, AttributeService, ConflictChecker,
    ConflictResolver, CreateProjectRequest, DeliveryService, HierarchySource, ManifestExporter,
    NeverClear, ProjectService, SetOutcome, UserService,
};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config = AppConfig::load_or_create(&config_path)
        .with_context(|| format!("loading config `{}`", config_path.display()))?;
    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("warning: file logging disabled: {err}");
    }

    if let Command::Scaffold { parent, name } = &cli.command {
        let created = create_production_structure(parent, name)?;
        println!(
            "Created {} folders under {}",
            created.len(),
            parent.join(name.trim()).display()
        );
        return Ok(());
    }

    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path.clone());
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating `{}`", parent.display()))?;
    }
    let conn = open_db(&db_path).with_context(|| format!("opening `{}`", db_path.display()))?;
    let users = UserService::new(SqliteUserRepository::new(&conn));
    if users.bootstrap_admin(&config.default_admin_password)? {
        println!("Created default admin account");
    }

    if let Command::Init = cli.command {
        println!("Config:   {}", config_path.display());
        println!("Database: {}", db_path.display());
        return Ok(());
    }

    let user = login(&users, &cli)?;
    info!(
        "event=cli_command module=cli status=start user={}",
        user.username
    );

    match cli.command {
        Command::Init | Command::Scaffold { .. } => Ok(()),
        Command::User(command) => run_user_command(&users, &user, command),
        Command::Project(command) => run_project_command(&conn, &user, command),
        Command::Tree { project, dir } => {
            let project = find_project(&conn, &user, &project)?;
            let dir = resolve_in_project(&project, dir.as_deref().unwrap_or(Path::new(".")))?;
            print_tree(&conn, &project, &dir)
        }
        Command::Status { project, path } => {
            let project = find_project(&conn, &user, &project)?;
            print_status(&conn, &project, &resolve_in_project(&project, &path)?)
        }
        Command::Mark(args) => mark(&conn, &user, args),
        Command::Send { project, dir } => {
            let project = find_project(&conn, &user, &project)?;
            let store = project_store(&conn, &project);
            let delivery = DeliveryService::new(&store, project.delivery_path.clone());
            let report = delivery.send_to_client(&resolve_in_project(&project, &dir)?)?;
            if report.is_empty() {
                println!("No files marked for client delivery");
            } else {
                for file in &report.copied {
                    println!("{} -> {}", file.source.display(), file.destination.display());
                }
                println!(
                    "Delivered {} files ({} bytes) to {}",
                    report.file_count(),
                    report.total_bytes(),
                    delivery.delivery_root().display()
                );
            }
            Ok(())
        }
        Command::Export { project, dir } => {
            let project = find_project(&conn, &user, &project)?;
            let store = project_store(&conn, &project);
            let exporter = ManifestExporter::new(&store, project.name.clone());
            let report = exporter.export_published_xml(&resolve_in_project(&project, &dir)?)?;
            match report.path {
                Some(path) => println!(
                    "Exported {} files in {} sequences to {}",
                    report.file_count,
                    report.sequence_count,
                    path.display()
                ),
                None => println!("No published files found"),
            }
            Ok(())
        }
    }
}

fn login(users: &UserService<SqliteUserRepository<'_>>, cli: &Cli) -> Result<User> {
    let username = cli
        .user
        .as_deref()
        .ok_or_else(|| anyhow!("--user is required (or set PUBMAN_USER)"))?;
    let password = cli
        .password
        .as_deref()
        .ok_or_else(|| anyhow!("--password is required (or set PUBMAN_PASSWORD)"))?;
    Ok(users.authenticate(username, password)?)
}

fn run_user_command(
    users: &UserService<SqliteUserRepository<'_>>,
    actor: &User,
    command: UserCommand,
) -> Result<()> {
    if !users.is_admin(&actor.username) {
        bail!("user management requires the admin account");
    }
    match command {
        UserCommand::List => {
            for name in users.list_usernames()? {
                println!("{name}");
            }
        }
        UserCommand::Add {
            username,
            account_password,
        } => {
            let user = users.create_user(&username, &account_password)?;
            println!("Added user {}", user.username);
        }
        UserCommand::Update {
            username,
            new_username,
            new_password,
        } => {
            let user = users.update_account(&username, &new_username, new_password.as_deref())?;
            println!("Updated user {}", user.username);
        }
        UserCommand::Remove { username } => {
            users.remove_user(&username)?;
            println!("Removed user {username}");
        }
    }
    Ok(())
}

fn run_project_command(conn: &Connection, user: &User, command: ProjectCommand) -> Result<()> {
    let projects = ProjectService::new(SqliteProjectRepository::new(conn));
    match command {
        ProjectCommand::Create(args) => {
            let project = projects.create_project(create_request(args), user.id)?;
            println!(
                "Created project #{} {} at {}",
                project.id,
                project.name,
                project.master_path.display()
            );
        }
        ProjectCommand::List => {
            for project in projects.list_projects(user.id)? {
                println!(
                    "#{} {}  client={}  due={}  master={}",
                    project.id,
                    project.name,
                    project.client_name,
                    if project.delivery_date.is_empty() {
                        "-"
                    } else {
                        project.delivery_date.as_str()
                    },
                    project.master_path.display()
                );
                if !project.comment.is_empty() {
                    println!("    {}", project.comment);
                }
            }
        }
        ProjectCommand::Rename { project, name } => {
            let id = find_project(conn, user, &project)?.id;
            let project = projects.rename_project(id, &name)?;
            println!("Renamed project #{} to {}", project.id, project.name);
        }
        ProjectCommand::Comment { project, comment } => {
            let id = find_project(conn, user, &project)?.id;
            projects.update_comment(id, &comment)?;
            println!("Updated comment of project #{id}");
        }
        ProjectCommand::Date { project, date } => {
            let id = find_project(conn, user, &project)?.id;
            let project = projects.update_delivery_date(id, &date)?;
            println!(
                "Delivery date of project #{} set to {}",
                project.id,
                if project.delivery_date.is_empty() {
                    "(none)"
                } else {
                    project.delivery_date.as_str()
                }
            );
        }
    }
    Ok(())
}

fn create_request(args: CreateProjectArgs) -> CreateProjectRequest {
    let hierarchy = match (args.scaffold, args.template) {
        (_, Some(template)) => Some(HierarchySource::Template(template)),
        (true, None) => Some(HierarchySource::Builtin),
        (false, None) => None,
    };
    CreateProjectRequest {
        name: args.name,
        master_path: args.master_path,
        client_name: args.client,
        comment: args.comment,
        delivery_date: args.date,
        hierarchy,
    }
}

fn find_project(conn: &Connection, user: &User, key: &str) -> Result<Project> {
    ProjectService::new(SqliteProjectRepository::new(conn))
        .resolve_project(user.id, key)?
        .ok_or_else(|| anyhow!("no visible project matches `{key}`"))
}

fn project_store<'conn>(
    conn: &'conn Connection,
    project: &Project,
) -> AttributeService<SqliteAttributeCacheRepository<'conn>> {
    AttributeService::for_project(SqliteAttributeCacheRepository::new(conn), project)
}

/// Relative paths are taken from the project master path; anything that ends
/// up outside of it is refused.
fn resolve_in_project(project: &Project, path: &Path) -> Result<PathBuf> {
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        project.master_path.join(path)
    };
    match relative_to_master(&project.master_path, &resolved) {
        Some(relative) if relative.as_os_str().is_empty() => Ok(project.master_path.clone()),
        Some(relative) => Ok(project.master_path.join(relative)),
        None => bail!(
            "`{}` is outside project master path `{}`",
            path.display(),
            project.master_path.display()
        ),
    }
}

fn print_tree(conn: &Connection, project: &Project, dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("not a directory: `{}`", dir.display());
    }
    let store = project_store(conn, project);
    println!("{}  [{}]", dir.display(), store.status_label(dir));
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_sidecar(entry.path()));
    for entry in walker {
        let entry = entry?;
        let indent = "  ".repeat(entry.depth());
        let suffix = if entry.file_type().is_dir() { "/" } else { "" };
        println!(
            "{indent}{}{suffix}  [{}]",
            entry.file_name().to_string_lossy(),
            store.status_label(entry.path())
        );
    }
    Ok(())
}

fn print_status(conn: &Connection, project: &Project, path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("path does not exist: `{}`", path.display());
    }
    let store = project_store(conn, project);
    let details = store.details(path);
    println!("{}", details.path.display());
    for kind in AttributeKind::ALL {
        let current = details.status(kind);
        println!(
            "  {}: {}{}",
            kind.badge(),
            kind.describe(current.status),
            if current.timestamp.is_empty() {
                String::new()
            } else {
                format!(" (by {} at {})", current.user, current.timestamp)
            }
        );
        for entry in details.recent_history(kind) {
            println!(
                "    {}  {}  {}",
                entry.timestamp,
                entry.user,
                kind.describe(entry.status)
            );
        }
    }
    Ok(())
}

fn mark(conn: &Connection, user: &User, args: MarkArgs) -> Result<()> {
    let project = find_project(conn, user, &args.project)?;
    let path = resolve_in_project(&project, &args.path)?;
    if !path.exists() {
        bail!("path does not exist: `{}`", path.display());
    }

    let store = project_store(conn, &project);
    let checker = ConflictChecker::new(&store);
    let mut resolver: Box<dyn ConflictResolver> = if args.yes {
        Box::new(AlwaysClear)
    } else if args.no {
        Box::new(NeverClear)
    } else {
        Box::new(StdinResolver)
    };

    let outcome = checker.set_attribute(
        &path,
        args.attribute,
        args.value.as_bool(),
        &user.username,
        resolver.as_mut(),
    )?;
    match outcome {
        SetOutcome::Applied { timestamp, cleared } => {
            for conflict in &cleared {
                println!("Cleared {} on {}", args.attribute.badge(), conflict.name);
            }
            println!(
                "{}: {} ({timestamp})",
                path.display(),
                args.attribute.describe(args.value.as_bool())
            );
        }
        SetOutcome::Declined { conflicts } => {
            warn!(
                "event=cli_mark module=cli status=declined conflicts={}",
                conflicts.len()
            );
            println!("Cancelled; {} sibling(s) keep {}", conflicts.len(), args.attribute.badge());
        }
    }
    Ok(())
}
