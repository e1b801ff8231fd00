use clap::{Parser, Subcommand};
use frflashy::client::{ApiClient, ModelSettings};
use frflashy::config::{self, Credentials, Needs, SiteConfig};
use frflashy::store::{Database, NewUser, Tier};
use frflashy::{auth, examples, generate, hints, imaging, media, output, server, speech};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn version_string() -> &'static str {
    if env!("FRFLASHY_TAGGED") == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("FRFLASHY_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "frflashy")]
#[command(about = "Content pipeline and web service for a French vocabulary flashcard site")]
#[command(long_about = "\
Content pipeline and web service for a French vocabulary flashcard site

Site layout (paths configurable in frflashy.toml):

  ./
  ├── frflashy.toml                # Optional config, see 'frflashy gen-config'
  ├── templates/
  │   ├── base.html                # Shared layout for {% extends %}
  │   ├── index.html               # Static pages (pages.static_pages)
  │   ├── about.html
  │   ├── hints/                   # Hint fragments, indexed by 'frflashy hints'
  │   │   └── greetings.html
  │   └── vocab/                   # Vocabulary pages, any depth, linked prev/next
  │       └── vetements/manteau.html
  ├── dist/                        # Build output
  └── recordings/                  # Audio uploaded through the web service

Environment:
  FRFLASHY_DATABASE_URL   SQLite database (path, optionally prefixed sqlite://)
  OPENAI_API_KEY          Generation API key
  OPENAI_BASE_URL         Generation API base (default https://api.openai.com/v1)
  RUST_LOG, LOG_FORMAT    Log filter (default info) and format (json)")]
#[command(version = version_string())]
struct Cli {
    /// Site root holding frflashy.toml and the templates
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render hint, static and vocabulary pages into the output directory
    Build,
    /// Index the hint pages into a JSON file
    Hints {
        /// Directory of hint fragments (default: paths.hints_dir)
        #[arg(long)]
        templates_dir: Option<PathBuf>,
        /// Index file to write (default: paths.hints_index)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Manage cached example sentences
    #[command(subcommand)]
    Examples(ExamplesCommand),
    /// Manage user accounts
    #[command(subcommand)]
    Users(UsersCommand),
    /// Generate pronunciation audio for a phrase
    Speak {
        /// Output name, slugified into the file name
        name: String,
        /// Voice hints: "voice=nova", a tone ("calm") or a gender ("woman")
        instructions: String,
        /// Text to speak
        text: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Generate a flashcard image
    Image {
        prompt: String,
        /// Output name, slugified into the file name
        name: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Generate flashcard media for every row of a vocabulary CSV
    #[command(subcommand)]
    Media(MediaCommand),
    /// Shrink a PNG towards a target file size
    Shrink {
        png: PathBuf,
        /// Target size in KB (default: images.target_kb)
        #[arg(long)]
        target_kb: Option<u64>,
    },
    /// Run the web service
    Serve {
        /// Address to bind (default: server.bind_address)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print a stock frflashy.toml with all options documented
    GenConfig,
}

#[derive(Subcommand)]
enum ExamplesCommand {
    /// Fill every expression of a vocabulary CSV up to the configured count
    Populate {
        csv: PathBuf,
        /// Examples per expression (default: examples.per_expression)
        #[arg(long)]
        count: Option<usize>,
    },
    /// Find and remove duplicate example sentences
    Check {
        /// Only report what would be deleted
        #[arg(long)]
        trial_run: bool,
        /// Delete without asking for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Write one text file of French sentences per expression
    Export { dir: PathBuf },
}

#[derive(Subcommand)]
enum MediaCommand {
    /// One image per row, named after the French expression
    Images {
        csv: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Shrink each new image towards this size in KB
        #[arg(long)]
        target_kb: Option<u64>,
    },
    /// One audio file per row, speaking the French expression
    Audio {
        csv: PathBuf,
        /// Voice hints, as for 'frflashy speak'
        #[arg(long, default_value = "")]
        instructions: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

impl Command {
    fn needs(&self) -> Needs {
        let database = matches!(self, Command::Examples(_) | Command::Users(_) | Command::Serve { .. });
        let api_key = matches!(
            self,
            Command::Examples(ExamplesCommand::Populate { .. })
                | Command::Speak { .. }
                | Command::Image { .. }
                | Command::Media(_)
                | Command::Serve { .. }
        );
        Needs { database, api_key }
    }
}

#[derive(Subcommand)]
enum UsersCommand {
    /// List all accounts
    List,
    /// Create an account
    Add {
        username: String,
        email: String,
        password: String,
        /// 0=admin, 1=gratis, 2=basic, 3=pro, 4=premium (names accepted)
        tier: Tier,
    },
    /// Delete an account
    Del {
        username: String,
        /// Delete without asking for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Check a password against an account
    Check { username: String, password: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let site_config = config::load_config(&cli.root)?;
    let paths = site_config.paths.resolve(&cli.root);
    let credentials = Credentials::from_env();
    credentials.check(cli.command.needs())?;

    match cli.command {
        Command::GenConfig => unreachable!("handled above"),
        Command::Build => {
            println!("==> Building {} → {}", paths.templates.display(), paths.output.display());
            let report = generate::SiteBuilder::new(&paths, &site_config.pages.static_pages).build()?;
            output::print_build_report(&report);
        }
        Command::Hints {
            templates_dir,
            output: index_path,
        } => {
            let dir = templates_dir.unwrap_or_else(|| paths.hints_dir.clone());
            let index_path = index_path.unwrap_or_else(|| paths.hints_index.clone());
            let records = hints::build_index(&dir)?;
            hints::write_index(&records, &index_path)?;
            output::print_hint_index(&records, &index_path);
        }
        Command::Examples(command) => {
            let db = Database::open(&credentials.require_database()?)?;
            run_examples(command, &db, &site_config, &credentials)?;
        }
        Command::Users(command) => {
            let db = Database::open(&credentials.require_database()?)?;
            run_users(command, &db)?;
        }
        Command::Speak {
            name,
            instructions,
            text,
            out_dir,
        } => {
            let client = api_client(&site_config, &credentials)?;
            let result = speech::speak(&client, &site_config.speech, &out_dir, &name, &instructions, &text)?;
            output::print_speech_output(&result);
        }
        Command::Image { prompt, name, out_dir } => {
            let client = api_client(&site_config, &credentials)?;
            let (path, image) = imaging::create_image(&client, &site_config.images, &out_dir, &name, &prompt)?;
            output::print_image_output(&path, &image);
        }
        Command::Media(command) => {
            let client = api_client(&site_config, &credentials)?;
            run_media(command, &client, &site_config)?;
        }
        Command::Shrink { png, target_kb } => {
            let target_kb = target_kb.unwrap_or(site_config.images.target_kb);
            let outcome = imaging::shrink_png(&png, target_kb)?;
            output::print_shrink_outcome(&png, target_kb, &outcome);
        }
        Command::Serve { bind } => {
            let db = Database::open(&credentials.require_database()?)?;
            let client = Arc::new(api_client(&site_config, &credentials)?);
            let bind = bind.unwrap_or_else(|| site_config.server.bind_address.clone());
            let state = Arc::new(server::AppState {
                recordings_dir: paths.recordings.clone(),
                db,
                transcriber: client.clone(),
                tutor: client.clone(),
                speech: client,
                sessions: auth::SessionStore::new(),
                config: site_config,
            });
            info!(version = version_string(), "frflashy starting");
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?
                .block_on(server::serve(state, &bind))?;
        }
    }

    Ok(())
}

fn run_examples(
    command: ExamplesCommand,
    db: &Database,
    site_config: &SiteConfig,
    credentials: &Credentials,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ExamplesCommand::Populate { csv, count } => {
            let n = count.unwrap_or(site_config.examples.per_expression);
            let expressions = examples::read_expressions(&csv)?;
            println!("==> {} expressions from {}", expressions.len(), csv.display());
            let client = api_client(site_config, credentials)?;
            let cache = examples::ExampleCache::new(db, &client, site_config.examples.max_attempts);
            let outcomes = examples::populate(&cache, &expressions, n);
            output::print_fill_outcomes(&outcomes, n);
        }
        ExamplesCommand::Check { trial_run, yes } => {
            let preview = examples::dedupe(db, true)?;
            output::print_dedupe_report(&preview);
            if trial_run || preview.groups.is_empty() {
                return Ok(());
            }
            if !yes && !confirm(&format!("Delete {} rows?", preview.deleted))? {
                println!("Cancelled.");
                return Ok(());
            }
            let report = examples::dedupe(db, false)?;
            println!("Deleted {} rows", report.deleted);
        }
        ExamplesCommand::Export { dir } => {
            let written = examples::export_text_caches(db, &dir)?;
            output::print_export(&written, &dir);
        }
    }
    Ok(())
}

fn run_media(
    command: MediaCommand,
    client: &ApiClient,
    site_config: &SiteConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        MediaCommand::Images {
            csv,
            out_dir,
            target_kb,
        } => {
            let rows = examples::read_vocab_rows(&csv)?;
            println!("==> {} images from {} → {}", rows.len(), csv.display(), out_dir.display());
            let outcomes = media::batch_images(
                client,
                &site_config.images,
                &rows,
                &out_dir,
                target_kb,
                &mut std::thread::sleep,
            )?;
            output::print_media_outcomes(&outcomes);
        }
        MediaCommand::Audio {
            csv,
            instructions,
            out_dir,
        } => {
            let rows = examples::read_vocab_rows(&csv)?;
            println!("==> {} audio files from {} → {}", rows.len(), csv.display(), out_dir.display());
            let outcomes = media::batch_speech(client, &site_config.speech, &rows, &out_dir, &instructions);
            output::print_media_outcomes(&outcomes);
        }
    }
    Ok(())
}

fn run_users(command: UsersCommand, db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        UsersCommand::List => output::print_user_table(&db.list_users()?),
        UsersCommand::Add {
            username,
            email,
            password,
            tier,
        } => {
            let password_hash = auth::hash_password(&password)?;
            db.insert_user(&NewUser {
                username: &username,
                email: &email,
                password_hash: &password_hash,
                tier,
            })?;
            println!("Created user '{username}'");
            println!("    Email: {email}");
            println!("    Tier: {} ({tier})", tier.code());
        }
        UsersCommand::Del { username, yes } => {
            let Some(user) = db.find_user(&username)? else {
                return Err(format!("user '{username}' not found").into());
            };
            println!("About to delete user:");
            println!("    ID: {}", user.id);
            println!("    Username: {}", user.username);
            println!("    Email: {}", user.email);
            println!("    Tier: {}", user.tier);
            if !yes && !confirm("Delete this user?")? {
                println!("Cancelled.");
                return Ok(());
            }
            db.delete_user(&username)?;
            println!("Deleted user '{username}'");
        }
        UsersCommand::Check { username, password } => {
            let Some(user) = db.find_user(&username)? else {
                return Err(format!("user '{username}' not found").into());
            };
            if auth::verify_password(&user.password_hash, &password) {
                println!("Password is CORRECT for user '{username}'");
            } else {
                println!("Password is INCORRECT for user '{username}'");
            }
        }
    }
    Ok(())
}

fn api_client(site_config: &SiteConfig, credentials: &Credentials) -> Result<ApiClient, config::ConfigError> {
    let key = credentials.require_api_key()?;
    Ok(ApiClient::new(
        &credentials.api_base,
        key,
        ModelSettings::from_config(site_config),
    ))
}

/// Ask on stdin; only a literal `yes` confirms.
fn confirm(prompt: &str) -> std::io::Result<bool> {
    print!("{prompt} Type 'yes' to confirm: ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

/// Logs go to stderr so command reports on stdout stay clean.
fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
