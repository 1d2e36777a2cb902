//! Command-line access to an Apollo catalog database.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apollo::db::{CatalogStore, StoreConfig, StoreError};
use apollo::models::{Album, AlbumKey, NewAlbum, RelationTag};

/// Manage users, albums and user/album relations in an Apollo catalog.
#[derive(Parser)]
#[command(name = "apollo")]
#[command(about = "Data-access tool for the Apollo music catalog")]
struct Cli {
    /// Database file path
    #[arg(short, long, env = "DATABASE_URL", default_value = "apollo.db")]
    database: String,

    /// SQLite busy timeout in milliseconds
    #[arg(long, default_value = "5000")]
    busy_timeout: u32,

    /// Print albums as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new user
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        #[arg(short, long)]
        email: String,
    },

    /// Check a username and password
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },

    /// Change a user's password
    ChangePassword {
        #[arg(short, long)]
        username: String,

        #[arg(long)]
        old: String,

        #[arg(long)]
        new: String,
    },

    /// Change a user's email
    ChangeEmail {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,
    },

    /// Show a user's email
    Email {
        #[arg(short, long)]
        username: String,
    },

    /// Add an album to the catalog
    AddAlbum {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        artist: String,

        /// Album URI (natural key)
        #[arg(long)]
        uri: String,

        #[arg(short, long)]
        image_link: String,
    },

    /// Show an album by URI
    Album {
        #[arg(long)]
        uri: String,
    },

    /// Relate a user to an album (liked, passed, recommended)
    Relate {
        #[arg(short, long)]
        username: String,

        /// Album URI
        #[arg(long, conflicts_with = "album_id", required_unless_present = "album_id")]
        uri: Option<String>,

        /// Album ID
        #[arg(long)]
        album_id: Option<i32>,

        #[arg(short, long)]
        tag: RelationTag,
    },

    /// List a user's albums under one tag
    List {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        tag: RelationTag,

        /// Page size
        #[arg(long)]
        limit: Option<u32>,

        /// Page start, used with --limit
        #[arg(long, default_value = "0", requires = "limit")]
        offset: u32,
    },

    /// Remove a user/album relation
    Unrelate {
        #[arg(short, long)]
        username: String,

        #[arg(long)]
        uri: String,

        #[arg(short, long)]
        tag: RelationTag,
    },

    /// List every album a user has any relation with
    Interacted {
        #[arg(short, long)]
        username: String,
    },
}

fn print_albums(albums: &[Album], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(albums)?);
    } else if albums.is_empty() {
        println!("No albums.");
    } else {
        for album in albums {
            println!("  [{}] {} - {} ({})", album.id, album.artist, album.name, album.uri);
        }
    }
    Ok(())
}

fn run(
    store: &mut CatalogStore,
    command: Commands,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Register {
            username,
            password,
            email,
        } => {
            let id = store.register(&username, &password, &email)?;
            println!("Registered user '{}' (id: {})", username, id);
        }
        Commands::Login { username, password } => {
            let id = store.login(&username, &password)?;
            println!("Login ok for '{}' (id: {})", username, id);
        }
        Commands::ChangePassword { username, old, new } => {
            let id = store.get_user_id(&username)?;
            if store.change_password(id, &old, &new)? {
                println!("Changed password for '{}'", username);
            } else {
                return Err(format!("Password for '{}' was not changed", username).into());
            }
        }
        Commands::ChangeEmail { username, email } => {
            let id = store.get_user_id(&username)?;
            if store.change_email(id, &email) {
                println!("Changed email for '{}' to {}", username, email);
            } else {
                return Err(format!("Email for '{}' was not changed", username).into());
            }
        }
        Commands::Email { username } => {
            let id = store.get_user_id(&username)?;
            println!("{}", store.get_email(id)?);
        }
        Commands::AddAlbum {
            name,
            artist,
            uri,
            image_link,
        } => {
            store.insert_album(&NewAlbum::new(&name, &artist, &uri, &image_link))?;
            println!("Added album '{}' ({})", name, uri);
        }
        Commands::Album { uri } => {
            let album = store.get_album(&uri)?;
            print_albums(std::slice::from_ref(&album), json)?;
        }
        Commands::Relate {
            username,
            uri,
            album_id,
            tag,
        } => {
            let id = store.get_user_id(&username)?;
            let key = match (&uri, album_id) {
                (Some(uri), _) => AlbumKey::Uri(uri),
                (None, Some(album_id)) => AlbumKey::Id(album_id),
                (None, None) => return Err("Either --uri or --album-id is required".into()),
            };
            store.add_relationship(id, key, tag)?;
            println!("'{}' {} {:?}", username, tag, key);
        }
        Commands::List {
            username,
            tag,
            limit,
            offset,
        } => {
            let id = store.get_user_id(&username)?;
            let albums = match limit {
                Some(limit) => store.list_relationships_page(id, tag, limit, offset)?,
                None => store.list_relationships(id, tag)?,
            };
            print_albums(&albums, json)?;
        }
        Commands::Unrelate { username, uri, tag } => {
            let id = store.get_user_id(&username)?;
            if store.remove_relationship(id, &uri, tag)? {
                println!("Removed {} relation between '{}' and {}", tag, username, uri);
            } else {
                return Err(
                    format!("No single {} relation for '{}' and {}", tag, username, uri).into(),
                );
            }
        }
        Commands::Interacted { username } => {
            let id = store.get_user_id(&username)?;
            let albums = store.get_all_interacted_albums(id)?;
            print_albums(&albums, json)?;
        }
    }

    Ok(())
}

fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apollo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = StoreConfig {
        busy_timeout_ms: cli.busy_timeout,
        ..StoreConfig::new(&cli.database)
    };

    let mut failure: Option<Box<dyn std::error::Error>> = None;
    let opened = CatalogStore::scoped(&config, |store| {
        if let Err(e) = run(store, cli.command, cli.json) {
            failure = Some(e);
        }
        Ok::<_, StoreError>(())
    });

    if let Err(e) = opened {
        eprintln!("Failed to open database {}: {}", config.database_url, e);
        std::process::exit(1);
    }
    if let Some(e) = failure {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
