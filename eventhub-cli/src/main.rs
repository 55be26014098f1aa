//! Command line client for an EventHub server. Keeps its session token and joined events in a data directory, the
//! same way the browser keeps them in `localStorage`.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use event_utils::{Credentials, DateFilterCriterion, Event, EventDraft, Identity, Registration};
use eventhub_frontend_rs::{
    ApiConfig, Channel, DEFAULT_API_BASE_URL, EventHub, FileStorage, HttpEventRepository,
    JoinedSetTracker, KeyValueStorage, ListSnapshot, TokenStore,
};

#[derive(Parser, Debug)]
#[command(name = "eventhub", author, version, about = "Browse, join and manage EventHub events")]
struct Cli {
    /// Base URL of the event API.
    #[arg(long, env = "EVENTHUB_API_URL", default_value = DEFAULT_API_BASE_URL)]
    api_url: String,
    /// Where the session token and joined events are kept between runs.
    #[arg(long, env = "EVENTHUB_DATA_DIR", default_value = ".eventhub")]
    data_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an account and sign in with it.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "EVENTHUB_PASSWORD")]
        password: String,
        #[arg(long, default_value = "")]
        photo_url: String,
    },
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "EVENTHUB_PASSWORD")]
        password: String,
    },
    Logout,
    /// Show who is signed in.
    Whoami,
    /// List all events, optionally narrowed by title and date.
    #[command(alias = "ls")]
    List {
        #[arg(long, default_value = "")]
        search: String,
        /// all, today, current-week, last-week, current-month or last-month
        #[arg(long, default_value_t = DateFilterCriterion::All)]
        date: DateFilterCriterion,
    },
    /// List the events you created.
    Mine,
    Join { id: String },
    Create(EventForm),
    Update {
        id: String,
        #[command(flatten)]
        form: EventForm,
    },
    Delete { id: String },
}

#[derive(Args, Debug)]
struct EventForm {
    #[arg(long)]
    title: String,
    /// YYYY-MM-DD
    #[arg(long)]
    date: String,
    /// HH:MM
    #[arg(long)]
    time: String,
    #[arg(long)]
    location: String,
    #[arg(long, default_value = "")]
    description: String,
}

impl EventForm {
    fn draft(&self) -> EventDraft {
        EventDraft::from_form(
            self.title.as_str(),
            &self.date,
            &self.time,
            self.location.as_str(),
            self.description.as_str(),
        )
    }
}

fn open_hub(cli: &Cli) -> anyhow::Result<EventHub<HttpEventRepository>> {
    let storage: Rc<dyn KeyValueStorage> = Rc::new(
        FileStorage::new(&cli.data_dir)
            .with_context(|| format!("opening data directory {}", cli.data_dir.display()))?,
    );
    let tokens = TokenStore::new(storage.clone(), Channel::default());
    let repository = HttpEventRepository::new(ApiConfig::new(cli.api_url.as_str())).with_tokens(tokens.clone());
    Ok(EventHub::from_parts(repository, tokens, JoinedSetTracker::load(storage)))
}

fn describe(identity: &Identity) -> String {
    match &identity.photo_url {
        Some(photo_url) if !photo_url.is_empty() => {
            format!("{} (@{}) {photo_url}", identity.name, identity.username)
        }
        _ => format!("{} (@{})", identity.name, identity.username),
    }
}

fn render(event: &Event, joined: bool) -> String {
    let when = event.date_time.as_deref().unwrap_or("no date");
    let mark = if joined { "*" } else { " " };
    format!(
        "{mark} {}  {when}  {}  @ {}  ({} attending, by {})",
        event.id, event.title, event.location, event.attendee_count, event.creator
    )
}

fn print_list(snapshot: &ListSnapshot, events: &[Event], hub: &EventHub<HttpEventRepository>) {
    if let Some(error) = &snapshot.error {
        eprintln!("{error}");
    }
    if events.is_empty() {
        println!("No events found.");
    }
    for event in events {
        println!("{}", render(event, !hub.can_join(&event.id)));
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let hub = open_hub(&cli)?;

    match cli.command {
        Commands::Register {
            name,
            username,
            password,
            photo_url,
        } => {
            let registration = Registration {
                name,
                photo_url,
                username,
                password,
            };
            match hub.register(&registration).await.context("Registration failed")? {
                Some(identity) => println!("Signed in as {}", describe(&identity)),
                None => println!("Registered, but the server's token carries no profile"),
            }
        }
        Commands::Login { username, password } => {
            let credentials = Credentials { username, password };
            match hub.login(&credentials).await.context("Login failed")? {
                Some(identity) => println!("Signed in as {}", describe(&identity)),
                None => println!("Signed in, but the server's token carries no profile"),
            }
        }
        Commands::Logout => {
            hub.logout()?;
            println!("Signed out");
        }
        Commands::Whoami => match hub.identity() {
            Some(identity) => println!("{}", describe(&identity)),
            None => println!("Not signed in"),
        },
        Commands::List { search, date } => {
            hub.refresh_events().await?;
            let events = hub.visible_events(&search, date);
            print_list(&hub.events(), &events, &hub);
        }
        Commands::Mine => {
            if !hub.is_authenticated() {
                bail!("you need to sign in first");
            }
            hub.refresh_my_events().await?;
            let mine = hub.my_events();
            print_list(&mine, &mine.events, &hub);
        }
        Commands::Join { id } => {
            if !hub.can_join(&id) {
                bail!("you already joined event {id}");
            }
            let response = hub.join(&id).await.context("Failed to join event")?;
            match response.attendee_count {
                Some(count) => println!("Joined {id}, {count} attending"),
                None => println!("Joined {id}"),
            }
        }
        Commands::Create(form) => {
            let created = hub.create(&form.draft()).await.context("Failed to create event")?;
            match created {
                Some(event) => println!("Created {}", event.id),
                None => println!("Created {:?}", form.title),
            }
        }
        Commands::Update { id, form } => {
            hub.update(&id, &form.draft()).await.context("Failed to update event")?;
            println!("Updated {id}");
        }
        Commands::Delete { id } => {
            hub.delete(&id).await.context("Failed to delete event")?;
            println!("Deleted {id}");
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    run(Cli::parse()).await
}
