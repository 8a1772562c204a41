use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    load_settings, Backoffice, Catalogued, CrudScreen, DeleteOutcome, ResourceStore,
    StoreEvent, SubmitOutcome, Toast,
};
use shared::domain::{Company, Depot, Driver, FreightOrder, Resource, Route, Vehicle, VehicleOwner};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Extra wait after stdin closes so the last debounced search can land.
const WATCH_DRAIN_MARGIN: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(about = "Back-office console for the logistics API")]
struct Cli {
    /// Settings file; defaults to ./backoffice.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the API base url from settings and environment.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EntityArg {
    Companies,
    Drivers,
    Vehicles,
    VehicleOwners,
    Depots,
    Routes,
    FreightOrders,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        entity: EntityArg,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long = "type")]
        kind: Option<String>,
    },
    Search {
        entity: EntityArg,
        term: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long = "type")]
        kind: Option<String>,
    },
    /// Checks whether an identification value is already registered.
    Lookup { entity: EntityArg, value: String },
    /// Fields are given as `name=value`.
    Create {
        entity: EntityArg,
        #[arg(value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },
    Update {
        entity: EntityArg,
        id: i64,
        #[arg(value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },
    Delete { entity: EntityArg, id: i64 },
    /// Reads search terms from stdin, one per line, through the debouncer.
    WatchSearch { entity: EntityArg },
}

impl Command {
    fn entity(&self) -> EntityArg {
        match self {
            Self::List { entity, .. }
            | Self::Search { entity, .. }
            | Self::Lookup { entity, .. }
            | Self::Create { entity, .. }
            | Self::Update { entity, .. }
            | Self::Delete { entity, .. }
            | Self::WatchSearch { entity } => *entity,
        }
    }
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(api_url) = cli.api_url {
        settings.api_base_url = api_url;
        settings.validate().context("invalid --api-url")?;
    }
    let backoffice = Backoffice::new(settings)?;

    match cli.command.entity() {
        EntityArg::Companies => run::<Company>(&backoffice, cli.command).await,
        EntityArg::Drivers => run::<Driver>(&backoffice, cli.command).await,
        EntityArg::Vehicles => run::<Vehicle>(&backoffice, cli.command).await,
        EntityArg::VehicleOwners => run::<VehicleOwner>(&backoffice, cli.command).await,
        EntityArg::Depots => run::<Depot>(&backoffice, cli.command).await,
        EntityArg::Routes => run::<Route>(&backoffice, cli.command).await,
        EntityArg::FreightOrders => run::<FreightOrder>(&backoffice, cli.command).await,
    }
}

async fn run<T: Catalogued>(backoffice: &Backoffice, command: Command) -> Result<()> {
    let mut toasts = backoffice.notifier().subscribe();
    let result = execute::<T>(backoffice, command).await;
    print_toasts(&mut toasts);
    result
}

async fn execute<T: Catalogued>(backoffice: &Backoffice, command: Command) -> Result<()> {
    let store = backoffice.store::<T>();
    let page_size = backoffice.settings().default_page_size;

    match command {
        Command::List {
            page, limit, kind, ..
        } => {
            store
                .list(page, limit.unwrap_or(page_size), kind.as_deref())
                .await?;
            print_page(&store)
        }
        Command::Search {
            term,
            page,
            limit,
            kind,
            ..
        } => {
            store
                .search(&term, page, limit.unwrap_or(page_size), kind.as_deref())
                .await?;
            print_page(&store)
        }
        Command::Lookup { value, .. } => match store.lookup_by_identification(&value).await? {
            Some(found) => {
                println!(
                    "{} {} is registered as id {}",
                    T::LABEL,
                    found.identification().unwrap_or(value.as_str()),
                    found.id()
                );
                println!("{}", serde_json::to_string(&found)?);
                Ok(())
            }
            None => {
                println!("{} {value} is not registered", T::LABEL);
                Ok(())
            }
        },
        Command::Create { fields, .. } => {
            let mut screen = backoffice.screen::<T>();
            screen.open_create();
            apply_fields(&mut screen, &fields)?;
            let outcome = screen.submit().await;
            report_submit(&screen, outcome)
        }
        Command::Update { id, fields, .. } => {
            let existing = find_record(&store, T::Id::from(id), page_size).await?;
            let mut screen = backoffice.screen::<T>();
            screen.open_edit(&existing);
            apply_fields(&mut screen, &fields)?;
            let outcome = screen.submit().await;
            report_submit(&screen, outcome)
        }
        Command::Delete { id, .. } => {
            let existing = find_record(&store, T::Id::from(id), page_size).await?;
            let mut screen = backoffice.screen::<T>();
            screen.confirm_delete(&existing);
            match screen.delete_confirmed().await {
                DeleteOutcome::Deleted => Ok(()),
                DeleteOutcome::Failed(message) => Err(anyhow::anyhow!(message)),
                DeleteOutcome::NotConfirming => bail!("delete was not confirmed"),
            }
        }
        Command::WatchSearch { .. } => watch_search::<T>(backoffice).await,
    }
}

fn apply_fields<T: Catalogued>(
    screen: &mut CrudScreen<T>,
    fields: &[(String, String)],
) -> Result<()> {
    for (name, value) in fields {
        if !screen.form_mut().set_value(name, value.as_str()) {
            if !screen.form().is_enabled(name) && screen.form().value(name).is_some() {
                bail!("field '{name}' cannot be changed on an existing {}", T::LABEL);
            }
            let known: Vec<&str> = screen
                .form()
                .spec()
                .fields()
                .iter()
                .map(|field| field.name)
                .collect();
            bail!("unknown field '{name}'; expected one of: {}", known.join(", "));
        }
        screen.form_mut().touch(name);
    }
    Ok(())
}

fn report_submit<T: Catalogued>(
    screen: &CrudScreen<T>,
    outcome: SubmitOutcome,
) -> Result<()> {
    match outcome {
        SubmitOutcome::Saved => Ok(()),
        SubmitOutcome::Invalid(issues) => {
            for issue in &issues {
                eprintln!(
                    "  {} {}",
                    screen.store().catalog().label(issue.field),
                    issue.error
                );
            }
            bail!("{} field(s) need attention", issues.len())
        }
        SubmitOutcome::Failed(message) => Err(anyhow::anyhow!(message)),
        SubmitOutcome::NotOpen => bail!("no form is open"),
    }
}

/// Pages through the listing until `id` shows up.
async fn find_record<T: Catalogued>(store: &ResourceStore<T>, id: T::Id, page_size: u32) -> Result<T> {
    let mut page = 1;
    loop {
        store
            .list(page, page_size, None)
            .await
            .with_context(|| format!("failed to load {} page {page}", T::PATH))?;
        if let Some(found) = store.find(id) {
            return Ok(found);
        }
        if page >= store.pagination().total_pages {
            bail!("{} {id} not found", T::LABEL);
        }
        page += 1;
    }
}

async fn watch_search<T: Catalogued>(backoffice: &Backoffice) -> Result<()> {
    let mut screen = backoffice.screen::<T>();
    let quiet = backoffice
        .settings()
        .search_debounce(T::PATH, T::screen_config().search_debounce);
    screen.load().await;
    print_page(screen.store())?;

    let printer = {
        let store = Arc::clone(screen.store());
        let mut events = store.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(StoreEvent::ItemsReplaced { .. }) => {
                        if let Err(err) = print_page(&store) {
                            debug!(error = %err, "failed to print page");
                        }
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
            }
        })
    };

    info!(resource = T::PATH, ?quiet, "reading search terms from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        screen.on_search_input(line);
    }

    tokio::time::sleep(quiet + WATCH_DRAIN_MARGIN).await;
    printer.abort();
    screen.teardown();
    Ok(())
}

fn print_page<T: Resource>(store: &ResourceStore<T>) -> Result<()> {
    for item in store.items() {
        println!("{}", serde_json::to_string(&item)?);
    }
    let pagination = store.pagination();
    println!(
        "-- page {}/{} ({} records)",
        pagination.current_page,
        pagination.total_pages.max(1),
        pagination.total_records
    );
    Ok(())
}

fn print_toasts(toasts: &mut broadcast::Receiver<Toast>) {
    while let Ok(toast) = toasts.try_recv() {
        eprintln!("[{:?}] {}: {}", toast.severity, toast.summary, toast.detail);
    }
}
