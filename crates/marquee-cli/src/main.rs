// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use marquee_application::services::SeasonTarget;
use marquee_application::{
    AppState, AutoSearchTarget, ControlState, LibrarySnapshot, SearchContext, SortColumn,
    TracingNotifier,
};
use marquee_config::{load as load_config, TelemetryConfig};
use marquee_domain::{
    AvailabilityInfo, EpisodeId, MediaId, MediaReference, MediaType, SearchCriteria, SlotId,
    TmdbId, UserId,
};
use marquee_infrastructure::HttpBackendClient;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "marquee")]
#[command(version)]
#[command(about = "Acquisition status and release search for a media request backend")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML config file layered under MARQUEE_ environment overrides
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve request/download status and progress for one catalog item
    Status(StatusArgs),

    /// Run an automatic search and report the resulting control state
    AutoSearch {
        #[command(subcommand)]
        target: AutoTarget,
    },

    /// Search indexers for releases and optionally grab one
    Search(SearchArgs),
}

#[derive(Args)]
struct StatusArgs {
    #[arg(long)]
    tmdb_id: i64,

    /// movie or series
    #[arg(long, default_value = "movie")]
    media_type: MediaType,

    /// Library id of the item, if it is already in the library
    #[arg(long)]
    media_id: Option<i64>,

    /// Keep polling and report control state changes until interrupted
    #[arg(long)]
    watch: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum AutoTarget {
    Movie {
        #[arg(long)]
        id: i64,
    },
    Episode {
        #[arg(long)]
        id: i64,
    },
    Season {
        #[arg(long)]
        series_id: i64,
        #[arg(long)]
        season: u32,
    },
    Series {
        #[arg(long)]
        id: i64,
    },
    MovieSlot {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        slot: i64,
    },
    EpisodeSlot {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        slot: i64,
    },
}

impl From<AutoTarget> for AutoSearchTarget {
    fn from(target: AutoTarget) -> Self {
        match target {
            AutoTarget::Movie { id } => Self::Movie(MediaId(id)),
            AutoTarget::Episode { id } => Self::Episode(EpisodeId(id)),
            AutoTarget::Season { series_id, season } => Self::Season(SeasonTarget {
                series_id: MediaId(series_id),
                season_number: season,
            }),
            AutoTarget::Series { id } => Self::Series(MediaId(id)),
            AutoTarget::MovieSlot { id, slot } => Self::MovieSlot {
                movie_id: MediaId(id),
                slot_id: SlotId(slot),
            },
            AutoTarget::EpisodeSlot { id, slot } => Self::EpisodeSlot {
                episode_id: EpisodeId(id),
                slot_id: SlotId(slot),
            },
        }
    }
}

#[derive(Args)]
struct SearchArgs {
    /// Library movie to search for
    #[arg(long, conflicts_with = "series_id")]
    movie_id: Option<i64>,

    /// Library series to search for
    #[arg(long)]
    series_id: Option<i64>,

    #[arg(long, requires = "series_id")]
    season: Option<u32>,

    #[arg(long, requires = "season")]
    episode: Option<u32>,

    #[arg(long, requires = "episode")]
    episode_id: Option<i64>,

    #[arg(long)]
    query: Option<String>,

    #[arg(long)]
    tmdb_id: Option<i64>,

    #[arg(long)]
    limit: Option<usize>,

    #[arg(long, value_enum, default_value_t = SortArg::Score)]
    sort: SortArg,

    /// Grab the release with this guid from the results
    #[arg(long)]
    grab: Option<String>,

    /// Quality slot to fill when grabbing
    #[arg(long, requires = "grab")]
    slot: Option<i64>,
}

impl SearchArgs {
    fn context(&self) -> Result<SearchContext> {
        match (self.movie_id, self.series_id) {
            (Some(movie_id), None) => Ok(SearchContext::Movie {
                movie_id: MediaId(movie_id),
            }),
            (None, Some(series_id)) => Ok(SearchContext::Series {
                series_id: MediaId(series_id),
                season: self.season,
                episode: self.episode,
                episode_id: self.episode_id.map(EpisodeId),
            }),
            _ => bail!("one of --movie-id or --series-id is required"),
        }
    }

    fn criteria(&self) -> SearchCriteria {
        SearchCriteria {
            query: self.query.clone(),
            tmdb_id: self.tmdb_id.map(TmdbId),
            limit: self.limit,
            ..Default::default()
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum SortArg {
    Score,
    Title,
    Quality,
    Slot,
    Indexer,
    Size,
    Age,
    Peers,
}

impl From<SortArg> for SortColumn {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Score => Self::Score,
            SortArg::Title => Self::Title,
            SortArg::Quality => Self::Quality,
            SortArg::Slot => Self::Slot,
            SortArg::Indexer => Self::Indexer,
            SortArg::Size => Self::Size,
            SortArg::Age => Self::Age,
            SortArg::Peers => Self::Peers,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.telemetry);

    let state = AppState::new(config, Arc::new(TracingNotifier));
    state.on_start();

    let backend = HttpBackendClient::from_config(&state.config.backend)
        .context("failed to build backend client")?;

    match cli.command {
        Command::Status(args) => run_status(&state, &backend, args).await,
        Command::AutoSearch { target } => {
            let control = state.acquisition_control();
            let outcome = control.auto_search(&backend, target.into()).await;
            print_json(&json!({ "state": outcome }))
        }
        Command::Search(args) => run_search(&state, &backend, args).await,
    }
}

fn init_tracing(telemetry: &TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&telemetry.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    if telemetry.json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_status(state: &AppState, backend: &HttpBackendClient, args: StatusArgs) -> Result<()> {
    let reference = MediaReference {
        tmdb_id: TmdbId(args.tmdb_id),
        media_type: args.media_type,
    };
    let availability = AvailabilityInfo {
        media_id: args.media_id.map(MediaId),
        ..Default::default()
    };
    let user_id = state.config.backend.user_id.map(UserId);

    if !args.watch {
        let snapshot = LibrarySnapshot::fetch(backend).await?;
        let status = snapshot.resolve(reference, Some(&availability), user_id);
        let progress = snapshot.progress_for(reference, &status);
        return print_json(&json!({ "status": status, "progress": progress }));
    }

    let control = state.acquisition_control();
    let mut interval = tokio::time::interval(state.config.acquisition.poll_interval());
    let mut last: Option<ControlState> = None;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => return result,
            _ = interval.tick() => {}
        }

        let snapshot = LibrarySnapshot::fetch(backend).await?;
        let status = snapshot.resolve(reference, Some(&availability), user_id);
        let progress = snapshot.progress_for(reference, &status);
        control.observe_status(&status);

        let current = control.effective_state();
        if last.as_ref() != Some(&current) {
            info!(target: "cli", state = ?current, "control state changed");
            print_json(&json!({
                "state": current,
                "status": status,
                "progress": progress,
            }))?;
            last = Some(current);
        }
    }
}

async fn run_search(state: &AppState, backend: &HttpBackendClient, args: SearchArgs) -> Result<()> {
    let mut session = state.search_session(args.context()?, args.criteria());
    session.sync_dialog(true);

    let column = SortColumn::from(args.sort);
    if session.sort_state().column != column {
        session.sort_by(column);
    }

    session.enable();
    session.run(backend, state.notifier.as_ref()).await?;

    let releases: Vec<_> = session
        .releases()
        .iter()
        .map(|release| {
            json!({
                "guid": release.guid,
                "title": release.title,
                "indexer": release.indexer,
                "quality": release.quality,
                "size": release.size,
                "seeders": release.seeders,
                "score": release.score,
            })
        })
        .collect();
    print_json(&json!({ "releases": releases }))?;

    let Some(guid) = args.grab.as_deref() else {
        return Ok(());
    };
    if !session.select(guid) {
        bail!("release {guid} is not in the search results");
    }
    if let Some(outcome) = session
        .grab_selected(backend, state.notifier.as_ref(), args.slot.map(SlotId))
        .await
    {
        print_json(&json!({ "grabbed": outcome.success, "message": outcome.message }))?;
    }
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt()).context("install SIGINT handler")?;
        let mut terminate = signal(SignalKind::terminate()).context("install SIGTERM handler")?;
        tokio::select! {
            _ = interrupt.recv() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.context("ctrl_c handler")?;
    }

    info!(target: "cli", "shutdown signal received");
    Ok(())
}
