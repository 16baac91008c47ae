//! Event management commands for CLI.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use dayweave_core::calendar::{EventId, Subcategory, UserId};
use dayweave_core::timeline::TimelineFilter;
use dayweave_core::{Category, EventPatch, Location, NewEvent, TransportMode};
use serde::Deserialize;

use super::{open_planner, parse_date, parse_instant, print_json, CmdResult};

#[derive(Args, Default)]
pub struct LocationArgs {
    /// Latitude in degrees (requires --lng)
    #[arg(long, allow_negative_numbers = true)]
    lat: Option<f64>,
    /// Longitude in degrees (requires --lat)
    #[arg(long, allow_negative_numbers = true)]
    lng: Option<f64>,
    /// Free-form street address
    #[arg(long)]
    address: Option<String>,
    /// Human-readable place name
    #[arg(long)]
    label: Option<String>,
}

impl LocationArgs {
    fn into_location(self) -> Result<Option<Location>, Box<dyn std::error::Error>> {
        let location = match (self.lat, self.lng, self.address) {
            (Some(lat), Some(lng), address) => {
                let loc = Location::from_coordinates(lat, lng)?;
                match address {
                    Some(address) => loc.with_address(address),
                    None => loc,
                }
            }
            (None, None, Some(address)) => Location::from_address(address)?,
            (None, None, None) => {
                if self.label.is_some() {
                    return Err("--label needs --lat/--lng or --address".into());
                }
                return Ok(None);
            }
            _ => return Err("--lat and --lng must be given together".into()),
        };
        Ok(Some(match self.label {
            Some(label) => location.with_label(label),
            None => location,
        }))
    }
}

#[derive(Subcommand)]
pub enum EventAction {
    /// Create an event
    Create {
        /// Owner user ID
        user: UserId,
        /// Event title
        summary: String,
        /// Start (RFC 3339 or YYYY-MM-DDTHH:MM local)
        #[arg(long)]
        start: String,
        /// End (RFC 3339 or YYYY-MM-DDTHH:MM local)
        #[arg(long)]
        end: String,
        #[command(flatten)]
        location: LocationArgs,
        /// Category (work, study, meeting, sport, leisure, household, focus, other)
        #[arg(long)]
        category: Option<Category>,
        /// Subcategory; implies its category
        #[arg(long)]
        subcategory: Option<Subcategory>,
        /// Transport mode used to reach this event
        #[arg(long)]
        mode: Option<TransportMode>,
    },
    /// List events of a user
    List {
        /// Owner user ID
        user: UserId,
        /// Day to list (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
        /// Include cancelled events
        #[arg(long)]
        include_cancelled: bool,
    },
    /// Get event details
    Get {
        /// Event ID
        id: EventId,
    },
    /// Update an event
    Update {
        /// Event ID
        id: EventId,
        /// New title
        #[arg(long)]
        summary: Option<String>,
        /// New start
        #[arg(long)]
        start: Option<String>,
        /// New end
        #[arg(long)]
        end: Option<String>,
        #[command(flatten)]
        location: LocationArgs,
        /// Remove the location
        #[arg(long, conflicts_with_all = ["lat", "lng", "address", "label"])]
        clear_location: bool,
        /// New category
        #[arg(long)]
        category: Option<Category>,
        /// New transport mode
        #[arg(long)]
        mode: Option<TransportMode>,
        /// Remove the transport mode
        #[arg(long, conflicts_with = "mode")]
        clear_mode: bool,
    },
    /// Cancel an event
    Cancel {
        /// Event ID
        id: EventId,
    },
    /// Mark an event as attended
    Confirm {
        /// Event ID
        id: EventId,
    },
    /// Import events from a JSON file
    Import {
        /// Owner user ID
        user: UserId,
        /// JSON array of {summary, start, end, location?, category?, subcategory?, transport_mode?}
        file: PathBuf,
    },
}

#[derive(Deserialize)]
struct ImportRecord {
    summary: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    location: Option<Location>,
    category: Option<Category>,
    subcategory: Option<Subcategory>,
    transport_mode: Option<TransportMode>,
}

impl ImportRecord {
    fn into_new_event(self, user: UserId) -> NewEvent {
        let mut event = NewEvent::new(user, self.summary, self.start, self.end);
        event.location = self.location;
        event.transport_mode = self.transport_mode;
        if let Some(category) = self.category {
            event = event.with_category(category);
        }
        if let Some(subcategory) = self.subcategory {
            event = event.with_subcategory(subcategory);
        }
        event
    }
}

pub fn run(action: EventAction) -> CmdResult {
    let planner = open_planner()?;
    let tz = planner.time_zone();

    match action {
        EventAction::Create {
            user,
            summary,
            start,
            end,
            location,
            category,
            subcategory,
            mode,
        } => {
            let mut event = NewEvent::new(user, summary, parse_instant(&start, tz)?, parse_instant(&end, tz)?);
            event.location = location.into_location()?;
            event.transport_mode = mode;
            if let Some(category) = category {
                event = event.with_category(category);
            }
            if let Some(subcategory) = subcategory {
                event = event.with_subcategory(subcategory);
            }
            print_json(&planner.create_event(event)?)?;
        }
        EventAction::List {
            user,
            date,
            include_cancelled,
        } => {
            let date = parse_date(date.as_deref(), tz)?;
            let (start, end) = planner.day_window(date);
            let filter = if include_cancelled {
                TimelineFilter::with_cancelled_since(start)
            } else {
                TimelineFilter::active_only()
            };
            print_json(&planner.events_in_window_with(user, start, end, filter)?)?;
        }
        EventAction::Get { id } => match planner.store().get_event(id)? {
            Some(event) => print_json(&event)?,
            None => return Err(format!("event {id} not found").into()),
        },
        EventAction::Update {
            id,
            summary,
            start,
            end,
            location,
            clear_location,
            category,
            mode,
            clear_mode,
        } => {
            let location = if clear_location {
                Some(None)
            } else {
                location.into_location()?.map(Some)
            };
            let patch = EventPatch {
                summary,
                start: start.map(|s| parse_instant(&s, tz)).transpose()?,
                end: end.map(|s| parse_instant(&s, tz)).transpose()?,
                location,
                category,
                subcategory: None,
                transport_mode: if clear_mode { Some(None) } else { mode.map(Some) },
            };
            print_json(&planner.update_event(id, patch)?)?;
        }
        EventAction::Cancel { id } => print_json(&planner.cancel_event(id)?)?,
        EventAction::Confirm { id } => print_json(&planner.confirm_event(id)?)?,
        EventAction::Import { user, file } => {
            let content = std::fs::read_to_string(&file)?;
            let records: Vec<ImportRecord> = serde_json::from_str(&content)?;
            let events = records.into_iter().map(|r| r.into_new_event(user)).collect();
            let report = planner.import_events(user, events)?;
            print_json(&report)?;
        }
    }
    Ok(())
}
