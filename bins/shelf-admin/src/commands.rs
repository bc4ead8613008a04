// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Subcommands and their execution against a metadata store.

use anyhow::{bail, Context, Result};
use clap::{Subcommand, ValueEnum};
use shelf_metadata::{MetadataGateway, MetadataStore, WriteOutcome};
use shelf_prefs::{DefaultSortService, SettingsService};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// UI settings (dark mode, mass-input mode)
    Settings {
        #[command(subcommand)]
        action: SettingsCmd,
    },
    /// Per-entity default sort preferences
    Sort {
        #[command(subcommand)]
        action: SortCmd,
    },
    /// Raw metadata records
    Meta {
        #[command(subcommand)]
        action: MetaCmd,
    },
    /// Last list filter (always stored locally)
    Filter {
        #[command(subcommand)]
        action: FilterCmd,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCmd {
    /// Print the current settings (creates defaults if missing)
    Show,
    /// Turn dark mode on or off
    DarkMode { state: Toggle },
    /// Turn mass-input mode on or off
    MassInput { state: Toggle },
}

#[derive(Subcommand, Debug)]
pub enum SortCmd {
    /// Print all preferences, or the one for ENTITY
    Show { entity: Option<String> },
    /// Set the default sort for ENTITY
    Set {
        entity: String,
        field: String,
        operand: String,
    },
    /// Remove the default sort for ENTITY
    Remove { entity: String },
}

#[derive(Subcommand, Debug)]
pub enum MetaCmd {
    /// Print the record stored under KEY
    Get { key: String },
    /// Store a JSON value under KEY
    Set { key: String, json: String },
    /// Delete the record stored under KEY
    Delete { key: String },
}

#[derive(Subcommand, Debug)]
pub enum FilterCmd {
    /// Print the saved filter
    Show,
    /// Save a filter string
    Set { text: String },
    /// Forget the saved filter
    Clear,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    fn enabled(self) -> bool {
        self == Self::On
    }
}

/// Run a settings/sort/meta command and return what should be printed.
pub async fn execute<G>(cmd: &Command, store: MetadataStore<G>) -> Result<String>
where
    G: MetadataGateway + 'static,
{
    match cmd {
        Command::Settings { action } => settings(action, store).await,
        Command::Sort { action } => sort(action, store).await,
        Command::Meta { action } => meta(action, store).await,
        Command::Filter { .. } => bail!("filter commands use the local store"),
    }
}

async fn settings<G>(action: &SettingsCmd, store: MetadataStore<G>) -> Result<String>
where
    G: MetadataGateway + 'static,
{
    let service = SettingsService::new(store);
    service.load_settings().await;
    let pending = match action {
        SettingsCmd::Show => None,
        SettingsCmd::DarkMode { state } => Some(service.update_dark_mode(state.enabled())),
        SettingsCmd::MassInput { state } => Some(service.update_mass_input_mode(state.enabled())),
    };
    if let Some(pending) = pending {
        if !pending.await {
            bail!("failed to persist settings");
        }
    }
    Ok(serde_json::to_string_pretty(&service.current())?)
}

async fn sort<G>(action: &SortCmd, store: MetadataStore<G>) -> Result<String>
where
    G: MetadataGateway,
{
    let service = DefaultSortService::load(store).await;
    match action {
        SortCmd::Show { entity: None } => Ok(serde_json::to_string_pretty(&service.snapshot())?),
        SortCmd::Show {
            entity: Some(entity),
        } => Ok(match service.default_sort(entity) {
            Some(pref) => serde_json::to_string_pretty(&pref)?,
            None => format!("no default sort for {entity}"),
        }),
        SortCmd::Set {
            entity,
            field,
            operand,
        } => {
            if !service.set_default_sort(entity, field, operand).await {
                bail!("failed to persist default sort for {entity}");
            }
            Ok(format!("{entity}: {field} {operand}"))
        }
        SortCmd::Remove { entity } => {
            if !service.remove_default_sort(entity).await {
                bail!("failed to remove default sort for {entity}");
            }
            Ok(format!("removed default sort for {entity}"))
        }
    }
}

async fn meta<G>(action: &MetaCmd, store: MetadataStore<G>) -> Result<String>
where
    G: MetadataGateway,
{
    match action {
        MetaCmd::Get { key } => {
            let record = store
                .record(key)
                .await
                .with_context(|| format!("fetch {key}"))?;
            Ok(serde_json::to_string_pretty(&record)?)
        }
        MetaCmd::Set { key, json } => {
            let value: serde_json::Value =
                serde_json::from_str(json).context("value must be valid JSON")?;
            let outcome = store
                .write(key, &value)
                .await
                .with_context(|| format!("write {key}"))?;
            Ok(match outcome {
                WriteOutcome::Created => format!("created {key}"),
                WriteOutcome::Updated => format!("updated {key}"),
            })
        }
        MetaCmd::Delete { key } => {
            if !store.delete(key).await {
                bail!("failed to delete {key}");
            }
            Ok(format!("deleted {key}"))
        }
    }
}
