//! CLI subcommand handlers.

use crate::render;
use crate::{Commands, ConfigAction, ProfileAction, ProfileFields};
use paperlens_core::profile::LoadOutcome;
use paperlens_core::{ClientConfig, Dashboard, ProfileField, WorkflowOutcome};
use serde::Serialize;

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, config: &ClientConfig, json: bool) -> anyhow::Result<()> {
    let dashboard = || Dashboard::new(config);
    match command {
        Commands::Trends => {
            let snapshot = dashboard()?.trends.refresh().await;
            emit(json, &snapshot, || render::trends(&snapshot))
        }
        Commands::Authors => {
            let slice = dashboard()?.catalog.refresh_authors().await;
            emit(json, &slice, || render::authors(&slice))
        }
        Commands::Papers => {
            let slice = dashboard()?.catalog.refresh_papers().await;
            emit(json, &slice, || render::papers(&slice))
        }
        Commands::Search { query } => {
            let dashboard = dashboard()?;
            dashboard.search.search(&query.join(" ")).await;
            let session = dashboard.search.session();
            emit(json, &session, || render::search(&session))
        }
        Commands::Insights => {
            let snapshot = dashboard()?.insights.refresh().await;
            emit(json, &snapshot, || render::insights(&snapshot))
        }
        Commands::Profile { action } => handle_profile(action, &dashboard()?, json).await,
        Commands::Config { action } => handle_config(action, config),
    }
}

fn handle_config(action: ConfigAction, config: &ClientConfig) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let problems = config.validate();
            print!("{}", config.to_toml_string()?);
            for problem in problems {
                eprintln!("warning: {}", problem);
            }
            Ok(())
        }
    }
}

async fn handle_profile(action: ProfileAction, dashboard: &Dashboard, json: bool) -> anyhow::Result<()> {
    let profile = &dashboard.profile;

    // Start from the stored fields so omitted flags keep their values.
    if let LoadOutcome::Failed(e) = profile.load().await {
        let complete = match &action {
            ProfileAction::Show => false,
            ProfileAction::Save { fields } | ProfileAction::Analyze { fields } => fields.is_complete(),
        };
        if !complete {
            anyhow::bail!("Failed to load profile: {}", e);
        }
        tracing::warn!(error = %e, "Stored profile unavailable; saving the given fields");
    }

    let outcome = match action {
        ProfileAction::Show => None,
        ProfileAction::Save { fields } => {
            apply_fields(dashboard, fields);
            Some(profile.save().await)
        }
        ProfileAction::Analyze { fields } => {
            apply_fields(dashboard, fields);
            Some(profile.analyze().await)
        }
    };

    let snapshot = profile.snapshot();
    emit(json, &snapshot, || render::profile(&snapshot))?;

    match outcome {
        Some(WorkflowOutcome::Failed(e)) => Err(anyhow::anyhow!("Profile workflow failed: {}", e)),
        Some(WorkflowOutcome::Rejected) => Err(anyhow::anyhow!("Another profile workflow is running")),
        _ => Ok(()),
    }
}

impl ProfileFields {
    /// Every field was given, so nothing needs the stored profile.
    fn is_complete(&self) -> bool {
        self.name.is_some() && self.title.is_some() && self.proposal.is_some()
    }
}

fn apply_fields(dashboard: &Dashboard, fields: ProfileFields) {
    for (field, value) in [
        (ProfileField::Name, fields.name),
        (ProfileField::Title, fields.title),
        (ProfileField::Proposal, fields.proposal),
    ] {
        if let Some(value) = value {
            dashboard.profile.edit(field, value);
        }
    }
}

/// Print either pretty JSON of `value` or the rendered table.
fn emit<T: Serialize>(json: bool, value: &T, table: impl FnOnce() -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", table());
    }
    Ok(())
}
