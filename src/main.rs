use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use kiosk_checkin::{
    init_config, init_telemetry, preview_buttons, render_grid, Advance, ButtonConfig,
    ButtonConfigStore, ButtonIcon, ButtonId, ButtonType, CatalogSnapshot, CompletionDispatcher,
    ConfigRepository, FieldFlags, FieldKey, JsonFileRepository, Kiosk, KioskEngineConfig,
    NewButton, NotifyPolicy, SessionError, StandardField, StepKind, WorkflowConfigStore,
    WorkflowOptions, WorkflowResolver,
};

#[derive(Parser)]
#[command(name = "kiosk")]
#[command(about = "Configurable visitor and delivery check-in kiosk")]
#[command(long_about = "Drives the check-in kiosk from the command line: seed a button catalog, \
                       preview the welcome grid, inspect the screens a button resolves to, \
                       and run a scripted check-in end to end.")]
struct Cli {
    /// Catalog file (defaults to storage.catalog_path from configuration)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample button catalog
    Init {
        /// Overwrite an existing catalog
        #[arg(long)]
        force: bool,
    },
    /// Show the welcome grid as the kiosk would render it
    Preview {
        #[arg(long, default_value = "3")]
        columns: usize,
    },
    /// List the screens a button resolves to
    Resolve {
        /// Button id or label
        button: String,
    },
    /// Run one scripted check-in through the kiosk
    CheckIn {
        /// Button id or label
        button: String,
        /// Field values as key=value, e.g. --set fullName="Ada Lovelace"
        #[arg(long = "set", value_name = "KEY=VALUE")]
        values: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = init_config()?;
    init_telemetry(&config.observability)?;

    let catalog_path = cli
        .catalog
        .unwrap_or_else(|| config.storage.catalog_path.clone());
    let repository = JsonFileRepository::new(catalog_path);

    tokio::runtime::Runtime::new()?.block_on(async {
        match cli.command {
            Commands::Init { force } => init_command(&repository, force).await,
            Commands::Preview { columns } => preview_command(&repository, columns).await,
            Commands::Resolve { button } => resolve_command(&repository, config, &button).await,
            Commands::CheckIn { button, values } => {
                check_in_command(&repository, config, &button, &values).await
            }
        }
    })
}

async fn init_command(repository: &JsonFileRepository, force: bool) -> Result<()> {
    if !force && repository.load().await?.is_some() {
        bail!(
            "Catalog already exists at {} (use --force to overwrite)",
            repository.path().display()
        );
    }

    let store = ButtonConfigStore::new(Arc::new(WorkflowConfigStore::new()));
    let visit = store.add(NewButton::new("Visit Employee", ButtonType::VisitEmployee))?;
    let delivery = store.add(
        NewButton::new("Food Delivery", ButtonType::Delivery).with_icon(ButtonIcon::Coffee),
    )?;
    store.add(NewButton::new("Package Drop-off", ButtonType::Delivery).with_icon(ButtonIcon::Truck))?;
    store.add(NewButton::new("Interview", ButtonType::Other).with_icon(ButtonIcon::Briefcase))?;
    store.add(NewButton::new("All Hands", ButtonType::Event).disabled())?;

    let workflows = store.workflows();
    workflows.set_field_flags(&visit.id, StandardField::Host, FieldFlags::REQUIRED)?;
    workflows.set_options(
        &visit.id,
        WorkflowOptions {
            capture_photo: true,
            print_badge: true,
            require_nda: false,
        },
    )?;
    workflows.set_notify(
        &delivery.id,
        NotifyPolicy::SpecificContact {
            contact: "front-desk@example.com".to_string(),
        },
    )?;

    repository.save(&CatalogSnapshot::capture(&store)).await?;
    println!("✅ Wrote sample catalog to {}", repository.path().display());
    println!("   → Try: kiosk preview");
    Ok(())
}

async fn preview_command(repository: &JsonFileRepository, columns: usize) -> Result<()> {
    let store = load_catalog(repository).await?;
    print!("{}", render_grid(&preview_buttons(&store), columns));
    Ok(())
}

async fn resolve_command(
    repository: &JsonFileRepository,
    config: &KioskEngineConfig,
    needle: &str,
) -> Result<()> {
    let store = load_catalog(repository).await?;
    let button = find_button(&store, needle)?;
    let workflow = store.workflows().get(&button.id);
    let steps = WorkflowResolver::new(config.kiosk.contact_layout).resolve(&button, &workflow);

    println!("🧭 {} ({:?})", button.label, button.button_type);
    for (i, step) in steps.iter().enumerate() {
        println!("  {}. {}", i + 1, step_title(&step.kind));
        for field in &step.fields {
            let marker = if field.required { "*" } else { " " };
            println!("       {marker} {} [{}]", field.label, field.key);
        }
    }
    Ok(())
}

async fn check_in_command(
    repository: &JsonFileRepository,
    config: &KioskEngineConfig,
    needle: &str,
    raw_values: &[String],
) -> Result<()> {
    let store = load_catalog(repository).await?;
    let button = find_button(&store, needle)?;
    let values = parse_assignments(raw_values)?;

    let dispatcher = Arc::new(CompletionDispatcher::logging(
        config.completion.side_effect_timeout(),
    ));
    let mut kiosk = Kiosk::new(
        Arc::new(store),
        WorkflowResolver::new(config.kiosk.contact_layout),
        dispatcher,
        config.kiosk.idle_timeout(),
    );

    kiosk.start_session(button.id)?;
    println!("🚪 Started check-in: {}", button.label);
    if !kiosk.is_idle() {
        for (key, value) in values {
            kiosk.set_value(key, value)?;
        }
        loop {
            let title = kiosk
                .current_step()
                .map(|view| step_title(&view.step.kind))
                .unwrap_or("Success");
            match kiosk.advance() {
                Ok(Advance::Moved { .. }) => println!("  ✅ {title}"),
                Ok(Advance::Completed) => {
                    println!("  ✅ {title}");
                    break;
                }
                Err(SessionError::Validation(errors)) => {
                    println!("  ❌ {title}: {errors}");
                    kiosk.cancel()?;
                    bail!("Check-in stopped at {title}; supply the missing values with --set");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    let record = tokio::time::timeout(
        config.completion.side_effect_timeout() + Duration::from_secs(1),
        kiosk.next_completion(),
    )
    .await
    .context("Timed out waiting for completion side effects")?
    .ok_or_else(|| anyhow!("Completion channel closed"))?;

    println!("🎉 Checked in (session {})", record.session_id);
    if let Some(photo) = &record.photo {
        println!("   📷 Photo: {photo}");
    }
    if record.badge_printed {
        println!("   🪪 Badge printed");
    }
    if let Some(target) = &record.notified {
        println!("   📨 Notified: {target}");
    }
    for banner in record.banners() {
        println!("   ⚠️  {banner}");
    }
    Ok(())
}

async fn load_catalog(repository: &JsonFileRepository) -> Result<ButtonConfigStore> {
    let snapshot = repository.load().await?.ok_or_else(|| {
        anyhow!(
            "No catalog at {} (run: kiosk init)",
            repository.path().display()
        )
    })?;
    let store = ButtonConfigStore::new(Arc::new(WorkflowConfigStore::new()));
    snapshot.apply(&store)?;
    Ok(store)
}

fn find_button(store: &ButtonConfigStore, needle: &str) -> Result<ButtonConfig> {
    if let Ok(id) = needle.parse::<ButtonId>() {
        if let Some(button) = store.get(&id) {
            return Ok(button);
        }
    }
    store
        .list()
        .into_iter()
        .find(|b| b.label.eq_ignore_ascii_case(needle.trim()))
        .ok_or_else(|| anyhow!("No button matches '{needle}'"))
}

fn parse_assignments(raw: &[String]) -> Result<Vec<(FieldKey, String)>> {
    raw.iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{pair}'"))?;
            let key: FieldKey = key
                .trim()
                .parse()
                .map_err(|e| anyhow!("Invalid field key '{key}': {e}"))?;
            Ok((key, value.to_string()))
        })
        .collect()
}

fn step_title(kind: &StepKind) -> &'static str {
    match kind {
        StepKind::TypeSelect => "Visit type",
        StepKind::ContactInfo => "Contact information",
        StepKind::HostSearch => "Who are you visiting?",
        StepKind::CourierSelect => "Courier",
        StepKind::RecipientSearch => "Who is it for?",
        StepKind::CustomField(_) => "Additional information",
        StepKind::PhotoCapture => "Photo",
        StepKind::NdaSign => "Non-disclosure agreement",
        StepKind::Success => "Success",
    }
}
