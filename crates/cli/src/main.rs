use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use form_controls_core::{
    read_observations, register_default_controls, ComponentStore, ControlInput, CoreConfig,
    FileSelection, FormFieldPath, FormSession, InputOutcome, RuleValidator,
};
use form_files::UploadStore;
use forms::FormDefinition;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "formctl")]
#[command(about = "Drive clinical form controls from the command line")]
struct Cli {
    /// Form definition (YAML, or JSON with a .json extension)
    #[arg(long, global = true)]
    form: Option<PathBuf>,

    /// JSON array of previously recorded observations
    #[arg(long, global = true)]
    observations: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount the form and print its observations and initial errors
    Mount,
    /// Type text into a control
    Input {
        /// Form field path of the control (e.g. Vitals.1/3-0)
        path: String,
        /// Raw text as typed; surrounding whitespace is trimmed
        text: String,
    },
    /// Upload a file into a complex control
    Upload {
        /// Form field path of the control
        path: String,
        /// File to upload
        file: PathBuf,
        /// Declared media type, used when the content cannot be sniffed
        #[arg(long)]
        media_type: Option<String>,
    },
    /// Run save-time validation
    Validate,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("formctl=info".parse()?)
                .add_directive("form_controls_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'formctl --help' for commands");
        return Ok(());
    };

    let config = CoreConfig::from_env_values(
        std::env::var("FORM_NAMESPACE").ok(),
        std::env::var("FORM_UPLOAD_DIR").ok(),
    )?;

    let Some(form_path) = cli.form else {
        bail!("--form is required");
    };
    let mut session = mount_session(&form_path, cli.observations.as_deref(), &config)?;

    match command {
        Commands::Mount => {}
        Commands::Input { path, text } => {
            let path = FormFieldPath::parse(&path)?;
            if session.input(&path, ControlInput::Text(text))? == InputOutcome::Ignored {
                tracing::warn!("{} ignored the input", path);
            }
        }
        Commands::Upload {
            path,
            file,
            media_type,
        } => {
            let path = FormFieldPath::parse(&path)?;
            let selection = file_selection(&file, media_type)?;
            let store = UploadStore::new(config.upload_dir())?;
            session.upload_with(&path, selection, &store)?;
        }
        Commands::Validate => {
            let failures = session.validate()?;
            if failures.is_empty() {
                tracing::info!("all controls are valid");
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&report(&session)?)?);
    Ok(())
}

fn mount_session(
    form_path: &Path,
    observations_path: Option<&Path>,
    config: &CoreConfig,
) -> anyhow::Result<FormSession> {
    let form = load_form(form_path)?;
    let observations = match observations_path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading observations {}", path.display()))?;
            read_observations(&json)?
        }
        None => Vec::new(),
    };

    // Widgets are registered explicitly before any form is mounted.
    let mut components = ComponentStore::new();
    register_default_controls(&mut components);

    Ok(FormSession::mount(
        form,
        &observations,
        &components,
        Arc::new(RuleValidator),
        config,
    )?)
}

fn load_form(path: &Path) -> anyhow::Result<FormDefinition> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading form definition {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    let form = if is_json {
        FormDefinition::parse_json(&text)?
    } else {
        FormDefinition::parse_yaml(&text)?
    };
    Ok(form)
}

/// Reads `path` into the selection a browser file picker would produce.
fn file_selection(path: &Path, declared: Option<String>) -> anyhow::Result<FileSelection> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let media_type = infer::get(&bytes)
        .map(|kind| kind.mime_type().to_string())
        .or(declared)
        .with_context(|| {
            format!(
                "cannot detect the media type of {}; pass --media-type",
                path.display()
            )
        })?;
    let data_url = format!("data:{};base64,{}", media_type, STANDARD.encode(&bytes));
    Ok(FileSelection {
        media_type,
        data_url,
    })
}

fn report(session: &FormSession) -> anyhow::Result<serde_json::Value> {
    let errors: serde_json::Map<String, serde_json::Value> = session
        .errors()
        .into_iter()
        .map(|(path, errors)| serde_json::to_value(errors).map(|value| (path.to_string(), value)))
        .collect::<Result<_, _>>()?;
    let notifications: Vec<serde_json::Value> = session
        .notifications()
        .iter()
        .map(|(path, notification)| {
            json!({
                "formFieldPath": path.to_string(),
                "type": notification.kind(),
                "message": notification.to_string(),
            })
        })
        .collect();

    Ok(json!({
        "observations": session.observations(),
        "errors": errors,
        "notifications": notifications,
    }))
}
