use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use copydesk_core::{
    update, AppState, ClaimPreview, Document, Msg, OperationKind, OperationRequest, Payload,
    SlotPhase,
};
use copydesk_engine::{AtomicDir, EngineHandle, HttpTaskApi};
use copydesk_logging::desk_info;

use super::config::AppConfig;
use super::effects::EffectRunner;
use super::persistence;
use super::render::{self, ProgressRenderer};
use crate::cli::{Brief, Cli, Command, OutputArgs};

const EVENT_WAIT: Duration = Duration::from_millis(100);

pub fn run_app(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        config.api.base_url = api_url;
    }
    copydesk_logging::initialize(config.log_destination(), config.log_level()?);

    let cache = persistence::open_cache(&config.store.dir)
        .with_context(|| format!("opening store at {}", config.store.dir.display()))?;
    let api = HttpTaskApi::new(config.api_settings())
        .with_context(|| format!("api base url {:?}", config.api.base_url))?;
    let engine = EngineHandle::new(Arc::new(api), config.poll_settings());

    let mut session = Session::new(
        AppState::new().with_locator_config(config.locator_config()),
        EffectRunner::new(engine, cache),
    );
    let result = session.execute(cli.command);
    session.runner.shutdown();
    result
}

struct Session {
    state: AppState,
    runner: EffectRunner,
    renderer: ProgressRenderer,
}

impl Session {
    fn new(state: AppState, runner: EffectRunner) -> Self {
        let mut session = Self {
            state,
            runner,
            renderer: ProgressRenderer::default(),
        };
        let restored = session.runner.restored_cache();
        session.dispatch(Msg::RestoreCache(restored));
        session
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            for line in self.renderer.render(&state.view()) {
                eprintln!("{line}");
            }
        }
        self.state = state;
        self.runner.run(effects);
    }

    /// Feeds engine events into the state until `done` holds.
    fn run_until(&mut self, done: impl Fn(&AppState) -> bool) -> anyhow::Result<()> {
        while !done(&self.state) {
            if let Some(msg) = self.runner.next_msg(EVENT_WAIT)? {
                self.dispatch(msg);
            }
        }
        Ok(())
    }

    fn execute(&mut self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Research { brief, output } => {
                let Brief {
                    keywords,
                    industry,
                    audience,
                } = brief;
                self.run_operation(
                    OperationRequest::Research {
                        keywords,
                        industry,
                        audience,
                    },
                    &output,
                )
            }
            Command::Outline {
                brief,
                research,
                output,
            } => {
                let research_summary = research.as_deref().map(read_text).transpose()?;
                let Brief {
                    keywords,
                    industry,
                    audience,
                } = brief;
                self.run_operation(
                    OperationRequest::Outline {
                        keywords,
                        industry,
                        audience,
                        research_summary,
                    },
                    &output,
                )
            }
            Command::Generate {
                title,
                brief,
                outline,
                output,
            } => {
                let outline = outline.as_deref().map(read_text).transpose()?;
                let Brief {
                    keywords,
                    industry,
                    audience,
                } = brief;
                self.run_operation(
                    OperationRequest::MediumGeneration {
                        title,
                        keywords,
                        industry,
                        audience,
                        outline,
                    },
                    &output,
                )
            }
            Command::Rewrite {
                input,
                instructions,
                output,
            } => {
                let content = read_text(&input)?;
                self.run_operation(
                    OperationRequest::Rewrite {
                        content,
                        instructions,
                    },
                    &output,
                )
            }
            Command::FactCheck {
                input,
                apply,
                output,
            } => self.fact_check(&input, apply, &output),
        }
    }

    fn run_operation(&mut self, request: OperationRequest, output: &OutputArgs) -> anyhow::Result<()> {
        let kind = request.kind();
        self.dispatch(Msg::OperationRequested(request));
        self.run_until(|state| !is_running(state, kind))?;

        let Some(slot) = self.state.slot(kind) else {
            bail!("{kind} request was not accepted");
        };
        match (&slot.phase, &slot.result) {
            (SlotPhase::Completed, Some(result)) => {
                let text = payload_text(result)?;
                emit(&text, output)
            }
            _ => bail!(
                "{}",
                self.state
                    .last_error()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{kind} did not complete"))
            ),
        }
    }

    fn fact_check(&mut self, input: &Path, apply: bool, output: &OutputArgs) -> anyhow::Result<()> {
        let markdown = read_text(input)?;
        self.dispatch(Msg::DocumentLoaded(Document::from_markdown(&markdown)));
        self.dispatch(Msg::FactCheckRequested);
        self.run_until(|state| !state.fact_check_pending())?;
        if let Some(error) = self.state.last_error() {
            bail!("{error}");
        }

        let claim_count = self.state.claims().len();
        desk_info!("fact-check returned {} claims", claim_count);
        for claim_index in 0..claim_count {
            self.dispatch(Msg::ClaimPreviewRequested { claim_index });
            if let Some(preview) = self.state.view().preview {
                for line in render::preview_lines(&preview) {
                    println!("{line}");
                }
            }
            let ready = matches!(self.state.preview(), Some(ClaimPreview::Ready(_)));
            if apply && ready {
                self.dispatch(Msg::ClaimFixApproved);
            } else {
                self.dispatch(Msg::ClaimFixDismissed);
            }
        }

        for claim in &self.state.view().claims {
            println!("{}", render::claim_line(claim));
        }
        if apply {
            emit(&self.state.document().flatten(), output)?;
        }
        Ok(())
    }
}

fn is_running(state: &AppState, kind: OperationKind) -> bool {
    state.slot(kind).is_some_and(|slot| slot.phase.is_active())
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn payload_text(payload: &Payload) -> anyhow::Result<String> {
    match payload {
        Payload::String(text) => Ok(text.clone()),
        other => Ok(serde_json::to_string_pretty(other)?),
    }
}

fn emit(text: &str, output: &OutputArgs) -> anyhow::Result<()> {
    let Some(path) = &output.output else {
        println!("{text}");
        return Ok(());
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} is not a file path", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    let written = AtomicDir::open(dir)?.replace_file(file_name, text)?;
    eprintln!("wrote {}", written.display());
    Ok(())
}
