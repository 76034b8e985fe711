use std::io;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Instant;

use chrono::Utc;
use clai_core::Effect;
use clai_core::HistoryEntry;
use clai_core::HistoryStore;
use clai_core::RuntimeAction;
use clai_exec::ClipboardSink;
use clai_exec::CommandModel;
use clai_exec::ExecError;
use clai_exec::PlatformContext;
use clai_exec::ShellRunner;

/// Side-effecting collaborators the per-effect workers hand work to.
pub struct Services {
    pub model: Arc<dyn CommandModel>,
    pub shell: Arc<dyn ShellRunner>,
    pub clipboard: Arc<dyn ClipboardSink>,
}

#[derive(Clone)]
pub struct EffectDispatcher {
    tx: Sender<RuntimeAction>,
    services: Arc<Services>,
    history_tx: Sender<Effect>,
}

impl EffectDispatcher {
    /// Starts the history worker, which owns `history` for the dispatcher's lifetime.
    pub fn new(
        tx: Sender<RuntimeAction>,
        services: Services,
        history: HistoryStore,
    ) -> io::Result<Self> {
        let (history_tx, history_rx) = mpsc::channel();
        let results = tx.clone();
        thread::Builder::new()
            .name("clai-history".to_string())
            .spawn(move || run_history_worker(&history, &history_rx, &results))?;

        Ok(Self {
            tx,
            services: Arc::new(services),
            history_tx,
        })
    }

    /// History effects are queued on the history worker and run in dispatch
    /// order; everything else gets its own thread, whose handle is returned.
    /// Reporting effects send exactly one result.
    pub fn dispatch(&self, effect: Effect) -> Option<JoinHandle<()>> {
        tracing::debug!(effect = effect.label(), "dispatching");
        if effect.is_history() {
            if self.history_tx.send(effect).is_err() {
                tracing::warn!("history worker is gone, dropping effect");
            }
            return None;
        }

        let tx = self.tx.clone();
        let services = Arc::clone(&self.services);
        Some(thread::spawn(move || {
            if let Some(result) = execute(&services, effect) {
                // The loop may already be gone; late results are dropped.
                let _ = tx.send(result);
            }
        }))
    }
}

fn run_history_worker(
    store: &HistoryStore,
    jobs: &Receiver<Effect>,
    results: &Sender<RuntimeAction>,
) {
    for effect in jobs {
        if let Some(result) = execute_history(store, effect) {
            let _ = results.send(result);
        }
    }
    tracing::debug!("history worker stopped");
}

fn execute_history(store: &HistoryStore, effect: Effect) -> Option<RuntimeAction> {
    match effect {
        Effect::LoadHistory => Some(RuntimeAction::HistoryLoaded {
            entries: store.load_newest_first(),
        }),
        Effect::AppendHistory {
            prompt_text,
            response_code,
        } => {
            let entry = HistoryEntry::new(Utc::now(), prompt_text, response_code);
            if let Err(err) = store.append(entry) {
                tracing::warn!(path = %store.path().display(), error = %err, "failed to append history");
            }
            None
        }
        Effect::PatchLastHistory { explanation } => {
            match store.patch_last_explanation(&explanation) {
                Ok(true) => {}
                Ok(false) => tracing::debug!("no history entry to attach explanation to"),
                Err(err) => {
                    tracing::warn!(path = %store.path().display(), error = %err, "failed to patch history")
                }
            }
            None
        }
        other => {
            tracing::warn!(effect = other.label(), "not a history effect");
            None
        }
    }
}

fn execute(services: &Services, effect: Effect) -> Option<RuntimeAction> {
    match effect {
        Effect::RequestCode { prompt } => {
            let started = Instant::now();
            let result = services
                .model
                .generate_command(&prompt, &PlatformContext::current());
            log_failure("code request", &result);
            Some(RuntimeAction::CodeRequestFinished {
                result: result.map_err(|err| err.to_string()),
                elapsed: started.elapsed(),
            })
        }
        Effect::RequestExplanation { command } => {
            let started = Instant::now();
            let result = services.model.explain_command(&command);
            log_failure("explanation request", &result);
            Some(RuntimeAction::ExplanationFinished {
                result: result.map_err(|err| err.to_string()),
                elapsed: started.elapsed(),
            })
        }
        Effect::RunShell { command } => {
            let started = Instant::now();
            let result = services.shell.run(&command);
            Some(RuntimeAction::ShellRunFinished {
                result: result.map_err(|err| err.to_string()),
                elapsed: started.elapsed(),
            })
        }
        Effect::CopyToClipboard { text } => {
            let result = services.clipboard.copy(&text);
            log_failure("clipboard copy", &result);
            Some(RuntimeAction::ClipboardFinished {
                result: result.map_err(|err| err.to_string()),
            })
        }
        Effect::LoadHistory | Effect::AppendHistory { .. } | Effect::PatchLastHistory { .. } => {
            tracing::warn!(effect = effect.label(), "history effect outside the history worker");
            None
        }
    }
}

fn log_failure<T>(what: &str, result: &Result<T, ExecError>) {
    if let Err(err) = result {
        tracing::warn!(error = %err, "{what} failed");
    }
}
