use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use crate::config::AppConfig;
use crate::pipeline;
use crate::state::{Delta, ProviderCommand};

/// Runs pipelines on a worker thread, one command at a time.
pub fn spawn_provider(cfg: AppConfig, tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                ProviderCommand::Run {
                    provider,
                    bookmaker,
                } => {
                    let mut cfg = cfg.clone();
                    cfg.provider = provider;
                    cfg.bookmaker = bookmaker;
                    if tx.send(Delta::RunStarted(provider)).is_err() {
                        return;
                    }

                    let progress_tx = tx.clone();
                    let result = pipeline::run(&cfg, |progress| {
                        let _ = progress_tx.send(Delta::Progress {
                            current: progress.current,
                            total: progress.total,
                            event_id: progress.event_id,
                        });
                    });
                    let delta = match result {
                        Ok(report) => Delta::RunFinished(Box::new(report)),
                        Err(err) => Delta::RunFailed(format!("{err:#}")),
                    };
                    if tx.send(delta).is_err() {
                        return;
                    }
                }
            }
        }
    });
}
