use std::sync::Arc;

use codeblue_schema::Intent;
use codeblue_store::EventStore;
use codeblue_timer::{TimerCallback, TimerService};
use serde_json::{Map, Value};

use crate::clock;
use crate::console::Console;
use crate::history::History;
use crate::interpreter::{Interpreter, NEXT_STEP_PROMPT};

/// Applies a normalized intent: mutates the event store, schedules timers,
/// or prints a reply. Per-turn failures become printed lines; nothing
/// reachable from `dispatch` aborts the interaction loop.
pub struct Dispatcher {
    store: EventStore,
    timers: TimerService,
    interpreter: Interpreter,
    console: Console,
}

impl Dispatcher {
    pub fn new(
        store: EventStore,
        timers: TimerService,
        interpreter: Interpreter,
        console: Console,
    ) -> Self {
        Self {
            store,
            timers,
            interpreter,
            console,
        }
    }

    /// Interpret one user utterance and apply the resulting intent.
    pub async fn handle_input(&self, text: &str, history: &mut History) {
        let intent = self.interpreter.interpret(text, history).await;
        self.dispatch(intent, history).await;
    }

    pub async fn dispatch(&self, intent: Intent, history: &mut History) {
        match intent {
            Intent::LogEvent { event, note, extra } => {
                self.log_event(&event, &note, extra, history).await;
            }
            Intent::StartTimer { seconds, label } => {
                self.start_timer(seconds, &label).await;
            }
            Intent::Reply { message } => {
                self.console.line(&message);
            }
            Intent::Unknown => {
                self.console.line("無法解析動作，請重新描述。");
            }
        }
    }

    async fn log_event(
        &self,
        event: &str,
        note: &str,
        extra: Option<Map<String, Value>>,
        history: &mut History,
    ) {
        let ts = clock::event_timestamp();
        match self.store.append(event, note, &ts, extra.as_ref()).await {
            Ok(id) => {
                tracing::info!(event_id = id, name = %event, "event logged");
                history.push(format!("{ts} {event} - {note}"));
                self.console
                    .line(&format!("已紀錄事件：{ts} {event}，並提供後續建議。"));

                // The suggestion is printed, never dispatched: a follow-up
                // that classifies as log_event cannot log a second event.
                match self.interpreter.interpret(NEXT_STEP_PROMPT, history).await {
                    Intent::Reply { message } => {
                        self.console.line(&format!("建議步驟：{message}"));
                    }
                    _ => {
                        self.console.line("無法提供建議，請手動處理。");
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "event append failed");
                self.console.line(&format!("紀錄事件失敗: {e}"));
            }
        }
    }

    async fn start_timer(&self, seconds: i64, label: &str) {
        let console = self.console.clone();
        let on_finish: TimerCallback = Arc::new(move |label, secs| {
            console.line(&format!("[callback] 計時器 '{label}' 結束 ({secs}s)"));
            console.line("接下來的步驟：請繼續監控病人的反應，準備給藥。");
        });

        self.timers.start(seconds, label, on_finish).await;
        let effective = if seconds > 0 {
            seconds as u64
        } else {
            codeblue_timer::DEFAULT_SECONDS
        };
        self.console
            .line(&format!("已開始計時器: {effective}秒 ({label})"));
    }
}
