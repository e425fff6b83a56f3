use std::sync::Arc;

use codeblue_provider::{LlmProvider, LlmRequest, OpenAiProvider, DEFAULT_API_BASE};
use codeblue_schema::Intent;

use crate::history::History;

/// Fixed reply when no interpretation credential is configured.
pub const NO_PROVIDER_REPLY: &str = "OpenAI 尚未設定";

/// Synthetic prompt issued after every logged event.
pub const NEXT_STEP_PROMPT: &str = "下一步我該做什麼";

const API_KEY_ENV: &str = "OPENAI_API_KEY";
const API_BASE_ENV: &str = "OPENAI_API_BASE";

/// Turns raw user text plus history into a normalized [`Intent`].
///
/// One collaborator call per invocation, no retry; every failure mode
/// degrades to `reply` so the loop never sees an error.
pub struct Interpreter {
    provider: Option<Arc<dyn LlmProvider>>,
    model: String,
}

impl Interpreter {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Build from environment. A missing credential disables the external
    /// call rather than failing startup.
    pub fn from_env(model: impl Into<String>) -> Self {
        let api_base =
            std::env::var(API_BASE_ENV).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let provider = match OpenAiProvider::from_env(API_KEY_ENV, api_base) {
            Ok(provider) => Some(Arc::new(provider) as Arc<dyn LlmProvider>),
            Err(e) => {
                tracing::warn!("interpretation disabled: {e}");
                None
            }
        };
        Self::new(provider, model)
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// The single suspension point of the interaction loop. Infallible:
    /// transport and parse failures both come back as `reply`, the former
    /// with a diagnostic prefix and a warn-level log record.
    pub async fn interpret(&self, text: &str, history: &History) -> Intent {
        let Some(provider) = &self.provider else {
            return Intent::reply(NO_PROVIDER_REPLY);
        };

        let request = LlmRequest::simple(
            self.model.clone(),
            Some(system_prompt(history)),
            text.to_string(),
        );

        match provider.chat(request).await {
            Ok(response) => Intent::normalize(&response.text),
            Err(e) => {
                tracing::warn!(error = %e, "interpretation call failed");
                Intent::reply(format!("解析服務錯誤: {e}"))
            }
        }
    }
}

fn system_prompt(history: &History) -> String {
    format!(
        "你是一個 ACLS（急救心臟生命支持）助手，專注於協助使用者進行急救。\n\
         你的任務包括：\n\
         1. 判斷使用者輸入是否需要紀錄事件或給藥，並生成事件名稱、完整說明、藥物名稱、劑量、途徑、EKG等資訊。\n\
         2. 判斷是否需要設定計時器，並提供建議。\n\
         3. 僅提供急救建議，勿提供非急救醫療建議。\n\
         4. 所有回覆請簡明、精準、禮貌，使用中文。\n\
         5. 如果需要你紀錄事件，請自動根據ACLS紀錄完整，例如:epi 1mg ivp請記錄成Epinephrine 1mg IV-push\n\
         回覆必須是單一 JSON 紀錄，格式如下：\n\
         {{\"action\":\"log_event\",\"event\":\"電擊\",\"note\":\"VF 心律，已執行電擊\",\"extra\":{{\"ekg\":\"VF\",\"energy\":\"200J\"}}}} 或 \
         {{\"action\":\"start_timer\",\"seconds\":180,\"label\":\"下一次給藥\"}} 或 {{\"action\":\"reply\",\"message\":\"請先確定患者氣道\"}}\n\
         \n\
         如果使用者輸入了「病人OHCA」這樣的訊息，請紀錄病人發生OHCA的時間，並回覆指引：紀錄事件：OHCA，開始急救。\n\
         請提示開始心肺復甦（CPR），並準備使用除顫器（AED）。\n\
         如果病人已經進行了電擊，請提示繼續下一步急救措施。\n\
         \n\
         這是過去的急救事件，請參考它來建議下一步：\n\
         過去的急救事件：{}\n\
         現在請基於病人的狀況和過去的急救步驟，提供下一步的建議。",
        history.to_prompt_text()
    )
}
