//! Model selection and voice preferences on top of the `app_settings` table.

use tracing::{error, instrument};

use crate::domain::{find_model, ModelInfo, VoiceSettings, AVAILABLE_MODELS, DEFAULT_MODEL_ID};
use crate::store::{Store, StoreResult};

pub const SELECTED_MODEL_KEY: &str = "selected_ai_model";
pub const VOICE_AUTOPLAY_KEY: &str = "voice_autoplay_enabled";
pub const VOICE_INPUT_KEY: &str = "voice_input_enabled";

/// Model id for the next completion call. Read per request; store errors fall back to the default.
#[instrument(level = "debug", skip(store))]
pub fn selected_model(store: &Store) -> String {
  match store.get_setting(SELECTED_MODEL_KEY) {
    Ok(Some(id)) => id,
    Ok(None) => DEFAULT_MODEL_ID.to_string(),
    Err(e) => {
      error!(target: "aitalk_backend", error = %e, "Reading selected model failed; using default");
      DEFAULT_MODEL_ID.to_string()
    }
  }
}

/// Catalog entry for a stored id; unknown ids show the first catalog entry.
pub fn model_info_or_default(id: &str) -> &'static ModelInfo {
  find_model(id).unwrap_or(&AVAILABLE_MODELS[0])
}

/// Persist a model choice. Returns `None` when the id is not on the allow-list.
pub fn select_model(store: &Store, id: &str) -> StoreResult<Option<&'static ModelInfo>> {
  let Some(info) = find_model(id) else {
    return Ok(None);
  };
  store.set_setting(SELECTED_MODEL_KEY, info.id)?;
  Ok(Some(info))
}

pub fn voice_settings(store: &Store) -> StoreResult<VoiceSettings> {
  let defaults = VoiceSettings::default();
  let read = |key: &str, default: bool| -> StoreResult<bool> {
    Ok(store.get_setting(key)?.map(|v| v == "true").unwrap_or(default))
  };
  Ok(VoiceSettings {
    voice_autoplay_enabled: read(VOICE_AUTOPLAY_KEY, defaults.voice_autoplay_enabled)?,
    voice_input_enabled: read(VOICE_INPUT_KEY, defaults.voice_input_enabled)?,
  })
}

pub fn save_voice_settings(store: &Store, v: VoiceSettings) -> StoreResult<()> {
  store.set_settings(&[
    (VOICE_AUTOPLAY_KEY, bool_str(v.voice_autoplay_enabled)),
    (VOICE_INPUT_KEY, bool_str(v.voice_input_enabled)),
  ])
}

fn bool_str(b: bool) -> &'static str {
  if b { "true" } else { "false" }
}
