//! Typed per-project settings.
//!
//! A setting is stored as a raw string plus a declared type. Inactive settings
//! behave as if they were absent, so callers always fall back to their
//! default.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

/// Business days between reminders.
pub const REMINDER_DAYS: &str = "reminder_days";

pub const DEFAULT_REMINDER_DAYS: u32 = 2;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SettingType {
  Int,
  Bool,
  String,
  List,
  Json,
}

impl SettingType {
  pub fn name(self) -> &'static str { self.into() }

  pub fn from_name(name: &str) -> Result<Self> {
    name
      .parse()
      .map_err(|_| Error::UnknownSettingType(name.to_owned()))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
  pub project_id:   Uuid,
  pub key:          String,
  pub raw_value:    String,
  pub setting_type: SettingType,
  pub active:       bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
  Int(i64),
  Bool(bool),
  String(String),
  List(Vec<String>),
  Json(serde_json::Value),
}

impl Setting {
  pub fn new(
    project_id: Uuid,
    key: impl Into<String>,
    raw_value: impl Into<String>,
    setting_type: SettingType,
  ) -> Self {
    Self {
      project_id,
      key: key.into(),
      raw_value: raw_value.into(),
      setting_type,
      active: true,
    }
  }

  /// Parse the raw value according to its declared type. Returns `None` for an
  /// inactive setting.
  pub fn value(&self) -> Result<Option<SettingValue>> {
    if !self.active {
      return Ok(None);
    }
    let raw = self.raw_value.trim();
    let value = match self.setting_type {
      SettingType::Int => SettingValue::Int(raw.parse().map_err(|e| {
        Error::InvalidSetting {
          key:    self.key.clone(),
          reason: format!("{e}"),
        }
      })?),
      SettingType::Bool => SettingValue::Bool(matches!(
        raw.to_ascii_lowercase().as_str(),
        "true" | "t" | "1"
      )),
      SettingType::String => SettingValue::String(self.raw_value.clone()),
      SettingType::List => {
        if raw.starts_with('[') && raw.ends_with(']') {
          SettingValue::List(serde_json::from_str(raw)?)
        } else {
          SettingValue::List(
            raw.split(',').map(|v| v.trim().to_owned()).collect(),
          )
        }
      }
      SettingType::Json => SettingValue::Json(serde_json::from_str(raw)?),
    };
    Ok(Some(value))
  }
}

/// Resolve the reminder interval from an optional `reminder_days` setting.
///
/// Missing, inactive, non-integer, or negative settings yield `default`.
pub fn reminder_days(setting: Option<&Setting>, default: u32) -> u32 {
  match setting.map(Setting::value) {
    Some(Ok(Some(SettingValue::Int(n)))) => u32::try_from(n).unwrap_or(default),
    _ => default,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn setting(raw: &str, ty: SettingType) -> Setting {
    Setting::new(Uuid::new_v4(), "k", raw, ty)
  }

  #[test]
  fn parses_each_type() {
    assert_eq!(
      setting("5", SettingType::Int).value().unwrap(),
      Some(SettingValue::Int(5))
    );
    assert_eq!(
      setting("T", SettingType::Bool).value().unwrap(),
      Some(SettingValue::Bool(true))
    );
    assert_eq!(
      setting("a, b,c", SettingType::List).value().unwrap(),
      Some(SettingValue::List(vec!["a".into(), "b".into(), "c".into()]))
    );
    assert_eq!(
      setting("[\"x\"]", SettingType::List).value().unwrap(),
      Some(SettingValue::List(vec!["x".into()]))
    );
  }

  #[test]
  fn inactive_setting_has_no_value() {
    let mut s = setting("5", SettingType::Int);
    s.active = false;
    assert_eq!(s.value().unwrap(), None);
    assert_eq!(reminder_days(Some(&s), 2), 2);
  }

  #[test]
  fn reminder_days_falls_back() {
    assert_eq!(reminder_days(None, DEFAULT_REMINDER_DAYS), 2);
    assert_eq!(reminder_days(Some(&setting("4", SettingType::Int)), 2), 4);
    assert_eq!(reminder_days(Some(&setting("-1", SettingType::Int)), 2), 2);
    assert_eq!(reminder_days(Some(&setting("soon", SettingType::Int)), 2), 2);
  }
}
