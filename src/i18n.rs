/*
Simple i18n helper for user-visible messages.

This module provides:
- A tiny embedded translations store for ZH/EN (compile-time embedded JSON).
- A simple `tr` function to lookup translations by key + optional params.
- A `t` convenience wrapper using the active language (APP_LANG, default zh).

Usage:
    use crate::i18n;
    let msg = i18n::t("auth.required");
    let msg_with = i18n::t_with("class_day.already_open", &[("date", "2024-05-01")]);

Notes:
- Placeholders in translation strings use single-brace format: `{name}`.
- Default language is `zh`. If a key is missing for the requested language,
  the fallback language will be used.
*/

use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LANG: &str = "zh";

static TRANSLATIONS: OnceLock<HashMap<String, HashMap<String, String>>> = OnceLock::new();
static ACTIVE_LANG: OnceLock<String> = OnceLock::new();

const ZH_JSON: &str = r#"
{
  "auth.required": "尚未登入或登入已過期",
  "auth.logged_out": "已登出",
  "sync.not_configured": "尚未設定試算表 ID 或未登入",
  "spreadsheet.not_set": "尚未設定試算表 ID",
  "sheet.not_found": "找不到工作表「{sheet}」",
  "date.invalid": "無法解析日期：{date}",
  "class_day.already_open": "該日期已經開課：{date}",
  "class_day.not_found": "找不到該課程日期：{date}",
  "class_day.has_bookings": "無法關閉課程：已有 {count} 位學生預約",
  "class_day.full": "以下日期課程已額滿：{date}",
  "student.not_found": "找不到該學生：{id}",
  "student.name_required": "學生姓名不可為空",
  "students.not_found": "找不到以下學生: {ids}",
  "booking.no_students": "請至少選擇一位學生",
  "error.unsupported_language": "不支援的語言：{lang}"
}
"#;

const EN_JSON: &str = r#"
{
  "auth.required": "Not signed in or the session has expired",
  "auth.logged_out": "Logged out",
  "sync.not_configured": "Spreadsheet ID is not set or you are not signed in",
  "spreadsheet.not_set": "Spreadsheet ID is not set",
  "sheet.not_found": "Sheet \"{sheet}\" not found",
  "date.invalid": "Cannot parse date: {date}",
  "class_day.already_open": "A class is already open on {date}",
  "class_day.not_found": "No class is open on {date}",
  "class_day.has_bookings": "Cannot close class: {count} student(s) already booked",
  "class_day.full": "The class on {date} is full",
  "student.not_found": "Student not found: {id}",
  "student.name_required": "Student name must not be empty",
  "students.not_found": "Students not found: {ids}",
  "booking.no_students": "Select at least one student",
  "error.unsupported_language": "Unsupported language: {lang}"
}
"#;

/// Initialize translations map (lazy).
fn build_translations() -> HashMap<String, HashMap<String, String>> {
    let mut out: HashMap<String, HashMap<String, String>> = HashMap::new();

    let zh_map: HashMap<String, String> = serde_json::from_str(ZH_JSON).unwrap_or_else(|e| {
        panic!("failed to parse ZH_JSON in i18n module: {}", e);
    });
    out.insert("zh".to_string(), zh_map);

    let en_map: HashMap<String, String> = serde_json::from_str(EN_JSON).unwrap_or_else(|e| {
        panic!("failed to parse EN_JSON in i18n module: {}", e);
    });
    out.insert("en".to_string(), en_map);

    out
}

/// Returns the global translations map (lang -> (key -> message)).
fn translations() -> &'static HashMap<String, HashMap<String, String>> {
    TRANSLATIONS.get_or_init(build_translations)
}

/// Normalize a language tag into a short, lowercase code (e.g. "zh-TW" -> "zh").
pub fn normalize_language(lang: &str) -> String {
    lang.split('-').next().unwrap_or(lang).to_lowercase()
}

/// Returns true if the given language code is supported (e.g. "zh", "en").
pub fn is_supported_language(lang: &str) -> bool {
    translations().contains_key(lang)
}

/// Select the language used by `t` / `t_with`. Only the first call has an effect.
pub fn set_active_language(lang: &str) -> Result<(), String> {
    let lang = normalize_language(lang);
    if !is_supported_language(&lang) {
        return Err(tr(None, "error.unsupported_language", Some(&[("lang", lang.as_str())])));
    }
    let _ = ACTIVE_LANG.set(lang);
    Ok(())
}

fn active_language() -> &'static str {
    ACTIVE_LANG.get().map(String::as_str).unwrap_or(DEFAULT_LANG)
}

/// Translate a key using an explicit language (or default if None).
///
/// Returns the translated and parameter-substituted string. If no translation is found,
/// returns the default language value or the key itself.
pub fn tr(lang: Option<&str>, key: &str, params: Option<&[(&str, &str)]>) -> String {
    let map = translations();

    let desired = lang.unwrap_or(DEFAULT_LANG);

    let val = map
        .get(desired)
        .and_then(|m| m.get(key))
        .cloned()
        .or_else(|| map.get(DEFAULT_LANG).and_then(|m| m.get(key)).cloned())
        // If still missing, return the key itself (useful in logs)
        .unwrap_or_else(|| key.to_string());

    if let Some(params) = params {
        let mut s = val;
        for (k, v) in params {
            s = s.replace(&format!("{{{}}}", k), v);
        }
        s
    } else {
        val
    }
}

/// Convenience wrapper: translate using the active language.
pub fn t(key: &str) -> String {
    tr(Some(active_language()), key, None)
}

/// Convenience wrapper with params (active language).
pub fn t_with(key: &str, params: &[(&str, &str)]) -> String {
    tr(Some(active_language()), key, Some(params))
}
