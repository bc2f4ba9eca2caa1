use serde::Serialize;
use serde_json::value::{to_value, Value as Json};

/// Render JSON values into the text spliced by `{{x}}` and `{{{x}}}`.
pub trait JsonRender {
    fn render(&self) -> String;
}

/// The truthiness rule shared by `{{#x}}` and `{{^x}}` sections.
pub trait JsonTruthy {
    fn is_truthy(&self) -> bool;
}

impl JsonRender for Json {
    fn render(&self) -> String {
        match *self {
            Json::String(ref s) => s.to_string(),
            Json::Bool(i) => i.to_string(),
            Json::Number(ref n) => n.to_string(),
            Json::Null => String::new(),
            Json::Array(ref a) => a
                .iter()
                .map(JsonRender::render)
                .collect::<Vec<String>>()
                .join(","),
            Json::Object(_) => "[object]".to_owned(),
        }
    }
}

impl JsonTruthy for Json {
    fn is_truthy(&self) -> bool {
        match *self {
            Json::Bool(ref i) => *i,
            Json::Number(ref n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
            Json::Null => false,
            Json::String(ref i) => !i.is_empty() && i != "0",
            Json::Array(ref i) => !i.is_empty(),
            Json::Object(ref i) => !i.is_empty(),
        }
    }
}

impl JsonTruthy for Option<&Json> {
    fn is_truthy(&self) -> bool {
        self.map(JsonTruthy::is_truthy).unwrap_or(false)
    }
}

/// Convert any serializable value into the JSON used as render data.
///
/// Values that fail to serialize become `null`.
pub fn to_json<T>(src: T) -> Json
where
    T: Serialize,
{
    to_value(src).unwrap_or_default()
}
