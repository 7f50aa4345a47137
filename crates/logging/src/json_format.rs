// crates/logging/src/json_format.rs
#![allow(missing_docs)]

use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{Event, Subscriber};
use tracing_serde::{AsSerde, fields::AsMap};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, format::Writer};
use tracing_subscriber::registry::LookupSpan;

/// One JSON record per line for log files.
///
/// `message` is lifted to the top level next to `timestamp`, `level`,
/// `target` and `pid`; every other field stays under `fields`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFormatter;

fn record(event: &Event<'_>) -> Result<Value, serde_json::Error> {
    let meta = event.metadata();
    let mut fields = match serde_json::to_value(event.field_map())? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let message = fields.remove("message").unwrap_or(Value::Null);
    let timestamp = OffsetDateTime::now_utc()
        .format(&format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
        ))
        .unwrap_or_default();

    let mut obj = Map::new();
    obj.insert("timestamp".into(), Value::String(timestamp));
    obj.insert("level".into(), serde_json::to_value(meta.level().as_serde())?);
    obj.insert("target".into(), Value::String(meta.target().to_string()));
    obj.insert("pid".into(), Value::from(std::process::id()));
    obj.insert("message".into(), message);
    obj.insert("fields".into(), Value::Object(fields));
    Ok(Value::Object(obj))
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let value = record(event).map_err(|_| std::fmt::Error)?;
        writeln!(writer, "{value}")
    }
}
