use crate::constants::ENTRYPOINT_MAKE_OVEN;
use crate::models::{ContractKind, Operation};
use chrono::{TimeZone, Utc};

/// Render an operation as a chat message, selected by contract kind.
pub fn format_operation(kind: ContractKind, op: &Operation) -> String {
    let when = render_timestamp(op.timestamp);

    match kind {
        ContractKind::Factory => {
            if op.entrypoint_is(ENTRYPOINT_MAKE_OVEN) {
                format!(
                    "🏭 New oven being set up by `{}` at {} (op `{}`)",
                    op.source, when, op.hash
                )
            } else {
                format!(
                    "🏭 `{}` on the factory by `{}` at {} (op `{}`)",
                    entrypoint_label(op),
                    op.source,
                    when,
                    op.hash
                )
            }
        }
        ContractKind::Oven => {
            let oven = op.destination.as_deref().unwrap_or("an oven");
            format!(
                "{} `{}` on oven `{}` by `{}` at {} (op `{}`)",
                entrypoint_emoji(op),
                entrypoint_label(op),
                oven,
                op.source,
                when,
                op.hash
            )
        }
    }
}

fn entrypoint_label(op: &Operation) -> &str {
    op.entrypoint.as_deref().unwrap_or("transfer")
}

fn entrypoint_emoji(op: &Operation) -> &'static str {
    match op.entrypoint.as_deref() {
        Some("borrow") => "🏦",
        Some("repay") => "💸",
        Some("withdraw") => "📤",
        Some("default") => "📥",
        Some("liquidate") => "⚠️",
        Some("setDelegate") => "🗳️",
        _ => "🔧",
    }
}

fn render_timestamp(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|time| time.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}
