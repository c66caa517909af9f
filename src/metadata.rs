pub mod builder;
pub mod engine;
pub mod error;
pub mod locks;
pub mod remove;
pub mod scanner;
pub mod store;

/// The `lastUpdated` stamp format, `yyyyMMddHHmmss` in UTC.
pub fn now_stamp() -> String {
    let format = time::macros::format_description!(
        "[year][month][day][hour][minute][second]"
    );
    time::OffsetDateTime::now_utc()
        .format(format)
        .unwrap_or_else(|_| "00000000000000".to_string())
}
